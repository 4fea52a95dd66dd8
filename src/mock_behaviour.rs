//! This module provides ways to tweak mocked sources, so that they can return errors on some tests
#![cfg(feature = "mock_services")]

use std::error::Error;

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    // From the TaskStore trait
    pub create_behaviour: (u32, u32),
    pub update_behaviour: (u32, u32),
    pub delete_behaviour: (u32, u32),
    pub subscribe_behaviour: (u32, u32),

    // From the LocationProvider trait
    pub permission_behaviour: (u32, u32),
    pub coordinate_behaviour: (u32, u32),

    // From the PrayerTimesSource trait
    pub fetch_timings_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All actions will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            create_behaviour: (0, n_fails),
            update_behaviour: (0, n_fails),
            delete_behaviour: (0, n_fails),
            subscribe_behaviour: (0, n_fails),
            permission_behaviour: (0, n_fails),
            coordinate_behaviour: (0, n_fails),
            fetch_timings_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_create(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.create_behaviour, "create")
    }
    pub fn can_update(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.update_behaviour, "update")
    }
    pub fn can_delete(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.delete_behaviour, "delete")
    }
    pub fn can_subscribe(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.subscribe_behaviour, "subscribe")
    }
    pub fn can_request_permission(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.permission_behaviour, "request_foreground_permission")
    }
    pub fn can_get_coordinate(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.coordinate_behaviour, "current_coordinate")
    }
    pub fn can_fetch_timings(&mut self) -> Result<(), Box<dyn Error>> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.fetch_timings_behaviour, "fetch_timings")
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> Result<(), Box<dyn Error>> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
            Err(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value).into())
        } else {
            log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        assert!(ok.can_create().is_ok());
        assert!(ok.can_create().is_ok());
        assert!(ok.can_update().is_ok());
        assert!(ok.can_delete().is_ok());
        assert!(ok.can_fetch_timings().is_ok());

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_create().is_err());
        assert!(now.can_update().is_err());
        assert!(now.can_update().is_err());
        assert!(now.can_create().is_err());
        assert!(now.can_create().is_ok());
        assert!(now.can_create().is_ok());
        assert!(now.can_update().is_ok());

        let mut custom = MockBehaviour{
            create_behaviour: (0,1),
            delete_behaviour: (1,3),
            ..MockBehaviour::default()
        };
        assert!(custom.can_create().is_err());
        assert!(custom.can_create().is_ok());
        assert!(custom.can_create().is_ok());
        assert!(custom.can_delete().is_ok());
        assert!(custom.can_delete().is_err());
        assert!(custom.can_delete().is_err());
        assert!(custom.can_delete().is_err());
        assert!(custom.can_delete().is_ok());
        assert!(custom.can_delete().is_ok());
    }

    #[test]
    fn suspended_behaviour_allows_everything() {
        let mut failing = MockBehaviour::fail_now(5);
        failing.suspend();
        assert!(failing.can_subscribe().is_ok());
        assert!(failing.can_request_permission().is_ok());
        failing.resume();
        assert!(failing.can_subscribe().is_err());
        assert!(failing.can_get_coordinate().is_err());
    }
}
