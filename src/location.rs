//! Device location providers

use std::error::Error;
use std::fmt::{Display, Formatter};
#[cfg(feature = "mock_services")]
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "mock_services")]
use crate::mock_behaviour::MockBehaviour;
#[cfg(feature = "mock_services")]
use crate::store::lock;


/// A geographic coordinate, in decimal degrees
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// The answer of the user when asked for location access
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}


#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Ask for the permission to read the location while the app is in the foreground
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, Box<dyn Error>>;
    /// Read the current position once
    async fn current_coordinate(&self) -> Result<Coordinate, Box<dyn Error>>;
}


/// A location provider that always reports the same place.
///
/// Without a coordinate, it behaves like a device where location access has been refused
#[derive(Clone, Debug)]
pub struct FixedLocation {
    coordinate: Option<Coordinate>,
}

impl FixedLocation {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, Box<dyn Error>> {
        Ok(match self.coordinate {
            Some(_) => PermissionStatus::Granted,
            None => PermissionStatus::Denied,
        })
    }

    async fn current_coordinate(&self) -> Result<Coordinate, Box<dyn Error>> {
        self.coordinate.ok_or_else(|| "No location has been configured".into())
    }
}


/// A fake [`LocationProvider`], whose answers are set by the test
#[cfg(feature = "mock_services")]
#[derive(Debug)]
pub struct MockLocation {
    permission: PermissionStatus,
    coordinate: Coordinate,
    behaviour: Mutex<MockBehaviour>,
    coordinate_requests: Mutex<u32>,
}

#[cfg(feature = "mock_services")]
impl MockLocation {
    pub fn granted(coordinate: Coordinate) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            coordinate,
            behaviour: Mutex::new(MockBehaviour::new()),
            coordinate_requests: Mutex::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            ..Self::granted(Coordinate::new(0.0, 0.0))
        }
    }

    pub fn with_behaviour(self, behaviour: MockBehaviour) -> Self {
        *lock(&self.behaviour) = behaviour;
        self
    }

    /// How many times the coordinate has been read
    pub fn coordinate_requests(&self) -> u32 {
        *lock(&self.coordinate_requests)
    }
}

#[cfg(feature = "mock_services")]
#[async_trait]
impl LocationProvider for MockLocation {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, Box<dyn Error>> {
        lock(&self.behaviour).can_request_permission()?;
        Ok(self.permission)
    }

    async fn current_coordinate(&self) -> Result<Coordinate, Box<dyn Error>> {
        *lock(&self.coordinate_requests) += 1;
        lock(&self.behaviour).can_get_coordinate()?;
        Ok(self.coordinate)
    }
}
