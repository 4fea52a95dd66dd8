//! The prayer times screen

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::location::{LocationProvider, PermissionStatus};
use crate::navigation::Navigation;
use crate::prayer::{Prayer, PrayerTimesSource, Timings};


/// What can go wrong while loading prayer times.
///
/// Only the permission refusal is told apart: every other failure ends up in [`Self::Unexpected`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrayerTimesError {
    PermissionDenied,
    /// The service replied with a code other than 200
    FetchFailed,
    Unexpected,
}

impl Display for PrayerTimesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PrayerTimesError::PermissionDenied => write!(f, "Location permission denied"),
            PrayerTimesError::FetchFailed => write!(f, "Failed to fetch prayer times"),
            PrayerTimesError::Unexpected => write!(f, "Error fetching data"),
        }
    }
}

impl Error for PrayerTimesError {}


#[derive(Clone, Debug, PartialEq)]
pub enum PrayerTimesState {
    Loading,
    Data(Timings),
    Error(PrayerTimesError),
}

impl Default for PrayerTimesState {
    fn default() -> Self {
        PrayerTimesState::Loading
    }
}


/// Finds where the device is, and shows today's prayer times there
pub struct PrayerTimesScreen<L, P>
where
    L: LocationProvider + ?Sized,
    P: PrayerTimesSource + ?Sized,
{
    location: Arc<L>,
    service: Arc<P>,
    state: PrayerTimesState,
}

impl<L, P> PrayerTimesScreen<L, P>
where
    L: LocationProvider + ?Sized,
    P: PrayerTimesSource + ?Sized,
{
    pub fn new(location: Arc<L>, service: Arc<P>) -> Self {
        Self { location, service, state: PrayerTimesState::Loading }
    }

    pub fn state(&self) -> &PrayerTimesState { &self.state }

    pub fn is_loading(&self) -> bool {
        self.state == PrayerTimesState::Loading
    }

    pub fn error(&self) -> Option<PrayerTimesError> {
        match &self.state {
            PrayerTimesState::Error(err) => Some(*err),
            _ => None,
        }
    }

    pub fn timings(&self) -> Option<&Timings> {
        match &self.state {
            PrayerTimesState::Data(timings) => Some(timings),
            _ => None,
        }
    }

    /// Load the prayer times: ask for the location permission, read the location, then query the service.
    ///
    /// The screen is loading until this completes. Dropping this future before it completes leaves the state untouched
    pub async fn mount(&mut self) {
        self.state = PrayerTimesState::Loading;
        self.state = match self.load().await {
            Ok(timings) => PrayerTimesState::Data(timings),
            Err(err) => PrayerTimesState::Error(err),
        };
    }

    async fn load(&self) -> Result<Timings, PrayerTimesError> {
        let permission = self.location.request_foreground_permission().await
            .map_err(|err| unexpected("requesting the location permission", err))?;
        if permission != PermissionStatus::Granted {
            log::info!("Location permission has been denied");
            return Err(PrayerTimesError::PermissionDenied);
        }

        let at = self.location.current_coordinate().await
            .map_err(|err| unexpected("reading the location", err))?;

        let reply = self.service.fetch_timings(at).await
            .map_err(|err| unexpected("fetching prayer times", err))?;
        if reply.is_success() == false {
            log::warn!("Prayer times service replied with code {}", reply.code);
            return Err(PrayerTimesError::FetchFailed);
        }

        let timings = reply.timings()
            .map_err(|err| unexpected("reading prayer times", err))?;
        log::info!("Loaded prayer times at {}", at);
        Ok(timings)
    }

    pub fn go_back(&self) -> Navigation {
        Navigation::Back
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = vec!["Prayer Times".to_string()];
        match &self.state {
            PrayerTimesState::Loading => lines.push("Loading...".to_string()),
            PrayerTimesState::Error(err) => lines.push(err.to_string()),
            PrayerTimesState::Data(timings) => {
                for prayer in Prayer::ALL.iter() {
                    lines.push(format!("{} {}: {}", prayer.icon(), prayer, timings.get(*prayer).unwrap_or("")));
                }
            },
        }
        lines.push("[Go Back]".to_string());
        lines
    }
}

fn unexpected(step: &str, err: Box<dyn Error>) -> PrayerTimesError {
    log::error!("Error while {}: {}", step, err);
    PrayerTimesError::Unexpected
}
