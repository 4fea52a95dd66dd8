//! Daily prayer times, and the services that provide them

pub mod aladhan;

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
#[cfg(feature = "mock_services")]
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::location::Coordinate;
#[cfg(feature = "mock_services")]
use crate::mock_behaviour::MockBehaviour;
#[cfg(feature = "mock_services")]
use crate::store::lock;

pub use aladhan::AladhanClient;


/// The five daily prayers
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// Every prayer, in the order of the day
    pub const ALL: [Prayer; 5] = [Prayer::Fajr, Prayer::Dhuhr, Prayer::Asr, Prayer::Maghrib, Prayer::Isha];

    /// The key of this prayer in a timings object
    pub fn name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Prayer::Fajr => "🕌",
            Prayer::Dhuhr => "🌅",
            Prayer::Asr => "🌇",
            Prayer::Maghrib => "🌆",
            Prayer::Isha => "🌙",
        }
    }
}

impl Display for Prayer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}


/// The named times of one day, as returned by the service.
///
/// Every key is kept (the service also returns `Sunrise`, `Midnight`...), but only the five [`Prayer`]s are read
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timings {
    times: BTreeMap<String, String>,
}

impl Timings {
    pub fn new(times: BTreeMap<String, String>) -> Self {
        Self { times }
    }

    /// Build timings from a JSON object. Values that are not strings are ignored
    pub fn from_json(value: &Value) -> Result<Self, Box<dyn Error>> {
        let object = value.as_object().ok_or_else(|| format!("Timings should be an object, got {}", value))?;
        let times = object.iter()
            .filter_map(|(name, time)| time.as_str().map(|t| (name.clone(), t.to_string())))
            .collect();
        Ok(Self { times })
    }

    /// The time of a prayer, exactly as the service wrote it
    pub fn get(&self, prayer: Prayer) -> Option<&str> {
        self.times.get(prayer.name()).map(String::as_str)
    }

    /// The time of a prayer. A trailing annotation such as `"05:00 (+03)"` is ignored
    pub fn time_of(&self, prayer: Prayer) -> Option<NaiveTime> {
        let raw = self.get(prayer)?;
        let hh_mm = raw.split_whitespace().next()?;
        NaiveTime::parse_from_str(hh_mm, "%H:%M").ok()
    }

    /// The first prayer of the day that is strictly after `time`, if any
    pub fn next_after(&self, time: NaiveTime) -> Option<(Prayer, NaiveTime)> {
        Prayer::ALL.iter()
            .filter_map(|prayer| self.time_of(*prayer).map(|t| (*prayer, t)))
            .find(|(_, t)| *t > time)
    }
}


/// The reply of the prayer-times service.
///
/// `data` is only meaningful when `code` is 200: error replies may carry a plain message instead.
/// `code` is kept as it was sent, and is `null` when missing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingsResponse {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub data: Value,
}

impl TimingsResponse {
    /// Only the number 200 means success. A missing code, or `"200"` as a string, does not
    pub fn is_success(&self) -> bool {
        self.code.as_f64() == Some(200.0)
    }

    /// Extract `data.timings`
    pub fn timings(&self) -> Result<Timings, Box<dyn Error>> {
        let raw = self.data.get("timings").ok_or("The response has no timings")?;
        Timings::from_json(raw)
    }
}

/// Parse the body of a reply of the prayer-times service
pub fn parse_timings_response(body: &str) -> Result<TimingsResponse, Box<dyn Error>> {
    Ok(serde_json::from_str(body)?)
}


#[async_trait]
pub trait PrayerTimesSource: Send + Sync {
    /// Ask for today's timings at a given place
    async fn fetch_timings(&self, at: Coordinate) -> Result<TimingsResponse, Box<dyn Error>>;
}


/// A fake [`PrayerTimesSource`], that replies with a canned body
#[cfg(feature = "mock_services")]
#[derive(Debug)]
pub struct MockPrayerService {
    body: String,
    behaviour: Mutex<MockBehaviour>,
    requests: Mutex<Vec<Coordinate>>,
}

#[cfg(feature = "mock_services")]
impl MockPrayerService {
    /// Reply with this JSON body
    pub fn replying(body: Value) -> Self {
        Self::replying_raw(body.to_string())
    }

    /// Reply with this text, that may not even be valid JSON
    pub fn replying_raw<S: ToString>(body: S) -> Self {
        Self {
            body: body.to_string(),
            behaviour: Mutex::new(MockBehaviour::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_behaviour(self, behaviour: MockBehaviour) -> Self {
        *lock(&self.behaviour) = behaviour;
        self
    }

    /// The coordinates of every request received so far
    pub fn requests(&self) -> Vec<Coordinate> {
        lock(&self.requests).clone()
    }
}

#[cfg(feature = "mock_services")]
#[async_trait]
impl PrayerTimesSource for MockPrayerService {
    async fn fetch_timings(&self, at: Coordinate) -> Result<TimingsResponse, Box<dyn Error>> {
        lock(&self.requests).push(at);
        lock(&self.behaviour).can_fetch_timings()?;
        parse_timings_response(&self.body)
    }
}
