//! Support for configuration options

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::location::Coordinate;
use crate::store::WritePolicy;

/// The User-Agent header sent along every HTTP request.
/// Feel free to override it when initing this library.
pub static USER_AGENT: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new(format!("SaAe/{}", env!("CARGO_PKG_VERSION")))));

pub fn user_agent() -> String {
    crate::store::lock(&USER_AGENT).clone()
}


/// Everything that can be tweaked from a settings file.
///
/// Every field is optional in the file, missing ones take their default value
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub prayer: PrayerSettings,
    /// The coordinate reported by the location provider. No coordinate means location access is denied
    pub location: Option<Coordinate>,
    pub write_policy: WritePolicy,
}

impl Settings {
    /// Read settings from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let settings = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(std::io::BufReader::new(file))?,
        };
        Ok(settings)
    }
}


/// Where the task documents live
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub base_url: String,
    pub project_id: String,
    pub api_key: Option<String>,
    pub collection: String,
    /// How often the collection is listed while someone is subscribed to it
    pub poll_interval_ms: u64,
}

impl StoreSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: "https://firestore.googleapis.com".to_string(),
            project_id: String::new(),
            api_key: None,
            collection: "todos".to_string(),
            poll_interval_ms: 2000,
        }
    }
}


/// Where the prayer times come from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrayerSettings {
    pub base_url: String,
    /// The calculation method, as understood by the service
    pub method: u32,
    /// No value means requests never time out
    pub timeout_secs: Option<u64>,
}

impl Default for PrayerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://api.aladhan.com".to_string(),
            method: 2,
            timeout_secs: None,
        }
    }
}
