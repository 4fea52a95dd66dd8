//! A client for the Aladhan prayer-times API

use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::PrayerSettings;
use crate::location::Coordinate;
use crate::prayer::{parse_timings_response, PrayerTimesSource, TimingsResponse};


/// Fetches today's timings from `GET {base_url}/v1/timings`
#[derive(Clone, Debug)]
pub struct AladhanClient {
    base_url: Url,
    method: u32,
    http: reqwest::Client,
}

impl AladhanClient {
    /// Create a client. This does not start a connection
    pub fn new(settings: &PrayerSettings) -> Result<Self, Box<dyn Error>> {
        let base_url = Url::parse(&settings.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(format!("{} cannot be used as a base URL", base_url).into());
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(crate::config::user_agent());
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            base_url,
            method: settings.method,
            http: builder.build()?,
        })
    }

    /// The request URL for a given place
    pub fn timings_url(&self, at: Coordinate) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(&["v1", "timings"]);
        }
        url.query_pairs_mut()
            .append_pair("latitude", &at.latitude.to_string())
            .append_pair("longitude", &at.longitude.to_string())
            .append_pair("method", &self.method.to_string());
        url
    }
}

#[async_trait]
impl PrayerTimesSource for AladhanClient {
    async fn fetch_timings(&self, at: Coordinate) -> Result<TimingsResponse, Box<dyn Error>> {
        let url = self.timings_url(at);
        log::debug!("Fetching prayer times from {}", url);

        // Error replies come with a non-200 status but still have a JSON body with a `code`
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        log::trace!("Prayer times reply ({:?}): {}", status, text);

        parse_timings_response(&text)
    }
}
