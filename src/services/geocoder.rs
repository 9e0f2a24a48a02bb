use crate::core::resolver::{Geocoder, ProviderError, RawCoordinates};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Read a coordinate that providers send either as a string or a number
pub(crate) fn coordinate_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Nominatim-style free-text geocoding client
///
/// Issues `GET {endpoint}/search?q=...&format=json&limit=1` and reads the
/// `lat`/`lon` fields of the first returned place.
pub struct NominatimGeocoder {
    base_url: String,
    client: Client,
}

impl NominatimGeocoder {
    pub fn new(base_url: String, user_agent: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<RawCoordinates>, ProviderError> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query)
        );

        tracing::debug!("Geocoding via: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "Geocoder returned {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let places = json
            .as_array()
            .ok_or_else(|| ProviderError::Malformed("Expected a list of places".into()))?;

        // Only the best match counts; a first place without coordinates is malformed
        let candidates = match places.first() {
            None => Vec::new(),
            Some(place) => {
                let latitude = coordinate_text(place.get("lat"));
                let longitude = coordinate_text(place.get("lon"));
                match (latitude, longitude) {
                    (Some(latitude), Some(longitude)) => vec![RawCoordinates { latitude, longitude }],
                    _ => return Err(ProviderError::Malformed("First place has no lat/lon".into())),
                }
            }
        };

        tracing::debug!("Geocoder returned {} candidates", candidates.len());

        Ok(candidates)
    }
}
