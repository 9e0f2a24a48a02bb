use crate::core::resolver::{IpLocator, ProviderError, RawCoordinates};
use crate::services::geocoder::coordinate_text;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// IP-based approximate location client
///
/// Accepts both `latitude`/`longitude` (ipapi.co) and `lat`/`lon`
/// (ip-api.com) response shapes.
pub struct HttpIpLocator {
    endpoint: String,
    client: Client,
}

impl HttpIpLocator {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl IpLocator for HttpIpLocator {
    async fn locate(&self) -> Result<RawCoordinates, ProviderError> {
        let response = self.client.get(&self.endpoint).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Transport(format!(
                "IP locator returned {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        if json.get("error").and_then(|e| e.as_bool()).unwrap_or(false) {
            let reason = json
                .get("reason")
                .and_then(|r| r.as_str())
                .unwrap_or("unknown reason");
            return Err(ProviderError::Malformed(format!("IP locator error: {}", reason)));
        }

        let latitude = coordinate_text(json.get("latitude").or_else(|| json.get("lat")));
        let longitude = coordinate_text(json.get("longitude").or_else(|| json.get("lon")));

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(RawCoordinates { latitude, longitude }),
            _ => Err(ProviderError::Malformed("Missing latitude/longitude".into())),
        }
    }
}
