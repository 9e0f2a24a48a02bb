use crate::core::normalize::{normalize_coordinates, RegionPolicy};
use crate::models::{LocationTier, ReferencePoint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// W3C geolocation error codes reported by devices
pub const PERMISSION_DENIED: u16 = 1;
pub const POSITION_UNAVAILABLE: u16 = 2;
pub const TIMEOUT: u16 = 3;

/// Errors surfaced to the user when a location cannot be resolved
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("Location permission was denied")]
    PermissionDenied,

    #[error("Location information is unavailable")]
    Unavailable,

    #[error("The location request timed out")]
    Timeout,

    #[error("No location matched the given address")]
    NotFound,

    #[error("Location service error: {0}")]
    ServiceError(String),
}

/// Failures reported by an external location provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Provider returned a malformed response: {0}")]
    Malformed(String),
}

/// Coordinates as a provider returned them, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCoordinates {
    pub latitude: String,
    pub longitude: String,
}

impl RawCoordinates {
    pub fn from_numbers(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        }
    }
}

/// Error reported by the platform's location capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFailure {
    pub code: u16,
    pub message: Option<String>,
}

impl From<DeviceFailure> for LocationError {
    fn from(failure: DeviceFailure) -> Self {
        match failure.code {
            PERMISSION_DENIED => LocationError::PermissionDenied,
            POSITION_UNAVAILABLE => LocationError::Unavailable,
            TIMEOUT => LocationError::Timeout,
            code => LocationError::ServiceError(
                failure
                    .message
                    .unwrap_or_else(|| format!("device error code {}", code)),
            ),
        }
    }
}

/// Options passed with every device location request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceOptions {
    #[serde(rename = "enableHighAccuracy")]
    pub enable_high_accuracy: bool,
    #[serde(rename = "timeoutMs", with = "duration_ms")]
    pub timeout: Duration,
    /// Zero means a cached reading is never acceptable
    #[serde(rename = "maximumAgeMs", with = "duration_ms")]
    pub maximum_age: Duration,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Free-text geocoding provider
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidate points for `query`, best match first
    async fn search(&self, query: &str) -> Result<Vec<RawCoordinates>, ProviderError>;
}

/// Approximate location derived from the caller's IP address
#[async_trait]
pub trait IpLocator: Send + Sync {
    async fn locate(&self) -> Result<RawCoordinates, ProviderError>;
}

/// The platform's device location capability
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn current_position(&self, options: &DeviceOptions) -> Result<RawCoordinates, DeviceFailure>;
}

/// Which strategy a resolution should use
pub enum LocationRequest<'a> {
    Address(&'a str),
    Device(&'a dyn DeviceLocator),
    IpApproximate,
}

impl LocationRequest<'_> {
    pub fn tier(&self) -> LocationTier {
        match self {
            LocationRequest::Address(_) => LocationTier::AddressGeocode,
            LocationRequest::Device(_) => LocationTier::Device,
            LocationRequest::IpApproximate => LocationTier::IpApproximate,
        }
    }
}

/// Resolves a reference point from one location source per call
///
/// Each call makes exactly one attempt. Retrying, and the decision to fall
/// back to the IP estimate, belong to the caller.
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    ip_locator: Arc<dyn IpLocator>,
    policy: RegionPolicy,
    bias_suffix: String,
    device_options: DeviceOptions,
}

impl LocationResolver {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        ip_locator: Arc<dyn IpLocator>,
        policy: RegionPolicy,
        bias_suffix: impl Into<String>,
    ) -> Self {
        Self {
            geocoder,
            ip_locator,
            policy,
            bias_suffix: bias_suffix.into(),
            device_options: DeviceOptions::default(),
        }
    }

    pub fn with_device_options(mut self, options: DeviceOptions) -> Self {
        self.device_options = options;
        self
    }

    pub fn device_options(&self) -> DeviceOptions {
        self.device_options
    }

    pub fn policy(&self) -> &RegionPolicy {
        &self.policy
    }

    pub async fn resolve(&self, request: LocationRequest<'_>) -> Result<ReferencePoint, LocationError> {
        let tier = request.tier();

        let raw = match request {
            LocationRequest::Address(query) => self.geocode(query).await?,
            LocationRequest::Device(device) => self.locate_device(device).await?,
            LocationRequest::IpApproximate => self.ip_locator.locate().await.map_err(|e| {
                tracing::warn!("IP location lookup failed: {}", e);
                LocationError::ServiceError(e.to_string())
            })?,
        };

        let normalized = normalize_coordinates(&raw.latitude, &raw.longitude, &self.policy)
            .map_err(|e| {
                tracing::warn!("Provider returned unusable coordinates {:?}: {}", raw, e);
                LocationError::ServiceError(e.to_string())
            })?;

        tracing::info!(
            "Resolved {:?} location ({}, {})",
            tier,
            normalized.point.latitude,
            normalized.point.longitude
        );

        Ok(ReferencePoint {
            point: normalized.point,
            tier,
            far_from_region: normalized.far_from_region,
        })
    }

    async fn geocode(&self, query: &str) -> Result<RawCoordinates, LocationError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LocationError::NotFound);
        }

        let biased = format!("{}{}", query, self.bias_suffix);
        tracing::debug!("Geocoding address: {}", biased);

        match self.geocoder.search(&biased).await {
            Ok(candidates) => candidates.into_iter().next().ok_or(LocationError::NotFound),
            Err(ProviderError::Malformed(detail)) => {
                tracing::warn!("Geocoder response was malformed: {}", detail);
                Err(LocationError::NotFound)
            }
            Err(e) => {
                tracing::warn!("Geocoding failed: {}", e);
                Err(LocationError::ServiceError(e.to_string()))
            }
        }
    }

    async fn locate_device(&self, device: &dyn DeviceLocator) -> Result<RawCoordinates, LocationError> {
        let options = self.device_options;

        match tokio::time::timeout(options.timeout, device.current_position(&options)).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(failure)) => {
                tracing::info!("Device location failed with code {}", failure.code);
                Err(failure.into())
            }
            Err(_) => Err(LocationError::Timeout),
        }
    }
}
