use serde::{Deserialize, Serialize};
use crate::core::distance::GeoPoint;
use crate::models::domain::{MapSnapshot, ReferencePoint};

/// Response for a newly created session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: uuid::Uuid,
    pub map: MapSnapshot,
}

/// Normalized editor coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeResponse {
    pub point: GeoPoint,
    #[serde(rename = "farFromRegion")]
    pub far_from_region: bool,
}

/// Result of a location request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationResponse {
    /// False when a newer action superseded this lookup
    pub applied: bool,
    pub reference: Option<ReferencePoint>,
    pub map: MapSnapshot,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    /// Set when a failed device lookup makes the IP estimate available
    #[serde(rename = "ipFallbackOffered", default, skip_serializing_if = "std::ops::Not::not")]
    pub ip_fallback_offered: bool,
}
