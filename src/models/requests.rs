use crate::core::distance::DistanceUnit;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Request to open a map session
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_session_radius"))]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub unit: Option<DistanceUnit>,
}

/// Raw coordinates typed into an editor form
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NormalizeRequest {
    #[validate(length(max = 64))]
    pub latitude: String,
    #[validate(length(max = 64))]
    pub longitude: String,
}

/// Free-text address to geocode
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddressLocationRequest {
    #[validate(length(min = 1, max = 256))]
    pub query: String,
}

/// Outcome of the client's device location request
///
/// Either both coordinates or an error code are expected.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_device_report"))]
pub struct DeviceReportRequest {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(alias = "error_code", rename = "errorCode", default)]
    pub error_code: Option<u16>,
    #[serde(alias = "error_message", rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

/// Explicit confirmation that the IP estimate may be used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpFallbackRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_radius_update"))]
pub struct RadiusRequest {
    /// `None` removes the radius limit
    #[serde(default)]
    pub radius: Option<f64>,
}

fn check_radius(radius: Option<f64>) -> Result<(), ValidationError> {
    match radius {
        Some(r) if !(r.is_finite() && r > 0.0) => Err(ValidationError::new("radius_must_be_positive")),
        _ => Ok(()),
    }
}

fn validate_session_radius(req: &CreateSessionRequest) -> Result<(), ValidationError> {
    check_radius(req.radius)
}

fn validate_radius_update(req: &RadiusRequest) -> Result<(), ValidationError> {
    check_radius(req.radius)
}

fn validate_device_report(report: &DeviceReportRequest) -> Result<(), ValidationError> {
    let has_position = report.latitude.is_some() && report.longitude.is_some();
    if has_position || report.error_code.is_some() {
        Ok(())
    } else {
        Err(ValidationError::new("position_or_error_code_required"))
    }
}
