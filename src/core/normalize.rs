use crate::core::distance::GeoPoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating raw coordinate input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude and longitude must both be numbers")]
    InvalidFormat,

    #[error("Latitude must be within ±90 and longitude within ±180")]
    OutOfRange,
}

/// Expected longitude sign for the deployment region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    #[default]
    Western,
    Eastern,
    Unconstrained,
}

impl Hemisphere {
    fn correct(self, longitude: f64) -> f64 {
        match self {
            Hemisphere::Western if longitude > 0.0 => -longitude,
            Hemisphere::Eastern if longitude < 0.0 => -longitude,
            _ => longitude,
        }
    }
}

/// Regional data-entry policy applied by the normalizer
///
/// The sign and swap corrections are tuned to one deployment area. They are
/// not geodesy, and a different region should ship a different policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionPolicy {
    pub hemisphere: Hemisphere,
    pub center: GeoPoint,
    /// Both offsets from `center` must exceed this for the far flag
    pub far_threshold_deg: f64,
    /// |lat| above and |lng| below this means the pair was likely transposed
    pub swap_threshold_deg: f64,
}

impl Default for RegionPolicy {
    fn default() -> Self {
        Self {
            hemisphere: Hemisphere::Western,
            center: GeoPoint {
                latitude: 39.7589,
                longitude: -84.1916,
            },
            far_threshold_deg: 10.0,
            swap_threshold_deg: 60.0,
        }
    }
}

/// Normalized point plus the advisory far-from-region marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCoordinates {
    pub point: GeoPoint,
    #[serde(rename = "farFromRegion")]
    pub far_from_region: bool,
}

/// Parse and repair a raw latitude/longitude text pair
pub fn normalize_coordinates(
    raw_lat: &str,
    raw_lng: &str,
    policy: &RegionPolicy,
) -> Result<NormalizedCoordinates, CoordinateError> {
    let latitude = parse_component(raw_lat)?;
    let longitude = parse_component(raw_lng)?;

    normalize_point(latitude, longitude, policy)
}

/// Apply range validation and the regional corrections to parsed values
pub fn normalize_point(
    latitude: f64,
    longitude: f64,
    policy: &RegionPolicy,
) -> Result<NormalizedCoordinates, CoordinateError> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(CoordinateError::InvalidFormat);
    }
    if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
        return Err(CoordinateError::OutOfRange);
    }

    let mut lat = latitude;
    let mut lng = policy.hemisphere.correct(longitude);

    // Swap the parsed values, not the sign-corrected ones, then correct again
    if lat.abs() > policy.swap_threshold_deg && lng.abs() < policy.swap_threshold_deg {
        tracing::debug!("Coordinates ({}, {}) look transposed, swapping", latitude, longitude);
        lat = longitude;
        lng = policy.hemisphere.correct(latitude);
    }

    let point = GeoPoint {
        latitude: lat,
        longitude: lng,
    };

    let lat_offset = (point.latitude - policy.center.latitude).abs();
    let lng_offset = (point.longitude - policy.center.longitude).abs();
    let far_from_region =
        lat_offset > policy.far_threshold_deg && lng_offset > policy.far_threshold_deg;

    if far_from_region {
        tracing::info!(
            "Normalized coordinates ({}, {}) are far from the region center",
            point.latitude,
            point.longitude
        );
    }

    Ok(NormalizedCoordinates {
        point,
        far_from_region,
    })
}

fn parse_component(raw: &str) -> Result<f64, CoordinateError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| CoordinateError::InvalidFormat)?;

    // "NaN" and "inf" parse successfully but are not coordinates
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoordinateError::InvalidFormat)
    }
}
