use serde::{Deserialize, Serialize};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth's radius in miles
const EARTH_RADIUS_MI: f64 = 3958.8;

/// A latitude/longitude pair that is finite and within declared range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if Self::is_valid(latitude, longitude) {
            Some(Self { latitude, longitude })
        } else {
            None
        }
    }

    #[inline]
    pub fn is_valid(latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && latitude.abs() <= 90.0
            && longitude.abs() <= 180.0
    }
}

/// Unit in which distances and radii are expressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Kilometers,
    #[default]
    Miles,
}

impl DistanceUnit {
    pub fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
            DistanceUnit::Miles => EARTH_RADIUS_MI,
        }
    }
}

/// Calculate the Haversine distance between two points
///
/// The square-root term is clamped to 1.0 before `asin`, so nearly antipodal
/// points cannot push it outside the function's domain.
///
/// # Arguments
/// * `a` - First point
/// * `b` - Second point
/// * `unit` - Selects the Earth radius used
///
/// # Returns
/// Non-negative distance in `unit`
#[inline]
pub fn haversine_distance(a: GeoPoint, b: GeoPoint, unit: DistanceUnit) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();

    unit.earth_radius() * c
}
