use crate::core::distance::{DistanceUnit, GeoPoint};
use serde::{Deserialize, Serialize};

/// Directory entry shown on the map
///
/// Coordinates are kept raw here; the repository may hold anything and the
/// visibility filter decides what is usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partner {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "isVisible", default = "default_true")]
    pub is_visible: bool,
    #[serde(rename = "collaborationStatus", default)]
    pub collaboration_status: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl Partner {
    /// Coordinates as a validated point, if they are usable
    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

fn default_true() -> bool { true }

/// Lifecycle state of a collaboration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationStatus {
    Active,
    Paused,
    Ended,
}

impl std::str::FromStr for CollaborationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(CollaborationStatus::Active),
            "paused" => Ok(CollaborationStatus::Paused),
            "ended" => Ok(CollaborationStatus::Ended),
            other => Err(format!("unknown collaboration status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collaboration {
    pub id: String,
    pub name: String,
    pub status: CollaborationStatus,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Many-to-many link between a collaboration and a partner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "collaborationId")]
    pub collaboration_id: String,
    #[serde(rename = "partnerId")]
    pub partner_id: String,
}

/// Read-only copy of the partner directory at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub partners: Vec<Partner>,
    #[serde(default)]
    pub collaborations: Vec<Collaboration>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

/// How a reference point was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationTier {
    Device,
    AddressGeocode,
    IpApproximate,
}

/// Origin used for distance filtering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub point: GeoPoint,
    pub tier: LocationTier,
    #[serde(rename = "farFromRegion", default)]
    pub far_from_region: bool,
}

/// A partner that passed the visibility filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisiblePartner {
    pub partner: Partner,
    /// Present only when a reference point was supplied
    pub distance: Option<f64>,
}

/// Rendering data attached to an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgePayload {
    #[serde(rename = "collaborationName")]
    pub collaboration_name: String,
    #[serde(rename = "partnerAName")]
    pub partner_a_name: String,
    #[serde(rename = "partnerBName")]
    pub partner_b_name: String,
    pub status: CollaborationStatus,
    pub link: Option<String>,
    pub from: GeoPoint,
    pub to: GeoPoint,
}

/// Derived link between two visible partners sharing a collaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    #[serde(rename = "collaborationId")]
    pub collaboration_id: String,
    #[serde(rename = "partnerA")]
    pub partner_a: String,
    #[serde(rename = "partnerB")]
    pub partner_b: String,
    pub color: String,
    pub payload: EdgePayload,
}

/// Declarative view handed to the rendering layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub reference: Option<ReferencePoint>,
    pub radius: Option<f64>,
    pub unit: DistanceUnit,
    pub mode: crate::core::graph::EligibilityMode,
    pub partners: Vec<VisiblePartner>,
    pub edges: Vec<Edge>,
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partner_defaults_to_visible() {
        let partner: Partner = serde_json::from_str(
            r#"{"id":"p1","name":"Acme","latitude":39.7,"longitude":-84.2}"#,
        )
        .unwrap();
        assert!(partner.is_visible);
        assert!(partner.location().is_some());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Active".parse::<CollaborationStatus>(), Ok(CollaborationStatus::Active));
        assert_eq!(" ended ".parse::<CollaborationStatus>(), Ok(CollaborationStatus::Ended));
        assert!("archived".parse::<CollaborationStatus>().is_err());
    }

    #[test]
    fn test_tier_serializes_kebab_case() {
        let json = serde_json::to_string(&LocationTier::AddressGeocode).unwrap();
        assert_eq!(json, "\"address-geocode\"");
    }
}
