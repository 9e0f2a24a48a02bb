use crate::core::{
    graph::{build_edges, GraphOptions},
    session::SessionContext,
    visibility::compute_visible,
};
use crate::models::{DirectorySnapshot, MapSnapshot};

/// Map orchestrator - turns a directory snapshot and a session context into
/// the view handed to the renderer
///
/// # Pipeline Stages
/// 1. Validity and visibility-flag filtering
/// 2. Radius filtering and distance ranking
/// 3. Collaboration edge construction over the visible set
#[derive(Debug, Clone, Default)]
pub struct MapBuilder {
    options: GraphOptions,
}

impl MapBuilder {
    pub fn new(options: GraphOptions) -> Self {
        Self { options }
    }

    /// Recompute the whole snapshot as one unit
    ///
    /// The context is taken by reference to one immutable value, so the
    /// radius, reference point and mode used here are always consistent.
    pub fn build(&self, directory: &DirectorySnapshot, context: &SessionContext) -> MapSnapshot {
        let partners = compute_visible(
            &directory.partners,
            context.reference.as_ref(),
            context.radius,
            context.unit,
        );

        let edges = build_edges(
            &context.mode,
            &directory.collaborations,
            &directory.memberships,
            &partners,
            &self.options,
        );

        tracing::debug!(
            "Built map: {} of {} partners visible, {} edges",
            partners.len(),
            directory.partners.len(),
            edges.len()
        );

        MapSnapshot {
            reference: context.reference,
            radius: context.radius,
            unit: context.unit,
            mode: context.mode.clone(),
            partners,
            edges,
            generated_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distance::{DistanceUnit, GeoPoint};
    use crate::core::graph::EligibilityMode;
    use crate::models::{Collaboration, CollaborationStatus, LocationTier, Membership, Partner, ReferencePoint};

    fn create_partner(id: &str, lat: f64, lon: f64) -> Partner {
        Partner {
            id: id.to_string(),
            name: format!("Partner {}", id),
            latitude: lat,
            longitude: lon,
            is_visible: true,
            collaboration_status: Some("active".to_string()),
            website: None,
        }
    }

    fn directory() -> DirectorySnapshot {
        DirectorySnapshot {
            partners: vec![
                create_partner("near", 39.7589, -84.15),  // ~2mi
                create_partner("mid", 39.7589, -84.05),   // ~7.5mi
                create_partner("far", 39.7589, -83.70),   // ~26mi
            ],
            collaborations: vec![Collaboration {
                id: "c1".to_string(),
                name: "Shared project".to_string(),
                status: CollaborationStatus::Active,
                color: None,
                link: None,
            }],
            memberships: ["near", "mid", "far"]
                .iter()
                .map(|p| Membership {
                    collaboration_id: "c1".to_string(),
                    partner_id: p.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_edges_follow_visible_set() {
        let builder = MapBuilder::default();
        let mut context = SessionContext::new(Some(10.0), DistanceUnit::Miles);
        context.reference = Some(ReferencePoint {
            point: GeoPoint { latitude: 39.7589, longitude: -84.1916 },
            tier: LocationTier::Device,
            far_from_region: false,
        });

        let snapshot = builder.build(&directory(), &context);

        let ids: Vec<_> = snapshot.partners.iter().map(|v| v.partner.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert_eq!(snapshot.edges.len(), 1);
        assert_eq!(snapshot.edges[0].id, "c1:mid:near");
    }

    #[test]
    fn test_without_reference_everyone_is_linked() {
        let builder = MapBuilder::default();
        let context = SessionContext::new(Some(10.0), DistanceUnit::Miles);

        let snapshot = builder.build(&directory(), &context);

        assert_eq!(snapshot.partners.len(), 3);
        assert_eq!(snapshot.edges.len(), 3);
    }

    #[test]
    fn test_mode_none_hides_edges() {
        let builder = MapBuilder::default();
        let mut context = SessionContext::new(None, DistanceUnit::Miles);
        context.mode = EligibilityMode::NoneSelected;

        let snapshot = builder.build(&directory(), &context);

        assert_eq!(snapshot.partners.len(), 3);
        assert!(snapshot.edges.is_empty());
    }
}
