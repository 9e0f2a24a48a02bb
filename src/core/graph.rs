use crate::core::distance::GeoPoint;
use crate::models::{Collaboration, CollaborationStatus, Edge, EdgePayload, Membership, Partner, VisiblePartner};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Color used when a collaboration does not define one
pub const DEFAULT_EDGE_COLOR: &str = "#3388ff";

/// Rule selecting which collaborations contribute edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum EligibilityMode {
    #[default]
    #[serde(rename = "all")]
    AllCollaborations,
    #[serde(rename = "active")]
    ActiveOnly,
    Specific {
        #[serde(rename = "collaborationId")]
        collaboration_id: String,
    },
    #[serde(rename = "none")]
    NoneSelected,
}

impl EligibilityMode {
    #[inline]
    pub fn admits(&self, collaboration: &Collaboration) -> bool {
        match self {
            EligibilityMode::AllCollaborations => true,
            EligibilityMode::ActiveOnly => collaboration.status == CollaborationStatus::Active,
            EligibilityMode::Specific { collaboration_id } => collaboration.id == *collaboration_id,
            EligibilityMode::NoneSelected => false,
        }
    }
}

/// Edge styling and diagnostics
#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub default_color: String,
    /// Visible member count above which a collaboration is logged as large
    pub large_collaboration_warn: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            default_color: DEFAULT_EDGE_COLOR.to_string(),
            large_collaboration_warn: 25,
        }
    }
}

/// Canonical edge identifier, independent of member order
///
/// Each part is percent-encoded before joining, so ids that themselves
/// contain `:` cannot collide.
pub fn edge_id(collaboration_id: &str, a: &str, b: &str) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!(
        "{}:{}:{}",
        urlencoding::encode(collaboration_id),
        urlencoding::encode(low),
        urlencoding::encode(high)
    )
}

/// Build the collaboration edges between visible partners
///
/// Every pair of visible members of an eligible collaboration is linked, so a
/// collaboration with n visible members yields n·(n−1)/2 edges. Members are
/// ordered by id before pairing, which makes both the ids and the order of
/// the result a pure function of the inputs.
pub fn build_edges(
    mode: &EligibilityMode,
    collaborations: &[Collaboration],
    memberships: &[Membership],
    visible: &[VisiblePartner],
    options: &GraphOptions,
) -> Vec<Edge> {
    if *mode == EligibilityMode::NoneSelected {
        return Vec::new();
    }

    let partners: HashMap<&str, &Partner> = visible
        .iter()
        .map(|v| (v.partner.id.as_str(), &v.partner))
        .collect();

    let mut members_by_collaboration: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for membership in memberships {
        if partners.contains_key(membership.partner_id.as_str()) {
            members_by_collaboration
                .entry(membership.collaboration_id.as_str())
                .or_default()
                .insert(membership.partner_id.as_str());
        }
    }

    let mut seen_collaborations = HashSet::new();
    let mut edges = Vec::new();

    for collaboration in collaborations.iter().filter(|c| mode.admits(c)) {
        if !seen_collaborations.insert(collaboration.id.as_str()) {
            tracing::warn!("Duplicate collaboration id {}, keeping the first", collaboration.id);
            continue;
        }

        let Some(members) = members_by_collaboration.get(collaboration.id.as_str()) else {
            continue;
        };
        if members.len() < 2 {
            continue;
        }
        if members.len() > options.large_collaboration_warn {
            tracing::warn!(
                "Collaboration {} has {} visible members ({} edges)",
                collaboration.id,
                members.len(),
                members.len() * (members.len() - 1) / 2
            );
        }

        let color = collaboration
            .color
            .clone()
            .unwrap_or_else(|| options.default_color.clone());
        let members: Vec<&Partner> = members.iter().filter_map(|id| partners.get(id).copied()).collect();

        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                edges.push(make_edge(collaboration, a, b, &color));
            }
        }
    }

    edges
}

fn make_edge(collaboration: &Collaboration, a: &Partner, b: &Partner, color: &str) -> Edge {
    // Both partners passed the visibility filter, so their coordinates are valid
    let from = GeoPoint {
        latitude: a.latitude,
        longitude: a.longitude,
    };
    let to = GeoPoint {
        latitude: b.latitude,
        longitude: b.longitude,
    };

    Edge {
        id: edge_id(&collaboration.id, &a.id, &b.id),
        collaboration_id: collaboration.id.clone(),
        partner_a: a.id.clone(),
        partner_b: b.id.clone(),
        color: color.to_string(),
        payload: EdgePayload {
            collaboration_name: collaboration.name.clone(),
            partner_a_name: a.name.clone(),
            partner_b_name: b.name.clone(),
            status: collaboration.status,
            link: collaboration.link.clone(),
            from,
            to,
        },
    }
}
