use crate::core::distance::{haversine_distance, DistanceUnit};
use crate::models::{Partner, ReferencePoint, VisiblePartner};

/// Check whether a partner may appear on the map at all
///
/// Hidden partners and partners with unusable coordinates never pass.
#[inline]
pub fn is_displayable(partner: &Partner) -> bool {
    partner.is_visible && partner.location().is_some()
}

/// Select and order the partners visible from a reference point
///
/// # Arguments
/// * `partners` - Directory entries in insertion order
/// * `reference` - Optional origin; without it no distance filtering happens
/// * `radius` - Optional inclusive radius, in `unit`
/// * `unit` - Unit for both the radius and the reported distances
///
/// # Returns
/// Without a reference point, the displayable partners in input order.
/// With one, partners within `radius` sorted by ascending distance; equal
/// distances keep their input order.
pub fn compute_visible(
    partners: &[Partner],
    reference: Option<&ReferencePoint>,
    radius: Option<f64>,
    unit: DistanceUnit,
) -> Vec<VisiblePartner> {
    let Some(reference) = reference else {
        return partners
            .iter()
            .filter(|p| is_displayable(p))
            .map(|p| VisiblePartner {
                partner: p.clone(),
                distance: None,
            })
            .collect();
    };

    let mut visible: Vec<VisiblePartner> = partners
        .iter()
        .filter(|p| p.is_visible)
        .filter_map(|p| {
            let location = p.location()?;
            let distance = haversine_distance(reference.point, location, unit);

            let within = radius.map_or(true, |r| distance <= r);
            within.then(|| VisiblePartner {
                partner: p.clone(),
                distance: Some(distance),
            })
        })
        .collect();

    // sort_by is stable, so ties keep insertion order
    visible.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    visible
}
