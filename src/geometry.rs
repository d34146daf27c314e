//! Spherical distance, planar polygon area and way metrics over partially resolvable nodes.

use std::collections::HashMap;

use crate::data::record::{MapCoords, NodeRef, OsmId};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;
const EQUATOR_LENGTH_M: f64 = 40_075_000.0;

/// Anything that can resolve a node id to a position.
pub trait CoordinateLookup {
    fn lookup(&self, node_id: OsmId) -> Option<MapCoords>;
}

impl CoordinateLookup for HashMap<OsmId, MapCoords> {
    fn lookup(&self, node_id: OsmId) -> Option<MapCoords> {
        self.get(&node_id).copied()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Great-circle distance in meters (haversine). Malformed input yields 0.
pub fn haversine(from: &MapCoords, to: &MapCoords) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let d_phi = (to.lat - from.lat).to_radians();
    let d_lambda = (to.lon - from.lon).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    finite_or_zero(EARTH_RADIUS_M * c)
}

/// Like [`haversine`], but an unknown endpoint gives 0 rather than an error.
pub fn distance(from: Option<MapCoords>, to: Option<MapCoords>) -> f64 {
    match (from, to) {
        (Some(from), Some(to)) => haversine(&from, &to),
        _ => 0.0,
    }
}

/// Equirectangular projection to local meters, (x, y).
pub fn project_equirectangular(coords: &MapCoords) -> (f64, f64) {
    let y = coords.lat * METERS_PER_DEGREE_LAT;
    let x = coords.lon * (EQUATOR_LENGTH_M * coords.lat.to_radians().cos() / 360.0);
    (x, y)
}

/// Unsigned shoelace area of a ring of planar points. The ring is closed implicitly.
pub fn shoelace_area(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    let mut forward = 0.0;
    let mut backward = 0.0;
    for i in 0..n {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % n];
        forward += x1 * y2;
        backward += y1 * x2;
    }
    finite_or_zero(0.5 * (forward - backward).abs())
}

/// First and last raw references equal, with at least three references.
pub fn is_closed(refs: &[NodeRef]) -> bool {
    match (refs.first(), refs.last()) {
        (Some(first), Some(last)) if refs.len() >= 3 => first.raw() == last.raw(),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayMetrics {
    pub length_m: f64,
    pub area_m2: f64,
    pub centroid: MapCoords,
}

impl Default for WayMetrics {
    fn default() -> Self {
        WayMetrics {
            length_m: 0.0,
            area_m2: 0.0,
            centroid: MapCoords { lat: 0.0, lon: 0.0 },
        }
    }
}

/// Length, area and centroid of a way. References that don't resolve are dropped; the chain
/// is not bridged across them. Area is only computed for closed ways.
pub fn way_metrics<L>(refs: &[NodeRef], lookup: &L) -> WayMetrics
where
    L: CoordinateLookup + ?Sized,
{
    let coords: Vec<MapCoords> = refs
        .iter()
        .filter_map(NodeRef::id)
        .filter_map(|id| lookup.lookup(id))
        .collect();

    if coords.len() < 2 {
        return WayMetrics::default();
    }

    let length_m = coords.windows(2).map(|pair| haversine(&pair[0], &pair[1])).sum();

    let count = coords.len() as f64;
    let centroid = MapCoords {
        lat: coords.iter().map(|c| c.lat).sum::<f64>() / count,
        lon: coords.iter().map(|c| c.lon).sum::<f64>() / count,
    };

    let area_m2 = if is_closed(refs) && coords.len() >= 3 {
        let projected: Vec<(f64, f64)> = coords.iter().map(project_equirectangular).collect();
        shoelace_area(&projected)
    } else {
        0.0
    };

    WayMetrics {
        length_m,
        area_m2,
        centroid,
    }
}
