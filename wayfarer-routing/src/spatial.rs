//! Spatial index for snapping coordinates to edges
//!
//! An R-tree over the individual polyline segments of every geometry slot,
//! bulk-loaded once during the build.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use rustc_hash::FxHashSet;

use crate::geo::Coordinate;
use crate::graph::EdgeId;

/// Meters per degree of latitude on the mean earth sphere
const METERS_PER_DEGREE: f64 = 111_195.08;

/// One polyline segment, endpoints as [lon, lat]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentEntry {
    pub a: [f64; 2],
    pub b: [f64; 2],
    pub edge: EdgeId,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

impl PointDistance for SegmentEntry {
    /// Squared planar distance in degrees
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.b[0] - self.a[0];
        let dy = self.b[1] - self.a[1];
        let len_2 = dx * dx + dy * dy;

        let t = if len_2 == 0.0 {
            0.0
        } else {
            (((point[0] - self.a[0]) * dx + (point[1] - self.a[1]) * dy) / len_2).clamp(0.0, 1.0)
        };

        let px = self.a[0] + t * dx - point[0];
        let py = self.a[1] + t * dy - point[1];
        px * px + py * py
    }
}

#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<SegmentEntry>,
}

impl SpatialIndex {
    pub fn build(entries: Vec<SegmentEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Edges with a segment that may lie within `radius_m` of `center`, in
    /// order of increasing planar distance, each edge once.
    ///
    /// A superset: callers measure the exact distance.
    pub fn candidates(&self, center: Coordinate, radius_m: f64) -> Vec<EdgeId> {
        let query = [center.lon, center.lat];
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();

        for entry in self.tree.nearest_neighbor_iter(&query) {
            let deg = entry.distance_2(&query).sqrt();
            // Longitude degrees shrink towards the poles; bound with the
            // highest latitude the segment point can have
            let lat = (center.lat.abs() + deg).min(89.9);
            let lower_bound_m = deg * METERS_PER_DEGREE * lat.to_radians().cos();
            if lower_bound_m > radius_m * 1.01 + 1.0 {
                break;
            }
            if seen.insert(entry.edge) {
                out.push(entry.edge);
            }
        }

        out
    }
}
