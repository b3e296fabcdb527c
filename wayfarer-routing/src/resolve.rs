//! Point resolution: snap a coordinate onto the nearest edge a profile can use

use tracing::debug;

use crate::config::ResolverConfig;
use crate::geo::Coordinate;
use crate::graph::{EdgeId, GraphStore};
use crate::profile::ProfileTable;

/// A coordinate resolved onto an edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterPoint {
    pub edge: EdgeId,
    /// Position along `edge` in its own travel direction, 0.0 = tail, 1.0 = head
    pub offset: f64,
    /// Projected point on the edge geometry
    pub location: Coordinate,
    /// Distance from the query to `location` in meters
    pub distance_m: f64,
}

/// Resolve `coordinate` for the profile behind `table`.
///
/// The search radius starts at `initial_radius_m` and doubles up to
/// `max_radius_m`. Returns `None` when no usable edge lies within the
/// maximum radius. Equal distances go to the lower edge id.
pub fn resolve(
    graph: &GraphStore,
    table: &ProfileTable,
    config: &ResolverConfig,
    coordinate: Coordinate,
) -> Option<RouterPoint> {
    if !coordinate.is_valid() {
        return None;
    }

    let mut radius = config.initial_radius_m;
    loop {
        let matches = graph.nearest_edges(coordinate, radius);
        let candidates = matches.len();

        let found = matches.into_iter().find_map(|m| {
            if graph.edge_cost(table, m.edge).traversable {
                return Some(RouterPoint {
                    edge: m.edge,
                    offset: m.projection.fraction,
                    location: m.projection.coordinate,
                    distance_m: m.projection.distance_m,
                });
            }
            // The stored direction is closed; the twin reads the slot backwards
            let twin = graph.twin(m.edge)?;
            graph.edge_cost(table, twin).traversable.then(|| RouterPoint {
                edge: twin,
                offset: 1.0 - m.projection.fraction,
                location: m.projection.coordinate,
                distance_m: m.projection.distance_m,
            })
        });

        if let Some(point) = found {
            debug!(
                profile = %table.profile(),
                radius_m = radius,
                candidates,
                edge = point.edge.0,
                distance_m = point.distance_m,
                "resolved point"
            );
            return Some(point);
        }

        if radius >= config.max_radius_m || config.max_radius_m.is_nan() {
            debug!(profile = %table.profile(), radius_m = radius, "point unresolved");
            return None;
        }
        // A zero or negative start cannot double; go straight to the bound
        radius = if radius > 0.0 {
            (radius * 2.0).min(config.max_radius_m)
        } else {
            config.max_radius_m
        };
    }
}
