//! Route assembly
//!
//! Turns a search [`Path`] into a coordinate sequence with cumulative
//! distance and travel time.

use crate::geo::{haversine_distance, slice_polyline, Coordinate};
use crate::graph::{EdgeId, GraphStore};
use crate::profile::{Profile, ProfileTable};
use crate::resolve::RouterPoint;
use crate::search::Path;

/// Partial legs shorter than this are dropped
const MIN_LEG_M: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEntry {
    pub coordinate: Coordinate,
    /// Meters from the start
    pub distance_m: f64,
    /// Seconds from the start
    pub time_s: f64,
    /// Edge travelled to reach this entry (the first edge for entry 0)
    pub edge: EdgeId,
}

/// The stretch of a route along one edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteLeg {
    pub edge: EdgeId,
    pub first_entry: usize,
    pub last_entry: usize,
    pub distance_m: f64,
    pub time_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub profile: Profile,
    pub entries: Vec<RouteEntry>,
    pub legs: Vec<RouteLeg>,
    pub total_distance_m: f64,
    pub total_time_s: f64,
}

impl Route {
    pub fn geometry(&self) -> Vec<Coordinate> {
        self.entries.iter().map(|e| e.coordinate).collect()
    }
}

/// Build the route for `path` between two resolved points
pub fn assemble(
    graph: &GraphStore,
    table: &ProfileTable,
    path: &Path,
    from: &RouterPoint,
    to: &RouterPoint,
) -> Route {
    // (coordinate, edge, speed m/s) per entry
    let mut points: Vec<(Coordinate, EdgeId, f64)> = vec![(from.location, from.edge, 0.0)];
    let mut spans: Vec<(EdgeId, usize, usize)> = Vec::with_capacity(path.legs.len());

    for leg in &path.legs {
        let edge = graph.edge(leg.edge);
        let start_m = leg.from_frac * edge.length_m;
        let end_m = leg.to_frac * edge.length_m;
        if end_m - start_m < MIN_LEG_M {
            continue;
        }

        let speed = table.cost(edge.tags, edge.length_m, edge.direction()).speed_mps;
        let geometry = graph.edge_geometry(leg.edge);
        let first = points.len() - 1;
        points.extend(
            slice_polyline(&geometry, start_m, end_m)
                .into_iter()
                .skip(1)
                .map(|c| (c, leg.edge, speed)),
        );
        if points.len() - 1 > first {
            spans.push((leg.edge, first, points.len() - 1));
        }
    }

    // Entry 0 belongs to the first edge actually travelled
    if let Some(&(edge, ..)) = spans.first() {
        points[0].1 = edge;
    }

    if points.len() > 1 {
        if let Some(last) = points.last_mut() {
            last.0 = to.location;
        }
    }

    let mut entries = Vec::with_capacity(points.len());
    let mut distance_m = 0.0;
    let mut time_s = 0.0;
    let mut prev: Option<Coordinate> = None;
    for (coordinate, edge, speed) in points {
        if let Some(p) = prev {
            let d = haversine_distance(p, coordinate);
            distance_m += d;
            if speed > 0.0 {
                time_s += d / speed;
            }
        }
        entries.push(RouteEntry {
            coordinate,
            distance_m,
            time_s,
            edge,
        });
        prev = Some(coordinate);
    }

    let legs = spans
        .into_iter()
        .map(|(edge, first_entry, last_entry)| RouteLeg {
            edge,
            first_entry,
            last_entry,
            distance_m: entries[last_entry].distance_m - entries[first_entry].distance_m,
            time_s: entries[last_entry].time_s - entries[first_entry].time_s,
        })
        .collect();

    Route {
        profile: table.profile(),
        entries,
        legs,
        total_distance_m: distance_m,
        total_time_s: time_s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_network;
    use crate::config::{EngineConfig, ResolverConfig};
    use crate::records::VecSource;
    use crate::resolve::resolve;
    use crate::search::{shortest_path, PathLeg, QueryOptions};

    fn graph() -> GraphStore {
        // An L: 1 -> 2 east through shape point 5, then 2 -> 3 north, with a
        // service spur 2 -> 4
        let mut src = VecSource::default();
        src.node(1, 0.0, 0.0)
            .node(2, 0.0, 0.001)
            .node(3, 0.001, 0.001)
            .node(4, -0.0005, 0.0015)
            .node(5, 0.0, 0.0005)
            .way(10, &[1, 5, 2, 3], &[("highway", "residential")])
            .way(11, &[2, 4], &[("highway", "service")]);
        build_network(&mut src, &EngineConfig::default()).unwrap()
    }

    fn assemble_between(g: &GraphStore, a: Coordinate, b: Coordinate) -> Route {
        let table = g.profile_table(Profile::Car).unwrap();
        let config = ResolverConfig::default();
        let from = resolve(g, table, &config, a).unwrap();
        let to = resolve(g, table, &config, b).unwrap();
        let path = shortest_path(g, table, &from, &to, &QueryOptions::default())
            .unwrap()
            .unwrap();
        assemble(g, table, &path, &from, &to)
    }

    #[test]
    fn test_entries_monotone_and_totals() {
        let g = graph();
        let route = assemble_between(&g, Coordinate::new(0.0, 0.0002), Coordinate::new(0.0008, 0.001));

        assert_eq!(route.legs.len(), 2);
        // start, bend vertex, node 2, end
        assert_eq!(route.entries.len(), 4);
        for pair in route.entries.windows(2) {
            assert!(pair[1].distance_m >= pair[0].distance_m);
            assert!(pair[1].time_s >= pair[0].time_s);
        }

        let summed: f64 = route
            .entries
            .windows(2)
            .map(|p| haversine_distance(p[0].coordinate, p[1].coordinate))
            .sum();
        assert!((route.total_distance_m - summed).abs() < 1e-9);

        let legs: f64 = route.legs.iter().map(|l| l.distance_m).sum();
        assert!((route.total_distance_m - legs).abs() < 1e-9);

        // 0.0008 deg east then 0.0008 deg north
        assert!((route.total_distance_m - 2.0 * 88.956).abs() < 0.1);
        // Residential at 30 km/h
        assert!((route.total_time_s - route.total_distance_m / (30.0 / 3.6)).abs() < 1e-6);
    }

    #[test]
    fn test_endpoints_snap_to_resolved_points() {
        let g = graph();
        let a = Coordinate::new(0.00005, 0.0002);
        let b = Coordinate::new(0.0008, 0.00105);
        let route = assemble_between(&g, a, b);

        let first = route.entries.first().unwrap().coordinate;
        let last = route.entries.last().unwrap().coordinate;
        assert!((first.lat - 0.0).abs() < 1e-9 && (first.lon - 0.0002).abs() < 1e-9);
        assert!((last.lat - 0.0008).abs() < 1e-9 && (last.lon - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_first_entry_skips_empty_leading_leg() {
        let g = graph();
        let table = g.profile_table(Profile::Car).unwrap();
        let config = ResolverConfig::default();
        let from = resolve(&g, table, &config, Coordinate::new(0.0, 0.0002)).unwrap();
        let to = resolve(&g, table, &config, Coordinate::new(0.0008, 0.001)).unwrap();
        let path = shortest_path(&g, table, &from, &to, &QueryOptions::default())
            .unwrap()
            .unwrap();

        // Lead in with a zero-length leg on the spur
        let spur = (0..g.edge_count() as u32)
            .map(EdgeId)
            .find(|&id| g.edge(id).way_id == 11)
            .unwrap();
        let mut padded = path.clone();
        padded.legs.insert(
            0,
            PathLeg {
                edge: spur,
                from_frac: 0.0,
                to_frac: 0.0,
            },
        );

        let route = assemble(&g, table, &padded, &from, &to);
        assert_eq!(route, assemble(&g, table, &path, &from, &to));
        assert_eq!(route.entries[0].edge, route.legs[0].edge);
        assert_ne!(route.entries[0].edge, spur);
    }

    #[test]
    fn test_same_point_single_entry() {
        let g = graph();
        let p = Coordinate::new(0.0, 0.0003);
        let route = assemble_between(&g, p, p);

        assert_eq!(route.entries.len(), 1);
        assert!(route.legs.is_empty());
        assert_eq!(route.total_distance_m, 0.0);
    }
}
