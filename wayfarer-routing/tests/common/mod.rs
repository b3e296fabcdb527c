//! Shared networks for integration tests
//!
//! Everything sits on the equator, where a degree of latitude and of
//! longitude are both about 111.195 km, so positions can be written in
//! meters.

#![allow(dead_code)]

use wayfarer_routing::{Coordinate, Engine, EngineConfig, Profile, VecSource};

pub const METERS_PER_DEGREE: f64 = 111_195.08;

/// Coordinate `east_m` / `north_m` meters from (0, `lon0`)
pub fn at(lon0: f64, east_m: f64, north_m: f64) -> Coordinate {
    Coordinate::new(north_m / METERS_PER_DEGREE, lon0 + east_m / METERS_PER_DEGREE)
}

pub fn node(src: &mut VecSource, id: i64, c: Coordinate) {
    src.node(id, c.lat, c.lon);
}

pub const RHOMBUS_LON: f64 = 10.0;

/// Node ids of the rhombus corners
pub const A: i64 = 1;
pub const B: i64 = 2;
pub const C: i64 = 3;
pub const D: i64 = 4;

pub fn rhombus_point(id: i64) -> Coordinate {
    match id {
        A => at(RHOMBUS_LON, 0.0, 0.0),
        B => at(RHOMBUS_LON, 60.0, 80.0),
        C => at(RHOMBUS_LON, 120.0, 0.0),
        D => at(RHOMBUS_LON, 60.0, -90.0),
        _ => unreachable!("no rhombus corner {id}"),
    }
}

/// Four residential streets A-B-C-D-A and a footway straight across A-C.
///
/// A-B-C is 200 m, A-D-C about 216 m and the footway 120 m.
pub fn rhombus() -> VecSource {
    let mut src = VecSource::default();
    for id in [A, B, C, D] {
        node(&mut src, id, rhombus_point(id));
    }
    src.way(100, &[A, B], &[("highway", "residential"), ("name", "North Lane")])
        .way(101, &[B, C], &[("highway", "residential"), ("name", "North Lane")])
        .way(102, &[C, D], &[("highway", "residential"), ("name", "South Lane")])
        .way(103, &[D, A], &[("highway", "residential"), ("name", "South Lane")])
        .way(104, &[A, C], &[("highway", "footway")]);
    src
}

pub fn all_profiles() -> EngineConfig {
    EngineConfig {
        profiles: Profile::ALL.to_vec(),
        ..Default::default()
    }
}

pub fn rhombus_engine() -> Engine {
    Engine::build(&mut rhombus(), all_profiles()).unwrap()
}

pub const T_LON: f64 = 30.0;

/// "Main Street" running west to east through a junction J, with "Side
/// Street" leaving J to the south
pub fn t_junction() -> VecSource {
    let mut src = VecSource::default();
    node(&mut src, 1, at(T_LON, -100.0, 0.0));
    node(&mut src, 2, at(T_LON, 0.0, 0.0));
    node(&mut src, 3, at(T_LON, 100.0, 0.0));
    node(&mut src, 4, at(T_LON, 0.0, -100.0));
    src.way(1, &[1, 2, 3], &[("highway", "secondary"), ("name", "Main Street")])
        .way(2, &[2, 4], &[("highway", "residential"), ("name", "Side Street")]);
    src
}

pub const RING_LON: f64 = 20.0;

/// A one-way roundabout of radius 30 m entered from the west by "Approach
/// Road", with a spur to the north and "East Road" leaving to the east.
///
/// The ring runs west, north, east, south and back to west.
pub fn roundabout() -> VecSource {
    let mut src = VecSource::default();
    node(&mut src, 1, at(RING_LON, -150.0, 0.0));
    node(&mut src, 10, at(RING_LON, -30.0, 0.0));
    node(&mut src, 11, at(RING_LON, 0.0, 30.0));
    node(&mut src, 12, at(RING_LON, 30.0, 0.0));
    node(&mut src, 13, at(RING_LON, 0.0, -30.0));
    node(&mut src, 2, at(RING_LON, 0.0, 150.0));
    node(&mut src, 3, at(RING_LON, 150.0, 0.0));
    src.way(1, &[1, 10], &[("highway", "primary"), ("name", "Approach Road")])
        .way(
            2,
            &[10, 11, 12, 13, 10],
            &[("highway", "primary"), ("junction", "roundabout")],
        )
        .way(3, &[11, 2], &[("highway", "tertiary")])
        .way(4, &[12, 3], &[("highway", "primary"), ("name", "East Road")]);
    src
}
