//! Coordinates and spherical geometry helpers

use geo::{HaversineBearing, HaversineDistance, Point};
use serde::{Deserialize, Serialize};

/// Fixed-point scale for stored coordinates (1e-7 degrees)
const FIXED_SCALE: f64 = 1e7;

/// A WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "latitude")]
    pub lat: f64,
    #[serde(rename = "longitude")]
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the WGS84 value ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    fn point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Coordinate stored in 1e-7 degree integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedCoord {
    pub lat_e7: i32,
    pub lon_e7: i32,
}

impl FixedCoord {
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat_e7: (lat * FIXED_SCALE).round() as i32,
            lon_e7: (lon * FIXED_SCALE).round() as i32,
        }
    }

    pub fn to_coordinate(self) -> Coordinate {
        Coordinate {
            lat: self.lat_e7 as f64 / FIXED_SCALE,
            lon: self.lon_e7 as f64 / FIXED_SCALE,
        }
    }
}

impl From<Coordinate> for FixedCoord {
    fn from(c: Coordinate) -> Self {
        FixedCoord::from_degrees(c.lat, c.lon)
    }
}

/// Great-circle distance in meters
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    a.point().haversine_distance(&b.point())
}

/// Initial bearing from `a` to `b` in degrees, 0 = north, clockwise, [0, 360)
pub fn bearing(a: Coordinate, b: Coordinate) -> f64 {
    let raw = a.point().haversine_bearing(b.point());
    ((raw % 360.0) + 360.0) % 360.0
}

/// Signed turn angle from an incoming to an outgoing bearing, wrapped to
/// (-180, 180]. Positive = right turn, negative = left turn.
pub fn turn_angle(in_bearing: f64, out_bearing: f64) -> f64 {
    let mut delta = out_bearing - in_bearing;
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

pub fn polyline_length(coords: &[Coordinate]) -> f64 {
    coords
        .windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .sum()
}

/// Perpendicular projection of a query onto a polyline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub coordinate: Coordinate,
    /// Position along the polyline, 0.0 at the first vertex, 1.0 at the last
    pub fraction: f64,
    /// Distance from the query to the projected point in meters
    pub distance_m: f64,
}

/// Project `query` onto the closest segment of `coords`.
///
/// The segment parameter is computed in a local equirectangular frame
/// centred on the query, the resulting distance is haversine. Among segments
/// at equal distance the first one wins.
pub fn project_onto_polyline(query: Coordinate, coords: &[Coordinate]) -> Option<Projection> {
    match coords {
        [] => None,
        [only] => Some(Projection {
            coordinate: *only,
            fraction: 0.0,
            distance_m: haversine_distance(query, *only),
        }),
        _ => {
            let lon_scale = query.lat.to_radians().cos();
            let mut walked = 0.0;
            let mut best: Option<(f64, Coordinate, f64)> = None; // (distance, point, along)

            for pair in coords.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                let seg_len = haversine_distance(a, b);

                let ax = a.lon * lon_scale;
                let bx = b.lon * lon_scale;
                let qx = query.lon * lon_scale;
                let dx = bx - ax;
                let dy = b.lat - a.lat;

                let t = if dx == 0.0 && dy == 0.0 {
                    0.0
                } else {
                    (((qx - ax) * dx + (query.lat - a.lat) * dy) / (dx * dx + dy * dy))
                        .clamp(0.0, 1.0)
                };

                let point = interpolate(a, b, t);
                let distance = haversine_distance(query, point);

                if best.map_or(true, |(d, _, _)| distance < d) {
                    best = Some((distance, point, walked + t * seg_len));
                }

                walked += seg_len;
            }

            best.map(|(distance_m, coordinate, along)| Projection {
                coordinate,
                fraction: if walked > 0.0 {
                    (along / walked).clamp(0.0, 1.0)
                } else {
                    0.0
                },
                distance_m,
            })
        }
    }
}

/// Sub-polyline between `start_m` and `end_m` meters from the first vertex.
///
/// Cut points are interpolated, intermediate vertices kept. Offsets past the
/// end clamp to the last vertex.
pub fn slice_polyline(coords: &[Coordinate], start_m: f64, end_m: f64) -> Vec<Coordinate> {
    if coords.len() < 2 {
        return coords.to_vec();
    }

    let start_m = start_m.max(0.0);
    let end_m = end_m.max(start_m);

    let mut out: Vec<Coordinate> = Vec::new();
    let mut walked = 0.0;

    for pair in coords.windows(2) {
        let seg_len = haversine_distance(pair[0], pair[1]);
        let seg_end = walked + seg_len;

        if out.is_empty() && start_m <= seg_end {
            out.push(interpolate(pair[0], pair[1], ratio(start_m - walked, seg_len)));
        }

        if !out.is_empty() {
            if end_m <= seg_end {
                out.push(interpolate(pair[0], pair[1], ratio(end_m - walked, seg_len)));
                out.dedup();
                return out;
            }
            out.push(pair[1]);
        }

        walked = seg_end;
    }

    if out.is_empty() {
        out.extend(coords.last().copied());
    }
    out.dedup();
    out
}

fn ratio(offset: f64, seg_len: f64) -> f64 {
    if seg_len > 0.0 {
        (offset / seg_len).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn interpolate(a: Coordinate, b: Coordinate, t: f64) -> Coordinate {
    Coordinate {
        lat: a.lat + (b.lat - a.lat) * t,
        lon: a.lon + (b.lon - a.lon) * t,
    }
}
