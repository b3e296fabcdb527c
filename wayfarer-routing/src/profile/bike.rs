//! Bicycle routing profile - tag semantics for bicycle routing

use super::{
    access_allowed, apply_oneway, is_ferry, is_roundabout, oneway_direction, TagLookup, WayAttrs,
    WayRules, FERRY_SPEED_KMH,
};

/// Speed when a way not open to bikes by default is explicitly tagged for them
const EXPLICIT_ACCESS_KMH: f64 = 12.0;

const ACCESS_KEYS: &[&str] = &["bicycle", "vehicle", "access"];

pub struct BikeProfile;

impl WayRules for BikeProfile {
    fn process_way(tags: &TagLookup<'_>) -> WayAttrs {
        if tags.get_str("bicycle") == Some("dismount") {
            return WayAttrs::default();
        }

        let access = access_allowed(tags, ACCESS_KEYS);
        if access == Some(false) {
            return WayAttrs::default();
        }

        if is_ferry(tags) {
            return WayAttrs::both_ways(FERRY_SPEED_KMH);
        }

        let Some(highway) = tags.get_str("highway") else {
            return WayAttrs::default();
        };

        let speed_kmh = match (default_speed(highway), tags.get_str("bicycle")) {
            (Some(kmh), _) => kmh,
            (None, Some("yes" | "designated" | "permissive"))
                if !matches!(highway, "motorway" | "motorway_link") =>
            {
                EXPLICIT_ACCESS_KMH
            }
            _ => return WayAttrs::default(),
        };

        let mut attrs = WayAttrs::both_ways(speed_kmh);

        // Bikes are not bound by the car oneway unless tagged for bicycles;
        // roundabouts are always oneway
        if let Some(forward_only) = oneway_direction(tags.get_str("oneway:bicycle")) {
            apply_oneway(&mut attrs, forward_only);
        } else if is_roundabout(tags) {
            apply_oneway(&mut attrs, true);
        }

        attrs
    }
}

fn default_speed(highway: &str) -> Option<f64> {
    let kmh = match highway {
        "cycleway" => 20.0,
        "path" | "footway" => 15.0,
        "residential" | "unclassified" | "tertiary" | "secondary" | "primary" => 18.0,
        "tertiary_link" | "secondary_link" | "primary_link" => 18.0,
        "service" | "living_street" => 15.0,
        "track" => 12.0,
        _ => return None,
    };
    Some(kmh)
}
