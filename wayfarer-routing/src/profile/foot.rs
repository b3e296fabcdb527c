//! Pedestrian routing profile - tag semantics for walking

use super::{access_allowed, is_ferry, TagLookup, WayAttrs, WayRules, FERRY_SPEED_KMH};

const ACCESS_KEYS: &[&str] = &["foot", "access"];

pub struct FootProfile;

impl WayRules for FootProfile {
    fn process_way(tags: &TagLookup<'_>) -> WayAttrs {
        if access_allowed(tags, ACCESS_KEYS) == Some(false) {
            return WayAttrs::default();
        }

        if is_ferry(tags) {
            return WayAttrs::both_ways(FERRY_SPEED_KMH);
        }

        let speed_kmh = match tags.get_str("highway") {
            Some("footway" | "pedestrian" | "steps") => 5.0,
            Some("path" | "cycleway") => 4.5,
            Some("residential" | "living_street" | "unclassified") => 5.0,
            Some("tertiary" | "secondary" | "primary") => 4.5,
            Some("tertiary_link" | "secondary_link" | "primary_link") => 4.5,
            Some("service") => 4.5,
            Some("track") => 4.0,
            _ => return WayAttrs::default(),
        };

        // Pedestrians ignore oneway restrictions
        WayAttrs::both_ways(speed_kmh)
    }
}
