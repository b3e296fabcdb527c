//! Car routing profile - tag semantics for automobile routing

use super::{
    access_allowed, apply_oneway, is_ferry, is_roundabout, oneway_direction, TagLookup, WayAttrs,
    WayRules, FERRY_SPEED_KMH,
};

/// Upper bound applied to tagged speed limits
const MAX_SPEED_KMH: f64 = 130.0;

const ACCESS_KEYS: &[&str] = &["motorcar", "motor_vehicle", "vehicle", "access"];

pub struct CarProfile;

impl WayRules for CarProfile {
    fn process_way(tags: &TagLookup<'_>) -> WayAttrs {
        if is_ferry(tags) {
            if access_allowed(tags, ACCESS_KEYS) == Some(false) {
                return WayAttrs::default();
            }
            return WayAttrs::both_ways(FERRY_SPEED_KMH);
        }

        let Some(highway) = tags.get_str("highway") else {
            return WayAttrs::default();
        };

        let Some(base_speed_kmh) = default_speed(highway) else {
            return WayAttrs::default();
        };

        if access_allowed(tags, ACCESS_KEYS) == Some(false) {
            return WayAttrs::default();
        }

        let speed_kmh = tags
            .get_str("maxspeed")
            .and_then(parse_maxspeed)
            .unwrap_or(base_speed_kmh);

        let mut attrs = WayAttrs::both_ways(speed_kmh);

        match oneway_direction(tags.get_str("oneway")) {
            Some(forward_only) => apply_oneway(&mut attrs, forward_only),
            None if tags.get_str("oneway") == Some("no") => {}
            // Motorways and roundabouts are oneway unless tagged otherwise
            None if highway == "motorway" || highway == "motorway_link" || is_roundabout(tags) => {
                apply_oneway(&mut attrs, true)
            }
            None => {}
        }

        attrs
    }
}

/// Default speed in km/h per highway class; `None` when cars are not
/// admitted by default
fn default_speed(highway: &str) -> Option<f64> {
    let kmh = match highway {
        "motorway" => 110.0,
        "motorway_link" => 60.0,
        "trunk" => 90.0,
        "trunk_link" => 50.0,
        "primary" => 70.0,
        "primary_link" => 40.0,
        "secondary" => 60.0,
        "secondary_link" => 40.0,
        "tertiary" => 50.0,
        "tertiary_link" => 30.0,
        "unclassified" => 50.0,
        "residential" => 30.0,
        "service" => 20.0,
        "living_street" => 10.0,
        _ => return None,
    };
    Some(kmh)
}

/// Parse a `maxspeed` value in km/h or mph. Zone codes such as `DE:urban`
/// are ignored.
fn parse_maxspeed(value: &str) -> Option<f64> {
    let value = value.trim();
    let (number, factor) = match value.strip_suffix("mph") {
        Some(n) => (n.trim(), 1.609_344),
        None => (value.strip_suffix("km/h").unwrap_or(value).trim(), 1.0),
    };
    let kmh = number.parse::<f64>().ok()? * factor;
    (kmh > 0.0).then(|| kmh.min(MAX_SPEED_KMH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::kmh_to_mps;

    fn process(pairs: &[(&str, &str)]) -> WayAttrs {
        let raw: Vec<(String, String)> = pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CarProfile::process_way(&TagLookup::raw(&raw))
    }

    #[test]
    fn test_parse_maxspeed() {
        assert_eq!(parse_maxspeed("50"), Some(50.0));
        assert_eq!(parse_maxspeed("50 km/h"), Some(50.0));
        assert!((parse_maxspeed("30 mph").unwrap() - 48.28).abs() < 0.01);
        assert_eq!(parse_maxspeed("200"), Some(MAX_SPEED_KMH));
        assert_eq!(parse_maxspeed("DE:urban"), None);
        assert_eq!(parse_maxspeed("0"), None);
    }

    #[test]
    fn test_no_highway_not_routable() {
        assert!(!process(&[("name", "Somewhere")]).is_traversable());
        assert!(!process(&[("highway", "cycleway")]).is_traversable());
        assert!(!process(&[("highway", "construction")]).is_traversable());
    }

    #[test]
    fn test_motorway_oneway_override() {
        let attrs = process(&[("highway", "motorway"), ("oneway", "no")]);
        assert!(attrs.access_fwd && attrs.access_rev);
        assert!((attrs.speed_mps - kmh_to_mps(110.0)).abs() < 1e-9);
    }
}
