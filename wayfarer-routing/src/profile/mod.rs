//! Built-in vehicle profiles
//!
//! Each profile maps a tag set to per-direction access and a travel speed.
//! Results are cached per tag handle in a [`ProfileTable`] so edge costs are
//! computed on demand without re-reading tags.

pub mod bike;
pub mod car;
pub mod foot;
pub mod tag_lookup;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use wayfarer_common::{suggest_correction, Error};

use crate::tags::{TagDictionary, TagHandle};
pub use bike::BikeProfile;
pub use car::CarProfile;
pub use foot::FootProfile;
pub use tag_lookup::TagLookup;

/// Ferry crossings are costed at a flat speed for every profile
pub(crate) const FERRY_SPEED_KMH: f64 = 20.0;

/// Names accepted by [`Profile::from_str`]
const ACCEPTED_NAMES: &[&str] = &["car", "bike", "bicycle", "foot", "pedestrian", "walk"];

/// Travel mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Car,
    #[serde(alias = "bicycle")]
    Bike,
    #[serde(alias = "pedestrian", alias = "walk")]
    Foot,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Car, Profile::Bike, Profile::Foot];

    pub fn name(self) -> &'static str {
        match self {
            Profile::Car => "car",
            Profile::Bike => "bike",
            Profile::Foot => "foot",
        }
    }

    /// Evaluate the profile's rules for one tag set
    pub fn process_way(self, tags: &TagLookup<'_>) -> WayAttrs {
        match self {
            Profile::Car => CarProfile::process_way(tags),
            Profile::Bike => BikeProfile::process_way(tags),
            Profile::Foot => FootProfile::process_way(tags),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "car" => Ok(Profile::Car),
            "bike" | "bicycle" => Ok(Profile::Bike),
            "foot" | "pedestrian" | "walk" => Ok(Profile::Foot),
            _ => Err(Error::UnknownProfile {
                name: s.to_string(),
                suggestion: suggest_correction(s, ACCEPTED_NAMES),
            }),
        }
    }
}

/// Tag semantics of one travel mode
pub trait WayRules {
    fn process_way(tags: &TagLookup<'_>) -> WayAttrs;
}

/// Access and speed of a way for one profile, relative to the way's
/// digitization direction
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WayAttrs {
    pub access_fwd: bool,
    pub access_rev: bool,
    /// Travel speed in meters per second, > 0 whenever either access flag is set
    pub speed_mps: f64,
}

impl WayAttrs {
    pub(crate) fn both_ways(speed_kmh: f64) -> Self {
        Self {
            access_fwd: true,
            access_rev: true,
            speed_mps: kmh_to_mps(speed_kmh),
        }
    }

    pub fn is_traversable(&self) -> bool {
        self.access_fwd || self.access_rev
    }

    pub fn allows(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.access_fwd,
            Direction::Backward => self.access_rev,
        }
    }
}

/// Travel direction relative to the way's node order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCost {
    pub traversable: bool,
    /// Travel time in seconds; infinite when not traversable
    pub weight_s: f64,
    pub speed_mps: f64,
}

impl EdgeCost {
    const BLOCKED: EdgeCost = EdgeCost {
        traversable: false,
        weight_s: f64::INFINITY,
        speed_mps: 0.0,
    };
}

/// Profile attributes cached per tag handle
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profile: Profile,
    attrs: Vec<WayAttrs>,
}

impl ProfileTable {
    pub fn build(profile: Profile, dict: &TagDictionary) -> Self {
        let attrs = dict
            .handles()
            .map(|h| profile.process_way(&TagLookup::interned(dict.resolve(h))))
            .collect();
        Self { profile, attrs }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn attrs(&self, handle: TagHandle) -> WayAttrs {
        self.attrs.get(handle.index()).copied().unwrap_or_default()
    }

    /// Cost of travelling `length_m` along a way with these tags
    pub fn cost(&self, handle: TagHandle, length_m: f64, direction: Direction) -> EdgeCost {
        let attrs = self.attrs(handle);
        if !attrs.allows(direction) || attrs.speed_mps <= 0.0 {
            return EdgeCost::BLOCKED;
        }
        EdgeCost {
            traversable: true,
            weight_s: length_m.max(0.0) / attrs.speed_mps,
            speed_mps: attrs.speed_mps,
        }
    }
}

/// Resolve a hierarchy of access keys, most specific first; the first key
/// present decides.
pub(crate) fn access_allowed(tags: &TagLookup<'_>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| {
        tags.get_str(key).map(|value| {
            !matches!(value, "no" | "private" | "agricultural" | "forestry" | "delivery")
        })
    })
}

/// Oneway semantics of the plain `oneway` key: Some(true) forward only,
/// Some(false) reverse only
pub(crate) fn oneway_direction(value: Option<&str>) -> Option<bool> {
    match value {
        Some("yes" | "1" | "true") => Some(true),
        Some("-1" | "reverse") => Some(false),
        _ => None,
    }
}

pub(crate) fn apply_oneway(attrs: &mut WayAttrs, forward_only: bool) {
    if forward_only {
        attrs.access_rev = false;
    } else {
        attrs.access_fwd = false;
    }
}

pub(crate) fn is_roundabout(tags: &TagLookup<'_>) -> bool {
    tags.is_any("junction", &["roundabout", "circular"])
}

pub(crate) fn is_ferry(tags: &TagLookup<'_>) -> bool {
    tags.get_str("route") == Some("ferry")
}

pub(crate) fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / 3.6
}
