//! Routing engine facade
//!
//! Owns the built graph and exposes point resolution and route calculation
//! per profile. An `Engine` is immutable once built and is shared across
//! threads behind an `Arc`.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use wayfarer_common::{Error, Result};

use crate::builder::NetworkBuilder;
use crate::config::EngineConfig;
use crate::geo::Coordinate;
use crate::graph::GraphStore;
use crate::instructions::{
    generate_instructions, Instruction, LanguageFormatter, Maneuver, SimpleEnglishFormatter,
};
use crate::profile::{Profile, ProfileTable};
use crate::records::RecordSource;
use crate::resolve::{resolve, RouterPoint};
use crate::route::{assemble, Route};
use crate::search::{shortest_path, QueryOptions};

/// Which end of a route request failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Start,
    End,
}

/// Result of a route request that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Found(RouteSummary),
    /// An endpoint is not near any edge the profile can use
    Unresolved(Endpoint),
    /// Both endpoints resolved but no path connects them
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionSummary {
    pub text: String,
    pub position: Coordinate,
    pub entry: usize,
    pub maneuver: Maneuver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub profile: Profile,
    pub geometry: Vec<Coordinate>,
    /// Meters
    pub total_distance: f64,
    /// Seconds
    pub total_time: f64,
    pub instructions: Vec<InstructionSummary>,
}

impl RouteSummary {
    fn new(route: &Route, instructions: Vec<Instruction>) -> Self {
        let instructions = instructions
            .into_iter()
            .map(|i| InstructionSummary {
                position: route.entries[i.entry].coordinate,
                text: i.text,
                entry: i.entry,
                maneuver: i.maneuver,
            })
            .collect();

        Self {
            profile: route.profile,
            geometry: route.geometry(),
            total_distance: route.total_distance_m,
            total_time: route.total_time_s,
            instructions,
        }
    }

    /// GeoJSON `Feature` with a `LineString` geometry
    pub fn to_geojson(&self) -> serde_json::Value {
        let coordinates: Vec<[f64; 2]> = self.geometry.iter().map(|c| [c.lon, c.lat]).collect();
        json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
            "properties": {
                "name": format!("{} route", self.profile),
                "profile": self.profile,
                "distance": self.total_distance,
                "journeytime": self.total_time,
            },
        })
    }
}

pub struct Engine {
    graph: GraphStore,
    config: EngineConfig,
    formatter: Arc<dyn LanguageFormatter>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("profiles", &self.graph.profiles())
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

impl Engine {
    /// Validate `config` and build the network from `source`
    pub fn build(source: &mut dyn RecordSource, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let started = Instant::now();
        let graph = NetworkBuilder::new(&config).build(source)?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            profiles = ?graph.profiles(),
            "routing engine ready"
        );

        Ok(Self {
            graph,
            config,
            formatter: Arc::new(SimpleEnglishFormatter),
        })
    }

    /// Replace the instruction wording
    pub fn with_formatter(mut self, formatter: Arc<dyn LanguageFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn profiles(&self) -> Vec<Profile> {
        self.graph.profiles()
    }

    pub fn supports_profile(&self, profile: Profile) -> bool {
        self.graph.profile_table(profile).is_some()
    }

    fn table(&self, profile: Profile) -> Result<&ProfileTable> {
        self.graph
            .profile_table(profile)
            .ok_or_else(|| Error::UnsupportedProfile {
                requested: profile.name().to_string(),
                enabled: self
                    .profiles()
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Snap a coordinate onto the network for `profile`
    pub fn resolve(&self, profile: Profile, coordinate: Coordinate) -> Result<Option<RouterPoint>> {
        let table = self.table(profile)?;
        Ok(resolve(&self.graph, table, &self.config.resolver, coordinate))
    }

    /// Nearest point on the network, or `None` beyond the search radius
    pub fn resolve_point(&self, profile: Profile, lat: f64, lon: f64) -> Result<Option<Coordinate>> {
        Ok(self
            .resolve(profile, Coordinate::new(lat, lon))?
            .map(|p| p.location))
    }

    /// Route between two resolved points; `Ok(None)` when unreachable
    pub fn calculate(
        &self,
        profile: Profile,
        from: &RouterPoint,
        to: &RouterPoint,
        options: &QueryOptions,
    ) -> Result<Option<Route>> {
        let table = self.table(profile)?;
        let path = shortest_path(&self.graph, table, from, to, options)?;
        Ok(path.map(|p| assemble(&self.graph, table, &p, from, to)))
    }

    pub fn generate_instructions(&self, route: &Route) -> Result<Vec<Instruction>> {
        let table = self.table(route.profile)?;
        Ok(generate_instructions(
            &self.graph,
            table,
            route,
            self.formatter.as_ref(),
            &self.config.instructions,
        ))
    }

    pub fn calculate_route(
        &self,
        profile: Profile,
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
    ) -> Result<RouteOutcome> {
        self.calculate_route_with(
            profile,
            Coordinate::new(start_lat, start_lon),
            Coordinate::new(end_lat, end_lon),
            &QueryOptions::default(),
        )
    }

    /// Resolve both ends, search, and assemble geometry and instructions
    pub fn calculate_route_with(
        &self,
        profile: Profile,
        start: Coordinate,
        end: Coordinate,
        options: &QueryOptions,
    ) -> Result<RouteOutcome> {
        let Some(from) = self.resolve(profile, start)? else {
            return Ok(RouteOutcome::Unresolved(Endpoint::Start));
        };
        let Some(to) = self.resolve(profile, end)? else {
            return Ok(RouteOutcome::Unresolved(Endpoint::End));
        };

        let Some(route) = self.calculate(profile, &from, &to, options)? else {
            debug!(%profile, "no route between resolved points");
            return Ok(RouteOutcome::NotFound);
        };

        let instructions = self.generate_instructions(&route)?;
        Ok(RouteOutcome::Found(RouteSummary::new(&route, instructions)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::VecSource;

    fn engine(profiles: &[Profile]) -> Engine {
        let mut src = VecSource::default();
        src.node(1, 0.0, 0.0)
            .node(2, 0.0, 0.001)
            .way(10, &[1, 2], &[("highway", "residential"), ("name", "Quay Street")]);
        let config = EngineConfig {
            profiles: profiles.to_vec(),
            ..Default::default()
        };
        Engine::build(&mut src, config).unwrap()
    }

    #[test]
    fn test_capabilities() {
        let e = engine(&[Profile::Car, Profile::Foot]);
        assert!(e.supports_profile(Profile::Car));
        assert!(!e.supports_profile(Profile::Bike));
        assert_eq!(e.profiles(), vec![Profile::Car, Profile::Foot]);
    }

    #[test]
    fn test_unsupported_profile_error() {
        let e = engine(&[Profile::Car]);
        match e.resolve_point(Profile::Foot, 0.0, 0.0005) {
            Err(Error::UnsupportedProfile { requested, enabled }) => {
                assert_eq!(requested, "foot");
                assert_eq!(enabled, "car");
            }
            other => panic!("expected UnsupportedProfile, got {other:?}"),
        }
        // Still serving the enabled profile
        assert!(e.resolve_point(Profile::Car, 0.0, 0.0005).unwrap().is_some());
    }

    #[test]
    fn test_unresolved_endpoints() {
        let e = engine(&[Profile::Car]);
        assert_eq!(
            e.calculate_route(Profile::Car, 1.0, 1.0, 0.0, 0.0005).unwrap(),
            RouteOutcome::Unresolved(Endpoint::Start)
        );
        assert_eq!(
            e.calculate_route(Profile::Car, 0.0, 0.0005, 1.0, 1.0).unwrap(),
            RouteOutcome::Unresolved(Endpoint::End)
        );
    }

    #[test]
    fn test_found_route_summary_and_geojson() {
        let e = engine(&[Profile::Car]);
        let RouteOutcome::Found(summary) =
            e.calculate_route(Profile::Car, 0.0, 0.0001, 0.0, 0.0009).unwrap()
        else {
            panic!("expected a route");
        };

        assert_eq!(summary.instructions.len(), 2);
        assert_eq!(summary.instructions[0].text, "Head east on Quay Street");
        assert_eq!(summary.instructions[1].maneuver, Maneuver::Arrive);
        assert_eq!(
            summary.instructions[1].position,
            *summary.geometry.last().unwrap()
        );

        let geojson = summary.to_geojson();
        assert_eq!(geojson["type"], "Feature");
        assert_eq!(geojson["geometry"]["type"], "LineString");
        assert_eq!(geojson["properties"]["profile"], "car");
        let coords = geojson["geometry"]["coordinates"].as_array().unwrap();
        assert_eq!(coords.len(), summary.geometry.len());
        // [lon, lat] order
        assert_eq!(coords[0][0].as_f64(), Some(summary.geometry[0].lon));
        assert!((geojson["properties"]["distance"].as_f64().unwrap() - 88.956).abs() < 0.1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut src = VecSource::default();
        let mut config = EngineConfig::default();
        config.resolver.max_radius_m = 1.0;
        assert!(matches!(
            Engine::build(&mut src, config),
            Err(Error::Config(_))
        ));
    }
}
