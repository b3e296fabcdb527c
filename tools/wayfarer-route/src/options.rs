//! Engine settings shared by every subcommand

use std::path::PathBuf;

use clap::Args;
use wayfarer_routing::{Coordinate, EngineConfig, Profile};

#[derive(Debug, Clone, Default, Args)]
pub struct EngineArgs {
    /// TOML engine configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Profiles to build, comma separated (overrides the config file)
    #[arg(long, global = true, value_delimiter = ',')]
    pub profiles: Vec<Profile>,

    /// Largest point resolution radius in meters
    #[arg(long, global = true)]
    pub max_radius: Option<f64>,

    /// Smallest bearing change in degrees announced as a turn
    #[arg(long, global = true)]
    pub turn_threshold: Option<f64>,
}

impl EngineArgs {
    /// Config file (or defaults) with command line overrides applied
    pub fn engine_config(&self) -> wayfarer_routing::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        if !self.profiles.is_empty() {
            config.profiles = self.profiles.clone();
        }
        if let Some(radius) = self.max_radius {
            config.resolver.max_radius_m = radius;
            config.resolver.initial_radius_m = config.resolver.initial_radius_m.min(radius);
        }
        if let Some(threshold) = self.turn_threshold {
            config.instructions.turn_angle_threshold_deg = threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse `lat,lon`
pub fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("'{s}' is not in 'lat,lon' format"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("bad latitude '{lat}': {e}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("bad longitude '{lon}': {e}"))?;

    let coordinate = Coordinate::new(lat, lon);
    if !coordinate.is_valid() {
        return Err(format!("'{s}' is outside the valid coordinate range"));
    }
    Ok(coordinate)
}
