//! Engine configuration
//!
//! Read once at startup, from TOML or built in code. The built graph is never
//! reconfigured.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wayfarer_common::{Error, Result};

use crate::profile::Profile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Profiles the graph is built for; others are rejected at query time
    pub profiles: Vec<Profile>,
    pub resolver: ResolverConfig,
    pub instructions: InstructionConfig,
    pub build: BuildConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profiles: Profile::ALL.to_vec(),
            resolver: ResolverConfig::default(),
            instructions: InstructionConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// First search radius in meters; doubled until `max_radius_m`
    pub initial_radius_m: f64,
    pub max_radius_m: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            initial_radius_m: 25.0,
            max_radius_m: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstructionConfig {
    /// Minimum absolute turn angle in degrees for a turn instruction
    pub turn_angle_threshold_deg: f64,
}

impl Default for InstructionConfig {
    fn default() -> Self {
        Self {
            turn_angle_threshold_deg: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStrategy {
    /// Read ways first, then re-read keeping only referenced nodes
    #[default]
    TwoPass,
    /// Single pass holding every node coordinate
    Buffered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub strategy: BuildStrategy,
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.resolver;
        if !(r.initial_radius_m.is_finite() && r.initial_radius_m > 0.0) {
            return Err(Error::Config(format!(
                "resolver.initial_radius_m must be positive, got {}",
                r.initial_radius_m
            )));
        }
        if !(r.max_radius_m.is_finite() && r.max_radius_m >= r.initial_radius_m) {
            return Err(Error::Config(format!(
                "resolver.max_radius_m ({}) must be >= initial_radius_m ({})",
                r.max_radius_m, r.initial_radius_m
            )));
        }

        let t = self.instructions.turn_angle_threshold_deg;
        if !(0.0..=180.0).contains(&t) {
            return Err(Error::Config(format!(
                "instructions.turn_angle_threshold_deg must be within 0..=180, got {t}"
            )));
        }

        Ok(())
    }

    /// Enabled profiles, deduplicated in declaration order
    pub fn enabled_profiles(&self) -> Vec<Profile> {
        let mut out: Vec<Profile> = Vec::with_capacity(self.profiles.len());
        for p in &self.profiles {
            if !out.contains(p) {
                out.push(*p);
            }
        }
        out
    }
}
