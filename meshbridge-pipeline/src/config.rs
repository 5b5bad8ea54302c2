//! Pipeline configuration

use meshbridge_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do when the host is in a mode the pipeline cannot work in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModePolicy {
    /// Fail with `UnsupportedMode`
    #[default]
    Reject,
    /// Switch the host to object-level editing and carry on
    SwitchToObject,
}

/// Where segment colours come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteKind {
    /// Fixed colour list, identical on every run
    #[default]
    Preset,
    /// Random colours; a seed makes them reproducible
    Random { seed: Option<u64> },
}

/// Handling of out-of-range user parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPolicy {
    #[default]
    Reject,
    Clamp,
}

/// Configuration for the mesh pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Vertices closer than this are fused during normalization
    pub merge_distance: f32,
    /// Interaction-mode handling for operations that need object or element mode
    pub mode_policy: ModePolicy,
    /// Segment colour source
    pub palette: PaletteKind,
    /// Recompute face normals after normalization
    pub recompute_normals: bool,
    /// Reject or clamp out-of-range parameters
    pub validate_parameters: ParameterPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            merge_distance: 1e-4,
            mode_policy: ModePolicy::Reject,
            palette: PaletteKind::Preset,
            recompute_normals: true,
            validate_parameters: ParameterPolicy::Reject,
        }
    }
}

/// Smallest positive merge distance; zero still means exact duplicates only
pub const MIN_MERGE_DISTANCE: f32 = 1e-9;

impl PipelineConfig {
    /// Parse a JSON document; absent keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidData(format!("invalid pipeline configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.merge_distance.is_finite() || self.merge_distance < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "merge distance must be a non-negative number, got {}",
                self.merge_distance
            )));
        }
        if self.merge_distance > 0.0 && self.merge_distance < MIN_MERGE_DISTANCE {
            return Err(Error::InvalidParameter(format!(
                "merge distance must be 0 or at least {}, got {}",
                MIN_MERGE_DISTANCE, self.merge_distance
            )));
        }
        Ok(())
    }
}
