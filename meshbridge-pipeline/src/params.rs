//! User-facing operation parameters

use crate::config::ParameterPolicy;
use meshbridge_core::{Error, Result};
use meshbridge_engine::{CLUSTER_RANGE, UNIT_RANGE};
use serde::{Deserialize, Serialize};

fn check_finite(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::InvalidParameter(format!("{} must be finite, got {}", name, value)));
    }
    Ok(())
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    check_finite(name, value)?;
    if !UNIT_RANGE.contains(&value) {
        return Err(Error::InvalidParameter(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

/// Parameters of a segmentation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Number of clusters the engine groups faces into, 2 to 10
    pub clusters: u32,
    /// Neighbour smoothing strength, 0 to 1
    pub smoothness: f32,
    /// Discard the mesh's existing material slots first.
    /// User-authored materials are lost.
    pub delete_existing_materials: bool,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            clusters: 4,
            smoothness: 0.5,
            delete_existing_materials: false,
        }
    }
}

impl SegmentationParams {
    pub fn validate(&self) -> Result<()> {
        if !CLUSTER_RANGE.contains(&self.clusters) {
            return Err(Error::InvalidParameter(format!(
                "clusters must be within [{}, {}], got {}",
                CLUSTER_RANGE.start(),
                CLUSTER_RANGE.end(),
                self.clusters
            )));
        }
        check_unit("smoothness", self.smoothness)
    }

    /// Clamp into range; non-finite values are still rejected
    pub fn clamped(&self) -> Result<Self> {
        check_finite("smoothness", self.smoothness)?;
        Ok(Self {
            clusters: self.clusters.clamp(*CLUSTER_RANGE.start(), *CLUSTER_RANGE.end()),
            smoothness: self.smoothness.clamp(*UNIT_RANGE.start(), *UNIT_RANGE.end()),
            ..*self
        })
    }

    /// Parameters to use under `policy`
    pub fn resolve(&self, policy: ParameterPolicy) -> Result<Self> {
        match policy {
            ParameterPolicy::Reject => self.validate().map(|_| *self),
            ParameterPolicy::Clamp => self.clamped(),
        }
    }
}

/// Parameters of a simplification run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplificationParams {
    /// Fraction of the faces to remove, 0 to 1
    pub decimation_factor: f32,
}

impl Default for SimplificationParams {
    fn default() -> Self {
        Self {
            decimation_factor: 0.5,
        }
    }
}

impl SimplificationParams {
    pub fn validate(&self) -> Result<()> {
        check_unit("decimation factor", self.decimation_factor)
    }

    pub fn clamped(&self) -> Result<Self> {
        check_finite("decimation factor", self.decimation_factor)?;
        Ok(Self {
            decimation_factor: self
                .decimation_factor
                .clamp(*UNIT_RANGE.start(), *UNIT_RANGE.end()),
        })
    }

    pub fn resolve(&self, policy: ParameterPolicy) -> Result<Self> {
        match policy {
            ParameterPolicy::Reject => self.validate().map(|_| *self),
            ParameterPolicy::Clamp => self.clamped(),
        }
    }
}
