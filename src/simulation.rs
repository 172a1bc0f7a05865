//! Simulation collaborator seam and a built-in phantom simulator
//!
//! The pipeline only ever calls [`Simulator::run`] with an opaque
//! [`SimulationConfig`]; parsing and validating the configuration is the
//! simulator's business.

use crate::error::{Result, VolumeError};
use crate::types::{Dimension, VolumeShape};
use crate::volume::RawVolume;
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Configuration passed through to a simulator untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationConfig(serde_json::Value);

impl SimulationConfig {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for SimulationConfig {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Producer of simulated volumes
pub trait Simulator: Send + Sync {
    /// Validate `config` and compute a (C, Z, Y, X) volume
    ///
    /// Validation failures must be reported as
    /// [`VolumeError::InvalidInput`] carrying the diagnostic text.
    fn run(&self, config: &SimulationConfig) -> Result<RawVolume>;

    /// JSON schema describing accepted configurations, for form builders
    fn schema(&self) -> serde_json::Value;
}

/// Largest extent accepted on any axis
pub const MAX_AXIS_EXTENT: usize = 1024;

/// Largest total voxel count accepted
pub const MAX_TOTAL_VOXELS: usize = 64 * 1024 * 1024;

/// Synthetic structure drawn by [`PhantomSimulator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// Channel-scaled linear ramps across the plane, rising with depth
    Gradient,
    /// A lattice of Gaussian beads, offset per channel
    Beads,
}

/// Parameters accepted by [`PhantomSimulator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhantomConfig {
    /// Output extents (C, Z, Y, X)
    pub shape: [usize; 4],
    #[serde(default = "default_pattern")]
    pub pattern: Pattern,
    /// Constant offset added to every voxel
    #[serde(default)]
    pub background: f64,
}

fn default_pattern() -> Pattern {
    Pattern::Gradient
}

impl PhantomConfig {
    /// Parse and validate a configuration
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let parsed: Self = serde_json::from_value(config.as_value().clone())
            .map_err(|e| VolumeError::InvalidInput(e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        for (dim, &extent) in Dimension::ALL.iter().zip(self.shape.iter()) {
            if extent == 0 || extent > MAX_AXIS_EXTENT {
                return Err(VolumeError::InvalidInput(format!(
                    "shape.{} must be between 1 and {}, got {}",
                    dim.label(),
                    MAX_AXIS_EXTENT,
                    extent
                )));
            }
        }
        let total: usize = self.shape.iter().product();
        if total > MAX_TOTAL_VOXELS {
            return Err(VolumeError::InvalidInput(format!(
                "volume of {} voxels exceeds limit of {}",
                total, MAX_TOTAL_VOXELS
            )));
        }
        if !self.background.is_finite() || self.background < 0.0 {
            return Err(VolumeError::InvalidInput(format!(
                "background must be a finite non-negative number, got {}",
                self.background
            )));
        }
        Ok(())
    }
}

/// Deterministic simulator drawing simple synthetic structures
///
/// Output is a pure function of the configuration and is produced in double
/// precision, so it goes through element-type canonicalization downstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhantomSimulator;

impl PhantomSimulator {
    pub fn new() -> Self {
        Self
    }

    fn render(config: &PhantomConfig) -> Result<Array4<f64>> {
        let shape = VolumeShape::from_dims(config.shape)?;
        let [c, z, y, x] = shape.dims();
        let norm = |i: usize, n: usize| if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
        let bg = config.background;

        let data = match config.pattern {
            Pattern::Gradient => Array4::from_shape_fn((c, z, y, x), |(ci, zi, yi, xi)| {
                let ramp = 0.4 * norm(yi, y) + 0.6 * norm(xi, x);
                bg + (ci + 1) as f64 * (0.3 + 0.7 * ramp) + 0.1 * zi as f64
            }),
            Pattern::Beads => {
                let spacing = 8.0;
                let sigma2 = 2.0 * 1.5f64.powi(2);
                Array4::from_shape_fn((c, z, y, x), |(ci, zi, yi, xi)| {
                    let offset = ci as f64 * spacing / c as f64;
                    let dy = (yi as f64 + offset).rem_euclid(spacing) - spacing / 2.0;
                    let dx = (xi as f64 + offset).rem_euclid(spacing) - spacing / 2.0;
                    let dz = zi as f64 - (z as f64 - 1.0) / 2.0;
                    bg + 100.0 * (-(dx * dx + dy * dy + dz * dz) / sigma2).exp()
                })
            }
        };
        Ok(data)
    }
}

impl Simulator for PhantomSimulator {
    fn run(&self, config: &SimulationConfig) -> Result<RawVolume> {
        let config = PhantomConfig::from_config(config)?;
        Ok(RawVolume::F64(Self::render(&config)?))
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "title": "Simulation",
            "type": "object",
            "additionalProperties": false,
            "required": ["shape"],
            "properties": {
                "shape": {
                    "title": "Shape",
                    "description": "Output extents as [C, Z, Y, X]",
                    "type": "array",
                    "items": {"type": "integer", "minimum": 1, "maximum": MAX_AXIS_EXTENT},
                    "minItems": 4,
                    "maxItems": 4
                },
                "pattern": {
                    "title": "Pattern",
                    "type": "string",
                    "enum": ["gradient", "beads"],
                    "default": "gradient"
                },
                "background": {
                    "title": "Background",
                    "type": "number",
                    "minimum": 0.0,
                    "default": 0.0
                }
            }
        })
    }
}
