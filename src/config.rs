//! Extractor configuration.
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a usable configuration.

use serde::{Deserialize, Serialize};

/// Longest side, in pixels, of the image handed to clustering.
pub const DEFAULT_MAX_DIMENSION: u32 = 150;

/// Decoded pixel area above which an input is treated as a decompression bomb.
pub const DEFAULT_MAX_PIXELS: u64 = 2 * 89_478_485;

/// Allocation cap handed to the decoder (bytes).
pub const DEFAULT_MAX_ALLOC_BYTES: u64 = 1 << 30;

/// Top-level extractor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Neither side of the clustered image exceeds this.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// Upper bound on `width * height` claimed by the image header.
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,

    /// Upper bound on decoder allocations.
    #[serde(default = "default_max_alloc_bytes")]
    pub max_alloc_bytes: u64,

    /// k-means parameters.
    #[serde(default)]
    pub cluster: ClusterParams,
}

/// Parameters for the k-means step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Centroid movement (in `[0, 1]` RGB units) below which a run stops.
    #[serde(default = "default_convergence")]
    pub convergence: f32,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Independent restarts; the lowest-score run wins.
    #[serde(default = "default_runs")]
    pub runs: u32,
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

fn default_max_alloc_bytes() -> u64 {
    DEFAULT_MAX_ALLOC_BYTES
}

fn default_max_iterations() -> usize {
    20
}

fn default_convergence() -> f32 {
    0.0025
}

fn default_seed() -> u64 {
    42
}

fn default_runs() -> u32 {
    1
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            max_pixels: default_max_pixels(),
            max_alloc_bytes: default_max_alloc_bytes(),
            cluster: ClusterParams::default(),
        }
    }
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            convergence: default_convergence(),
            seed: default_seed(),
            runs: default_runs(),
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config value: {field} {reason}")]
    Invalid { field: &'static str, reason: &'static str },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ExtractorConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });

        if self.max_dimension == 0 {
            return invalid("max_dimension", "must be positive");
        }
        if self.max_pixels == 0 {
            return invalid("max_pixels", "must be positive");
        }
        if self.cluster.max_iterations == 0 {
            return invalid("cluster.max_iterations", "must be positive");
        }
        if self.cluster.runs == 0 {
            return invalid("cluster.runs", "must be positive");
        }
        if !self.cluster.convergence.is_finite() || self.cluster.convergence < 0.0 {
            return invalid("cluster.convergence", "must be a non-negative number");
        }
        Ok(())
    }
}
