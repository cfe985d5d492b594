//! Adapter weight persistence.
//!
//! Adapters are saved and loaded independently of the backbone they are
//! inserted into. This allows training adapters against a frozen
//! pre-trained backbone, shipping them without the backbone weights, and
//! switching between several adapters for the same backbone.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Adapter;

/// Adapter save/load errors.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Adapter validation error: {0}")]
    Validation(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },
}

/// Serializable snapshot of one adapter's learned state.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdapterWeights {
    /// Format version for future compatibility.
    version: String,
    /// Channel width at the insertion point.
    embed_dim: usize,
    /// Bottleneck width.
    adapter_dim: usize,
    /// Normalization scale `[embed_dim]`.
    norm_weight: Vec<f32>,
    /// Normalization shift `[embed_dim]`.
    norm_bias: Vec<f32>,
    /// Down-projection kernel `[adapter_dim * embed_dim]`.
    down_weight: Vec<f32>,
    /// Up-projection kernel `[embed_dim * adapter_dim]`.
    up_weight: Vec<f32>,
}

impl AdapterWeights {
    /// Current format version.
    const VERSION: &'static str = "1.0";

    /// Snapshot an adapter's weights.
    pub fn from_adapter(adapter: &Adapter) -> Self {
        Self {
            version: Self::VERSION.to_string(),
            embed_dim: adapter.embed_dim,
            adapter_dim: adapter.adapter_dim,
            norm_weight: adapter.group_norm.weight.to_vec(),
            norm_bias: adapter.group_norm.bias.to_vec(),
            down_weight: adapter.down_project.weight().iter().copied().collect(),
            up_weight: adapter.up_project.weight().iter().copied().collect(),
        }
    }

    /// Restore this snapshot into `adapter`.
    ///
    /// The target must have the same `embed_dim`/`adapter_dim`; every
    /// buffer length is validated before anything is written.
    pub fn apply(&self, adapter: &mut Adapter) -> Result<(), AdapterError> {
        if adapter.embed_dim != self.embed_dim || adapter.adapter_dim != self.adapter_dim {
            return Err(AdapterError::DimensionMismatch {
                expected: format!("embed {} / bottleneck {}", self.embed_dim, self.adapter_dim),
                actual: format!("embed {} / bottleneck {}", adapter.embed_dim, adapter.adapter_dim),
            });
        }

        let proj_len = self.embed_dim * self.adapter_dim;
        if self.norm_weight.len() != self.embed_dim || self.norm_bias.len() != self.embed_dim {
            return Err(AdapterError::Validation(format!(
                "norm affine size mismatch: expected {}, got {}/{}",
                self.embed_dim,
                self.norm_weight.len(),
                self.norm_bias.len()
            )));
        }
        if self.down_weight.len() != proj_len {
            return Err(AdapterError::Validation(format!(
                "down projection size mismatch: expected {proj_len}, got {}",
                self.down_weight.len()
            )));
        }
        if self.up_weight.len() != proj_len {
            return Err(AdapterError::Validation(format!(
                "up projection size mismatch: expected {proj_len}, got {}",
                self.up_weight.len()
            )));
        }

        for (dst, src) in adapter.group_norm.weight.iter_mut().zip(&self.norm_weight) {
            *dst = *src;
        }
        for (dst, src) in adapter.group_norm.bias.iter_mut().zip(&self.norm_bias) {
            *dst = *src;
        }
        for (dst, src) in adapter.down_project.weight_mut().iter_mut().zip(&self.down_weight) {
            *dst = *src;
        }
        for (dst, src) in adapter.up_project.weight_mut().iter_mut().zip(&self.up_weight) {
            *dst = *src;
        }

        Ok(())
    }

    /// Save to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AdapterError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load from a JSON file, rejecting unknown format versions.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AdapterError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let weights: AdapterWeights = serde_json::from_reader(reader)?;

        if weights.version != Self::VERSION {
            return Err(AdapterError::Validation(format!(
                "unsupported adapter format version: {} (expected {})",
                weights.version,
                Self::VERSION
            )));
        }

        Ok(weights)
    }

    /// Snapshot metadata without the weight buffers.
    pub fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata {
            version: self.version.clone(),
            embed_dim: self.embed_dim,
            adapter_dim: self.adapter_dim,
            num_params: self.norm_weight.len()
                + self.norm_bias.len()
                + self.down_weight.len()
                + self.up_weight.len(),
        }
    }
}

/// Adapter snapshot metadata.
#[derive(Debug, Clone)]
pub struct AdapterMetadata {
    pub version: String,
    pub embed_dim: usize,
    pub adapter_dim: usize,
    pub num_params: usize,
}

/// Save an adapter's weights to a JSON file.
pub fn save_adapter<P: AsRef<Path>>(adapter: &Adapter, path: P) -> Result<(), AdapterError> {
    AdapterWeights::from_adapter(adapter).save(path)
}

/// Load adapter weights from a JSON file into a freshly built adapter.
pub fn load_adapter<P: AsRef<Path>>(path: P) -> Result<Adapter, AdapterError> {
    let weights = AdapterWeights::load(path)?;
    let mut adapter = Adapter::new(weights.embed_dim, weights.adapter_dim);
    weights.apply(&mut adapter)?;
    Ok(adapter)
}
