//! Model variants and their registry.
//!
//! Three constructible variants, named by [`ModelKind`] and built through
//! [`build_model`]:
//!
//! - [`Gpdl`]: the base generator
//! - [`GpdlAdapter`]: the generator with residual bottleneck adapters
//!   after each encoder stage, for parameter-efficient fine-tuning
//! - [`CongestionPredictionNet`]: the prediction network with a sigmoid
//!   congestion-map head
//!
//! The variant set is small and fixed, so the registry is an enum with
//! exhaustive dispatch rather than any dynamic lookup.

mod gpdl;
mod gpdl_adapter;
mod prediction;

pub use gpdl::{DecoderStage, EncoderStage, Gpdl};
pub use gpdl_adapter::GpdlAdapter;
pub use prediction::CongestionPredictionNet;

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EnrutarError, Result};
use crate::nn::{ParamKind, VisitParams};
use crate::Tensor;

/// Hyperparameters shared by all model variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Channel count of the layout feature input.
    pub in_channels: usize,
    /// Channel count of the generator output.
    pub out_channels: usize,
    /// Channel width of the first encoder stage; later stages double it.
    pub base_channels: usize,
    /// Bottleneck width of the adapters in the adapter-augmented variant.
    pub adapter_dim: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { in_channels: 3, out_channels: 1, base_channels: 32, adapter_dim: 16 }
    }
}

impl ModelConfig {
    /// Check every field before construction.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("in_channels", self.in_channels, "Layout features need at least one input channel"),
            ("out_channels", self.out_channels, "The generator needs at least one output channel"),
            ("base_channels", self.base_channels, "Use a small power of two such as 32"),
            ("adapter_dim", self.adapter_dim, "Use a small positive bottleneck width such as 16"),
        ];
        for (field, value, suggestion) in positive {
            if value == 0 {
                return Err(EnrutarError::ConfigValue {
                    field: field.to_string(),
                    message: "must be at least 1".to_string(),
                    suggestion: suggestion.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// The fixed set of constructible model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Base generator.
    Gpdl,
    /// Generator with residual bottleneck adapters.
    GpdlAdapter,
    /// Congestion prediction network.
    CongestionPrediction,
}

impl ModelKind {
    /// All variants, in registry order.
    pub const ALL: [ModelKind; 3] =
        [ModelKind::Gpdl, ModelKind::GpdlAdapter, ModelKind::CongestionPrediction];

    /// The name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Gpdl => "gpdl",
            ModelKind::GpdlAdapter => "gpdl_adapter",
            ModelKind::CongestionPrediction => "congestion_prediction",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = EnrutarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gpdl" => Ok(ModelKind::Gpdl),
            "gpdl_adapter" => Ok(ModelKind::GpdlAdapter),
            "congestion_prediction" => Ok(ModelKind::CongestionPrediction),
            other => Err(EnrutarError::ConfigValue {
                field: "model".to_string(),
                message: format!("unknown model kind '{other}'"),
                suggestion: "Use one of: gpdl, gpdl_adapter, congestion_prediction".to_string(),
            }),
        }
    }
}

/// A constructed model variant.
pub enum Model {
    Gpdl(Gpdl),
    GpdlAdapter(GpdlAdapter),
    CongestionPrediction(CongestionPredictionNet),
}

impl Model {
    /// Which variant this is.
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Gpdl(_) => ModelKind::Gpdl,
            Model::GpdlAdapter(_) => ModelKind::GpdlAdapter,
            Model::CongestionPrediction(_) => ModelKind::CongestionPrediction,
        }
    }

    /// Forward pass of the underlying variant.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        match self {
            Model::Gpdl(m) => m.forward(x),
            Model::GpdlAdapter(m) => m.forward(x),
            Model::CongestionPrediction(m) => m.forward(x),
        }
    }

    /// Re-apply the shared generation-style initialization.
    pub fn init_weights<R: Rng>(&mut self, rng: &mut R) {
        match self {
            Model::Gpdl(m) => m.generation_init_weights(rng),
            Model::GpdlAdapter(m) => m.generation_init_weights(rng),
            Model::CongestionPrediction(m) => m.generation_init_weights(rng),
        }
    }

    /// Number of learned scalars.
    pub fn num_parameters(&self) -> usize {
        match self {
            Model::Gpdl(m) => m.num_parameters(),
            Model::GpdlAdapter(m) => m.num_parameters(),
            Model::CongestionPrediction(m) => m.num_parameters(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        match self {
            Model::Gpdl(m) => m.config(),
            Model::GpdlAdapter(m) => m.config(),
            Model::CongestionPrediction(m) => m.config(),
        }
    }
}

impl VisitParams for Model {
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32])) {
        match self {
            Model::Gpdl(m) => m.visit_params(f),
            Model::GpdlAdapter(m) => m.visit_params(f),
            Model::CongestionPrediction(m) => m.visit_params(f),
        }
    }
}

/// Construct the requested variant with caller-supplied hyperparameters.
///
/// With `seed` the construction is reproducible; without it the weights
/// are drawn from OS entropy.
pub fn build_model(kind: ModelKind, config: &ModelConfig, seed: Option<u64>) -> Result<Model> {
    config.validate()?;
    let model = match kind {
        ModelKind::Gpdl => Model::Gpdl(match seed {
            Some(s) => Gpdl::with_seed(config, s),
            None => Gpdl::new(config),
        }),
        ModelKind::GpdlAdapter => Model::GpdlAdapter(match seed {
            Some(s) => GpdlAdapter::with_seed(config, s),
            None => GpdlAdapter::new(config),
        }),
        ModelKind::CongestionPrediction => Model::CongestionPrediction(match seed {
            Some(s) => CongestionPredictionNet::with_seed(config, s),
            None => CongestionPredictionNet::new(config),
        }),
    };
    Ok(model)
}
