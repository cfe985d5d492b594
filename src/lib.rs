//! Neural building blocks for routing-congestion prediction on circuit layouts.
//!
//! The crate provides the model-side pieces an external training loop
//! composes:
//!
//! - [`nn`]: layer primitives (2-D convolution, single-group normalization,
//!   activations, weight initialization)
//! - [`adapter`]: a residual bottleneck [`Adapter`] for parameter-efficient
//!   fine-tuning of a frozen backbone, plus standalone adapter persistence
//! - [`models`]: the three model variants ([`models::Gpdl`],
//!   [`models::GpdlAdapter`], [`models::CongestionPredictionNet`]) and the
//!   [`build_model`] factory over [`ModelKind`]
//!
//! Activations and feature maps are plain `ndarray` tensors in `[batch,
//! channel, height, width]` layout (see [`Tensor`]). Training, gradients,
//! and data loading live outside this crate; parameters are exposed to the
//! trainer through [`nn::VisitParams`].
//!
//! # Example
//!
//! ```
//! use enrutar::{build_model, ModelConfig, ModelKind, Tensor};
//!
//! let config = ModelConfig::default();
//! let model = build_model(ModelKind::GpdlAdapter, &config, Some(42)).unwrap();
//!
//! let x = Tensor::zeros((1, config.in_channels, 16, 16));
//! let y = model.forward(&x).unwrap();
//! assert_eq!(y.dim(), (1, config.out_channels, 16, 16));
//! ```

pub mod adapter;
pub mod error;
pub mod models;
pub mod nn;

pub use adapter::{Adapter, AdapterConfig};
pub use error::{EnrutarError, Result};
pub use models::{build_model, Model, ModelConfig, ModelKind};

/// Activation tensor in `[batch, channel, height, width]` layout.
pub type Tensor = ndarray::Array4<f32>;
