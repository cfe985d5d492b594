//! Residual bottleneck adapter.
//!
//! An [`Adapter`] injects a small trainable transformation into a larger
//! frozen or pre-trained network: normalize, project the channel vector
//! down to a narrow bottleneck, activate, project back up, and add the
//! result to the original input. Because the transformation sits on a
//! skip connection it only has to learn a deviation from identity, and a
//! freshly constructed adapter (up-projection at zero) *is* the identity.
//!
//! Adapters can be saved and loaded independently of the backbone they
//! are inserted into; see [`io`].

mod io;

pub use io::{load_adapter, save_adapter, AdapterError, AdapterMetadata, AdapterWeights};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::nn::{
    generation_init_weights, leaky_relu, ChannelNorm, Conv2d, ParamKind, VisitParams,
};
use crate::Tensor;

/// Adapter hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Channel width of the surrounding network at the insertion point;
    /// adapter input and output both have this many channels.
    pub embed_dim: usize,
    /// Bottleneck width of the down-projected representation. Intended to
    /// be at most `embed_dim`, though nothing enforces it.
    pub adapter_dim: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self { embed_dim: 64, adapter_dim: 16 }
    }
}

/// Residual bottleneck adapter over `[B, embed_dim, H, W]` feature maps.
pub struct Adapter {
    group_norm: ChannelNorm,
    down_project: Conv2d,
    up_project: Conv2d,
    embed_dim: usize,
    adapter_dim: usize,
}

impl Adapter {
    /// Negative slope of the bottleneck activation.
    const LEAKY_SLOPE: f32 = 0.2;

    /// Create an adapter.
    ///
    /// The up-projection starts at zero, so the fresh adapter maps every
    /// input to itself exactly. An initialization policy applied later
    /// (see [`Adapter::init_weights`]) may trade that away.
    pub fn new(embed_dim: usize, adapter_dim: usize) -> Self {
        let mut up_project = Conv2d::pointwise(adapter_dim, embed_dim);
        up_project.weight_mut().fill(0.0);

        Self {
            group_norm: ChannelNorm::new(embed_dim),
            down_project: Conv2d::pointwise(embed_dim, adapter_dim),
            up_project,
            embed_dim,
            adapter_dim,
        }
    }

    pub fn from_config(config: &AdapterConfig) -> Self {
        Self::new(config.embed_dim, config.adapter_dim)
    }

    /// Forward pass.
    ///
    /// For `z` of shape `[B, embed_dim, H, W]`:
    ///
    /// 1. normalize `z` across the full channel group
    /// 2. down-project to `adapter_dim` channels (1×1, no bias)
    /// 3. leaky ReLU, slope 0.2
    /// 4. up-project back to `embed_dim` channels (1×1, no bias)
    /// 5. add `z` and return
    ///
    /// Output shape equals input shape. A wrong channel count surfaces as
    /// the underlying projection/normalization layer's shape error; the
    /// adapter itself adds no validation.
    pub fn forward(&self, z: &Tensor) -> Result<Tensor> {
        let normalized_z = self.group_norm.forward(z)?;
        let h = leaky_relu(self.down_project.forward(&normalized_z)?, Self::LEAKY_SLOPE);
        Ok(self.up_project.forward(&h)? + z)
    }

    /// Apply the shared generation-style initialization to all three
    /// sub-transformations.
    pub fn init_weights<R: Rng>(&mut self, rng: &mut R) {
        generation_init_weights(self, rng);
    }

    pub fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    pub fn adapter_dim(&self) -> usize {
        self.adapter_dim
    }

    /// Number of learned scalars across norm and both projections.
    pub fn num_parameters(&self) -> usize {
        self.group_norm.num_parameters()
            + self.down_project.num_parameters()
            + self.up_project.num_parameters()
    }

    pub fn group_norm(&self) -> &ChannelNorm {
        &self.group_norm
    }

    pub fn group_norm_mut(&mut self) -> &mut ChannelNorm {
        &mut self.group_norm
    }

    pub fn down_project(&self) -> &Conv2d {
        &self.down_project
    }

    pub fn down_project_mut(&mut self) -> &mut Conv2d {
        &mut self.down_project
    }

    pub fn up_project(&self) -> &Conv2d {
        &self.up_project
    }

    pub fn up_project_mut(&mut self) -> &mut Conv2d {
        &mut self.up_project
    }
}

impl VisitParams for Adapter {
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32])) {
        self.group_norm.visit_params(f);
        self.down_project.visit_params(f);
        self.up_project.visit_params(f);
    }
}
