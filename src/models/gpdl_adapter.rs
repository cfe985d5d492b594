//! Adapter-augmented generator.
//!
//! Wraps a [`Gpdl`] backbone and inserts one residual bottleneck
//! [`Adapter`] after each encoder stage. The intended workflow is the
//! parameter-efficient one: the backbone carries pre-trained weights and
//! stays frozen, the external trainer updates only the adapters, and the
//! adapters travel separately from the backbone (see
//! [`adapter_weights`](GpdlAdapter::adapter_weights)).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::adapter::{Adapter, AdapterError, AdapterWeights};
use crate::error::Result;
use crate::nn::{generation_init_weights, ParamKind, VisitParams};
use crate::Tensor;

use super::{Gpdl, ModelConfig};

/// A [`Gpdl`] with adapters inserted after every encoder stage.
pub struct GpdlAdapter {
    backbone: Gpdl,
    adapters: Vec<Adapter>,
}

impl GpdlAdapter {
    /// Create with backbone weights drawn from OS entropy.
    pub fn new(config: &ModelConfig) -> Self {
        let mut rng = StdRng::from_os_rng();
        Self::with_rng(config, &mut rng)
    }

    /// Create with a seed for reproducibility.
    pub fn with_seed(config: &ModelConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(config, &mut rng)
    }

    fn with_rng<R: Rng>(config: &ModelConfig, rng: &mut R) -> Self {
        let backbone = Gpdl::with_rng(config, rng);
        // Fresh adapters are exact identities, so the augmented model
        // starts out computing the same function as its backbone.
        let adapters = backbone
            .encoder_stages()
            .iter()
            .map(|stage| Adapter::new(stage.out_channels(), config.adapter_dim))
            .collect();
        Self { backbone, adapters }
    }

    /// Wrap an already-built (typically pre-trained) backbone.
    pub fn from_backbone(backbone: Gpdl) -> Self {
        let adapter_dim = backbone.config().adapter_dim;
        let adapters = backbone
            .encoder_stages()
            .iter()
            .map(|stage| Adapter::new(stage.out_channels(), adapter_dim))
            .collect();
        Self { backbone, adapters }
    }

    /// Forward pass: the backbone's contracting path with an adapter
    /// after each stage, then the backbone's expanding path and head.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.backbone.check_input(x)?;
        let mut t = x.clone();
        for (stage, adapter) in self.backbone.encoder_stages().iter().zip(&self.adapters) {
            t = stage.forward(&t)?;
            t = adapter.forward(&t)?;
        }
        self.backbone.decode(&t)
    }

    /// Re-initialize every sub-transformation, backbone and adapters
    /// alike, with the shared generation-style policy.
    pub fn generation_init_weights<R: Rng>(&mut self, rng: &mut R) {
        generation_init_weights(self, rng);
    }

    /// Initialize only the adapters, leaving the (frozen) backbone
    /// untouched.
    pub fn init_adapter_weights<R: Rng>(&mut self, rng: &mut R) {
        for adapter in &mut self.adapters {
            adapter.init_weights(rng);
        }
    }

    pub fn backbone(&self) -> &Gpdl {
        &self.backbone
    }

    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    pub fn adapters_mut(&mut self) -> &mut [Adapter] {
        &mut self.adapters
    }

    /// Total learned scalars, backbone included.
    pub fn num_parameters(&self) -> usize {
        self.backbone.num_parameters()
            + self.adapters.iter().map(Adapter::num_parameters).sum::<usize>()
    }

    /// Learned scalars the fine-tuning workflow actually updates: the
    /// adapters only.
    pub fn num_trainable_parameters(&self) -> usize {
        self.adapters.iter().map(Adapter::num_parameters).sum()
    }

    /// Snapshot all adapters, in encoder-stage order.
    pub fn adapter_weights(&self) -> Vec<AdapterWeights> {
        self.adapters.iter().map(AdapterWeights::from_adapter).collect()
    }

    /// Restore adapter snapshots produced by
    /// [`adapter_weights`](Self::adapter_weights). The count and every
    /// dimension must match.
    pub fn apply_adapter_weights(&mut self, weights: &[AdapterWeights]) -> std::result::Result<(), AdapterError> {
        if weights.len() != self.adapters.len() {
            return Err(AdapterError::Validation(format!(
                "adapter count mismatch: expected {}, got {}",
                self.adapters.len(),
                weights.len()
            )));
        }
        for (adapter, snapshot) in self.adapters.iter_mut().zip(weights) {
            snapshot.apply(adapter)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &ModelConfig {
        self.backbone.config()
    }
}

impl VisitParams for GpdlAdapter {
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32])) {
        self.backbone.visit_params(f);
        for adapter in &mut self.adapters {
            adapter.visit_params(f);
        }
    }
}
