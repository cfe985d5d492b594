//! Congestion prediction network.
//!
//! Shares the backbone's stage vocabulary but commits to the prediction
//! task: whatever the input feature width, the output is a single-channel
//! congestion probability map squashed through a sigmoid.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{EnrutarError, Result};
use crate::nn::{generation_init_weights, sigmoid, Conv2d, ParamKind, VisitParams};
use crate::Tensor;

use super::gpdl::{DecoderStage, EncoderStage};
use super::ModelConfig;

/// Predicts a per-pixel congestion probability map from layout features.
pub struct CongestionPredictionNet {
    config: ModelConfig,
    encoder: Vec<EncoderStage>,
    decoder: Vec<DecoderStage>,
    head: Conv2d,
}

impl CongestionPredictionNet {
    /// Spatial contraction factor of the encoder; input height and width
    /// must be divisible by this.
    pub const SPATIAL_FACTOR: usize = 8;

    /// Create with weights drawn from OS entropy.
    pub fn new(config: &ModelConfig) -> Self {
        let mut rng = StdRng::from_os_rng();
        Self::with_rng(config, &mut rng)
    }

    /// Create with a seed for reproducibility.
    pub fn with_seed(config: &ModelConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(config, &mut rng)
    }

    pub(crate) fn with_rng<R: Rng>(config: &ModelConfig, rng: &mut R) -> Self {
        let c0 = config.base_channels;
        let widths = [c0, c0 * 2, c0 * 4];

        let encoder = vec![
            EncoderStage::new(config.in_channels, widths[0]),
            EncoderStage::new(widths[0], widths[1]),
            EncoderStage::new(widths[1], widths[2]),
        ];
        let decoder = vec![
            DecoderStage::new(widths[2], widths[1]),
            DecoderStage::new(widths[1], widths[0]),
            DecoderStage::new(widths[0], widths[0]),
        ];
        let head = Conv2d::new(widths[0], 1, 1, 1, 0, true);

        let mut model = Self { config: config.clone(), encoder, decoder, head };
        model.generation_init_weights(rng);
        model
    }

    /// Forward pass: `[B, in_channels, H, W] → [B, 1, H, W]`, every value
    /// in `(0, 1)`.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (b, c, h, w) = x.dim();
        let factor = Self::SPATIAL_FACTOR;
        if c != self.config.in_channels || h % factor != 0 || w % factor != 0 || h == 0 || w == 0 {
            let round_up = |d: usize| d.div_ceil(factor).max(1) * factor;
            return Err(EnrutarError::shape_mismatch(
                vec![b, self.config.in_channels, round_up(h), round_up(w)],
                vec![b, c, h, w],
            ));
        }

        let mut t = x.clone();
        for stage in &self.encoder {
            t = stage.forward(&t)?;
        }
        for stage in &self.decoder {
            t = stage.forward(&t)?;
        }
        Ok(sigmoid(self.head.forward(&t)?))
    }

    /// Re-apply the shared generation-style initialization.
    pub fn generation_init_weights<R: Rng>(&mut self, rng: &mut R) {
        generation_init_weights(self, rng);
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Number of learned scalars.
    pub fn num_parameters(&self) -> usize {
        let enc: usize = self.encoder.iter().map(EncoderStage::num_parameters).sum();
        let dec: usize = self.decoder.iter().map(DecoderStage::num_parameters).sum();
        enc + dec + self.head.num_parameters()
    }
}

impl VisitParams for CongestionPredictionNet {
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32])) {
        for stage in &mut self.encoder {
            stage.visit_params(f);
        }
        for stage in &mut self.decoder {
            stage.visit_params(f);
        }
        self.head.visit_params(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ModelConfig {
        ModelConfig { in_channels: 3, out_channels: 1, base_channels: 4, adapter_dim: 2 }
    }

    fn ramp(b: usize, c: usize, h: usize, w: usize) -> Tensor {
        let mut x = Tensor::zeros((b, c, h, w));
        for (i, v) in x.iter_mut().enumerate() {
            *v = ((i % 7) as f32 - 3.0) * 0.2;
        }
        x
    }

    #[test]
    fn test_forward_produces_single_channel_map() {
        let model = CongestionPredictionNet::with_seed(&small_config(), 12);
        let x = ramp(2, 3, 16, 16);
        let y = model.forward(&x).unwrap();
        assert_eq!(y.dim(), (2, 1, 16, 16));
    }

    #[test]
    fn test_output_is_a_probability_map() {
        let model = CongestionPredictionNet::with_seed(&small_config(), 12);
        let x = ramp(1, 3, 8, 8);
        let y = model.forward(&x).unwrap();
        assert!(y.iter().all(|&v| v > 0.0 && v < 1.0));
    }

    #[test]
    fn test_indivisible_spatial_size_is_rejected() {
        let model = CongestionPredictionNet::with_seed(&small_config(), 12);
        let x = ramp(1, 3, 10, 16);
        assert!(model.forward(&x).is_err());
    }

    #[test]
    fn test_seeded_construction_is_reproducible() {
        let config = small_config();
        let a = CongestionPredictionNet::with_seed(&config, 5);
        let b = CongestionPredictionNet::with_seed(&config, 5);
        let x = ramp(1, 3, 8, 8);
        assert_eq!(a.forward(&x).unwrap(), b.forward(&x).unwrap());
    }
}
