//! Base generator backbone.
//!
//! A compact encoder–decoder: three stride-2 convolution stages contract
//! the layout features by 8× while widening channels, three
//! nearest-neighbor upsample stages restore the resolution, and a 1×1
//! head projects to the output channel count. Every stage is convolution
//! → channel normalization → leaky ReLU.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{EnrutarError, Result};
use crate::nn::{
    generation_init_weights, leaky_relu, upsample_nearest, ChannelNorm, Conv2d, ParamKind,
    VisitParams,
};
use crate::Tensor;

use super::ModelConfig;

/// Negative slope shared by all backbone activations.
pub(crate) const LEAKY_SLOPE: f32 = 0.2;

/// One contracting stage: stride-2 3×3 convolution, normalization,
/// leaky ReLU. Halves the spatial size.
pub struct EncoderStage {
    conv: Conv2d,
    norm: ChannelNorm,
}

impl EncoderStage {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            conv: Conv2d::new(in_channels, out_channels, 3, 2, 1, true),
            norm: ChannelNorm::new(out_channels),
        }
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        Ok(leaky_relu(self.norm.forward(&self.conv.forward(x)?)?, LEAKY_SLOPE))
    }

    /// Channel width this stage produces.
    pub fn out_channels(&self) -> usize {
        self.conv.out_channels()
    }

    pub fn num_parameters(&self) -> usize {
        self.conv.num_parameters() + self.norm.num_parameters()
    }
}

impl VisitParams for EncoderStage {
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32])) {
        self.conv.visit_params(f);
        self.norm.visit_params(f);
    }
}

/// One expanding stage: nearest-neighbor 2× upsample, 3×3 convolution,
/// normalization, leaky ReLU. Doubles the spatial size.
pub struct DecoderStage {
    conv: Conv2d,
    norm: ChannelNorm,
}

impl DecoderStage {
    pub fn new(in_channels: usize, out_channels: usize) -> Self {
        Self {
            conv: Conv2d::new(in_channels, out_channels, 3, 1, 1, true),
            norm: ChannelNorm::new(out_channels),
        }
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let up = upsample_nearest(x, 2);
        Ok(leaky_relu(self.norm.forward(&self.conv.forward(&up)?)?, LEAKY_SLOPE))
    }

    pub fn num_parameters(&self) -> usize {
        self.conv.num_parameters() + self.norm.num_parameters()
    }
}

impl VisitParams for DecoderStage {
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32])) {
        self.conv.visit_params(f);
        self.norm.visit_params(f);
    }
}

/// Base generator: layout features in, per-pixel prediction map out.
pub struct Gpdl {
    config: ModelConfig,
    encoder: Vec<EncoderStage>,
    decoder: Vec<DecoderStage>,
    head: Conv2d,
}

impl Gpdl {
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
        let head = Conv2d::new(widths[0], config.out_channels, 1, 1, 0, true);

        let mut model = Self { config: config.clone(), encoder, decoder, head };
        model.generation_init_weights(rng);
        model
    }

    /// Forward pass: `[B, in_channels, H, W] → [B, out_channels, H, W]`
    /// for `H`, `W` divisible by [`Self::SPATIAL_FACTOR`].
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let t = self.encode(x)?;
        self.decode(&t)
    }

    /// Run the contracting half only.
    pub fn encode(&self, x: &Tensor) -> Result<Tensor> {
        self.check_input(x)?;
        let mut t = x.clone();
        for stage in &self.encoder {
            t = stage.forward(&t)?;
        }
        Ok(t)
    }

    /// Run the expanding half and the output head.
    pub fn decode(&self, x: &Tensor) -> Result<Tensor> {
        let mut t = x.clone();
        for stage in &self.decoder {
            t = stage.forward(&t)?;
        }
        self.head.forward(&t)
    }

    pub(crate) fn check_input(&self, x: &Tensor) -> Result<()> {
        let (b, c, h, w) = x.dim();
        let factor = Self::SPATIAL_FACTOR;
        if c != self.config.in_channels || h % factor != 0 || w % factor != 0 || h == 0 || w == 0 {
            let round_up = |d: usize| d.div_ceil(factor).max(1) * factor;
            return Err(EnrutarError::shape_mismatch(
                vec![b, self.config.in_channels, round_up(h), round_up(w)],
                vec![b, c, h, w],
            ));
        }
        Ok(())
    }

    /// The contracting stages, in order. The adapter-augmented variant
    /// interleaves its adapters with these.
    pub fn encoder_stages(&self) -> &[EncoderStage] {
        &self.encoder
    }

    /// Re-apply the shared generation-style initialization to every
    /// sub-transformation.
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

impl VisitParams for Gpdl {
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
            *v = ((i % 13) as f32 - 6.0) * 0.1;
        }
        x
    }

    #[test]
    fn test_forward_restores_spatial_size() {
        let model = Gpdl::with_seed(&small_config(), 42);
        let x = ramp(2, 3, 16, 24);
        let y = model.forward(&x).unwrap();
        assert_eq!(y.dim(), (2, 1, 16, 24));
    }

    #[test]
    fn test_encode_contracts_by_spatial_factor() {
        let model = Gpdl::with_seed(&small_config(), 42);
        let x = ramp(1, 3, 16, 16);
        let t = model.encode(&x).unwrap();
        assert_eq!(t.dim(), (1, 16, 2, 2));
    }

    #[test]
    fn test_indivisible_spatial_size_is_rejected() {
        let model = Gpdl::with_seed(&small_config(), 42);
        let x = ramp(1, 3, 12, 16);
        assert!(matches!(
            model.forward(&x),
            Err(EnrutarError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_channel_count_is_rejected() {
        let model = Gpdl::with_seed(&small_config(), 42);
        let x = ramp(1, 4, 16, 16);
        assert!(model.forward(&x).is_err());
    }

    #[test]
    fn test_seeded_construction_is_reproducible() {
        let config = small_config();
        let a = Gpdl::with_seed(&config, 7);
        let b = Gpdl::with_seed(&config, 7);
        let x = ramp(1, 3, 8, 8);
        assert_eq!(a.forward(&x).unwrap(), b.forward(&x).unwrap());
    }

    #[test]
    fn test_output_is_finite() {
        let model = Gpdl::with_seed(&small_config(), 3);
        let x = ramp(1, 3, 8, 8);
        let y = model.forward(&x).unwrap();
        assert!(y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_num_parameters_matches_stage_sum() {
        let model = Gpdl::with_seed(&small_config(), 1);
        let enc: usize = model.encoder.iter().map(EncoderStage::num_parameters).sum();
        let dec: usize = model.decoder.iter().map(DecoderStage::num_parameters).sum();
        assert_eq!(model.num_parameters(), enc + dec + model.head.num_parameters());
        assert!(model.num_parameters() > 0);
    }
}
