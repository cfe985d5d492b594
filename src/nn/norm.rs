//! Single-group group normalization.

use ndarray::{Array1, Axis};

use crate::error::{EnrutarError, Result};
use crate::nn::init::{ParamKind, VisitParams};
use crate::Tensor;

/// Group normalization with one group spanning all channels.
///
/// Statistics (mean, variance) are computed per sample over the whole
/// `C×H×W` block; a learned per-channel affine is applied afterwards.
/// With weight 1 and bias 0 the output of each sample has zero mean and
/// unit variance.
pub struct ChannelNorm {
    /// Per-channel scale, initialized to ones.
    pub weight: Array1<f32>,
    /// Per-channel shift, initialized to zeros.
    pub bias: Array1<f32>,
    eps: f32,
}

impl ChannelNorm {
    const DEFAULT_EPS: f32 = 1e-5;

    /// Create a normalization layer over `num_channels` channels.
    pub fn new(num_channels: usize) -> Self {
        Self::with_eps(num_channels, Self::DEFAULT_EPS)
    }

    /// Create with an explicit numerical-stability epsilon.
    pub fn with_eps(num_channels: usize, eps: f32) -> Self {
        Self {
            weight: Array1::ones(num_channels),
            bias: Array1::zeros(num_channels),
            eps,
        }
    }

    /// Forward pass over `[B, C, H, W]`; output has the same shape.
    ///
    /// Fails with [`EnrutarError::ShapeMismatch`] when `C` differs from
    /// the channel count the layer was built for.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (b, c, h, w) = x.dim();
        if c != self.weight.len() {
            return Err(EnrutarError::shape_mismatch(
                vec![b, self.weight.len(), h, w],
                vec![b, c, h, w],
            ));
        }

        let mut y = Tensor::zeros((b, c, h, w));
        let len = (c * h * w) as f32;

        for n in 0..b {
            let sample = x.index_axis(Axis(0), n);
            let mean = sample.sum() / len;
            let var = sample.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / len;
            let inv_std = 1.0 / (var + self.eps).sqrt();

            for ch in 0..c {
                let scale = self.weight[ch];
                let shift = self.bias[ch];
                for iy in 0..h {
                    for ix in 0..w {
                        y[[n, ch, iy, ix]] =
                            (x[[n, ch, iy, ix]] - mean) * inv_std * scale + shift;
                    }
                }
            }
        }

        Ok(y)
    }

    pub fn num_channels(&self) -> usize {
        self.weight.len()
    }

    /// Number of learned scalars.
    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

impl VisitParams for ChannelNorm {
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32])) {
        f(
            ParamKind::NormWeight,
            self.weight.as_slice_mut().expect("norm weight is contiguous"),
        );
        f(ParamKind::NormBias, self.bias.as_slice_mut().expect("norm bias is contiguous"));
    }
}
