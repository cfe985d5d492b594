//! 2-D convolution over `[B, C, H, W]` feature maps.

use ndarray::{Array1, Array4};

use crate::error::{EnrutarError, Result};
use crate::nn::init::{ParamKind, VisitParams};
use crate::Tensor;

/// 2-D convolution layer.
///
/// Weight layout is `[out_channels, in_channels, kernel, kernel]`; the
/// optional bias is one value per output channel. Padding is zero padding
/// applied symmetrically on both spatial axes.
pub struct Conv2d {
    /// Kernel weights `[out_channels, in_channels, kernel, kernel]`.
    weight: Array4<f32>,
    /// Per-output-channel bias, if the layer carries one.
    bias: Option<Array1<f32>>,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
}

impl Conv2d {
    /// Create a convolution layer.
    ///
    /// Weights start at deterministic small values (a fixed sinusoid
    /// pattern) so a freshly built layer is usable in tests without a
    /// seed; the owning model's init pass overwrites them.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        bias: bool,
    ) -> Self {
        let weight_data: Vec<f32> = (0..out_channels * in_channels * kernel_size * kernel_size)
            .map(|i| (i as f32 * 0.1).sin() * 0.01)
            .collect();
        let weight =
            Array4::from_shape_vec((out_channels, in_channels, kernel_size, kernel_size), weight_data)
                .expect("weight buffer matches its declared shape");

        Self {
            weight,
            bias: bias.then(|| Array1::zeros(out_channels)),
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
        }
    }

    /// A 1×1 convolution with stride 1, no padding and no bias: a learned
    /// linear map applied independently at each spatial position, with no
    /// spatial mixing.
    pub fn pointwise(in_channels: usize, out_channels: usize) -> Self {
        Self::new(in_channels, out_channels, 1, 1, 0, false)
    }

    /// Forward pass.
    ///
    /// Input `[B, in_channels, H, W]`; output `[B, out_channels, H', W']`
    /// with `H' = (H + 2·padding − kernel)/stride + 1` (floor), same for
    /// `W'`. Fails with [`EnrutarError::ShapeMismatch`] when the channel
    /// count is wrong or the padded input is smaller than the kernel.
    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (b, c, h, w) = x.dim();
        if c != self.in_channels {
            return Err(EnrutarError::shape_mismatch(
                vec![b, self.in_channels, h, w],
                vec![b, c, h, w],
            ));
        }
        if h + 2 * self.padding < self.kernel_size || w + 2 * self.padding < self.kernel_size {
            return Err(EnrutarError::shape_mismatch(
                vec![b, c, self.kernel_size, self.kernel_size],
                vec![b, c, h, w],
            ));
        }

        let oh = (h + 2 * self.padding - self.kernel_size) / self.stride + 1;
        let ow = (w + 2 * self.padding - self.kernel_size) / self.stride + 1;
        let mut y = Tensor::zeros((b, self.out_channels, oh, ow));

        for n in 0..b {
            for oc in 0..self.out_channels {
                let bias = self.bias.as_ref().map_or(0.0, |bv| bv[oc]);
                for oy in 0..oh {
                    for ox in 0..ow {
                        let mut acc = bias;
                        for ic in 0..self.in_channels {
                            for ky in 0..self.kernel_size {
                                // Padded coordinate; values outside the input are zero.
                                let iy = oy * self.stride + ky;
                                if iy < self.padding || iy >= h + self.padding {
                                    continue;
                                }
                                for kx in 0..self.kernel_size {
                                    let ix = ox * self.stride + kx;
                                    if ix < self.padding || ix >= w + self.padding {
                                        continue;
                                    }
                                    acc += x[[n, ic, iy - self.padding, ix - self.padding]]
                                        * self.weight[[oc, ic, ky, kx]];
                                }
                            }
                        }
                        y[[n, oc, oy, ox]] = acc;
                    }
                }
            }
        }

        Ok(y)
    }

    /// Kernel weights.
    pub fn weight(&self) -> &Array4<f32> {
        &self.weight
    }

    /// Mutable kernel weights, for the external trainer.
    pub fn weight_mut(&mut self) -> &mut Array4<f32> {
        &mut self.weight
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Number of learned scalars.
    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.as_ref().map_or(0, |b| b.len())
    }
}

impl VisitParams for Conv2d {
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32])) {
        f(
            ParamKind::ConvWeight,
            self.weight.as_slice_mut().expect("conv weight is contiguous"),
        );
        if let Some(bias) = self.bias.as_mut() {
            f(ParamKind::ConvBias, bias.as_slice_mut().expect("conv bias is contiguous"));
        }
    }
}
