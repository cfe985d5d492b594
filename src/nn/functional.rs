//! Parameter-free tensor functions.

use crate::Tensor;

/// Nearest-neighbor spatial upsampling by an integer factor.
///
/// `[B, C, H, W]` becomes `[B, C, H·factor, W·factor]`; each input pixel
/// is replicated into a `factor × factor` block.
pub fn upsample_nearest(x: &Tensor, factor: usize) -> Tensor {
    let (b, c, h, w) = x.dim();
    let mut y = Tensor::zeros((b, c, h * factor, w * factor));
    for n in 0..b {
        for ch in 0..c {
            for iy in 0..h {
                for ix in 0..w {
                    let v = x[[n, ch, iy, ix]];
                    for dy in 0..factor {
                        for dx in 0..factor {
                            y[[n, ch, iy * factor + dy, ix * factor + dx]] = v;
                        }
                    }
                }
            }
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsample_doubles_spatial_dims() {
        let x = Tensor::zeros((2, 3, 4, 5));
        let y = upsample_nearest(&x, 2);
        assert_eq!(y.dim(), (2, 3, 8, 10));
    }

    #[test]
    fn test_upsample_replicates_pixels() {
        let mut x = Tensor::zeros((1, 1, 2, 2));
        x[[0, 0, 0, 0]] = 1.0;
        x[[0, 0, 1, 1]] = 4.0;

        let y = upsample_nearest(&x, 2);
        assert_eq!(y[[0, 0, 0, 0]], 1.0);
        assert_eq!(y[[0, 0, 1, 1]], 1.0);
        assert_eq!(y[[0, 0, 2, 2]], 4.0);
        assert_eq!(y[[0, 0, 3, 3]], 4.0);
        assert_eq!(y[[0, 0, 0, 2]], 0.0);
    }

    #[test]
    fn test_upsample_factor_one_is_identity() {
        let x = Tensor::from_elem((1, 2, 3, 3), 0.25);
        let y = upsample_nearest(&x, 1);
        assert_eq!(x, y);
    }
}
