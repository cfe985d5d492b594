//! Elementwise activations.
//!
//! Each function consumes its input and mutates the buffer in place; the
//! numeric result is the only observable effect.

use crate::Tensor;

/// Leaky rectified linear unit: `x` for `x ≥ 0`, `negative_slope · x`
/// otherwise.
pub fn leaky_relu(mut x: Tensor, negative_slope: f32) -> Tensor {
    x.mapv_inplace(|v| if v >= 0.0 { v } else { v * negative_slope });
    x
}

/// Rectified linear unit.
pub fn relu(mut x: Tensor) -> Tensor {
    x.mapv_inplace(|v| v.max(0.0));
    x
}

/// Logistic sigmoid, `1 / (1 + e^{−x})`.
pub fn sigmoid(mut x: Tensor) -> Tensor {
    x.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp()));
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_leaky_relu_scales_negatives_only() {
        let mut x = Tensor::zeros((1, 1, 1, 3));
        x[[0, 0, 0, 0]] = -2.0;
        x[[0, 0, 0, 1]] = 0.0;
        x[[0, 0, 0, 2]] = 3.0;

        let y = leaky_relu(x, 0.2);
        assert_abs_diff_eq!(y[[0, 0, 0, 0]], -0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(y[[0, 0, 0, 1]], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y[[0, 0, 0, 2]], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_relu_zeroes_negatives() {
        let x = Tensor::from_elem((1, 1, 2, 2), -1.5);
        let y = relu(x);
        assert!(y.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sigmoid_output_is_in_open_unit_interval() {
        let mut x = Tensor::zeros((1, 1, 1, 3));
        x[[0, 0, 0, 0]] = -10.0;
        x[[0, 0, 0, 2]] = 10.0;

        let y = sigmoid(x);
        assert!(y.iter().all(|&v| v > 0.0 && v < 1.0));
        assert_abs_diff_eq!(y[[0, 0, 0, 1]], 0.5, epsilon = 1e-6);
    }
}
