//! Error types with actionable diagnostics.
//!
//! Every variant carries enough context to resolve the problem without
//! consulting external documentation.

use thiserror::Error;

/// Result type alias for enrutar operations.
pub type Result<T> = std::result::Result<T, EnrutarError>;

/// Errors raised by layer forward passes and model construction.
#[derive(Error, Debug)]
pub enum EnrutarError {
    /// Input tensor does not match the shape contract of a layer.
    #[error("Tensor shape mismatch: expected {expected:?}, got {actual:?}\n  → Check the channel count and spatial size the layer was built for")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    /// A hyperparameter value is invalid.
    #[error("Invalid configuration value for '{field}': {message}\n  → {suggestion}")]
    ConfigValue { field: String, message: String, suggestion: String },
}

impl EnrutarError {
    /// Shorthand for a shape-mismatch error.
    pub fn shape_mismatch(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        Self::ShapeMismatch { expected, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message_names_both_shapes() {
        let err = EnrutarError::shape_mismatch(vec![1, 64, 8, 8], vec![1, 32, 8, 8]);
        let msg = err.to_string();
        assert!(msg.contains("[1, 64, 8, 8]"));
        assert!(msg.contains("[1, 32, 8, 8]"));
    }

    #[test]
    fn test_config_value_message_carries_suggestion() {
        let err = EnrutarError::ConfigValue {
            field: "adapter_dim".to_string(),
            message: "must be at least 1".to_string(),
            suggestion: "Use a small positive bottleneck width such as 16".to_string(),
        };
        assert!(err.to_string().contains("adapter_dim"));
        assert!(err.to_string().contains("bottleneck width"));
    }
}
