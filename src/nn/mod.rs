//! Layer primitives the congestion models compose.
//!
//! Everything here is forward-only: layers own their learned parameters
//! and expose them to the external trainer through [`VisitParams`].

mod activation;
mod conv;
mod functional;
mod init;
mod norm;

pub use activation::{leaky_relu, relu, sigmoid};
pub use conv::Conv2d;
pub use functional::upsample_nearest;
pub use init::{generation_init_weights, ParamKind, VisitParams, GENERATION_INIT_STD};
pub use norm::ChannelNorm;
