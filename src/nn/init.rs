//! Shared weight-initialization policy.
//!
//! Models do not initialize themselves layer by layer; instead every layer
//! implements [`VisitParams`] and a single policy walks the whole module
//! tree. [`generation_init_weights`] is the policy the generator-style
//! models use: convolution weights drawn from N(0, 0.02), biases zeroed,
//! normalization affines reset to identity.

use rand::Rng;

/// Standard deviation of the generation-style normal initialization.
pub const GENERATION_INIT_STD: f64 = 0.02;

/// What role a parameter buffer plays, so an initialization policy can
/// apply per-layer-type rules without reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Convolution kernel weights.
    ConvWeight,
    /// Convolution per-output-channel bias.
    ConvBias,
    /// Normalization per-channel scale.
    NormWeight,
    /// Normalization per-channel shift.
    NormBias,
}

/// Implemented by every layer and model that owns learned parameters.
///
/// The walk visits each parameter buffer exactly once, in a fixed order,
/// as a flat contiguous slice. Composite modules chain their children.
pub trait VisitParams {
    /// Walk all learned parameter buffers.
    fn visit_params(&mut self, f: &mut dyn FnMut(ParamKind, &mut [f32]));
}

/// Apply the generation-style initialization to a whole module tree.
///
/// Rules, per parameter role:
/// - `ConvWeight`: N(0, [`GENERATION_INIT_STD`])
/// - `ConvBias`, `NormBias`: 0
/// - `NormWeight`: 1
pub fn generation_init_weights<M, R>(module: &mut M, rng: &mut R)
where
    M: VisitParams + ?Sized,
    R: Rng,
{
    module.visit_params(&mut |kind, data| match kind {
        ParamKind::ConvWeight => {
            for v in data.iter_mut() {
                *v = sample_normal(rng, GENERATION_INIT_STD);
            }
        }
        ParamKind::ConvBias | ParamKind::NormBias => data.fill(0.0),
        ParamKind::NormWeight => data.fill(1.0),
    });
}

/// Draw one N(0, std) sample via the Box–Muller transform.
pub(crate) fn sample_normal<R: Rng>(rng: &mut R, std: f64) -> f32 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    (z * std) as f32
}
