//! Performance-critical kernels: histogram accumulation, the best-split
//! gain scan, and elementwise gradient/hessian computation.
//!
//! The gain scan and the objective kernels exist in three variants:
//! wide (`f32x8`), narrow (`f32x4`) and scalar. They share one behavioral
//! contract: bit-identical results within a variant, agreement within a
//! few ULPs across variants. Selection happens at build time through the
//! `simd` cargo feature; the scalar path is always compiled.

mod histogram;
mod objective;
mod scan;

pub use histogram::gradient_histogram;
pub use objective::{binary_gradients, regression_gradients, sigmoid};
#[cfg(feature = "simd")]
pub use scan::{find_best_split_narrow, find_best_split_wide};
pub use scan::{find_best_split, find_best_split_scalar, ScanResult};

/// Label of the active gain-scan/objective variant, reported by the
/// version endpoint and the CLI.
pub fn simd_label() -> &'static str {
    #[cfg(feature = "simd")]
    {
        "wide-f32x8"
    }
    #[cfg(not(feature = "simd"))]
    {
        "scalar"
    }
}
