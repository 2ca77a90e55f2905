//! Weight-only quantization
//!
//! Block-wise low-bit quantization of dense weight matrices and a quantized
//! linear (matmul + optional bias) over the stored blocks:
//! - S4: 4-bit codes, two per byte, per-block f32 scale
//! - S8: 8-bit codes, per-block f32 scale
//!
//! Symmetric mode stores signed codes around zero; asymmetric mode stores
//! unsigned codes with a per-block zero point.

mod weight_only;

pub use weight_only::{
    dequantize, qdq_weight, quantize_weight, quantized_linear, ComputeDtype, QuantMode,
    QuantizedWeight, WeightDtype, DEFAULT_BLOCK_SIZE,
};
