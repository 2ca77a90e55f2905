//! Block-wise weight quantization and quantized matmul
//!
//! Weights are stored channel-major: one row per output channel, quantized
//! in blocks of `block_size` elements along the input dimension. Each block
//! carries an f32 scale (and a zero point in asymmetric mode).
//!
//! Scale recipe: `max|x| / qmax` per block in symmetric mode (qmax 7 for
//! S4, 127 for S8), `range / qmax` with a clamped zero point in asymmetric
//! mode. Codes are rounded then clamped; S4 codes are packed two per byte.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Elements per quantization block
pub const DEFAULT_BLOCK_SIZE: usize = 32;

/// Storage dtype for quantized codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightDtype {
    /// 4-bit codes, two per byte
    S4,
    /// 8-bit codes
    S8,
}

impl WeightDtype {
    /// Largest symmetric code magnitude
    fn qmax(self) -> f32 {
        match self {
            Self::S4 => 7.0,
            Self::S8 => 127.0,
        }
    }

    /// Largest unsigned code in asymmetric mode
    fn qmax_unsigned(self) -> f32 {
        match self {
            Self::S4 => 15.0,
            Self::S8 => 255.0,
        }
    }
}

impl std::str::FromStr for WeightDtype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "s4" => Ok(Self::S4),
            "s8" => Ok(Self::S8),
            other => Err(Error::InvalidParameter(format!(
                "unknown weight dtype: {other}"
            ))),
        }
    }
}

/// Compute dtype tag recorded for the downstream kernel
///
/// The reference path always accumulates in f32; the tag is carried so an
/// accelerated kernel can pick its accumulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDtype {
    #[default]
    F32,
    Bf16,
}

/// Symmetric or asymmetric quantization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuantMode {
    /// Zero point fixed at 0, range [-max_abs, max_abs]
    #[default]
    Symmetric,
    /// Per-block zero point, range [min, max]
    Asymmetric,
}

/// A block-quantized weight matrix
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuantizedWeight {
    /// Packed codes: nibbles for S4, one byte per code for S8
    pub data: Vec<u8>,
    /// Per-block scales, row-major over (channel, block)
    pub scales: Vec<f32>,
    /// Per-block zero points; empty in symmetric mode
    pub zero_points: Vec<i32>,
    /// Output channels (rows of the stored layout)
    pub out_features: usize,
    /// Input features (columns of the stored layout)
    pub in_features: usize,
    /// Elements per block
    pub block_size: usize,
    /// Storage dtype
    pub dtype: WeightDtype,
    /// Quantization mode
    pub mode: QuantMode,
    /// Compute dtype tag
    pub compute: ComputeDtype,
    /// Whether the source matrix was supplied channel-major already
    pub transposed: bool,
}

impl QuantizedWeight {
    /// Blocks per output channel
    pub fn blocks_per_row(&self) -> usize {
        self.in_features.div_ceil(self.block_size)
    }

    /// Total number of blocks
    pub fn num_blocks(&self) -> usize {
        self.out_features * self.blocks_per_row()
    }

    /// Storage bytes for codes plus quantization parameters
    pub fn memory_bytes(&self) -> usize {
        self.data.len() + self.scales.len() * 4 + self.zero_points.len() * 4
    }

    /// Compression ratio versus f32 storage
    pub fn compression_ratio(&self) -> f32 {
        let original = self.out_features * self.in_features * 4;
        original as f32 / self.memory_bytes() as f32
    }

    /// Code at (row, col) of the stored layout, sign-extended for S4
    fn code(&self, row: usize, col: usize) -> i32 {
        let idx = row * self.in_features + col;
        match self.dtype {
            WeightDtype::S8 => {
                let byte = self.data[idx];
                match self.mode {
                    QuantMode::Symmetric => i32::from(byte as i8),
                    QuantMode::Asymmetric => i32::from(byte),
                }
            }
            WeightDtype::S4 => {
                let byte = self.data[idx / 2];
                let nibble = if idx % 2 == 0 { byte & 0x0F } else { byte >> 4 };
                match self.mode {
                    QuantMode::Symmetric => {
                        // Sign extend from 4 bits
                        if nibble & 0x08 != 0 {
                            i32::from((nibble | 0xF0) as i8)
                        } else {
                            i32::from(nibble)
                        }
                    }
                    QuantMode::Asymmetric => i32::from(nibble),
                }
            }
        }
    }

    /// Dequantized value at (row, col) of the stored layout
    fn value(&self, row: usize, col: usize) -> f32 {
        let block = row * self.blocks_per_row() + col / self.block_size;
        let scale = self.scales[block];
        let code = self.code(row, col);
        match self.mode {
            QuantMode::Symmetric => code as f32 * scale,
            QuantMode::Asymmetric => (code - self.zero_points[block]) as f32 * scale,
        }
    }

    /// Largest absolute rounding error any element of a block can carry
    ///
    /// Half a step in symmetric mode; a full step in asymmetric mode, where
    /// the zero point is rounded separately.
    pub fn max_block_error(&self, block: usize) -> f32 {
        match self.mode {
            QuantMode::Symmetric => self.scales[block] * 0.5,
            QuantMode::Asymmetric => self.scales[block],
        }
    }
}

/// Quantize a dense weight matrix into blocks
///
/// `transpose` declares the input orientation: `true` means the matrix is
/// already channel-major `(out_features, in_features)`; `false` means it is
/// `(in_features, out_features)` and is reoriented before blocking. Blocks
/// run along the input dimension.
///
/// # Errors
///
/// Returns `InvalidParameter` for an empty matrix or a zero block size.
pub fn quantize_weight(
    weight: &Array2<f32>,
    transpose: bool,
    mode: QuantMode,
    block_size: usize,
    compute: ComputeDtype,
    dtype: WeightDtype,
) -> Result<QuantizedWeight> {
    if block_size == 0 {
        return Err(Error::InvalidParameter(
            "block_size must be > 0".to_string(),
        ));
    }
    if weight.is_empty() {
        return Err(Error::InvalidParameter(
            "cannot quantize an empty weight".to_string(),
        ));
    }

    // Normalize to channel-major (out, in)
    let stored = if transpose {
        weight.clone()
    } else {
        weight.t().to_owned()
    };
    let (out_features, in_features) = stored.dim();
    let blocks_per_row = in_features.div_ceil(block_size);

    let mut scales = Vec::with_capacity(out_features * blocks_per_row);
    let mut zero_points = match mode {
        QuantMode::Symmetric => Vec::new(),
        QuantMode::Asymmetric => Vec::with_capacity(out_features * blocks_per_row),
    };
    let code_count = out_features * in_features;
    let mut codes: Vec<u8> = Vec::with_capacity(code_count);

    for row in stored.rows() {
        let row = row.to_vec();
        for block in row.chunks(block_size) {
            match mode {
                QuantMode::Symmetric => {
                    let max_abs = block
                        .iter()
                        .fold(0.0f32, |acc, v| acc.max(v.abs()))
                        .max(1e-10);
                    let scale = max_abs / dtype.qmax();
                    scales.push(scale);
                    for &v in block {
                        let q = (v / scale).round().clamp(-dtype.qmax(), dtype.qmax()) as i8;
                        codes.push(q as u8);
                    }
                }
                QuantMode::Asymmetric => {
                    let (min, max) = block.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &v| {
                        (lo.min(v), hi.max(v))
                    });
                    // The representable range must include zero for the
                    // zero point to stay within the code range
                    let (min, max) = (min.min(0.0), max.max(0.0));
                    let range = (max - min).max(1e-10);
                    let qmax = dtype.qmax_unsigned();
                    let scale = range / qmax;
                    let zero_point = ((-min / scale).round() as i32).clamp(0, qmax as i32);
                    scales.push(scale);
                    zero_points.push(zero_point);
                    for &v in block {
                        let q = ((v / scale).round() as i32 + zero_point).clamp(0, qmax as i32);
                        codes.push(q as u8);
                    }
                }
            }
        }
    }

    let data = match dtype {
        WeightDtype::S8 => codes,
        WeightDtype::S4 => {
            let mut packed = vec![0u8; code_count.div_ceil(2)];
            for (idx, code) in codes.iter().enumerate() {
                let nibble = code & 0x0F;
                if idx % 2 == 0 {
                    packed[idx / 2] = nibble;
                } else {
                    packed[idx / 2] |= nibble << 4;
                }
            }
            packed
        }
    };

    Ok(QuantizedWeight {
        data,
        scales,
        zero_points,
        out_features,
        in_features,
        block_size,
        dtype,
        mode,
        compute,
        transposed: transpose,
    })
}

/// Dequantize back to a dense matrix in the source orientation
pub fn dequantize(weight: &QuantizedWeight) -> Array2<f32> {
    let stored = dequantize_stored(weight);
    if weight.transposed {
        stored
    } else {
        stored.t().to_owned()
    }
}

/// Dequantize into the channel-major stored layout
fn dequantize_stored(weight: &QuantizedWeight) -> Array2<f32> {
    Array2::from_shape_fn((weight.out_features, weight.in_features), |(r, c)| {
        weight.value(r, c)
    })
}

/// Quantize-dequantize a weight in place
///
/// Leaves the matrix carrying exactly the values the quantized form can
/// represent, in the original orientation.
pub fn qdq_weight(
    weight: &mut Array2<f32>,
    transpose: bool,
    mode: QuantMode,
    block_size: usize,
    dtype: WeightDtype,
) -> Result<()> {
    let quantized = quantize_weight(weight, transpose, mode, block_size, ComputeDtype::F32, dtype)?;
    *weight = dequantize(&quantized);
    Ok(())
}

/// Quantized linear: `activation × Wᵀ (+ bias)`
///
/// `activation` is `(batch, in_features)`; the result is `(batch,
/// out_features)`. The bias, when present, is added after the matmul.
///
/// # Errors
///
/// Returns `ShapeMismatch` when the activation width or the bias length
/// disagrees with the weight.
pub fn quantized_linear(
    activation: &Array2<f32>,
    weight: &QuantizedWeight,
    bias: Option<&Array1<f32>>,
) -> Result<Array2<f32>> {
    let (batch, act_features) = activation.dim();
    if act_features != weight.in_features {
        return Err(Error::ShapeMismatch {
            expected: vec![batch, weight.in_features],
            got: vec![batch, act_features],
        });
    }
    if let Some(bias) = bias {
        if bias.len() != weight.out_features {
            return Err(Error::ShapeMismatch {
                expected: vec![weight.out_features],
                got: vec![bias.len()],
            });
        }
    }

    let stored = dequantize_stored(weight);
    let mut result = activation.dot(&stored.t());
    if let Some(bias) = bias {
        result += bias;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use proptest::prelude::*;

    fn sample_weight() -> Array2<f32> {
        // (out=3, in=4), channel-major
        array![
            [0.5, -1.0, 0.25, 0.75],
            [2.0, -2.0, 1.5, -0.5],
            [-0.1, 0.1, 0.0, 0.3],
        ]
    }

    #[test]
    fn test_s8_symmetric_roundtrip_error_bound() {
        let weight = sample_weight();
        let q = quantize_weight(
            &weight,
            true,
            QuantMode::Symmetric,
            DEFAULT_BLOCK_SIZE,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap();
        let deq = dequantize(&q);

        assert_eq!(deq.dim(), weight.dim());
        for (row, (orig, got)) in weight.rows().into_iter().zip(deq.rows()).enumerate() {
            let bound = q.max_block_error(row) + 1e-6;
            for (&o, &g) in orig.iter().zip(got.iter()) {
                assert!((o - g).abs() <= bound, "row {row}: {o} vs {g}");
            }
        }
    }

    #[test]
    fn test_s4_symmetric_roundtrip_error_bound() {
        let weight = sample_weight();
        let q = quantize_weight(
            &weight,
            true,
            QuantMode::Symmetric,
            DEFAULT_BLOCK_SIZE,
            ComputeDtype::F32,
            WeightDtype::S4,
        )
        .unwrap();
        let deq = dequantize(&q);

        for (row, (orig, got)) in weight.rows().into_iter().zip(deq.rows()).enumerate() {
            let bound = q.max_block_error(row) + 1e-6;
            for (&o, &g) in orig.iter().zip(got.iter()) {
                assert!((o - g).abs() <= bound);
            }
        }
    }

    #[test]
    fn test_asymmetric_roundtrip_error_bound() {
        // All-positive block exercises the zero point
        let weight = array![[1.0f32, 1.5, 2.0, 2.5], [3.0, 3.5, 4.0, 4.5]];
        let q = quantize_weight(
            &weight,
            true,
            QuantMode::Asymmetric,
            4,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap();
        assert_eq!(q.zero_points.len(), q.num_blocks());

        let deq = dequantize(&q);
        for ((&o, &g), row) in weight.iter().zip(deq.iter()).zip([0usize, 0, 0, 0, 1, 1, 1, 1]) {
            assert!((o - g).abs() <= q.max_block_error(row) + 1e-6);
        }
    }

    #[test]
    fn test_untransposed_weight_roundtrip_orientation() {
        // (in=4, out=3): the transpose of the channel-major sample
        let weight = sample_weight().t().to_owned();
        let q = quantize_weight(
            &weight,
            false,
            QuantMode::Symmetric,
            DEFAULT_BLOCK_SIZE,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap();

        assert_eq!(q.out_features, 3);
        assert_eq!(q.in_features, 4);
        // Dequantization restores the source orientation
        assert_eq!(dequantize(&q).dim(), (4, 3));
    }

    #[test]
    fn test_qdq_in_place_is_idempotent() {
        let mut weight = sample_weight();
        qdq_weight(&mut weight, true, QuantMode::Symmetric, 2, WeightDtype::S8).unwrap();
        let after_first = weight.clone();

        // Quantizing already-representable values changes nothing
        qdq_weight(&mut weight, true, QuantMode::Symmetric, 2, WeightDtype::S8).unwrap();
        for (&a, &b) in after_first.iter().zip(weight.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_linear_matches_dequantized_matmul() {
        let weight = sample_weight();
        let q = quantize_weight(
            &weight,
            true,
            QuantMode::Symmetric,
            2,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap();

        let activation = array![[1.0f32, 0.0, -1.0, 2.0], [0.5, 0.5, 0.5, 0.5]];
        let result = quantized_linear(&activation, &q, None).unwrap();

        let expected = activation.dot(&dequantize(&q).t());
        assert_eq!(result.dim(), (2, 3));
        for (&r, &e) in result.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(r, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_linear_bias_added_after_matmul() {
        let weight = sample_weight();
        let q = quantize_weight(
            &weight,
            true,
            QuantMode::Symmetric,
            2,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap();

        let activation = array![[1.0f32, 0.0, -1.0, 2.0]];
        let bias = array![10.0f32, 20.0, 30.0];

        let without = quantized_linear(&activation, &q, None).unwrap();
        let with = quantized_linear(&activation, &q, Some(&bias)).unwrap();

        for ((&w, &wo), &b) in with.iter().zip(without.iter()).zip(bias.iter()) {
            assert_abs_diff_eq!(w, wo + b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_linear_activation_shape_mismatch() {
        let q = quantize_weight(
            &sample_weight(),
            true,
            QuantMode::Symmetric,
            DEFAULT_BLOCK_SIZE,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap();

        let activation = array![[1.0f32, 2.0]]; // wrong in_features
        let err = quantized_linear(&activation, &q, None).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_linear_bias_shape_mismatch() {
        let q = quantize_weight(
            &sample_weight(),
            true,
            QuantMode::Symmetric,
            DEFAULT_BLOCK_SIZE,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap();

        let activation = array![[1.0f32, 0.0, -1.0, 2.0]];
        let bias = array![1.0f32, 2.0]; // wrong out_features
        let err = quantized_linear(&activation, &q, Some(&bias)).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let err = quantize_weight(
            &sample_weight(),
            true,
            QuantMode::Symmetric,
            0,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_empty_weight_rejected() {
        let empty = Array2::<f32>::zeros((0, 4));
        let err = quantize_weight(
            &empty,
            true,
            QuantMode::Symmetric,
            DEFAULT_BLOCK_SIZE,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_s4_packs_two_codes_per_byte() {
        let weight = Array2::<f32>::ones((2, 8));
        let q = quantize_weight(
            &weight,
            true,
            QuantMode::Symmetric,
            8,
            ComputeDtype::F32,
            WeightDtype::S4,
        )
        .unwrap();
        assert_eq!(q.data.len(), 8); // 16 codes in 8 bytes
        assert!(q.compression_ratio() >= 4.0);
    }

    #[test]
    fn test_s8_memory_layout() {
        let weight = Array2::<f32>::ones((4, 32));
        let q = quantize_weight(
            &weight,
            true,
            QuantMode::Symmetric,
            DEFAULT_BLOCK_SIZE,
            ComputeDtype::F32,
            WeightDtype::S8,
        )
        .unwrap();
        assert_eq!(q.data.len(), 128);
        assert_eq!(q.scales.len(), 4);
        assert_eq!(q.num_blocks(), 4);
    }

    #[test]
    fn test_dtype_parsing() {
        assert_eq!("s4".parse::<WeightDtype>().unwrap(), WeightDtype::S4);
        assert_eq!("s8".parse::<WeightDtype>().unwrap(), WeightDtype::S8);
        assert!("fp8".parse::<WeightDtype>().is_err());
    }

    #[test]
    fn test_compute_dtype_is_recorded() {
        let q = quantize_weight(
            &sample_weight(),
            true,
            QuantMode::Symmetric,
            DEFAULT_BLOCK_SIZE,
            ComputeDtype::Bf16,
            WeightDtype::S8,
        )
        .unwrap();
        assert_eq!(q.compute, ComputeDtype::Bf16);
    }

    proptest! {
        /// Roundtrip error stays within half a scale step per element
        #[test]
        fn prop_roundtrip_bounded(
            values in prop::collection::vec(-10.0f32..10.0, 16),
            s4 in proptest::bool::ANY,
        ) {
            let weight = Array2::from_shape_vec((2, 8), values).unwrap();
            let dtype = if s4 { WeightDtype::S4 } else { WeightDtype::S8 };
            let q = quantize_weight(
                &weight, true, QuantMode::Symmetric, 4, ComputeDtype::F32, dtype,
            ).unwrap();
            let deq = dequantize(&q);

            for (idx, (&o, &g)) in weight.iter().zip(deq.iter()).enumerate() {
                let block = (idx / 8) * 2 + (idx % 8) / 4;
                prop_assert!((o - g).abs() <= q.max_block_error(block) + 1e-5);
            }
        }

        /// Quantized values are exactly representable: qdq is a fixpoint
        #[test]
        fn prop_qdq_fixpoint(values in prop::collection::vec(-4.0f32..4.0, 8)) {
            let mut weight = Array2::from_shape_vec((2, 4), values).unwrap();
            qdq_weight(&mut weight, true, QuantMode::Symmetric, 4, WeightDtype::S8).unwrap();
            let once = weight.clone();
            qdq_weight(&mut weight, true, QuantMode::Symmetric, 4, WeightDtype::S8).unwrap();
            for (&a, &b) in once.iter().zip(weight.iter()) {
                prop_assert!((a - b).abs() < 1e-4);
            }
        }
    }
}
