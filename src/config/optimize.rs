//! Post-training optimization configuration
//!
//! Describes a compression/quantization job: objective, target device and
//! backend, calibration approach, numeric precision, exclusions, and opaque
//! per-operator overrides forwarded to the optimization collaborator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::validate::ValidationError;

/// Optimization objective
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TuningMode {
    /// Minimize single-request latency
    #[default]
    Latency,
    /// Maximize aggregate throughput
    Throughput,
    /// Preserve task accuracy above all
    Accuracy,
}

/// Quantization calibration approach
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuantApproach {
    /// Static: calibrate activation ranges ahead of time
    #[default]
    Static,
    /// Dynamic: compute activation ranges at runtime
    Dynamic,
    /// Quantization-aware training
    AwareTraining,
}

/// Configuration for a post-training optimization job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Optimization objective
    #[serde(default)]
    pub mode: TuningMode,

    /// Target device
    #[serde(default = "default_device")]
    pub device: String,

    /// Execution backend on the target device
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Calibration approach
    #[serde(default)]
    pub approach: QuantApproach,

    /// Numeric precision to optimize toward
    #[serde(default = "default_precision")]
    pub precision: String,

    /// Precisions the job must not use
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_precisions: Vec<String>,

    /// Per-operator-type overrides, forwarded opaquely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_type_overrides: Option<BTreeMap<String, serde_json::Value>>,

    /// Per-operator-name overrides, forwarded opaquely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_name_overrides: Option<BTreeMap<String, serde_json::Value>>,

    /// Optimization recipe name -> parameters, forwarded opaquely
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recipes: BTreeMap<String, serde_json::Value>,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_backend() -> String {
    "ipex".to_string()
}

fn default_precision() -> String {
    "bf16".to_string()
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            mode: TuningMode::Latency,
            device: default_device(),
            backend: default_backend(),
            approach: QuantApproach::Static,
            precision: default_precision(),
            excluded_precisions: Vec::new(),
            op_type_overrides: None,
            op_name_overrides: None,
            recipes: BTreeMap::new(),
        }
    }
}

impl OptimizationConfig {
    /// Set the optimization objective
    #[must_use]
    pub fn mode(mut self, mode: TuningMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the target device
    #[must_use]
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    /// Set the target precision
    #[must_use]
    pub fn precision(mut self, precision: impl Into<String>) -> Self {
        self.precision = precision.into();
        self
    }

    /// Check the record's invariants
    ///
    /// # Errors
    ///
    /// Returns an error when the precision is empty or appears in its own
    /// exclusion list.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.precision.is_empty() {
            return Err(ValidationError::EmptyPrecision);
        }
        if self.excluded_precisions.contains(&self.precision) {
            return Err(ValidationError::ExcludedPrecision(self.precision.clone()));
        }
        Ok(())
    }
}
