//! Quantization policy configuration
//!
//! All config types are immutable once built, deserializable from YAML, and
//! validated eagerly: a config that passes `validate()` never causes an
//! error at numeric-compute time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Largest supported bit width; float32 has a 24-bit significand.
pub const MAX_BITS: u32 = 23;

/// Integer grid description
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntQuantConfig {
    /// Number of bits of the target integer type
    pub bits: u32,
    /// Whether zero must be exactly representable (odd bucket count)
    #[serde(default = "default_true")]
    pub preserve_zero: bool,
}

impl IntQuantConfig {
    pub fn new(bits: u32, preserve_zero: bool) -> Self {
        Self {
            bits,
            preserve_zero,
        }
    }

    /// Signed 8-bit grid with an exact zero: [-127, 127]
    pub fn int8() -> Self {
        Self::new(8, true)
    }

    /// Signed 4-bit grid with an exact zero: [-7, 7]
    pub fn int4() -> Self {
        Self::new(4, true)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bits == 0 {
            return Err(Error::ConfigError(
                "int_config.bits must be positive, got 0".to_string(),
            ));
        }
        if self.bits > MAX_BITS {
            return Err(Error::ConfigError(format!(
                "int_config.bits={} exceeds {MAX_BITS}: float32 has less precision",
                self.bits
            )));
        }
        Ok(())
    }
}

impl Default for IntQuantConfig {
    fn default() -> Self {
        Self::int8()
    }
}

/// How statistics are pooled and accumulated
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsConfig {
    /// Axes reduced away when accumulating; one scale is shared along them
    #[serde(default)]
    pub share_stats_axes: Vec<usize>,

    /// Order `p` of the Lp deviation statistic
    #[serde(default = "default_lp_order")]
    pub lp_order: f32,

    /// Window of the bounded exponential moving average; `None` sums forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema_update_count: Option<u32>,

    /// Exact zeros carry no weight
    #[serde(default)]
    pub filter_zeros: bool,
}

impl StatsConfig {
    pub fn new(share_stats_axes: Vec<usize>) -> Self {
        Self {
            share_stats_axes,
            ..Self::default()
        }
    }

    pub fn with_lp_order(mut self, lp_order: f32) -> Self {
        self.lp_order = lp_order;
        self
    }

    pub fn with_ema_update_count(mut self, count: u32) -> Self {
        self.ema_update_count = Some(count);
        self
    }

    pub fn with_filter_zeros(mut self, filter_zeros: bool) -> Self {
        self.filter_zeros = filter_zeros;
        self
    }

    /// Checks field ranges; axis bounds are checked against a rank in
    /// [`StatsConfig::validate_for_rank`].
    pub fn validate(&self) -> Result<()> {
        if !(self.lp_order.is_finite() && self.lp_order > 0.0) {
            return Err(Error::ConfigError(format!(
                "stats_config.lp_order must be positive and finite, got {}",
                self.lp_order
            )));
        }
        if self.ema_update_count == Some(0) {
            return Err(Error::ConfigError(
                "stats_config.ema_update_count must be at least 1".to_string(),
            ));
        }
        let mut seen = self.share_stats_axes.clone();
        seen.sort_unstable();
        if let Some(pair) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(Error::ConfigError(format!(
                "stats_config.share_stats_axes={:?} lists axis {} twice",
                self.share_stats_axes, pair[0]
            )));
        }
        Ok(())
    }

    pub fn validate_for_rank(&self, rank: usize) -> Result<()> {
        self.validate()?;
        if let Some(&axis) = self.share_stats_axes.iter().find(|&&a| a >= rank) {
            return Err(Error::ConfigError(format!(
                "stats_config.share_stats_axes={:?} has axis {axis} out of range for rank {rank}",
                self.share_stats_axes
            )));
        }
        Ok(())
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            share_stats_axes: Vec::new(),
            lp_order: default_lp_order(),
            ema_update_count: None,
            filter_zeros: false,
        }
    }
}

/// Linear combination turning accumulated statistics into a clip bound
///
/// `bound = const_bound_coeff + max_dev_coeff * max_dev
///        + l1_dev_coeff * l1_dev + lp_dev_coeff * lp_dev`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationConfig {
    #[serde(default)]
    pub max_dev_coeff: f32,
    #[serde(default)]
    pub l1_dev_coeff: f32,
    #[serde(default)]
    pub lp_dev_coeff: f32,
    #[serde(default)]
    pub const_bound_coeff: f32,
}

impl CalibrationConfig {
    /// Bound is the largest absolute value observed
    pub fn max() -> Self {
        Self {
            max_dev_coeff: 1.0,
            l1_dev_coeff: 0.0,
            lp_dev_coeff: 0.0,
            const_bound_coeff: 0.0,
        }
    }

    /// Bound is `k` times the mean absolute value
    pub fn l1(k: f32) -> Self {
        Self {
            max_dev_coeff: 0.0,
            l1_dev_coeff: k,
            lp_dev_coeff: 0.0,
            const_bound_coeff: 0.0,
        }
    }

    /// Bound is `k` times the Lp deviation
    pub fn lp(k: f32) -> Self {
        Self {
            max_dev_coeff: 0.0,
            l1_dev_coeff: 0.0,
            lp_dev_coeff: k,
            const_bound_coeff: 0.0,
        }
    }

    /// Static bound, independent of the data
    pub fn const_bound(bound: f32) -> Self {
        Self {
            max_dev_coeff: 0.0,
            l1_dev_coeff: 0.0,
            lp_dev_coeff: 0.0,
            const_bound_coeff: bound,
        }
    }

    /// True when the bound does not depend on observed statistics
    pub fn is_static(&self) -> bool {
        self.max_dev_coeff == 0.0 && self.l1_dev_coeff == 0.0 && self.lp_dev_coeff == 0.0
    }

    pub fn validate(&self) -> Result<()> {
        let coeffs = [
            ("max_dev_coeff", self.max_dev_coeff),
            ("l1_dev_coeff", self.l1_dev_coeff),
            ("lp_dev_coeff", self.lp_dev_coeff),
            ("const_bound_coeff", self.const_bound_coeff),
        ];
        for (name, value) in coeffs {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::ConfigError(format!(
                    "calibration_config.{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if coeffs.iter().all(|(_, v)| *v == 0.0) {
            return Err(Error::ConfigError(
                "calibration_config needs at least one positive coefficient".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::max()
    }
}

/// Complete quantization policy for one tensor site
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct TensorQuantConfig {
    #[serde(default)]
    pub quant_config: IntQuantConfig,

    #[serde(default)]
    pub stats_config: StatsConfig,

    #[serde(default)]
    pub calibration_config: CalibrationConfig,

    /// Calibrate on the first update only, then hold the scale
    #[serde(default)]
    pub freeze_scale_at_begin: bool,

    /// Inference reads the quantized value cached at the last update
    #[serde(default)]
    pub use_quantized_variable: bool,
}

impl TensorQuantConfig {
    pub fn new(quant_config: IntQuantConfig, stats_config: StatsConfig) -> Self {
        Self {
            quant_config,
            stats_config,
            ..Self::default()
        }
    }

    pub fn with_calibration(mut self, calibration_config: CalibrationConfig) -> Self {
        self.calibration_config = calibration_config;
        self
    }

    pub fn with_freeze_scale_at_begin(mut self, freeze: bool) -> Self {
        self.freeze_scale_at_begin = freeze;
        self
    }

    pub fn with_quantized_variable(mut self, use_quantized_variable: bool) -> Self {
        self.use_quantized_variable = use_quantized_variable;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.quant_config.validate()?;
        self.stats_config.validate()?;
        self.calibration_config.validate()
    }
}

fn default_true() -> bool {
    true
}

fn default_lp_order() -> f32 {
    2.0
}
