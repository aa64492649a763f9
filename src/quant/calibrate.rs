//! Scale calibration from accumulated statistics

use super::clip::safe_clip_bound;
use super::config::{CalibrationConfig, TensorQuantConfig};
use super::stats::Stats;
use crate::error::Result;
use ndarray::ArrayD;

/// Clip bound in data units, one value per stats position
pub fn calibration_bound(stats: &Stats, calibration: &CalibrationConfig) -> ArrayD<f32> {
    let mut bound = ArrayD::from_elem(stats.sum_of_ones().raw_dim(), calibration.const_bound_coeff);

    let terms = [
        (calibration.max_dev_coeff, Stats::max_dev as fn(&Stats) -> ArrayD<f32>),
        (calibration.l1_dev_coeff, Stats::l1_dev),
        (calibration.lp_dev_coeff, Stats::lp_dev),
    ];
    for (coeff, deviation) in terms {
        if coeff != 0.0 {
            bound.scaled_add(coeff, &deviation(stats));
        }
    }
    bound
}

/// Multiplicative dequantization scale: `bound / safe_clip_bound`
///
/// Positions with a zero or non-finite bound (nothing observed yet, or an
/// all-zero tensor) get scale 1, so the result is always strictly positive.
pub fn compute_scale(stats: &Stats, config: &TensorQuantConfig) -> Result<ArrayD<f32>> {
    let clip_bound = safe_clip_bound(&config.quant_config)?;
    let bound = calibration_bound(stats, &config.calibration_config);

    let scale = bound.mapv(|b| {
        let s = b / clip_bound;
        if s.is_finite() && s > 0.0 {
            s
        } else {
            1.0
        }
    });

    if stats.has_observations() {
        let fallbacks = bound
            .iter()
            .filter(|&&b| !(b.is_finite() && b > 0.0))
            .count();
        if fallbacks > 0 {
            tracing::warn!(
                fallbacks,
                positions = scale.len(),
                "calibration bound is zero or non-finite; using scale 1"
            );
        }
    }
    Ok(scale)
}
