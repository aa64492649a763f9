//! Running statistics of a tensor stream
//!
//! [`Stats`] is a value: [`Stats::with_update`] returns a new accumulator and
//! leaves the receiver untouched, so the owner decides what to persist.

use super::config::StatsConfig;
use super::shape::{check_shapes_conformal, sample_expectation, stats_shape};
use crate::error::{Error, Result};
use ndarray::{ArrayD, Axis, IxDyn, Zip};
use serde::{Deserialize, Serialize};

/// Accumulated statistics, reduced over the shared axes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    config: StatsConfig,
    sum_of_ones: ArrayD<f32>,
    sum_of_vals: ArrayD<f32>,
    max_of_abs_vals: ArrayD<f32>,
    sum_of_l1_vals: ArrayD<f32>,
    sum_of_lp_vals: ArrayD<f32>,
    ema_update_count: u32,
}

impl Stats {
    /// Zero state for tensors of `data_shape`
    pub fn init_stats(data_shape: &[usize], config: &StatsConfig) -> Result<Self> {
        config.validate_for_rank(data_shape.len())?;
        let shape = stats_shape(data_shape, &config.share_stats_axes);
        let zeros = ArrayD::<f32>::zeros(IxDyn(&shape));

        Ok(Self {
            config: config.clone(),
            sum_of_ones: zeros.clone(),
            sum_of_vals: zeros.clone(),
            max_of_abs_vals: zeros.clone(),
            sum_of_l1_vals: zeros.clone(),
            sum_of_lp_vals: zeros,
            ema_update_count: 0,
        })
    }

    /// Fold one weighted batch into a new accumulator
    ///
    /// `weight` must broadcast to `sample`. Without an EMA window the
    /// batch sums are added and the max is kept; with a window `N` every
    /// accumulator moves toward the batch value at rate `1/min(k, N)` where
    /// `k` counts updates, i.e. a plain average until `N` updates, then an
    /// EMA with decay `1 - 1/N`.
    pub fn with_update(&self, sample: &ArrayD<f32>, weight: &ArrayD<f32>) -> Result<Self> {
        let axes = &self.config.share_stats_axes;
        check_shapes_conformal(sample.shape(), &sample_expectation(self.shape(), axes))?;

        let mut weight = weight
            .broadcast(sample.raw_dim())
            .ok_or_else(|| Error::shape(sample.shape(), weight.shape()))?
            .to_owned();
        if self.config.filter_zeros {
            Zip::from(&mut weight).and(sample).for_each(|w, &x| {
                if x == 0.0 {
                    *w = 0.0;
                }
            });
        }

        let abs = sample.mapv(f32::abs);
        let lp_order = self.config.lp_order;
        let batch_ones = reduce_sum(&weight, axes);
        let batch_vals = reduce_sum(&(sample * &weight), axes);
        let batch_l1 = reduce_sum(&(&abs * &weight), axes);
        let batch_lp = reduce_sum(&(abs.mapv(|a| a.powf(lp_order)) * &weight), axes);
        let weighted_abs = Zip::from(&abs)
            .and(&weight)
            .map_collect(|&a, &w| if w > 0.0 { a } else { 0.0 });
        let batch_max = reduce_max(&weighted_abs, axes);

        let updated = match self.config.ema_update_count {
            None => Self {
                config: self.config.clone(),
                sum_of_ones: &self.sum_of_ones + &batch_ones,
                sum_of_vals: &self.sum_of_vals + &batch_vals,
                max_of_abs_vals: elementwise_max(&self.max_of_abs_vals, &batch_max),
                sum_of_l1_vals: &self.sum_of_l1_vals + &batch_l1,
                sum_of_lp_vals: &self.sum_of_lp_vals + &batch_lp,
                ema_update_count: self.ema_update_count,
            },
            Some(window) => {
                let count = (self.ema_update_count + 1).min(window);
                let rate = 1.0 / count as f32;
                Self {
                    config: self.config.clone(),
                    sum_of_ones: blend(&self.sum_of_ones, &batch_ones, rate),
                    sum_of_vals: blend(&self.sum_of_vals, &batch_vals, rate),
                    max_of_abs_vals: blend(&self.max_of_abs_vals, &batch_max, rate),
                    sum_of_l1_vals: blend(&self.sum_of_l1_vals, &batch_l1, rate),
                    sum_of_lp_vals: blend(&self.sum_of_lp_vals, &batch_lp, rate),
                    ema_update_count: count,
                }
            }
        };

        tracing::trace!(
            batch_weight = batch_ones.sum(),
            ema_update_count = updated.ema_update_count,
            "stats updated"
        );
        Ok(updated)
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Stats shape: the data shape with shared axes collapsed to 1
    pub fn shape(&self) -> &[usize] {
        self.sum_of_ones.shape()
    }

    pub fn sum_of_ones(&self) -> &ArrayD<f32> {
        &self.sum_of_ones
    }

    pub fn sum_of_vals(&self) -> &ArrayD<f32> {
        &self.sum_of_vals
    }

    pub fn max_of_abs_vals(&self) -> &ArrayD<f32> {
        &self.max_of_abs_vals
    }

    pub fn sum_of_l1_vals(&self) -> &ArrayD<f32> {
        &self.sum_of_l1_vals
    }

    pub fn sum_of_lp_vals(&self) -> &ArrayD<f32> {
        &self.sum_of_lp_vals
    }

    /// Number of updates folded through the EMA, capped at the window
    pub fn ema_update_count(&self) -> u32 {
        self.ema_update_count
    }

    /// True once any positive weight has been observed
    pub fn has_observations(&self) -> bool {
        self.sum_of_ones.iter().any(|&n| n > 0.0)
    }

    /// Weighted mean; zero where nothing was observed
    pub fn mean(&self) -> ArrayD<f32> {
        safe_div(&self.sum_of_vals, &self.sum_of_ones)
    }

    /// Largest observed magnitude; zero before the first observation
    pub fn max_dev(&self) -> ArrayD<f32> {
        self.max_of_abs_vals.clone()
    }

    /// Mean absolute value
    pub fn l1_dev(&self) -> ArrayD<f32> {
        safe_div(&self.sum_of_l1_vals, &self.sum_of_ones)
    }

    /// `(mean |x|^p)^(1/p)`
    pub fn lp_dev(&self) -> ArrayD<f32> {
        let inv_p = 1.0 / self.config.lp_order;
        safe_div(&self.sum_of_lp_vals, &self.sum_of_ones).mapv(|v| v.powf(inv_p))
    }
}

fn reduce_sum(values: &ArrayD<f32>, axes: &[usize]) -> ArrayD<f32> {
    let mut out = values.clone();
    for &axis in axes {
        out = out.sum_axis(Axis(axis)).insert_axis(Axis(axis));
    }
    out
}

fn reduce_max(values: &ArrayD<f32>, axes: &[usize]) -> ArrayD<f32> {
    let mut out = values.clone();
    for &axis in axes {
        out = out
            .fold_axis(Axis(axis), 0.0f32, |&acc, &x| acc.max(x))
            .insert_axis(Axis(axis));
    }
    out
}

fn elementwise_max(a: &ArrayD<f32>, b: &ArrayD<f32>) -> ArrayD<f32> {
    Zip::from(a).and(b).map_collect(|&x, &y| x.max(y))
}

fn blend(old: &ArrayD<f32>, new: &ArrayD<f32>, rate: f32) -> ArrayD<f32> {
    Zip::from(old)
        .and(new)
        .map_collect(|&o, &n| o * (1.0 - rate) + n * rate)
}

fn safe_div(num: &ArrayD<f32>, den: &ArrayD<f32>) -> ArrayD<f32> {
    Zip::from(num)
        .and(den)
        .map_collect(|&n, &d| if d > 0.0 { n / d } else { 0.0 })
}
