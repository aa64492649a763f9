//! Tensor quantizer state machine
//!
//! A [`TensorQuantizer`] is the immutable definition of one quantized tensor
//! site (name, data shape, policy). Its mutable part lives in an explicit
//! [`QuantizerState`] value that the caller owns and threads through
//! `update`; every transition returns a new state.
//!
//! Lifecycle: no state (uninitialized) → [`TensorQuantizer::init`] →
//! `Calibrating` ⇄ `Frozen` via [`QuantizerState::freeze`] /
//! [`QuantizerState::unfreeze`].

use super::calibrate::compute_scale;
use super::clip::{round_to_grid, safe_clip_bound};
use super::config::TensorQuantConfig;
use super::shape::{check_shapes_conformal, sample_expectation, stats_shape};
use super::stats::Stats;
use super::ste::{pass_through, stop_gradient};
use crate::autograd::{mul_const, Tensor};
use crate::error::{Error, Result};
use ndarray::{ArrayD, IxDyn, Zip};
use serde::{Deserialize, Serialize};

/// Whether statistics are still being collected
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantizerMode {
    /// Training: `update` folds samples and recalibrates
    Calibrating,
    /// Inference: stats and scale are held fixed
    Frozen,
}

/// Everything a quantizer carries across steps
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantizerState {
    scale: ArrayD<f32>,
    last_update: Option<i64>,
    quantized_variable: ArrayD<f32>,
    stats: Stats,
    mode: QuantizerMode,
}

impl QuantizerState {
    /// Dequantization scale at the stats shape
    pub fn scale(&self) -> &ArrayD<f32> {
        &self.scale
    }

    /// Event count of the last folded update
    pub fn last_update(&self) -> Option<i64> {
        self.last_update
    }

    /// Grid values of the sample seen at the last update
    pub fn quantized_variable(&self) -> &ArrayD<f32> {
        &self.quantized_variable
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn mode(&self) -> QuantizerMode {
        self.mode
    }

    /// At least one update has been folded
    pub fn is_calibrated(&self) -> bool {
        self.last_update.is_some()
    }

    /// Switch to inference; later `update` calls are rejected
    pub fn freeze(&self) -> Self {
        Self {
            mode: QuantizerMode::Frozen,
            ..self.clone()
        }
    }

    /// Resume calibration
    pub fn unfreeze(&self) -> Self {
        Self {
            mode: QuantizerMode::Calibrating,
            ..self.clone()
        }
    }
}

/// Definition of one quantized tensor site
#[derive(Clone, Debug)]
pub struct TensorQuantizer {
    name: String,
    data_shape: Vec<usize>,
    config: TensorQuantConfig,
    clip_bound: f32,
}

impl TensorQuantizer {
    /// Validates `config` against `data_shape`
    pub fn new(
        name: impl Into<String>,
        data_shape: &[usize],
        config: TensorQuantConfig,
    ) -> Result<Self> {
        config.validate()?;
        config.stats_config.validate_for_rank(data_shape.len())?;
        let clip_bound = safe_clip_bound(&config.quant_config)?;

        Ok(Self {
            name: name.into(),
            data_shape: data_shape.to_vec(),
            config,
            clip_bound,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_shape(&self) -> &[usize] {
        &self.data_shape
    }

    pub fn config(&self) -> &TensorQuantConfig {
        &self.config
    }

    /// Shape of the scale and of every stats accumulator
    pub fn stats_shape(&self) -> Vec<usize> {
        stats_shape(&self.data_shape, &self.config.stats_config.share_stats_axes)
    }

    /// `(-safe_clip_bound, safe_clip_bound)` in grid units
    pub fn clip_range(&self) -> (f32, f32) {
        (-self.clip_bound, self.clip_bound)
    }

    /// Fresh state: zero stats, unit scale, calibrating
    pub fn init(&self) -> Result<QuantizerState> {
        let stats = Stats::init_stats(&self.data_shape, &self.config.stats_config)?;
        Ok(QuantizerState {
            scale: ArrayD::ones(IxDyn(stats.shape())),
            last_update: None,
            quantized_variable: ArrayD::zeros(IxDyn(&self.data_shape)),
            stats,
            mode: QuantizerMode::Calibrating,
        })
    }

    /// Fold `sample` observed at step `event_count` into a new state
    ///
    /// A repeated `event_count` returns the state unchanged. A smaller one,
    /// or any call on a frozen state, is a programming error. With
    /// `use_quantized_variable` the sample must have exactly `data_shape`,
    /// since it becomes the cached inference output.
    pub fn update(
        &self,
        state: &QuantizerState,
        sample: &ArrayD<f32>,
        weight: &ArrayD<f32>,
        event_count: i64,
    ) -> Result<QuantizerState> {
        self.check_state(state)?;
        if state.mode == QuantizerMode::Frozen {
            return Err(Error::InvalidState(format!(
                "quantizer '{}' is frozen; update at event {event_count} rejected",
                self.name
            )));
        }
        match state.last_update {
            Some(last) if event_count == last => {
                tracing::debug!(quantizer = %self.name, event_count, "duplicate update ignored");
                return Ok(state.clone());
            }
            Some(last) if event_count < last => {
                return Err(Error::InvalidState(format!(
                    "quantizer '{}' got event {event_count} after event {last}",
                    self.name
                )));
            }
            _ => {}
        }

        if self.config.use_quantized_variable && sample.shape() != self.data_shape.as_slice() {
            return Err(Error::shape(&self.data_shape, sample.shape()));
        }

        let stats = state.stats.with_update(sample, weight)?;
        let scale = if self.config.freeze_scale_at_begin && state.is_calibrated() {
            state.scale.clone()
        } else {
            compute_scale(&stats, &self.config)?
        };
        let quantized_variable = self.snap_to_grid(&(sample * &inverse_of(&scale, sample)?));

        tracing::debug!(
            quantizer = %self.name,
            event_count,
            scale_min = scale.iter().copied().fold(f32::INFINITY, f32::min),
            scale_max = scale.iter().copied().fold(0.0f32, f32::max),
            "quantizer updated"
        );

        Ok(QuantizerState {
            scale,
            last_update: Some(event_count),
            quantized_variable,
            stats,
            mode: state.mode,
        })
    }

    /// Map `x` onto the integer grid: `round(clip(x / scale))`
    ///
    /// In train mode the clip+round step is a straight-through op, so the
    /// gradient w.r.t. `x` is `1 / scale`. In inference mode the result is
    /// detached; with `use_quantized_variable` it is the value cached at the
    /// last update and `x` must match the cached shape.
    pub fn to_quant(&self, state: &QuantizerState, x: &Tensor, train: bool) -> Result<Tensor> {
        self.check_state(state)?;
        self.check_input(x)?;

        if !train && self.config.use_quantized_variable {
            if x.shape() != state.quantized_variable.shape() {
                return Err(Error::shape(state.quantized_variable.shape(), x.shape()));
            }
            return Ok(Tensor::new(state.quantized_variable.clone(), false));
        }

        let inv_scale = state.scale.mapv(f32::recip);
        if train {
            let scaled = mul_const(x, &inv_scale)?;
            Ok(pass_through(&scaled, |v| self.snap_to_grid(v)))
        } else {
            let scaled = mul_const(&stop_gradient(x), &inv_scale)?;
            Ok(Tensor::new(self.snap_to_grid(scaled.data()), false))
        }
    }

    /// Scale to multiply grid values by
    ///
    /// The scale is derived from statistics and is a constant within a
    /// step, so it is detached in both modes. `train` has no effect; it is
    /// accepted so the signature matches `to_quant` and `dequantize`.
    pub fn from_quant_scale(&self, state: &QuantizerState, _train: bool) -> Tensor {
        Tensor::new(state.scale.clone(), false)
    }

    /// Grid values back to data units: `q * scale`
    pub fn dequantize(&self, state: &QuantizerState, q: &Tensor, train: bool) -> Result<Tensor> {
        self.check_state(state)?;
        self.check_input(q)?;
        let scale = self.from_quant_scale(state, train);
        mul_const(q, scale.data())
    }

    /// Quantize then dequantize
    ///
    /// In train mode the whole round trip is one straight-through op, so
    /// the gradient w.r.t. `x` is exactly 1.
    pub fn fake_quant(&self, state: &QuantizerState, x: &Tensor, train: bool) -> Result<Tensor> {
        if !train {
            let q = self.to_quant(state, x, false)?;
            return self.dequantize(state, &q, false);
        }

        self.check_state(state)?;
        self.check_input(x)?;
        let scale = state
            .scale
            .broadcast(x.data().raw_dim())
            .ok_or_else(|| Error::shape(x.shape(), state.scale.shape()))?
            .to_owned();
        let inv_scale = scale.mapv(f32::recip);
        Ok(pass_through(x, |v| {
            self.snap_to_grid(&(v * &inv_scale)) * &scale
        }))
    }

    fn snap_to_grid(&self, scaled: &ArrayD<f32>) -> ArrayD<f32> {
        let bound = self.clip_bound;
        let preserve_zero = self.config.quant_config.preserve_zero;
        scaled.mapv(|e| round_to_grid(e.clamp(-bound, bound), preserve_zero))
    }

    fn check_input(&self, x: &Tensor) -> Result<()> {
        let axes = &self.config.stats_config.share_stats_axes;
        check_shapes_conformal(x.shape(), &sample_expectation(&self.stats_shape(), axes))
    }

    fn check_state(&self, state: &QuantizerState) -> Result<()> {
        if state.scale.shape() != self.stats_shape().as_slice() {
            return Err(Error::InvalidState(format!(
                "state with scale shape {:?} does not belong to quantizer '{}' (stats shape {:?})",
                state.scale.shape(),
                self.name,
                self.stats_shape()
            )));
        }
        Ok(())
    }
}

/// Reciprocal scale broadcast to the sample's shape
fn inverse_of(scale: &ArrayD<f32>, sample: &ArrayD<f32>) -> Result<ArrayD<f32>> {
    let view = scale
        .broadcast(sample.raw_dim())
        .ok_or_else(|| Error::shape(sample.shape(), scale.shape()))?;
    Ok(Zip::from(&view).map_collect(|&s| s.recip()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{backward, sum};
    use crate::quant::clip::get_clip_bound;
    use crate::quant::config::{CalibrationConfig, IntQuantConfig, StatsConfig};
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn unit_weight() -> ArrayD<f32> {
        ArrayD::from_elem(IxDyn(&[]), 1.0)
    }

    fn per_tensor(bits: u32, shape: &[usize]) -> TensorQuantizer {
        let axes = (0..shape.len()).collect();
        let config = TensorQuantConfig::new(IntQuantConfig::new(bits, true), StatsConfig::new(axes));
        TensorQuantizer::new("tq", shape, config).unwrap()
    }

    #[test]
    fn test_init_state() {
        let quant = per_tensor(8, &[2, 3]);
        let state = quant.init().unwrap();

        assert_eq!(state.mode(), QuantizerMode::Calibrating);
        assert_eq!(state.last_update(), None);
        assert!(!state.is_calibrated());
        assert_eq!(state.scale().shape(), &[1, 1]);
        assert_eq!(state.scale()[[0, 0]], 1.0);
        assert_eq!(state.quantized_variable().shape(), &[2, 3]);
    }

    #[test]
    fn test_rejects_too_many_bits() {
        let config = TensorQuantConfig::new(IntQuantConfig::new(24, true), StatsConfig::default());
        assert!(matches!(
            TensorQuantizer::new("tq", &[4], config),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_constant_ten_round_trips_within_one_bucket() {
        let quant = per_tensor(8, &[4]);
        let state = quant.init().unwrap();
        let sample = ArrayD::from_elem(IxDyn(&[4]), 10.0);
        let state = quant.update(&state, &sample, &unit_weight(), 1).unwrap();

        let x = Tensor::full(&[4], 10.0, false);
        let q = quant.to_quant(&state, &x, true).unwrap();
        let y = quant.dequantize(&state, &q, true).unwrap();

        let bucket = state.scale()[[0]];
        assert_eq!(q.data()[[0]], 127.0);
        for &v in y.data().iter() {
            assert!((v - 10.0).abs() <= bucket, "{v} not within {bucket} of 10");
        }
    }

    #[test]
    fn test_duplicate_event_count_is_noop() {
        let quant = per_tensor(8, &[3]);
        let state = quant.init().unwrap();
        let first = ArrayD::from_elem(IxDyn(&[3]), 2.0);
        let second = ArrayD::from_elem(IxDyn(&[3]), 50.0);

        let once = quant.update(&state, &first, &unit_weight(), 7).unwrap();
        let twice = quant.update(&once, &second, &unit_weight(), 7).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.last_update(), Some(7));
    }

    #[test]
    fn test_new_event_recalibrates() {
        let quant = per_tensor(8, &[3]);
        let state = quant.init().unwrap();
        let s1 = quant
            .update(&state, &ArrayD::from_elem(IxDyn(&[3]), 2.0), &unit_weight(), 0)
            .unwrap();
        let s2 = quant
            .update(&s1, &ArrayD::from_elem(IxDyn(&[3]), 50.0), &unit_weight(), 1)
            .unwrap();

        assert!(s2.scale()[[0]] > s1.scale()[[0]]);
        assert_eq!(s2.stats().sum_of_ones()[[0]], 6.0);
    }

    #[test]
    fn test_decreasing_event_count_rejected() {
        let quant = per_tensor(8, &[2]);
        let state = quant.init().unwrap();
        let sample = ArrayD::ones(IxDyn(&[2]));
        let state = quant.update(&state, &sample, &unit_weight(), 5).unwrap();

        let err = quant.update(&state, &sample, &unit_weight(), 4).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_frozen_rejects_update_but_quantizes() {
        let quant = per_tensor(4, &[2]);
        let state = quant.init().unwrap();
        let sample = ndarray::arr1(&[1.0, -3.5]).into_dyn();
        let state = quant.update(&state, &sample, &unit_weight(), 0).unwrap().freeze();

        assert_eq!(state.mode(), QuantizerMode::Frozen);
        assert!(matches!(
            quant.update(&state, &sample, &unit_weight(), 1),
            Err(Error::InvalidState(_))
        ));

        let x = Tensor::from_vec(vec![1.0, -3.5], true);
        let q = quant.to_quant(&state, &x, false).unwrap();
        assert!(!q.requires_grad());
        assert_eq!(q.data()[[1]], -7.0);

        let resumed = state.unfreeze();
        assert!(quant.update(&resumed, &sample, &unit_weight(), 1).is_ok());
    }

    #[test]
    fn test_to_quant_clips_to_safe_range() {
        let quant = per_tensor(8, &[3]);
        let state = quant.init().unwrap();
        let state = quant
            .update(&state, &ndarray::arr1(&[1.0, -1.0, 0.5]).into_dyn(), &unit_weight(), 0)
            .unwrap();

        let x = Tensor::from_vec(vec![1000.0, -1000.0, 0.0], false);
        let q = quant.to_quant(&state, &x, false).unwrap();
        let (lo, hi) = quant.clip_range();

        assert_eq!(q.data()[[0]], 127.0);
        assert_eq!(q.data()[[1]], -127.0);
        assert_eq!(q.data()[[2]], 0.0);
        assert!(hi < get_clip_bound(&IntQuantConfig::int8()).unwrap());
        assert_eq!(lo, -hi);
    }

    #[test]
    fn test_to_quant_gradient_is_inverse_scale() {
        let quant = per_tensor(8, &[2]);
        let state = quant.init().unwrap();
        let state = quant
            .update(&state, &ndarray::arr1(&[4.0, -2.0]).into_dyn(), &unit_weight(), 0)
            .unwrap();

        let x = Tensor::from_vec(vec![1.0, 3.0], true);
        let mut loss = sum(&quant.to_quant(&state, &x, true).unwrap());
        backward(&mut loss, None);

        let inv = 1.0 / state.scale()[[0]];
        for &g in x.grad().unwrap().iter() {
            assert_abs_diff_eq!(g, inv, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_fake_quant_gradient_is_exactly_one() {
        let quant = per_tensor(4, &[3]);
        let state = quant.init().unwrap();
        let state = quant
            .update(&state, &ndarray::arr1(&[0.3, -0.9, 0.6]).into_dyn(), &unit_weight(), 0)
            .unwrap();

        let x = Tensor::from_vec(vec![0.31, -5.0, 0.0], true);
        let y = quant.fake_quant(&state, &x, true).unwrap();
        let mut loss = sum(&y);
        backward(&mut loss, None);

        assert!(x.grad().unwrap().iter().all(|&g| g == 1.0));
        // Out-of-range input lands on the outermost level
        let step = state.scale()[[0]];
        assert_abs_diff_eq!(y.data()[[1]], -7.0 * step, epsilon = 1e-6);
    }

    #[test]
    fn test_scale_is_detached() {
        let quant = per_tensor(8, &[2]);
        let state = quant.init().unwrap();
        let scale = quant.from_quant_scale(&state, true);
        assert!(!scale.requires_grad());
        assert_eq!(scale.data(), state.scale());

        let inference = quant.from_quant_scale(&state, false);
        assert!(!inference.requires_grad());
        assert_eq!(inference.data(), scale.data());
    }

    #[test]
    fn test_per_channel_quantization() {
        let config = TensorQuantConfig::new(IntQuantConfig::int8(), StatsConfig::new(vec![0]));
        let quant = TensorQuantizer::new("w", &[2, 2], config).unwrap();
        let state = quant.init().unwrap();
        let w = ndarray::arr2(&[[1.0, 100.0], [-0.5, -50.0]]).into_dyn();
        let state = quant.update(&state, &w, &unit_weight(), 0).unwrap();

        assert_eq!(state.scale().shape(), &[1, 2]);
        let q = state.quantized_variable();
        assert_eq!(q[[0, 0]], 127.0);
        assert_eq!(q[[0, 1]], 127.0);
        assert_abs_diff_eq!(q[[1, 0]], -64.0, epsilon = 1.0);
        assert_abs_diff_eq!(q[[1, 1]], -64.0, epsilon = 1.0);
    }

    #[test]
    fn test_batch_axis_may_vary() {
        let config = TensorQuantConfig::new(IntQuantConfig::int8(), StatsConfig::new(vec![0]));
        let quant = TensorQuantizer::new("act", &[32, 4], config).unwrap();
        let state = quant.init().unwrap();

        let x = Tensor::zeros(&[5, 4], false);
        assert!(quant.to_quant(&state, &x, false).is_ok());

        let wrong = Tensor::zeros(&[5, 3], false);
        assert!(matches!(
            quant.to_quant(&state, &wrong, false),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_freeze_scale_at_begin() {
        let config = TensorQuantConfig::new(IntQuantConfig::int8(), StatsConfig::new(vec![0]))
            .with_freeze_scale_at_begin(true);
        let quant = TensorQuantizer::new("tq", &[2], config).unwrap();
        let s0 = quant.init().unwrap();
        let s1 = quant
            .update(&s0, &ArrayD::from_elem(IxDyn(&[2]), 1.0), &unit_weight(), 0)
            .unwrap();
        let s2 = quant
            .update(&s1, &ArrayD::from_elem(IxDyn(&[2]), 9.0), &unit_weight(), 1)
            .unwrap();

        assert_eq!(s1.scale(), s2.scale());
        assert_eq!(s2.stats().max_dev()[[0]], 9.0);
        assert_eq!(s2.quantized_variable()[[0]], 127.0);
    }

    #[test]
    fn test_quantized_variable_used_for_inference() {
        let config = TensorQuantConfig::new(IntQuantConfig::int8(), StatsConfig::new(vec![0]))
            .with_quantized_variable(true);
        let quant = TensorQuantizer::new("w", &[2], config).unwrap();
        let state = quant.init().unwrap();
        let w = ndarray::arr1(&[2.0, -1.0]).into_dyn();
        let state = quant.update(&state, &w, &unit_weight(), 0).unwrap();

        let other = Tensor::from_vec(vec![0.0, 0.0], false);
        let q = quant.to_quant(&state, &other, false).unwrap();
        assert_eq!(q.data(), state.quantized_variable());
        assert_eq!(q.data()[[0]], 127.0);

        let trained = quant.to_quant(&state, &other, true).unwrap();
        assert_eq!(trained.data()[[0]], 0.0);
    }

    #[test]
    fn test_quantized_variable_requires_full_shape() {
        let config = TensorQuantConfig::new(IntQuantConfig::int8(), StatsConfig::new(vec![0]))
            .with_quantized_variable(true);
        let quant = TensorQuantizer::new("w", &[4, 2], config).unwrap();
        let state = quant.init().unwrap();

        let short = ArrayD::from_elem(IxDyn(&[3, 2]), 1.0);
        let err = quant.update(&state, &short, &unit_weight(), 0).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        let full = ArrayD::from_elem(IxDyn(&[4, 2]), 1.0);
        let state = quant.update(&state, &full, &unit_weight(), 0).unwrap();
        let q = quant
            .to_quant(&state, &Tensor::zeros(&[4, 2], false), false)
            .unwrap();
        assert_eq!(q.shape(), &[4, 2]);

        let x = Tensor::zeros(&[3, 2], false);
        assert!(matches!(
            quant.to_quant(&state, &x, false),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_sample_keeps_unit_scale() {
        let quant = per_tensor(8, &[3]);
        let state = quant.init().unwrap();
        let state = quant
            .update(&state, &ArrayD::zeros(IxDyn(&[3])), &unit_weight(), 0)
            .unwrap();

        assert_eq!(state.scale()[[0]], 1.0);
        let y = quant
            .fake_quant(&state, &Tensor::from_vec(vec![0.4, 0.6, -2.0], false), false)
            .unwrap();
        assert_eq!(y.data().as_slice().unwrap(), &[0.0, 1.0, -2.0]);
    }

    #[test]
    fn test_const_bound_calibration() {
        let config = TensorQuantConfig::new(IntQuantConfig::int4(), StatsConfig::new(vec![0]))
            .with_calibration(CalibrationConfig::const_bound(7.0));
        let quant = TensorQuantizer::new("tq", &[3], config).unwrap();
        let state = quant.init().unwrap();
        let state = quant
            .update(&state, &ndarray::arr1(&[0.1, 0.2, 0.3]).into_dyn(), &unit_weight(), 0)
            .unwrap();

        let q = quant
            .to_quant(&state, &Tensor::from_vec(vec![3.0, -6.0, 100.0], false), false)
            .unwrap();
        assert_eq!(q.data().as_slice().unwrap(), &[3.0, -6.0, 7.0]);
    }

    #[test]
    fn test_foreign_state_rejected() {
        let a = per_tensor(8, &[2]);
        let config = TensorQuantConfig::new(IntQuantConfig::int8(), StatsConfig::default());
        let b = TensorQuantizer::new("b", &[2], config).unwrap();
        let b_state = b.init().unwrap();

        // Per-element scale [2] against a per-tensor quantizer [1]
        assert!(matches!(
            a.to_quant(&b_state, &Tensor::zeros(&[2], false), false),
            Err(Error::InvalidState(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_grid_values_in_range(
            values in prop::collection::vec(-100.0f32..100.0, 1..32),
            probe in prop::collection::vec(-1e4f32..1e4, 1..32),
            bits in 2u32..12,
        ) {
            let quant = per_tensor(bits, &[values.len()]);
            let state = quant.init().unwrap();
            let state = quant
                .update(&state, &ndarray::arr1(&values).into_dyn(), &unit_weight(), 0)
                .unwrap();

            let probe_quant = per_tensor(bits, &[probe.len()]);
            let probe_state = probe_quant.init().unwrap();
            let probe_state = probe_quant
                .update(&probe_state, &ndarray::arr1(&probe).into_dyn(), &unit_weight(), 0)
                .unwrap();
            let max_level = 2f32.powi(bits as i32 - 1) - 1.0;

            for (quant, state, data) in [(&quant, &state, &values), (&probe_quant, &probe_state, &probe)] {
                let q = quant.to_quant(state, &Tensor::from_vec(data.clone(), false), false).unwrap();
                for &v in q.data().iter() {
                    prop_assert_eq!(v, v.round());
                    prop_assert!(v.abs() <= max_level);
                }
            }
        }

        #[test]
        fn prop_fake_quant_error_within_bucket(
            values in prop::collection::vec(-50.0f32..50.0, 1..32),
        ) {
            let quant = per_tensor(8, &[values.len()]);
            let state = quant.init().unwrap();
            let state = quant
                .update(&state, &ndarray::arr1(&values).into_dyn(), &unit_weight(), 0)
                .unwrap();

            let x = Tensor::from_vec(values.clone(), false);
            let y = quant.fake_quant(&state, &x, false).unwrap();
            let bucket = state.scale()[[0]];
            for (a, b) in values.iter().zip(y.data().iter()) {
                prop_assert!((a - b).abs() <= bucket);
            }
        }
    }
}
