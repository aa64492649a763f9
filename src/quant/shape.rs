//! Shape conformance and contraction-axis checks

use super::config::StatsConfig;
use crate::error::{Error, Result};

/// Checks that `actual` conforms to `expected`
///
/// Conformal means equal rank and equal size on every axis where `expected`
/// is `Some`. `None` places no requirement on that axis. The relation is
/// not symmetric.
pub fn check_shapes_conformal(actual: &[usize], expected: &[Option<usize>]) -> Result<()> {
    let compatible_rank = actual.len() == expected.len();
    let compatible_size = actual
        .iter()
        .zip(expected)
        .all(|(&got, want)| want.map_or(true, |w| w == got));

    if compatible_rank && compatible_size {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            expected: expected.to_vec(),
            got: actual.to_vec(),
        })
    }
}

/// Shape of the accumulated statistics: shared axes collapse to 1
pub fn stats_shape(data_shape: &[usize], share_stats_axes: &[usize]) -> Vec<usize> {
    data_shape
        .iter()
        .enumerate()
        .map(|(axis, &dim)| {
            if share_stats_axes.contains(&axis) {
                1
            } else {
                dim
            }
        })
        .collect()
}

/// Expected sample shape given the stats shape: shared axes are free
pub fn sample_expectation(stats_shape: &[usize], share_stats_axes: &[usize]) -> Vec<Option<usize>> {
    stats_shape
        .iter()
        .enumerate()
        .map(|(axis, &dim)| (!share_stats_axes.contains(&axis)).then_some(dim))
        .collect()
}

/// Every contraction axis of a consuming operation must share its stats
///
/// A contraction computes an implicit inner product over these axes; a
/// scale that varies along them would change the product by more than
/// quantization noise.
pub fn validate_contraction(
    config: &StatsConfig,
    config_path: &str,
    contraction_axes: &[usize],
) -> Result<()> {
    for &axis in contraction_axes {
        if !config.share_stats_axes.contains(&axis) {
            return Err(Error::ConfigError(format!(
                "expected contraction axis ({axis}) to be in \
                 {config_path}.share_stats_axes={:?}",
                config.share_stats_axes
            )));
        }
    }
    Ok(())
}

/// Convolution flavour of [`validate_contraction`]
///
/// `data_format` spells the axes, e.g. `"NHWC"` for inputs or `"HWIO"` for
/// filters; `feature_dim` is the contracted feature axis (`'C'` for inputs,
/// `'I'` for filters). Height, width and feature axes must all be shared.
pub fn validate_conv_contraction(
    config: &StatsConfig,
    config_path: &str,
    data_format: &str,
    feature_dim: char,
) -> Result<()> {
    let axes = [("height", 'H'), ("width", 'W'), ("channel", feature_dim)];

    for (axis_name, dim) in axes {
        let axis = data_format.chars().position(|c| c == dim).ok_or_else(|| {
            Error::ConfigError(format!(
                "data_format '{data_format}' has no '{dim}' ({axis_name}) axis"
            ))
        })?;
        if !config.share_stats_axes.contains(&axis) {
            return Err(Error::ConfigError(format!(
                "expected {axis_name} contraction axis ({axis}) to be in \
                 {config_path}.share_stats_axes={:?}",
                config.share_stats_axes
            )));
        }
    }
    Ok(())
}
