//! Clip bounds of the integer grid
//!
//! The display bound `(2^bits - z) / 2` is the edge of the outermost bucket.
//! The safe bound sits just inside it; scales are computed against it and
//! values are clipped to it. Clipping to the display bound would let
//! round-to-nearest-even land one bucket outside the grid (an 8-bit clip
//! of 127.5 rounds to 128).

use super::config::IntQuantConfig;
use crate::error::Result;

/// Edge of the outermost bucket: `bucket_count / 2`
pub fn get_clip_bound(config: &IntQuantConfig) -> Result<f32> {
    config.validate()?;
    let mut bucket_count = 2f64.powi(config.bits as i32);
    if config.preserve_zero {
        bucket_count -= 1.0;
    }
    Ok((bucket_count / 2.0) as f32)
}

/// Clip bound that rounding cannot push out of range
///
/// The offset `2^(bits-20)` spans several float32 ulps of the bound, so RTNE
/// stays in range, yet for `bits < 10` it stays below the `2^-bits`
/// resolution, so no integer level is lost.
pub fn safe_clip_bound(config: &IntQuantConfig) -> Result<f32> {
    let unsafe_bound = get_clip_bound(config)?;
    let bound = f64::from(unsafe_bound) - 2f64.powi(config.bits as i32 - 20);
    debug_assert!(bound < f64::from(unsafe_bound));
    Ok(bound as f32)
}

/// Snap an already clipped value onto the grid
///
/// With `preserve_zero` the grid is the integers (round half to even);
/// otherwise it is the half-integers, so that `2^bits` buckets fit
/// symmetrically around zero.
pub fn round_to_grid(x: f32, preserve_zero: bool) -> f32 {
    if preserve_zero {
        x.round_ties_even()
    } else {
        x.floor() + 0.5
    }
}

/// Largest magnitude reachable on the grid
pub fn max_grid_level(config: &IntQuantConfig) -> Result<f32> {
    Ok(round_to_grid(safe_clip_bound(config)?, config.preserve_zero))
}
