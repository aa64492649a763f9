//! Quantization-aware training primitives
//!
//! Integer quantization of tensors with statistics-driven scales:
//! - Clip bounds and the integer grid ([`clip`])
//! - Running statistics with optional EMA ([`stats`])
//! - Scale calibration from statistics ([`calibrate`])
//! - The per-tensor quantizer state machine ([`quantizer`])
//! - Straight-through estimation for the rounding step ([`ste`])

pub mod calibrate;
pub mod clip;
pub mod config;
pub mod quantizer;
pub mod shape;
pub mod stats;
pub mod ste;
pub mod store;

pub use calibrate::{calibration_bound, compute_scale};
pub use clip::{get_clip_bound, max_grid_level, round_to_grid, safe_clip_bound};
pub use config::{CalibrationConfig, IntQuantConfig, StatsConfig, TensorQuantConfig, MAX_BITS};
pub use quantizer::{QuantizerMode, QuantizerState, TensorQuantizer};
pub use shape::{check_shapes_conformal, validate_contraction, validate_conv_contraction};
pub use stats::Stats;
pub use ste::{pass_through, stop_gradient};
pub use store::QuantizerStore;
