//! # qat-core: Quantization-Aware Training Primitives
//!
//! qat-core provides the building blocks for simulating integer quantization
//! during training: a small tape-based autograd engine, running statistics,
//! scale calibration and a per-tensor quantizer with straight-through
//! gradients.
//!
//! ## Architecture
//!
//! - **autograd**: Tape-based automatic differentiation
//! - **quant**: Clip bounds, statistics, calibration, quantizer state machine
//! - **config**: Declarative YAML description of quantizer sites

pub mod autograd;
pub mod config;
pub mod quant;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use error::{Error, Result};
pub use quant::{QuantizerState, TensorQuantConfig, TensorQuantizer};
