//! Declarative YAML configuration
//!
//! Quantizer sites are described in YAML and turned into
//! [`TensorQuantizer`](crate::quant::TensorQuantizer)s.
//!
//! # Example
//!
//! ```yaml
//! quantizers:
//!   dense1.weights:
//!     shape: [784, 128]
//!     quant_config:
//!       bits: 8
//!     stats_config:
//!       share_stats_axes: [0]
//!   conv1.inputs:
//!     shape: [32, 28, 28, 1]
//!     stats_config:
//!       share_stats_axes: [0, 1, 2, 3]
//!       ema_update_count: 100
//!     conv:
//!       data_format: NHWC
//!       feature_dim: C
//! ```

mod cli;
mod load;
mod schema;
mod validate;

pub use cli::{parse_args, CalibrateArgs, Cli, Command, InfoArgs, OutputFormat, ValidateArgs};
pub use load::{load_config, parse_config};
pub use schema::{ConvSpec, QatSpec, SiteSpec};
pub use validate::{validate_config, ValidationError};
