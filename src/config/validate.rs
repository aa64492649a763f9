//! Configuration validation

use super::schema::{QatSpec, SiteSpec};
use crate::error::Error;

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No quantizers configured")]
    NoQuantizers,

    #[error("Site '{site}': shape {shape:?} has a zero-sized axis")]
    ZeroSizedAxis { site: String, shape: Vec<usize> },

    #[error("Site '{site}': data_format '{data_format}' does not match rank {rank}")]
    DataFormatRank {
        site: String,
        data_format: String,
        rank: usize,
    },

    #[error("Site '{site}': unknown keys {keys:?}")]
    UnknownKeys { site: String, keys: Vec<String> },

    #[error("Site '{site}': {reason}")]
    InvalidSite { site: String, reason: String },
}

/// Validate a quantizer specification
///
/// Checks:
/// - At least one site is configured
/// - Sites carry no unrecognized keys
/// - Shapes have no zero-sized axes
/// - Bit widths, statistics and calibration settings are in range
/// - Convolution operands share stats along their contraction axes
pub fn validate_config(spec: &QatSpec) -> Result<(), ValidationError> {
    if spec.quantizers.is_empty() {
        return Err(ValidationError::NoQuantizers);
    }

    for (name, site) in &spec.quantizers {
        validate_site(name, site)?;
    }

    Ok(())
}

fn validate_site(name: &str, site: &SiteSpec) -> Result<(), ValidationError> {
    if !site.unknown.is_empty() {
        return Err(ValidationError::UnknownKeys {
            site: name.to_string(),
            keys: site.unknown.keys().cloned().collect(),
        });
    }

    if site.shape.contains(&0) {
        return Err(ValidationError::ZeroSizedAxis {
            site: name.to_string(),
            shape: site.shape.clone(),
        });
    }

    if let Some(conv) = &site.conv {
        if conv.data_format.chars().count() != site.shape.len() {
            return Err(ValidationError::DataFormatRank {
                site: name.to_string(),
                data_format: conv.data_format.clone(),
                rank: site.shape.len(),
            });
        }
    }

    site.to_quantizer(name)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidSite {
            site: name.to_string(),
            reason: match e {
                Error::ConfigError(msg) => msg,
                other => other.to_string(),
            },
        })
}
