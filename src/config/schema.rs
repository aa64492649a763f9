//! YAML schema for declarative quantizer configuration

use crate::error::Result;
use crate::quant::{validate_conv_contraction, TensorQuantConfig, TensorQuantizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every quantized tensor site of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QatSpec {
    /// Sites keyed by name, e.g. `dense1.weights`
    pub quantizers: BTreeMap<String, SiteSpec>,
}

/// One quantized tensor site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSpec {
    /// Data shape of the tensor
    pub shape: Vec<usize>,

    /// Quantization policy (`quant_config`, `stats_config`, ...)
    #[serde(flatten)]
    pub config: TensorQuantConfig,

    /// Present when the tensor feeds a convolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conv: Option<ConvSpec>,

    /// Keys no other field claimed; validation rejects a non-empty map
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_yaml::Value>,
}

/// Layout of a convolution operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvSpec {
    /// Axis letters, e.g. `NHWC` for inputs or `HWIO` for filters
    pub data_format: String,

    /// Contracted feature axis letter: `C` for inputs, `I` for filters
    pub feature_dim: char,
}

impl SiteSpec {
    /// Build the quantizer for this site
    pub fn to_quantizer(&self, name: &str) -> Result<TensorQuantizer> {
        if let Some(conv) = &self.conv {
            validate_conv_contraction(
                &self.config.stats_config,
                &format!("quantizers.{name}.stats_config"),
                &conv.data_format,
                conv.feature_dim,
            )?;
        }
        TensorQuantizer::new(name, &self.shape, self.config.clone())
    }
}

impl QatSpec {
    /// Build every quantizer, in name order
    pub fn build_quantizers(&self) -> Result<Vec<TensorQuantizer>> {
        self.quantizers
            .iter()
            .map(|(name, site)| site.to_quantizer(name))
            .collect()
    }
}
