//! Loading quantizer specifications from YAML

use super::schema::QatSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Load and validate a quantizer spec from a YAML file
///
/// # Example
///
/// ```no_run
/// use qat_core::config::load_config;
///
/// let spec = load_config("qat.yaml")?;
/// let quantizers = spec.build_quantizers()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<QatSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec = parse_config(&yaml_content)?;
    tracing::debug!(
        path = %config_path.as_ref().display(),
        sites = spec.quantizers.len(),
        "config loaded"
    );
    Ok(spec)
}

/// Parse and validate a quantizer spec from YAML text
pub fn parse_config(yaml: &str) -> Result<QatSpec> {
    let spec: QatSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {}", e)))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quant::CalibrationConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MNIST_YAML: &str = r#"
quantizers:
  dense1.weights:
    shape: [784, 128]
    quant_config:
      bits: 8
    stats_config:
      share_stats_axes: [0]
    use_quantized_variable: true
  conv1.inputs:
    shape: [32, 28, 28, 1]
    quant_config:
      bits: 4
      preserve_zero: false
    stats_config:
      share_stats_axes: [0, 1, 2, 3]
      ema_update_count: 100
      filter_zeros: true
    calibration_config:
      l1_dev_coeff: 3.0
    conv:
      data_format: NHWC
      feature_dim: C
"#;

    #[test]
    fn test_load_valid_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MNIST_YAML.as_bytes()).unwrap();

        let spec = load_config(temp_file.path()).unwrap();
        assert_eq!(spec.quantizers.len(), 2);

        let weights = &spec.quantizers["dense1.weights"];
        assert_eq!(weights.shape, vec![784, 128]);
        assert_eq!(weights.config.quant_config.bits, 8);
        assert!(weights.config.quant_config.preserve_zero);
        assert!(weights.config.use_quantized_variable);
        assert_eq!(weights.config.calibration_config, CalibrationConfig::max());

        let inputs = &spec.quantizers["conv1.inputs"];
        assert!(!inputs.config.quant_config.preserve_zero);
        assert_eq!(inputs.config.stats_config.ema_update_count, Some(100));
        assert_eq!(inputs.config.calibration_config.l1_dev_coeff, 3.0);
        assert_eq!(inputs.conv.as_ref().unwrap().feature_dim, 'C');
    }

    #[test]
    fn test_build_quantizers_in_name_order() {
        let spec = parse_config(MNIST_YAML).unwrap();
        let quantizers = spec.build_quantizers().unwrap();
        let names: Vec<_> = quantizers.iter().map(|q| q.name()).collect();
        assert_eq!(names, vec!["conv1.inputs", "dense1.weights"]);
    }

    #[test]
    fn test_load_invalid_config() {
        let yaml = r#"
quantizers:
  w:
    shape: [4]
    quant_config:
      bits: 30
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(err.to_string().contains("bits=30"));
    }

    #[test]
    fn test_misspelled_site_key_rejected() {
        let yaml = r#"
quantizers:
  w:
    shape: [4, 2]
    stat_config:
      share_stats_axes: [0]
"#;
        let err = parse_config(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
        assert!(err.to_string().contains("stat_config"));
    }

    #[test]
    fn test_misspelled_nested_key_rejected() {
        let yaml = r#"
quantizers:
  w:
    shape: [4]
    stats_config:
      share_stat_axes: [0]
"#;
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));

        let top = "quantizers:\n  w:\n    shape: [4]\nversion: 2\n";
        assert!(parse_config(top).is_err());
    }

    #[test]
    fn test_load_malformed_yaml() {
        let yaml = "this is not valid yaml: [}";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config("/nonexistent/qat.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
