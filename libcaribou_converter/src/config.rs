use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::constants::AD9249_EVENT_NAME;
use super::error::ConfigError;

/// Structure representing the application configuration. Contains pathing, the detector
/// type of the raw data and the converter parameters.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub raw_path: PathBuf,
    pub output_path: PathBuf,
    pub detector_type: String,
    pub parameters: BTreeMap<String, serde_yaml::Value>,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid, the converter parameters
    /// carry the AD9249 defaults so that a template is self-documenting
    fn default() -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(String::from("blStart"), serde_yaml::Value::from(150));
        parameters.insert(String::from("blEnd"), serde_yaml::Value::from(80));
        parameters.insert(String::from("ampStart"), serde_yaml::Value::from(170));
        parameters.insert(String::from("ampEnd"), serde_yaml::Value::from(270));
        parameters.insert(String::from("calib_range_min"), serde_yaml::Value::from(0.0));
        parameters.insert(
            String::from("calib_range_max"),
            serde_yaml::Value::from(16384.0),
        );
        parameters.insert(
            String::from("waveform_filename"),
            serde_yaml::Value::from(""),
        );
        parameters.insert(
            String::from("zero_suppression"),
            serde_yaml::Value::from(true),
        );
        Self {
            raw_path: PathBuf::from("None"),
            output_path: PathBuf::from("None"),
            detector_type: String::from(AD9249_EVENT_NAME),
            parameters,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file, overwriting anything already there
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Flatten the converter parameters into the string keyed lookup handed to converters
    pub fn converter_configuration(&self) -> Result<Configuration, ConfigError> {
        let mut conf = Configuration::new();
        for (key, value) in self.parameters.iter() {
            let text = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Null => String::new(),
                _ => return Err(ConfigError::NonScalarValue { key: key.clone() }),
            };
            conf.set(key, text);
        }
        Ok(conf)
    }
}

/// Configuration is the read-only key/value lookup a converter receives with every event.
///
/// Values are kept as strings and parsed on access, with the caller supplying the default
/// returned for missing keys or values that do not parse as the requested type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style setter, mostly useful for tests
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Get a typed value, or the default if the key is missing or does not parse
    pub fn get<T: FromStr>(&self, key: &str, default: T) -> T {
        match self.values.get(key) {
            Some(text) => match text.trim().parse::<T>() {
                Ok(value) => value,
                Err(_) => {
                    spdlog::warn!(
                        "Configuration value {} = {:?} could not be parsed; using default",
                        key,
                        text
                    );
                    default
                }
            },
            None => default,
        }
    }

    /// Get a string value, or the default if the key is missing
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let conf = Configuration::new()
            .with("blStart", 120)
            .with("calib_range_max", "4096.5")
            .with("waveform_filename", "waves.txt")
            .with("ampEnd", "not a number");
        assert_eq!(conf.get("blStart", 150), 120);
        assert_eq!(conf.get("calib_range_max", 16384.0), 4096.5);
        assert_eq!(conf.get("ampEnd", 270), 270);
        assert_eq!(conf.get("blEnd", 80), 80);
        assert_eq!(conf.get_string("waveform_filename", ""), "waves.txt");
        assert_eq!(conf.get_string("missing", "x"), "x");
    }

    #[test]
    fn test_integer_reads_as_float() {
        let conf = Configuration::new().with("calib_range_min", 10);
        assert_eq!(conf.get("calib_range_min", 0.0f64), 10.0);
    }

    #[test]
    fn test_parameters_from_yaml() {
        let yaml = r#"
raw_path: /data/raw
output_path: /data/out.yml
detector_type: CaribouAD9249Event
parameters:
  blStart: 100
  calib_range_max: 2000.0
  calibration_px12: "2*x + 1"
  waveform_filename: ~
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let conf = config.converter_configuration().unwrap();
        assert_eq!(conf.get("blStart", 0), 100);
        assert_eq!(conf.get("calib_range_max", 0.0), 2000.0);
        assert_eq!(conf.get_string("calibration_px12", "x"), "2*x + 1");
        assert_eq!(conf.get_string("waveform_filename", "unset"), "");
    }

    #[test]
    fn test_non_scalar_parameter() {
        let mut config = Config::default();
        config.parameters.insert(
            String::from("blStart"),
            serde_yaml::Value::Sequence(vec![serde_yaml::Value::from(1)]),
        );
        assert!(matches!(
            config.converter_configuration(),
            Err(ConfigError::NonScalarValue { .. })
        ));
    }

    #[test]
    fn test_template_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        let conf = back.converter_configuration().unwrap();
        assert_eq!(conf.get("blEnd", 0), 80);
        assert_eq!(back.detector_type, "CaribouAD9249Event");
    }
}
