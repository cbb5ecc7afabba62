use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalibrationError {
    #[error("Calibration formula {0:?} is empty")]
    EmptyFormula(String),
    #[error("Calibration formula {formula:?} has a syntax error at position {position}")]
    Syntax { formula: String, position: usize },
    #[error("Calibration formula {formula:?} uses unknown identifier {name:?}")]
    UnknownIdentifier { formula: String, name: String },
    #[error("Calibration formula {formula:?} calls {name} with {given} arguments; expected {expected}")]
    WrongArgumentCount {
        formula: String,
        name: String,
        given: usize,
        expected: usize,
    },
    #[error("Calibration function {name} has an invalid domain [{min}, {max}]")]
    InvalidDomain { name: String, min: f64, max: f64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config parameter {key} has a value that is not a scalar")]
    NonScalarValue { key: String },
    #[error("Config has an invalid window: {0}")]
    InvalidWindow(String),
}

#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("Converter failed due to configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Converter failed due to calibration error: {0}")]
    Calibration(#[from] CalibrationError),
    #[error("Converter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Converter could not be found: {0}")]
    UnknownDetector(#[from] RegistryError),
    #[error("Converter stream context holds state of an unexpected type")]
    ContextState,
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("No converter is registered for detector type {0:#010x}")]
    UnknownDetectorType(u32),
    #[error("Detector type {id:#010x} ({name}) already has a registered converter")]
    DuplicateDetectorType { id: u32, name: String },
}

#[derive(Debug, Error)]
pub enum RawStackError {
    #[error("RawStack failed with IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("RawStack could not open directory {0:?} because it does not exist")]
    BadFilePath(PathBuf),
    #[error("RawStack did not find any matching files in the raw data directory")]
    NoMatchingFiles,
}

#[derive(Debug, Error)]
pub enum EventWriterError {
    #[error("EventWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("EventWriter failed to convert to yaml: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to RawStack error: {0}")]
    RawStackError(#[from] RawStackError),
    #[error("Processor failed due to EventWriter error: {0}")]
    WriterError(#[from] EventWriterError),
    #[error("Processor failed due to Registry error: {0}")]
    RegistryError(#[from] RegistryError),
    #[error("Processor failed due to Converter error: {0}")]
    ConverterError(#[from] ConverterError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
}
