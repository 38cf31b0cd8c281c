use phishguard_common::RecordError;
use thiserror::Error;

/// Failure to obtain a usable classifier from the artifact file.
///
/// Cloneable so a cached failure can be reported on every render.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArtifactLoadError {
    /// The artifact file does not exist
    #[error("Model file '{path}' not found. Please ensure the file is in the same directory.")]
    NotFound { path: String },

    /// The file exists but could not be read
    #[error("Error loading model: {message}")]
    Read { path: String, message: String },

    /// The file is not a well-formed artifact document
    #[error("Error loading model: {message}")]
    Corrupt { path: String, message: String },

    /// The document parsed but describes an unusable model
    #[error("Error loading model: {message}")]
    Invalid { path: String, message: String },
}

impl ArtifactLoadError {
    /// Path of the artifact that failed to load
    pub fn path(&self) -> &str {
        match self {
            ArtifactLoadError::NotFound { path }
            | ArtifactLoadError::Read { path, .. }
            | ArtifactLoadError::Corrupt { path, .. }
            | ArtifactLoadError::Invalid { path, .. } => path,
        }
    }
}

/// Failure raised by a classifier while scoring a row
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// The row's columns differ from the columns the model was trained on
    #[error("feature schema mismatch: model expects [{expected}], row has [{found}]")]
    SchemaMismatch { expected: String, found: String },

    /// The row itself is malformed
    #[error("invalid input row: {0}")]
    InvalidInput(String),

    /// Class probabilities do not form a distribution
    #[error("invalid class probabilities: legitimate={legitimate}, phishing={phishing}")]
    InvalidProbabilities { legitimate: f64, phishing: f64 },

    /// Any other model malfunction
    #[error("model error: {0}")]
    Model(String),
}

/// Errors that can occur in the detector node library
#[derive(Error, Debug)]
pub enum DetectorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classifier artifact could not be loaded
    #[error(transparent)]
    ArtifactLoad(#[from] ArtifactLoadError),

    /// Classifier failed during inference
    #[error("Error making prediction: {0}")]
    Inference(#[from] InferenceError),

    /// Submitted feature values were rejected
    #[error("Invalid feature value: {0}")]
    InvalidRecord(#[from] RecordError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias using DetectorError
pub type Result<T, E = DetectorError> = std::result::Result<T, E>;

impl From<String> for DetectorError {
    fn from(s: String) -> Self {
        DetectorError::Other(s)
    }
}

impl From<&str> for DetectorError {
    fn from(s: &str) -> Self {
        DetectorError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for DetectorError {
    fn from(err: serde_json::Error) -> Self {
        DetectorError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for DetectorError {
    fn from(err: config::ConfigError) -> Self {
        DetectorError::Config(err.to_string())
    }
}
