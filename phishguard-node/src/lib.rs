//! PhishGuard Detector Node Library
//!
//! Serves an interactive page that scores nine URL-structure features with a
//! pre-trained random forest and reports whether the URL looks like phishing.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod forest;
pub mod loader;
pub mod page;
pub mod server;

// Re-export commonly used types
pub use analysis::{analyze, Analysis, AnalysisOutcome, PredictionReport};
pub use classifier::{ClassProbabilities, Classifier, Label};
pub use config::DetectorConfig;
pub use error::{ArtifactLoadError, DetectorError, InferenceError};
pub use features::FeatureRow;
pub use forest::RandomForestModel;
pub use loader::ModelLoader;
pub use server::{create_router, DetectorState};
