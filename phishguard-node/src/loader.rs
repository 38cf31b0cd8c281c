// Classifier artifact loader
//
// The artifact is read at most once per loader. Whatever the first attempt
// produces, a usable model or an error, is cached and handed back on every
// later call without touching storage again.

use metrics::counter;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

use crate::classifier::Classifier;
use crate::error::ArtifactLoadError;
use crate::forest::{ForestError, RandomForestModel};

/// Shared handle to a loaded classifier
pub type SharedClassifier = Arc<dyn Classifier>;

/// Lazily loads and caches the classifier artifact
pub struct ModelLoader {
    path: PathBuf,
    cached: OnceLock<Result<SharedClassifier, ArtifactLoadError>>,
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl ModelLoader {
    /// Loader for the artifact at `path`; nothing is read until first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceLock::new(),
        }
    }

    /// Loader that already holds a classifier
    pub fn with_classifier(classifier: SharedClassifier) -> Self {
        let cached = OnceLock::new();
        let _ = cached.set(Ok(classifier));
        Self {
            path: PathBuf::from("<in-memory>"),
            cached,
        }
    }

    /// Loader that already holds a load failure
    pub fn with_failure(error: ArtifactLoadError) -> Self {
        let cached = OnceLock::new();
        let path = PathBuf::from(error.path());
        let _ = cached.set(Err(error));
        Self { path, cached }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The classifier, loading it on first call
    pub fn load(&self) -> Result<SharedClassifier, ArtifactLoadError> {
        self.cached
            .get_or_init(|| load_artifact(&self.path))
            .clone()
    }

    /// Whether a load has been attempted and succeeded
    pub fn is_loaded(&self) -> bool {
        matches!(self.cached.get(), Some(Ok(_)))
    }
}

/// Read and validate the random forest artifact at `path`
pub fn load_artifact(path: &Path) -> Result<SharedClassifier, ArtifactLoadError> {
    let shown = path.display().to_string();
    info!(path = %shown, "Loading classifier artifact");

    let result = read_forest(path, &shown);
    match &result {
        Ok(model) => {
            counter!("phishguard_model_loads_total", 1);
            info!(path = %shown, model = %model.describe(), "Model loaded successfully");
        }
        Err(e) => {
            counter!("phishguard_model_load_failures_total", 1);
            error!(path = %shown, error = %e, "Failed to load classifier artifact");
        }
    }
    result
}

fn read_forest(path: &Path, shown: &str) -> Result<SharedClassifier, ArtifactLoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ArtifactLoadError::NotFound {
            path: shown.to_string(),
        },
        ErrorKind::InvalidData => ArtifactLoadError::Corrupt {
            path: shown.to_string(),
            message: format!("artifact is not UTF-8 JSON: {e}"),
        },
        _ => ArtifactLoadError::Read {
            path: shown.to_string(),
            message: e.to_string(),
        },
    })?;

    let model = RandomForestModel::from_json(&text).map_err(|e| match e {
        ForestError::Parse(e) => ArtifactLoadError::Corrupt {
            path: shown.to_string(),
            message: e.to_string(),
        },
        ForestError::Invalid(message) => ArtifactLoadError::Invalid {
            path: shown.to_string(),
            message,
        },
    })?;

    Ok(Arc::new(model))
}
