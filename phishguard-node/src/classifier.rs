use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InferenceError;
use crate::features::FeatureRow;

/// Allowed drift of `legitimate + phishing` away from 1.0
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Predicted class of a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Class 0
    Legitimate,
    /// Class 1
    Phishing,
}

impl Label {
    /// Numeric class code used by the model
    pub fn code(self) -> u8 {
        match self {
            Label::Legitimate => 0,
            Label::Phishing => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Label::Legitimate),
            1 => Some(Label::Phishing),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Legitimate => "legitimate",
            Label::Phishing => "phishing",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability of each class, `[P(legitimate), P(phishing)]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub legitimate: f64,
    pub phishing: f64,
}

impl ClassProbabilities {
    /// Build a distribution, rejecting anything that is not one
    pub fn new(legitimate: f64, phishing: f64) -> Result<Self, InferenceError> {
        let valid = legitimate.is_finite()
            && phishing.is_finite()
            && (0.0..=1.0).contains(&legitimate)
            && (0.0..=1.0).contains(&phishing)
            && (legitimate + phishing - 1.0).abs() <= PROBABILITY_TOLERANCE;

        if valid {
            Ok(Self {
                legitimate,
                phishing,
            })
        } else {
            Err(InferenceError::InvalidProbabilities {
                legitimate,
                phishing,
            })
        }
    }

    /// Probability assigned to `label`
    pub fn of(&self, label: Label) -> f64 {
        match label {
            Label::Legitimate => self.legitimate,
            Label::Phishing => self.phishing,
        }
    }

    /// Most probable class; ties go to the first class
    pub fn argmax(&self) -> Label {
        if self.phishing > self.legitimate {
            Label::Phishing
        } else {
            Label::Legitimate
        }
    }
}

/// A binary URL classifier.
///
/// Concrete models live behind this trait so the page can be driven by the
/// random forest in production and by fixed doubles in tests.
pub trait Classifier: fmt::Debug + Send + Sync {
    /// Predicted class of the first row
    fn classify(&self, row: &FeatureRow) -> Result<Label, InferenceError>;

    /// Class probabilities of the first row
    fn class_probabilities(&self, row: &FeatureRow) -> Result<ClassProbabilities, InferenceError>;

    /// Short model description for logs and the health endpoint
    fn describe(&self) -> String {
        "classifier".to_string()
    }
}

/// Stub classifiers for driving the page without a trained model
#[cfg(any(test, feature = "test-util"))]
mod doubles {
    use super::*;

    /// Classifier that always answers the same way
    #[derive(Debug, Clone)]
    pub struct FixedClassifier {
        label: Label,
        probabilities: (f64, f64),
    }

    impl FixedClassifier {
        /// Probabilities are passed through unchecked so tests can feed broken values
        pub fn new(label: Label, legitimate: f64, phishing: f64) -> Self {
            Self {
                label,
                probabilities: (legitimate, phishing),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn classify(&self, _row: &FeatureRow) -> Result<Label, InferenceError> {
            Ok(self.label)
        }

        fn class_probabilities(&self, _row: &FeatureRow) -> Result<ClassProbabilities, InferenceError> {
            let (legitimate, phishing) = self.probabilities;
            ClassProbabilities::new(legitimate, phishing)
        }

        fn describe(&self) -> String {
            format!("fixed classifier ({})", self.label)
        }
    }

    /// Classifier that fails every call with the given message
    #[derive(Debug, Clone)]
    pub struct FailingClassifier {
        message: String,
    }

    impl FailingClassifier {
        pub fn new(message: impl Into<String>) -> Self {
            Self {
                message: message.into(),
            }
        }
    }

    impl Classifier for FailingClassifier {
        fn classify(&self, _row: &FeatureRow) -> Result<Label, InferenceError> {
            Err(InferenceError::Model(self.message.clone()))
        }

        fn class_probabilities(&self, _row: &FeatureRow) -> Result<ClassProbabilities, InferenceError> {
            Err(InferenceError::Model(self.message.clone()))
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use doubles::{FailingClassifier, FixedClassifier};
