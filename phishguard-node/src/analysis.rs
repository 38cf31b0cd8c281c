// Prediction step of the analysis action
//
// Scores one FeatureRecord and reduces the classifier's answer to exactly
// one outcome: a phishing verdict, a legitimate verdict, or an error.

use metrics::counter;
use phishguard_common::FeatureRecord;
use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{ClassProbabilities, Classifier, Label};
use crate::error::InferenceError;
use crate::features::FeatureRow;

/// Format a probability as a percentage with two decimals, e.g. `87.00%`
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// A successful prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub label: Label,
    pub probabilities: ClassProbabilities,
}

impl PredictionReport {
    /// Probability of the predicted class
    pub fn confidence(&self) -> f64 {
        self.probabilities.of(self.label)
    }

    pub fn is_phishing(&self) -> bool {
        self.label == Label::Phishing
    }

    /// `Confidence: 87.00%`
    pub fn confidence_line(&self) -> String {
        format!("Confidence: {}", format_percent(self.confidence()))
    }

    /// The two breakdown metrics, legitimate first
    pub fn metrics(&self) -> [(&'static str, String); 2] {
        [
            (
                "Legitimate Probability",
                format_percent(self.probabilities.legitimate),
            ),
            (
                "Phishing Probability",
                format_percent(self.probabilities.phishing),
            ),
        ]
    }
}

/// Result of one analysis action
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Verdict(PredictionReport),
    Failed(InferenceError),
}

impl AnalysisOutcome {
    pub fn report(&self) -> Option<&PredictionReport> {
        match self {
            AnalysisOutcome::Verdict(report) => Some(report),
            AnalysisOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&InferenceError> {
        match self {
            AnalysisOutcome::Verdict(_) => None,
            AnalysisOutcome::Failed(e) => Some(e),
        }
    }
}

/// The input row together with what the classifier made of it
#[derive(Debug, Clone)]
pub struct Analysis {
    pub row: FeatureRow,
    pub outcome: AnalysisOutcome,
}

/// Score a record.
///
/// Any classifier error is captured in the outcome; this never fails.
pub fn analyze(classifier: &dyn Classifier, record: &FeatureRecord) -> Analysis {
    let row = FeatureRow::from(record);
    let outcome = match predict(classifier, &row) {
        Ok(report) => {
            counter!("phishguard_analyses_total", 1, "verdict" => report.label.as_str());
            info!(
                verdict = %report.label,
                legitimate = report.probabilities.legitimate,
                phishing = report.probabilities.phishing,
                "URL analyzed"
            );
            AnalysisOutcome::Verdict(report)
        }
        Err(e) => {
            counter!("phishguard_inference_errors_total", 1);
            warn!(error = %e, "Prediction failed");
            AnalysisOutcome::Failed(e)
        }
    };
    Analysis { row, outcome }
}

fn predict(classifier: &dyn Classifier, row: &FeatureRow) -> Result<PredictionReport, InferenceError> {
    let label = classifier.classify(row)?;
    let probabilities = classifier.class_probabilities(row)?;
    Ok(PredictionReport {
        label,
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FailingClassifier, FixedClassifier};

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.87), "87.00%");
        assert_eq!(format_percent(0.13), "13.00%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.123456), "12.35%");
    }

    #[test]
    fn test_legitimate_verdict_uses_class_zero_probability() {
        let stub = FixedClassifier::new(Label::Legitimate, 0.87, 0.13);
        let analysis = analyze(&stub, &FeatureRecord::defaults());
        let report = analysis.outcome.report().unwrap();
        assert!(!report.is_phishing());
        assert_eq!(report.confidence_line(), "Confidence: 87.00%");
        assert_eq!(
            report.metrics(),
            [
                ("Legitimate Probability", "87.00%".to_string()),
                ("Phishing Probability", "13.00%".to_string()),
            ]
        );
    }

    #[test]
    fn test_phishing_verdict_uses_class_one_probability() {
        let stub = FixedClassifier::new(Label::Phishing, 0.22, 0.78);
        let analysis = analyze(&stub, &FeatureRecord::defaults());
        let report = analysis.outcome.report().unwrap();
        assert!(report.is_phishing());
        assert_eq!(report.confidence_line(), "Confidence: 78.00%");
    }

    #[test]
    fn test_verdict_follows_label_not_argmax() {
        // the label decides the branch even when it disagrees with the probabilities
        let stub = FixedClassifier::new(Label::Phishing, 0.6, 0.4);
        let report = analyze(&stub, &FeatureRecord::defaults())
            .outcome
            .report()
            .cloned()
            .unwrap();
        assert!(report.is_phishing());
        assert_eq!(report.confidence_line(), "Confidence: 40.00%");
    }

    #[test]
    fn test_classifier_error_yields_no_report() {
        let stub = FailingClassifier::new("boom");
        let analysis = analyze(&stub, &FeatureRecord::defaults());
        assert!(analysis.outcome.report().is_none());
        assert_eq!(
            analysis.outcome.error().unwrap().to_string(),
            "model error: boom"
        );
        // the input row is still available for display
        assert_eq!(analysis.row.cells().len(), 9);
    }

    #[test]
    fn test_invalid_distribution_is_an_error() {
        let stub = FixedClassifier::new(Label::Legitimate, 0.7, 0.7);
        let analysis = analyze(&stub, &FeatureRecord::defaults());
        assert!(matches!(
            analysis.outcome,
            AnalysisOutcome::Failed(InferenceError::InvalidProbabilities { .. })
        ));
    }
}
