// Random forest classifier artifact
//
// The artifact is a JSON document produced by the training pipeline. Each
// tree is a flat node list in which node 0 is the root and every child sits
// after its parent, so evaluation always terminates.

use ndarray::ArrayView1;
use phishguard_common::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::classifier::{ClassProbabilities, Classifier, Label};
use crate::error::InferenceError;
use crate::features::FeatureRow;

/// Model type tag accepted by this loader
pub const MODEL_TYPE: &str = "random_forest";

/// Serialized form of the whole forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    /// Feature schema version the forest was trained against
    pub format_version: u32,
    pub model_type: String,
    /// Training-time column names, in order
    pub feature_names: Vec<String>,
    pub trees: Vec<TreeArtifact>,
}

/// Serialized form of a single decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<TreeNode>,
}

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// `x[feature] <= threshold` continues at `left`, otherwise at `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class sample weights `[legitimate, phishing]`
    Leaf { value: [f64; 2] },
}

/// Reasons an artifact document cannot become a model
#[derive(Error, Debug)]
pub enum ForestError {
    /// Not valid JSON, or not the expected document shape
    #[error("{0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed document describing an unusable forest
    #[error("{0}")]
    Invalid(String),
}

/// Validated random forest ready for inference
#[derive(Debug, Clone)]
pub struct RandomForestModel {
    feature_names: Vec<String>,
    trees: Vec<Vec<TreeNode>>,
}

impl RandomForestModel {
    /// Parse and validate an artifact document
    pub fn from_json(json: &str) -> Result<Self, ForestError> {
        let artifact: ForestArtifact = serde_json::from_str(json)?;
        Self::try_from(artifact)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Validate the row against the training-time columns and return its values
    fn input<'a>(&self, row: &'a FeatureRow) -> Result<ArrayView1<'a, f64>, InferenceError> {
        let columns_match = row.columns().len() == self.feature_names.len()
            && row
                .columns()
                .iter()
                .zip(&self.feature_names)
                .all(|(column, expected)| column == expected);
        if !columns_match {
            return Err(InferenceError::SchemaMismatch {
                expected: self.feature_names.join(", "),
                found: row.columns().join(", "),
            });
        }

        if row.n_rows() != 1 {
            return Err(InferenceError::InvalidInput(format!(
                "expected exactly one row, got {}",
                row.n_rows()
            )));
        }
        if row.matrix().ncols() != self.feature_names.len() {
            return Err(InferenceError::InvalidInput(format!(
                "row has {} values for {} columns",
                row.matrix().ncols(),
                self.feature_names.len()
            )));
        }

        let values = row.matrix().row(0);
        if let Some(position) = values.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::InvalidInput(format!(
                "{} is not a finite number",
                self.feature_names[position]
            )));
        }
        Ok(values)
    }

    /// Leaf weights reached by `x` in tree `index`
    fn leaf(&self, index: usize, x: &ArrayView1<'_, f64>) -> Result<[f64; 2], InferenceError> {
        let nodes = &self.trees[index];
        let mut cursor = 0;
        loop {
            match nodes.get(cursor) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    cursor = if x[*feature] <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                None => {
                    return Err(InferenceError::Model(format!(
                        "tree {index} has no node {cursor}"
                    )))
                }
            }
        }
    }

    /// Mean of the per-tree class distributions
    fn probabilities(&self, x: &ArrayView1<'_, f64>) -> Result<ClassProbabilities, InferenceError> {
        let mut legitimate = 0.0;
        let mut phishing = 0.0;
        for index in 0..self.trees.len() {
            let [l, p] = self.leaf(index, x)?;
            let total = l + p;
            legitimate += l / total;
            phishing += p / total;
        }
        let n = self.trees.len() as f64;
        ClassProbabilities::new(legitimate / n, phishing / n)
    }
}

impl TryFrom<ForestArtifact> for RandomForestModel {
    type Error = ForestError;

    fn try_from(artifact: ForestArtifact) -> Result<Self, Self::Error> {
        if artifact.format_version != SCHEMA_VERSION {
            return Err(ForestError::Invalid(format!(
                "unsupported format_version {}, expected {}",
                artifact.format_version, SCHEMA_VERSION
            )));
        }
        if artifact.model_type != MODEL_TYPE {
            return Err(ForestError::Invalid(format!(
                "unsupported model_type '{}', expected '{}'",
                artifact.model_type, MODEL_TYPE
            )));
        }
        if artifact.feature_names.is_empty() {
            return Err(ForestError::Invalid("feature_names is empty".to_string()));
        }
        if artifact.trees.is_empty() {
            return Err(ForestError::Invalid("forest has no trees".to_string()));
        }

        let n_features = artifact.feature_names.len();
        for (t, tree) in artifact.trees.iter().enumerate() {
            validate_tree(t, &tree.nodes, n_features).map_err(ForestError::Invalid)?;
        }

        debug!(
            trees = artifact.trees.len(),
            features = n_features,
            "Random forest artifact validated"
        );

        Ok(Self {
            feature_names: artifact.feature_names,
            trees: artifact.trees.into_iter().map(|t| t.nodes).collect(),
        })
    }
}

fn validate_tree(t: usize, nodes: &[TreeNode], n_features: usize) -> Result<(), String> {
    if nodes.is_empty() {
        return Err(format!("tree {t} has no nodes"));
    }
    for (i, node) in nodes.iter().enumerate() {
        match node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= n_features {
                    return Err(format!(
                        "tree {t} node {i} splits on feature {feature}, but only {n_features} features exist"
                    ));
                }
                if !threshold.is_finite() {
                    return Err(format!("tree {t} node {i} has a non-finite threshold"));
                }
                for child in [*left, *right] {
                    if child <= i || child >= nodes.len() {
                        return Err(format!(
                            "tree {t} node {i} points to invalid child {child}"
                        ));
                    }
                }
            }
            TreeNode::Leaf { value } => {
                let sane = value.iter().all(|w| w.is_finite() && *w >= 0.0);
                if !sane || value[0] + value[1] <= 0.0 {
                    return Err(format!(
                        "tree {t} node {i} has invalid class weights {value:?}"
                    ));
                }
            }
        }
    }
    Ok(())
}

impl Classifier for RandomForestModel {
    fn classify(&self, row: &FeatureRow) -> Result<Label, InferenceError> {
        let x = self.input(row)?;
        Ok(self.probabilities(&x)?.argmax())
    }

    fn class_probabilities(&self, row: &FeatureRow) -> Result<ClassProbabilities, InferenceError> {
        let x = self.input(row)?;
        self.probabilities(&x)
    }

    fn describe(&self) -> String {
        format!(
            "random forest ({} trees, {} features)",
            self.trees.len(),
            self.feature_names.len()
        )
    }
}
