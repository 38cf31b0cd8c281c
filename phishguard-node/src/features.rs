// Row assembly for the classifier
//
// Turns a FeatureRecord into the single-row table the classifier scores.
// Column names and order both come from the shared schema, so the form and
// the model input cannot drift apart.

use ndarray::{Array2, ArrayView1};
use phishguard_common::{feature_names, FeatureRecord, FEATURE_COUNT};
use serde_json::{Map, Value};

/// A named, single-row feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    columns: Vec<&'static str>,
    values: Array2<f64>,
}

impl FeatureRow {
    /// Build a row from raw parts.
    ///
    /// Classifiers validate the columns against what they were trained on,
    /// so this accepts any shape.
    pub fn from_parts(columns: Vec<&'static str>, values: Array2<f64>) -> Self {
        Self { columns, values }
    }

    /// Column names in order
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    /// The underlying 1×N matrix
    pub fn matrix(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of rows (1 for rows built from a record)
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Values of the first row
    pub fn first(&self) -> Option<ArrayView1<'_, f64>> {
        (self.values.nrows() > 0).then(|| self.values.row(0))
    }

    /// `(column, value)` pairs of the first row
    pub fn cells(&self) -> Vec<(&'static str, f64)> {
        match self.first() {
            Some(row) => self.columns.iter().copied().zip(row.iter().copied()).collect(),
            None => Vec::new(),
        }
    }

    /// First row as a JSON object keyed by column name
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (column, value) in self.cells() {
            // integral by construction
            map.insert(column.to_string(), Value::from(value as i64));
        }
        Value::Object(map)
    }
}

impl From<&FeatureRecord> for FeatureRow {
    fn from(record: &FeatureRecord) -> Self {
        let values = Array2::from_shape_fn((1, FEATURE_COUNT), |(_, j)| {
            f64::from(record.values()[j])
        });
        Self {
            columns: feature_names().to_vec(),
            values,
        }
    }
}
