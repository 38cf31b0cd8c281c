use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use metrics::{counter, describe_counter};
use phishguard_common::{
    feature_index, FeatureKind, FeatureRecord, RecordError, FEATURE_SCHEMA, SCHEMA_VERSION,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{instrument, warn};

use crate::analysis::{analyze, AnalysisOutcome};
use crate::classifier::{ClassProbabilities, Label};
use crate::error::{DetectorError, Result};
use crate::loader::ModelLoader;
use crate::page::{render_page, PageState};

/// Detector application state
#[derive(Debug, Clone)]
pub struct DetectorState {
    /// Lazily loaded, process-wide classifier
    pub loader: Arc<ModelLoader>,
}

impl DetectorState {
    pub fn new(loader: ModelLoader) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }
}

/// Successful JSON prediction
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    /// Numeric class, 0 = legitimate, 1 = phishing
    pub label: u8,
    pub verdict: Label,
    /// Probability of the predicted class
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
    /// The row that was scored
    pub features: Value,
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Create the router with all endpoints
pub fn create_router(state: DetectorState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze_form))
        .route("/api/v1/predict", post(predict_json))
        .route("/api/v1/schema", get(schema))
        .route("/api/v1/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Page with the form at its defaults
#[instrument(skip(state))]
async fn index(State(state): State<DetectorState>) -> Html<String> {
    counter!("phishguard_page_views_total", 1);

    let page = match state.loader.load() {
        Ok(_) => render_page(&PageState::AwaitingInput(FeatureRecord::defaults())),
        Err(e) => render_page(&PageState::ModelUnavailable(&e)),
    };
    Html(page)
}

/// The Analyze URL action
#[instrument(skip(state, fields))]
async fn analyze_form(
    State(state): State<DetectorState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    counter!("phishguard_page_views_total", 1);

    let classifier = match state.loader.load() {
        Ok(classifier) => classifier,
        Err(e) => return Html(render_page(&PageState::ModelUnavailable(&e))).into_response(),
    };

    let record =
        match FeatureRecord::from_fields(fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Rejected form submission");
                return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response();
            }
        };

    let analysis = analyze(classifier.as_ref(), &record);
    Html(render_page(&PageState::Analyzed(record, &analysis))).into_response()
}

/// Read a record from a JSON object of integer field values
pub fn record_from_json(body: &Map<String, Value>) -> Result<FeatureRecord, RecordError> {
    let mut record = FeatureRecord::defaults();
    for (name, value) in body {
        let Some(i) = feature_index(name) else {
            continue;
        };
        let raw = whole_number(value).ok_or(RecordError::InvalidNumber {
            field: FEATURE_SCHEMA[i].name,
        })?;
        record = record.with_value(name, raw)?;
    }
    Ok(record)
}

/// Integer value of a JSON number, saturating outside the `i64` range
fn whole_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if value.as_u64().is_some() {
        return Some(i64::MAX);
    }
    // integers beyond u64 arrive as floats; `as` saturates
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i64)
}

/// JSON variant of the Analyze URL action
#[instrument(skip(state, body))]
async fn predict_json(
    State(state): State<DetectorState>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<PredictionResponse>, ApiError> {
    predict_body(&state, &body)
        .map(Json)
        .map_err(|e| api_error(status_for(&e), e))
}

fn predict_body(state: &DetectorState, body: &Map<String, Value>) -> Result<PredictionResponse> {
    let classifier = state.loader.load()?;
    let record = record_from_json(body)?;

    let analysis = analyze(classifier.as_ref(), &record);
    match analysis.outcome {
        AnalysisOutcome::Verdict(report) => Ok(PredictionResponse {
            label: report.label.code(),
            verdict: report.label,
            confidence: report.confidence(),
            probabilities: report.probabilities,
            features: analysis.row.to_json(),
        }),
        AnalysisOutcome::Failed(e) => Err(e.into()),
    }
}

/// HTTP status for an API failure
fn status_for(error: &DetectorError) -> StatusCode {
    match error {
        DetectorError::ArtifactLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        DetectorError::InvalidRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The feature schema the form and the classifier share
#[instrument]
async fn schema() -> Json<Value> {
    let features: Vec<Value> = FEATURE_SCHEMA
        .iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "label": spec.label,
                "help": spec.help,
                "kind": match spec.kind {
                    FeatureKind::Count => "count",
                    FeatureKind::Flag => "flag",
                },
                "min": spec.min,
                "max": spec.max,
                "default": spec.default,
                "group": spec.group.title(),
            })
        })
        .collect();

    Json(json!({
        "schema_version": SCHEMA_VERSION,
        "features": features,
    }))
}

/// Health check endpoint
#[instrument(skip(state))]
async fn health_check(State(state): State<DetectorState>) -> Json<Value> {
    let (status, model) = match state.loader.load() {
        Ok(classifier) => ("healthy", json!({ "loaded": true, "description": classifier.describe() })),
        Err(e) => ("degraded", json!({ "loaded": false, "error": e.to_string() })),
    };

    Json(json!({
        "status": status,
        "model": model,
        "schema_version": SCHEMA_VERSION,
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Initialize metrics descriptions
pub fn initialize_metrics() {
    describe_counter!(
        "phishguard_page_views_total",
        "Total number of page renders"
    );
    describe_counter!(
        "phishguard_analyses_total",
        "Total number of successful analyses, by verdict"
    );
    describe_counter!(
        "phishguard_inference_errors_total",
        "Total number of analyses that failed inside the classifier"
    );
    describe_counter!(
        "phishguard_model_loads_total",
        "Total number of successful classifier artifact loads"
    );
    describe_counter!(
        "phishguard_model_load_failures_total",
        "Total number of failed classifier artifact loads"
    );
}
