//! Router-level tests for the PhishGuard detector
//!
//! These drive the axum router in-process with `tower::ServiceExt::oneshot`:
//! - page rendering in every model state
//! - the Analyze URL form action
//! - the JSON prediction, schema and health endpoints
//! - the bundled sample forest

use axum::body::{to_bytes, Body};
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

use phishguard_common::feature_names;
use phishguard_node::classifier::{FailingClassifier, FixedClassifier, Label};
use phishguard_node::error::ArtifactLoadError;
use phishguard_node::loader::ModelLoader;
use phishguard_node::server::{create_router, DetectorState};

const DEFAULT_FORM: &str = "NumDots=3&UrlLength=50&NumDash=0&AtSymbol=0&IpAddress=0\
                            &HttpsInHostname=0&PathLevel=3&PathLength=20&NumNumericChars=5";

fn sample_model_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../models/random_forest_model.json")
}

fn router_with(loader: ModelLoader) -> Router {
    create_router(DetectorState::new(loader))
}

fn stub_router(label: Label, legitimate: f64, phishing: f64) -> Router {
    router_with(ModelLoader::with_classifier(Arc::new(FixedClassifier::new(
        label, legitimate, phishing,
    ))))
}

fn missing_model_router() -> Router {
    router_with(ModelLoader::new("definitely/not/here/random_forest_model.json"))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn post_form(app: &Router, form: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/analyze")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn post_json(app: &Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/predict")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[cfg(test)]
mod page_tests {
    use super::*;

    #[tokio::test]
    async fn test_index_shows_form_without_results() {
        let app = stub_router(Label::Legitimate, 0.87, 0.13);
        let (status, html) = get(&app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Model loaded successfully!"));
        assert!(html.contains("<form method=\"post\" action=\"/analyze\">"));
        assert!(html.contains("Analyze URL"));
        assert!(!html.contains("Prediction Results"));
        assert!(!html.contains("Confidence:"));
    }

    #[tokio::test]
    async fn test_defaults_with_legitimate_stub() {
        let app = stub_router(Label::Legitimate, 0.87, 0.13);
        let (status, html) = post_form(&app, DEFAULT_FORM).await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("This appears to be LEGITIMATE (not phishing)"));
        assert!(html.contains("Confidence: 87.00%"));
        assert!(html.contains(
            "<div class=\"metric-label\">Legitimate Probability</div><div class=\"metric-value\">87.00%</div>"
        ));
        assert!(html.contains(
            "<div class=\"metric-label\">Phishing Probability</div><div class=\"metric-value\">13.00%</div>"
        ));
        assert!(!html.contains("PHISHING attempt"));
    }

    #[tokio::test]
    async fn test_defaults_with_phishing_stub() {
        let app = stub_router(Label::Phishing, 0.22, 0.78);
        let (status, html) = post_form(&app, DEFAULT_FORM).await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("WARNING: This appears to be a PHISHING attempt!"));
        assert!(html.contains("Confidence: 78.00%"));
        assert!(html.contains("Report this URL to your IT security team"));
        assert!(!html.contains("This appears to be LEGITIMATE"));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_stable_across_presses() {
        let app = missing_model_router();

        let (status, html) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("not found. Please ensure the file is in the same directory."));
        assert!(!html.contains("<form"));

        for _ in 0..3 {
            let (status, html) = post_form(&app, DEFAULT_FORM).await;
            assert_eq!(status, StatusCode::OK);
            assert!(html.contains("random_forest_model.json"));
            assert!(html.contains("not found"));
            assert!(!html.contains("Prediction Results"));
            assert!(!html.contains("Error making prediction"));
            assert!(!html.contains("<form"));
        }
    }

    #[tokio::test]
    async fn test_inference_error_is_rendered_in_page() {
        let app = router_with(ModelLoader::with_classifier(Arc::new(
            FailingClassifier::new("column count mismatch"),
        )));
        let (status, html) = post_form(&app, "NumDots=12&UrlLength=300").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Error making prediction: model error: column count mismatch"));
        assert!(!html.contains("Prediction Results"));
        assert!(!html.contains("Probability Breakdown"));
        // entered values survive
        assert!(html.contains("name=\"NumDots\" min=\"0\" max=\"20\" step=\"1\" value=\"12\""));
        assert!(html.contains("name=\"UrlLength\" min=\"0\" max=\"500\" step=\"1\" value=\"300\""));
    }

    #[tokio::test]
    async fn test_out_of_range_count_is_clamped() {
        let app = stub_router(Label::Legitimate, 0.5, 0.5);
        let (status, html) = post_form(&app, "NumDots=99&PathLength=-3").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("name=\"NumDots\" min=\"0\" max=\"20\" step=\"1\" value=\"20\""));
        assert!(html.contains("name=\"PathLength\" min=\"0\" max=\"200\" step=\"1\" value=\"0\""));
    }

    #[tokio::test]
    async fn test_count_beyond_i64_is_clamped() {
        let app = stub_router(Label::Legitimate, 0.5, 0.5);
        let (status, html) = post_form(&app, "UrlLength=99999999999999999999").await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("name=\"UrlLength\" min=\"0\" max=\"500\" step=\"1\" value=\"500\""));
    }

    #[tokio::test]
    async fn test_invalid_flag_is_rejected() {
        let app = stub_router(Label::Legitimate, 0.5, 0.5);
        let (status, body) = post_form(&app, "AtSymbol=2").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, "AtSymbol must be 0 or 1, got 2");
    }

    #[tokio::test]
    async fn test_non_numeric_value_is_rejected() {
        let app = stub_router(Label::Legitimate, 0.5, 0.5);
        let (status, body) = post_form(&app, "UrlLength=very+long").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("UrlLength"));
    }

    #[tokio::test]
    async fn test_schema_mismatched_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("random_forest_model.json");
        let mut names: Vec<&str> = feature_names().to_vec();
        names.swap(0, 1);
        let doc = json!({
            "format_version": 1,
            "model_type": "random_forest",
            "feature_names": names,
            "trees": [ { "nodes": [ { "kind": "leaf", "value": [1.0, 1.0] } ] } ]
        });
        std::fs::write(&path, doc.to_string()).unwrap();

        let app = router_with(ModelLoader::new(&path));
        let (status, html) = post_form(&app, DEFAULT_FORM).await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Error making prediction: feature schema mismatch"));
        assert!(!html.contains("Prediction Results"));
    }
}

#[cfg(test)]
mod api_tests {
    use super::*;

    #[tokio::test]
    async fn test_predict_json() {
        let app = stub_router(Label::Phishing, 0.22, 0.78);
        let (status, body) = post_json(&app, json!({ "NumDots": 3, "AtSymbol": 1 })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], 1);
        assert_eq!(body["verdict"], "phishing");
        assert_eq!(body["confidence"], 0.78);
        assert_eq!(body["probabilities"]["legitimate"], 0.22);
        assert_eq!(body["features"]["AtSymbol"], 1);
        assert_eq!(body["features"]["UrlLength"], 50);
    }

    #[tokio::test]
    async fn test_predict_json_without_model() {
        let app = missing_model_router();
        let (status, body) = post_json(&app, json!({})).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_predict_json_inference_error() {
        let app = router_with(ModelLoader::with_classifier(Arc::new(
            FailingClassifier::new("tree walk failed"),
        )));
        let (status, body) = post_json(&app, json!({})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "Error making prediction: model error: tree walk failed"
        );
    }

    #[tokio::test]
    async fn test_predict_json_clamps_count_beyond_i64() {
        let app = stub_router(Label::Legitimate, 0.9, 0.1);
        let body: Value = serde_json::from_str(r#"{ "UrlLength": 18446744073709551615 }"#).unwrap();
        let (status, body) = post_json(&app, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["features"]["UrlLength"], 500);
    }

    #[tokio::test]
    async fn test_predict_json_rejects_invalid_flag() {
        let app = stub_router(Label::Legitimate, 0.9, 0.1);
        let (status, body) = post_json(&app, json!({ "HttpsInHostname": 7 })).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"],
            "Invalid feature value: HttpsInHostname must be 0 or 1, got 7"
        );
    }

    #[tokio::test]
    async fn test_schema_endpoint() {
        let app = stub_router(Label::Legitimate, 0.9, 0.1);
        let (status, body) = get(&app, "/api/v1/schema").await;
        let body: Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schema_version"], 1);
        let names: Vec<&str> = body["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, feature_names().to_vec());
        assert_eq!(body["features"][3]["kind"], "flag");
        assert_eq!(body["features"][1]["max"], 500);
    }

    #[tokio::test]
    async fn test_health_reports_model_state() {
        let (_, body) = get(&stub_router(Label::Legitimate, 0.9, 0.1), "/api/v1/health").await;
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model"]["loaded"], true);

        let (_, body) = get(&missing_model_router(), "/api/v1/health").await;
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["status"], "degraded");
        assert!(body["model"]["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_preloaded_failure_never_touches_storage() {
        let app = router_with(ModelLoader::with_failure(ArtifactLoadError::Corrupt {
            path: "random_forest_model.json".to_string(),
            message: "invalid load key".to_string(),
        }));
        let (_, html) = get(&app, "/").await;
        assert!(html.contains("Error loading model: invalid load key"));
    }
}

#[cfg(test)]
mod sample_model_tests {
    use super::*;

    fn sample_router() -> Router {
        router_with(ModelLoader::new(sample_model_path()))
    }

    #[tokio::test]
    async fn test_sample_model_defaults_look_legitimate() {
        let (status, body) = post_json(&sample_router(), json!({})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "legitimate");
        let legitimate = body["probabilities"]["legitimate"].as_f64().unwrap();
        let phishing = body["probabilities"]["phishing"].as_f64().unwrap();
        assert!((legitimate + phishing - 1.0).abs() < 1e-6);
        assert!(legitimate > 0.85);
    }

    #[tokio::test]
    async fn test_sample_model_all_minimums() {
        let body: Value = feature_names().iter().map(|n| (n.to_string(), json!(0))).collect();
        let (status, body) = post_json(&sample_router(), body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["confidence"].as_f64().unwrap() >= 0.5);
    }

    #[tokio::test]
    async fn test_sample_model_all_maximums() {
        let body = json!({
            "NumDots": 20, "UrlLength": 500, "NumDash": 20,
            "AtSymbol": 1, "IpAddress": 1, "HttpsInHostname": 1,
            "PathLevel": 20, "PathLength": 200, "NumNumericChars": 100
        });
        let (status, body) = post_json(&sample_router(), body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verdict"], "phishing");
        assert_eq!(body["label"], 1);
    }

    #[tokio::test]
    async fn test_sample_model_page_round_trip() {
        let (status, html) = post_form(&sample_router(), DEFAULT_FORM).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("This appears to be LEGITIMATE (not phishing)"));
        assert!(html.contains("View Input Data"));
    }
}
