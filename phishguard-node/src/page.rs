// HTML rendering of the detector page
//
// Every request renders the whole page from scratch: header, model status,
// the feature form, the optional analysis results and the About sidebar.

use phishguard_common::{FeatureRecord, FeatureSpec, FormGroup};

use crate::analysis::{Analysis, AnalysisOutcome, PredictionReport};
use crate::error::ArtifactLoadError;
use crate::features::FeatureRow;

/// What the page shows on this render pass
#[derive(Debug)]
pub enum PageState<'a> {
    /// The classifier artifact could not be loaded; nothing can be predicted
    ModelUnavailable(&'a ArtifactLoadError),
    /// Model ready, form shown with the given values
    AwaitingInput(FeatureRecord),
    /// Model ready and an analysis was requested
    Analyzed(FeatureRecord, &'a Analysis),
}

const PAGE_TITLE: &str = "Phishing URL Detector";

const STYLE: &str = r#"
    body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 0; display: flex; color: #262730; }
    aside { width: 300px; min-height: 100vh; background: #f0f2f6; padding: 24px; box-sizing: border-box; }
    main { flex: 1; padding: 32px 48px; max-width: 1100px; }
    .columns { display: flex; gap: 32px; }
    .column { flex: 1; }
    label { display: block; margin-top: 12px; font-size: 14px; }
    input, select { width: 100%; padding: 6px; margin-top: 4px; box-sizing: border-box; }
    button { width: 100%; margin-top: 24px; padding: 10px; background: #ff4b4b; color: white; border: 0; border-radius: 6px; font-size: 16px; cursor: pointer; }
    .alert { padding: 12px 16px; border-radius: 6px; margin: 12px 0; }
    .alert.success { background: #dff5e3; color: #14532d; }
    .alert.error { background: #fde2e2; color: #7f1d1d; }
    .metrics { display: flex; gap: 32px; }
    .metric-label { font-size: 14px; }
    .metric-value { font-size: 32px; }
    table { border-collapse: collapse; }
    th, td { border: 1px solid #ddd; padding: 4px 8px; text-align: right; }
"#;

/// Escape text for inclusion in HTML element content or attributes
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render the complete page
pub fn render_page(state: &PageState<'_>) -> String {
    let mut body = String::new();
    body.push_str("<h1>🔒 Phishing URL Detection System</h1>\n");
    body.push_str(
        "<p>This application uses a Random Forest machine learning model to detect phishing URLs.\n\
         Enter the URL features below to check if a URL is legitimate or a phishing attempt.</p>\n",
    );

    match state {
        PageState::ModelUnavailable(error) => {
            body.push_str(&alert("error", &escape_html(&error.to_string())));
        }
        PageState::AwaitingInput(record) => {
            body.push_str(&alert("success", "✅ Model loaded successfully!"));
            body.push_str(&feature_form(record));
        }
        PageState::Analyzed(record, analysis) => {
            body.push_str(&alert("success", "✅ Model loaded successfully!"));
            body.push_str(&feature_form(record));
            body.push_str(&input_preview(&analysis.row));
            body.push_str(&results(&analysis.outcome));
        }
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{PAGE_TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         {sidebar}<main>\n{body}</main>\n</body>\n</html>\n",
        sidebar = sidebar(),
    )
}

fn alert(kind: &str, html: &str) -> String {
    format!("<div class=\"alert {kind}\">{html}</div>\n")
}

/// Two-column form built from the shared schema
fn feature_form(record: &FeatureRecord) -> String {
    let mut html = String::from("<form method=\"post\" action=\"/analyze\">\n<div class=\"columns\">\n");
    for group in [FormGroup::UrlStructure, FormGroup::Additional] {
        html.push_str(&format!(
            "<div class=\"column\">\n<h3>{}</h3>\n",
            group.title()
        ));
        for (spec, value) in record.iter().filter(|(spec, _)| spec.group == group) {
            html.push_str(&control(spec, value));
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n<hr>\n<button type=\"submit\">🔍 Analyze URL</button>\n</form>\n");
    html
}

fn control(spec: &FeatureSpec, value: u32) -> String {
    let input = if spec.is_flag() {
        let options: String = [0u32, 1]
            .iter()
            .map(|option| {
                let selected = if *option == value { " selected" } else { "" };
                format!("<option value=\"{option}\"{selected}>{option}</option>")
            })
            .collect();
        format!(
            "<select id=\"{name}\" name=\"{name}\">{options}</select>",
            name = spec.name
        )
    } else {
        format!(
            "<input type=\"number\" id=\"{name}\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"1\" value=\"{value}\" required>",
            name = spec.name,
            min = spec.min,
            max = spec.max,
        )
    };
    format!(
        "<label for=\"{name}\" title=\"{help}\">{label}{input}</label>\n",
        name = spec.name,
        help = escape_html(spec.help),
        label = escape_html(spec.label),
    )
}

/// Collapsible table showing the exact row handed to the classifier
fn input_preview(row: &FeatureRow) -> String {
    let cells = row.cells();
    let header: String = cells
        .iter()
        .map(|(column, _)| format!("<th>{column}</th>"))
        .collect();
    let values: String = cells
        .iter()
        .map(|(_, value)| format!("<td>{value}</td>"))
        .collect();
    format!(
        "<details>\n<summary>📊 View Input Data</summary>\n\
         <table><thead><tr>{header}</tr></thead><tbody><tr>{values}</tr></tbody></table>\n\
         </details>\n"
    )
}

fn results(outcome: &AnalysisOutcome) -> String {
    match outcome {
        AnalysisOutcome::Verdict(report) => verdict(report),
        AnalysisOutcome::Failed(error) => alert(
            "error",
            &format!("Error making prediction: {}", escape_html(&error.to_string())),
        ),
    }
}

fn verdict(report: &PredictionReport) -> String {
    let mut html = String::from("<hr>\n<h2>🎯 Prediction Results</h2>\n");

    if report.is_phishing() {
        html.push_str(&alert(
            "error",
            "⚠️ <strong>WARNING: This appears to be a PHISHING attempt!</strong>",
        ));
        html.push_str(&format!("<p class=\"confidence\">{}</p>\n", report.confidence_line()));
        html.push_str(
            "<p><strong>Recommendation:</strong></p>\n<ul>\n\
             <li>Do NOT visit this URL</li>\n\
             <li>Do NOT enter any personal information</li>\n\
             <li>Report this URL to your IT security team</li>\n</ul>\n",
        );
    } else {
        html.push_str(&alert(
            "success",
            "✅ <strong>This appears to be LEGITIMATE (not phishing)</strong>",
        ));
        html.push_str(&format!("<p class=\"confidence\">{}</p>\n", report.confidence_line()));
        html.push_str(
            "<p><strong>Note:</strong> While the model predicts this is legitimate, \
             always exercise caution online.</p>\n",
        );
    }

    html.push_str("<hr>\n<h2>📈 Probability Breakdown</h2>\n<div class=\"metrics\">\n");
    for (label, value) in report.metrics() {
        html.push_str(&format!(
            "<div class=\"metric\"><div class=\"metric-label\">{label}</div>\
             <div class=\"metric-value\">{value}</div></div>\n"
        ));
    }
    html.push_str("</div>\n");
    html
}

const ABOUT_FEATURES: [&str; 8] = [
    "Number of dots in URL",
    "URL length",
    "Number of dashes",
    "Presence of @ symbol",
    "Use of IP address",
    "HTTPS in hostname",
    "Path depth and length",
    "Numeric characters count",
];

/// Static About panel, rendered in every state
fn sidebar() -> String {
    let features: String = ABOUT_FEATURES
        .iter()
        .map(|feature| format!("<li>{feature}</li>"))
        .collect();
    format!(
        "<aside>\n<h2>ℹ️ About</h2>\n\
         <p>This application uses machine learning to detect phishing URLs based on their structural features.</p>\n\
         <p><strong>Features Used:</strong></p>\n<ul>{features}</ul>\n\
         <p><strong>Model:</strong> Random Forest Classifier</p>\n<hr>\n\
         <p><strong>⚠️ Disclaimer</strong></p>\n\
         <p><small>This tool is for educational purposes. Always verify URLs through multiple methods before accessing them.</small></p>\n\
         </aside>\n"
    )
}
