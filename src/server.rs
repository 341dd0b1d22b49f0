//! HTTP front-end.
//!
//! Serves the survey form, the survey endpoint and the two download
//! endpoints. Every request is independent: the state only holds the arXiv
//! client and the model credential.

use crate::arxiv::{ArxivClient, PaperRecord};
use crate::config::LlmSettings;
use crate::error::SurveyError;
use crate::export::{self, ExportFormat};
use crate::llm::OpenAiChat;
use crate::pipeline::{self, SurveyParams};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared, read-only server state
#[derive(Debug, Clone)]
pub struct AppState {
    pub fetcher: ArxivClient,
    pub llm: LlmSettings,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/survey", post(survey_handler))
        .route("/export/{format}", post(export_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until the process stops
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await
}

/// Error body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

fn status_for(err: &SurveyError) -> StatusCode {
    match err {
        SurveyError::NoPapers => StatusCode::NOT_FOUND,
        SurveyError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SurveyError::Config(_) | SurveyError::Io(_) | SurveyError::Export(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        SurveyError::Network(_) | SurveyError::Api { .. } | SurveyError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for SurveyError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Form page
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Survey response
#[derive(Debug, Serialize)]
struct SurveyResponse {
    status: String,
    count: usize,
    summarized: usize,
    papers: Vec<PaperRecord>,
    survey: String,
}

/// Survey endpoint handler
async fn survey_handler(
    State(state): State<Arc<AppState>>,
    Json(params): Json<SurveyParams>,
) -> Result<Json<SurveyResponse>, SurveyError> {
    info!(
        topic = %params.topic,
        max_results = params.max_results,
        top_k = params.top_k,
        model = %params.model,
        sort_by = %params.sort_by,
        "Survey request"
    );

    params.validate()?;
    let model = OpenAiChat::new(state.llm.clone(), params.model.clone())?;

    let outcome = pipeline::run_survey(&state.fetcher, &model, &params)
        .await
        .inspect_err(|e| {
            if !matches!(e, SurveyError::NoPapers) {
                error!(error = %e, "Survey generation failed");
            }
        })?;

    Ok(Json(SurveyResponse {
        status: "success".to_string(),
        count: outcome.papers.len(),
        summarized: outcome.summarized,
        papers: outcome.papers,
        survey: outcome.survey,
    }))
}

/// Export request body
#[derive(Debug, Deserialize)]
struct ExportRequest {
    text: String,
}

/// Download endpoint handler
async fn export_handler(
    Path(format): Path<String>,
    Json(req): Json<ExportRequest>,
) -> Result<Response, SurveyError> {
    let format: ExportFormat = format.parse().map_err(|e| {
        warn!(format = %format, "Unknown export format");
        e
    })?;
    let document = export::export(&req.text, format)?;

    let headers = [
        (header::CONTENT_TYPE, document.mime.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name),
        ),
    ];
    Ok((headers, document.bytes).into_response())
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Research Assistant</title>
<style>
  body { font-family: sans-serif; display: flex; gap: 2rem; margin: 2rem; }
  aside { min-width: 16rem; }
  label { display: block; margin-top: .8rem; }
  main { flex: 1; }
  pre { white-space: pre-wrap; background: #f6f6f6; padding: 1rem; }
  .error { color: #b00020; }
</style>
</head>
<body>
<aside>
  <form id="survey-form">
    <label>Research Topic <input name="topic" value="Blue light effect on lettuce"></label>
    <label>Fetch papers from arXiv <input name="max_results" type="number" min="5" max="50" step="5" value="15"></label>
    <label>Top-K for summarization <input name="top_k" type="number" min="3" max="10" value="5"></label>
    <label>LLM
      <select name="model"><option>gpt-4</option><option selected>gpt-3.5-turbo</option></select>
    </label>
    <label>arXiv sorting
      <select name="sort_by"><option selected>relevance</option><option>submittedDate</option></select>
    </label>
    <p><button type="submit">Generate Survey</button></p>
  </form>
</aside>
<main>
  <h1>RAG Based Research Assistant</h1>
  <p>Fetch papers and generate a structured literature survey.</p>
  <p id="status"></p>
  <details id="papers-box" hidden><summary>Retrieved papers</summary><ul id="papers"></ul></details>
  <section id="result" hidden>
    <h2>Literature Survey Draft</h2>
    <pre id="survey"></pre>
    <h2>Export Report</h2>
    <button data-format="pdf">Download PDF</button>
    <button data-format="docx">Download Word</button>
  </section>
</main>
<script>
const form = document.getElementById("survey-form");
const statusLine = document.getElementById("status");
let survey = "";

form.addEventListener("submit", async (ev) => {
  ev.preventDefault();
  const data = new FormData(form);
  const params = {
    topic: data.get("topic"),
    max_results: Number(data.get("max_results")),
    top_k: Number(data.get("top_k")),
    model: data.get("model"),
    sort_by: data.get("sort_by"),
  };
  statusLine.className = "";
  statusLine.textContent = "Fetching papers and generating survey...";
  document.getElementById("result").hidden = true;
  document.getElementById("papers-box").hidden = true;

  const resp = await fetch("/survey", {
    method: "POST",
    headers: {"Content-Type": "application/json"},
    body: JSON.stringify(params),
  });
  const body = await resp.json();
  if (!resp.ok) {
    statusLine.className = "error";
    statusLine.textContent = body.message;
    return;
  }

  statusLine.textContent = `Retrieved ${body.count} papers.`;
  const list = document.getElementById("papers");
  list.replaceChildren(...body.papers.map((p) => {
    const li = document.createElement("li");
    const a = document.createElement("a");
    a.href = p.link;
    a.textContent = p.link;
    const b = document.createElement("b");
    b.textContent = p.title;
    li.append(b, ` (${p.published_year}) - `, a);
    return li;
  }));
  document.getElementById("papers-box").hidden = false;
  survey = body.survey;
  document.getElementById("survey").textContent = survey;
  document.getElementById("result").hidden = false;
});

document.querySelectorAll("button[data-format]").forEach((btn) => {
  btn.addEventListener("click", async () => {
    const format = btn.dataset.format;
    const resp = await fetch(`/export/${format}`, {
      method: "POST",
      headers: {"Content-Type": "application/json"},
      body: JSON.stringify({text: survey}),
    });
    const blob = await resp.blob();
    const a = document.createElement("a");
    a.href = URL.createObjectURL(blob);
    a.download = `literature_survey.${format}`;
    a.click();
    URL.revokeObjectURL(a.href);
  });
});
</script>
</body>
</html>
"#;
