use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use puntorojo_domain::TableRole;
use serde::Deserialize;

use crate::{
    analysis::{self, AnalysisReport},
    config::AppConfig,
    loader::TableUpload,
    sinks::html_report::render_html_report,
};

/// One uploaded table in an analyze request.
#[derive(Debug, Deserialize)]
pub struct IncomingTable {
    pub name: String,
    #[serde(default)]
    pub role: Option<TableRole>,
    pub content: String,
}

impl From<IncomingTable> for TableUpload {
    fn from(t: IncomingTable) -> Self {
        TableUpload::inline(t.name, t.role, t.content)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub tables: Vec<IncomingTable>,
}

#[derive(Clone)]
struct AppState {
    cfg: Arc<AppConfig>,
}

pub fn router(cfg: Arc<AppConfig>) -> Router {
    let body_limit = cfg.http.max_body_bytes;

    Router::new()
        .route("/", get(sample_report_html))
        .route("/healthz", get(|| async { "ok" }))
        .route("/analyze", post(analyze_json))
        .route("/analyze/html", post(analyze_html))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(AppState { cfg })
}

/// Bind and serve until the listener fails.
pub async fn serve(cfg: Arc<AppConfig>) -> anyhow::Result<()> {
    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "analysis service listening");
    axum::serve(listener, router(cfg).into_make_service()).await?;
    Ok(())
}

async fn run(state: &AppState, request: AnalyzeRequest) -> AnalysisReport {
    metrics::counter!("http_analyze_requests_total").increment(1);
    let uploads = request.tables.into_iter().map(TableUpload::from).collect();
    analysis::run_analysis(uploads, &state.cfg).await
}

fn html_response(report: &AnalysisReport) -> Response {
    match render_html_report(report) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render html report");
            metrics::counter!("http_analyze_failed_total").increment(1);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn sample_report_html(State(state): State<AppState>) -> Response {
    let report = run(&state, AnalyzeRequest::default()).await;
    html_response(&report)
}

async fn analyze_json(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<AnalysisReport> {
    Json(run(&state, request).await)
}

async fn analyze_html(State(state): State<AppState>, Json(request): Json<AnalyzeRequest>) -> Response {
    let report = run(&state, request).await;
    html_response(&report)
}
