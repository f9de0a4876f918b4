use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{FieldMap, PageSettings};
use crate::render::{build_dashboard, render_error_page, render_page};
use crate::snapshot::{Snapshot, SnapshotSource};

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn SnapshotSource>,
    pub fields: FieldMap,
    pub page: PageSettings,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, bind: SocketAddr) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("dashboard listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn dashboard(State(state): State<AppState>) -> Response {
    match state.source.latest().await {
        Ok(row) => {
            let snapshot = row.map(|row| Snapshot::from_row(&row, &state.fields));
            if snapshot.is_none() {
                info!(table = %state.page.table, "no snapshot rows available");
            }
            let view = build_dashboard(snapshot.as_ref(), &state.page);
            Html(render_page(&view, &state.page)).into_response()
        }
        Err(err) => {
            error!(error = %err, "failed loading snapshot");
            (StatusCode::BAD_GATEWAY, Html(render_error_page(&state.page))).into_response()
        }
    }
}
