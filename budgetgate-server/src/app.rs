//! HTTP surface: form submissions, approval links, and health.
//!
//! - `POST /submissions`: form-urlencoded budget request; JSON outcome
//! - `GET /approval?token=`: resolve an approval link; fixed HTML page
//! - `GET /healthz`: liveness

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use budgetgate_core::{ApprovalFlow, Submission, SubmissionOutcome};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::logging_layer::logging_layer;
use crate::pages::page_for;

// ─────────────────────────────────────────────────────────────────────────────
// Shared State
// ─────────────────────────────────────────────────────────────────────────────

/// State shared by all handlers.
pub struct AppState {
    flow: Arc<ApprovalFlow>,
}

impl AppState {
    pub fn new(flow: Arc<ApprovalFlow>) -> Self {
        Self { flow }
    }

    pub fn flow(&self) -> &Arc<ApprovalFlow> {
        &self.flow
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

/// Body of every `POST /submissions` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub outcome: SubmissionOutcome,
}

/// Query string of `GET /approval`.
#[derive(Debug, Default, Deserialize)]
pub struct ApprovalQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// HTTP status for a submission outcome.
#[must_use]
pub fn status_for(outcome: SubmissionOutcome) -> StatusCode {
    match outcome {
        SubmissionOutcome::AutoApproved => StatusCode::OK,
        SubmissionOutcome::PendingApproval => StatusCode::ACCEPTED,
        SubmissionOutcome::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
        SubmissionOutcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the application router.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/submissions", post(handle_submission))
        .route("/approval", get(handle_approval))
        .route("/healthz", get(handle_healthz))
        .layer(logging_layer())
        .with_state(state)
}

/// Bind and serve the application until `shutdown` is cancelled.
///
/// Returns the bound address (useful with port 0) and the server task.
///
/// # Errors
///
/// Returns an I/O error if the listener cannot bind.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<(SocketAddr, tokio::task::JoinHandle<Result<(), std::io::Error>>), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let router = app_router(state);

    info!(addr = %local_addr, "Budgetgate server listening");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(std::io::Error::other)
    });

    Ok((local_addr, handle))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn handle_submission(
    State(state): State<Arc<AppState>>,
    form: Result<Form<Submission>, FormRejection>,
) -> (StatusCode, Json<SubmissionResponse>) {
    let outcome = match form {
        Ok(Form(submission)) => state.flow.handle_submission(submission).await,
        Err(rejection) => state.flow.reject_unreadable(rejection.body_text()).await,
    };

    (status_for(outcome), Json(SubmissionResponse { outcome }))
}

async fn handle_approval(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ApprovalQuery>, QueryRejection>,
) -> Html<&'static str> {
    // An unreadable query string resolves like a missing token.
    let token = query.ok().and_then(|Query(q)| q.token);
    let resolution = state.flow.handle_link(token).await;
    Html(page_for(resolution))
}

async fn handle_healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
