//! Shared fixtures for server integration tests.
//!
//! - [`MockDownstream`]: axum server recording forwarded payloads
//! - [`RecordingMailer`] / [`RecordingSink`]: in-memory collaborators
//! - [`TestApp`]: the full service on an ephemeral port

#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use budgetgate_core::notify::{EmailMessage, MailError};
use budgetgate_core::{
    ApprovalFlow, CriticalReport, CriticalSink, FailureStage, FlowSettings, HttpForwarder, Mailer,
    Notifier, TokenStore, TokenStoreConfig,
};
use budgetgate_server::{AppState, start_server};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const BASE_URL: &str = "https://approvals.example.com/approval";

// ============================================================================
// Mock Downstream
// ============================================================================

#[derive(Debug, Default)]
struct DownstreamState {
    status: AtomicU16,
    payloads: Mutex<Vec<Value>>,
}

/// Downstream endpoint answering every POST with a configurable status.
#[derive(Debug, Clone)]
pub struct MockDownstream {
    state: Arc<DownstreamState>,
    pub url: String,
}

impl MockDownstream {
    pub async fn start() -> Self {
        let state = Arc::new(DownstreamState {
            status: AtomicU16::new(200),
            payloads: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/requests", post(record_payload))
            .with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            url: format!("http://{addr}/requests"),
        }
    }

    pub fn respond_with(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.state.payloads.lock().unwrap().clone()
    }
}

async fn record_payload(
    State(state): State<Arc<DownstreamState>>,
    Json(payload): Json<Value>,
) -> (StatusCode, &'static str) {
    state.payloads.lock().unwrap().push(payload);
    let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, "downstream says hello")
}

// ============================================================================
// Recording Collaborators
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<EmailMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == address)
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<CriticalReport>>,
}

impl RecordingSink {
    pub fn stages(&self) -> Vec<FailureStage> {
        self.reports.lock().unwrap().iter().map(|r| r.stage).collect()
    }

    pub fn reports(&self) -> Vec<CriticalReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl CriticalSink for RecordingSink {
    async fn report_critical(&self, report: CriticalReport) {
        self.reports.lock().unwrap().push(report);
    }
}

// ============================================================================
// Test App
// ============================================================================

/// The full HTTP service wired to recording collaborators.
pub struct TestApp {
    pub addr: SocketAddr,
    pub downstream: MockDownstream,
    pub mailer: Arc<RecordingMailer>,
    pub sink: Arc<RecordingSink>,
    pub store: Arc<TokenStore>,
    pub client: reqwest::Client,
    shutdown: CancellationToken,
}

impl TestApp {
    pub async fn start() -> Self {
        Self::start_with_ttl(Duration::from_secs(3600)).await
    }

    pub async fn start_with_ttl(ttl: Duration) -> Self {
        let downstream = MockDownstream::start().await;
        let mailer = Arc::new(RecordingMailer::default());
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(TokenStore::new(TokenStoreConfig {
            default_ttl: ttl,
            ..Default::default()
        }));

        let forwarder =
            HttpForwarder::new(Some(downstream.url.clone()), Duration::from_secs(5)).unwrap();
        let flow = ApprovalFlow::new(
            FlowSettings {
                base_url: Some(BASE_URL.to_string()),
                token_ttl: ttl,
                ..Default::default()
            },
            Arc::clone(&store),
            Arc::new(forwarder),
            Notifier::new(mailer.clone()),
            sink.clone(),
        );

        let shutdown = CancellationToken::new();
        let (addr, _handle) = start_server(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(AppState::new(Arc::new(flow))),
            shutdown.clone(),
        )
        .await
        .unwrap();

        Self {
            addr,
            downstream,
            mailer,
            sink,
            store,
            client: reqwest::Client::new(),
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POSTs a form submission, returning status and the `outcome` field.
    pub async fn submit(&self, fields: &[(&str, String)]) -> (u16, String) {
        let resp = self
            .client
            .post(self.url("/submissions"))
            .form(fields)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        let body: Value = resp.json().await.unwrap();
        (status, body["outcome"].as_str().unwrap_or_default().to_string())
    }

    /// Visits an approval link, returning status and page body.
    pub async fn visit(&self, token: Option<&str>) -> (u16, String) {
        let mut request = self.client.get(self.url("/approval"));
        if let Some(token) = token {
            request = request.query(&[("token", token)]);
        }
        let resp = request.send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.text().await.unwrap())
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Form fields for a request of `budget`.
pub fn form(budget: &str) -> Vec<(&'static str, String)> {
    vec![
        ("submitter_email", "alice@example.com".to_string()),
        ("budget", budget.to_string()),
        ("module", "Networking".to_string()),
        ("manager_email", "bob@example.com".to_string()),
    ]
}

/// Pulls the approve and deny token values out of a manager email.
pub fn extract_tokens(html: &str) -> (String, String) {
    (
        extract_token(html, "approve-"),
        extract_token(html, "deny-"),
    )
}

fn extract_token(html: &str, prefix: &str) -> String {
    let marker = format!("token={prefix}");
    let start = html
        .find(&marker)
        .unwrap_or_else(|| panic!("no {prefix} link in email"))
        + "token=".len();
    html[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
