//! End-to-end tests over HTTP: submissions, approval links, and failures.

mod helpers;

use budgetgate_core::FailureStage;
use budgetgate_server::pages;
use helpers::{TestApp, extract_tokens, form};
use std::time::Duration;

const SUBMITTER: &str = "alice@example.com";
const MANAGER: &str = "bob@example.com";

async fn pending_request(app: &TestApp, budget: &str) -> (String, String) {
    let (status, outcome) = app.submit(&form(budget)).await;
    assert_eq!(status, 202);
    assert_eq!(outcome, "pending_approval");

    let manager_mail = app.mailer.sent_to(MANAGER);
    assert_eq!(manager_mail.len(), 1);
    extract_tokens(&manager_mail[0].html)
}

// ============================================================================
// Submissions
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_small_request_is_auto_approved() {
    let app = TestApp::start().await;

    let (status, outcome) = app.submit(&form("15")).await;
    assert_eq!(status, 200);
    assert_eq!(outcome, "auto_approved");

    let payloads = app.downstream.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["email"], SUBMITTER);
    assert_eq!(payloads[0]["budget"], "15");
    assert_eq!(payloads[0]["module"], "Networking");

    let mail = app.mailer.sent_to(SUBMITTER);
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].subject, "Your budget request was approved");
    assert!(app.mailer.sent_to(MANAGER).is_empty());
    assert!(app.store.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_threshold_amount_is_auto_approved() {
    let app = TestApp::start().await;

    let (status, outcome) = app.submit(&form("20")).await;
    assert_eq!(status, 200);
    assert_eq!(outcome, "auto_approved");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_large_request_emails_manager() {
    let app = TestApp::start().await;

    let (approve, deny) = pending_request(&app, "150").await;
    assert!(approve.starts_with("approve-"));
    assert!(deny.starts_with("deny-"));
    assert_eq!(app.store.len(), 2);
    assert!(app.downstream.payloads().is_empty());
    assert!(app.mailer.sent_to(SUBMITTER).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_submission_is_rejected() {
    let app = TestApp::start().await;

    let mut fields = form("15");
    fields.retain(|(name, _)| *name != "submitter_email");
    let (status, outcome) = app.submit(&fields).await;
    assert_eq!(status, 422);
    assert_eq!(outcome, "rejected");

    assert!(app.downstream.payloads().is_empty());
    assert_eq!(app.sink.stages(), vec![FailureStage::Submission]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_budget_is_rejected_not_auto_approved() {
    let app = TestApp::start().await;

    let (status, outcome) = app.submit(&form("twelve")).await;
    assert_eq!(status, 422);
    assert_eq!(outcome, "rejected");
    assert!(app.downstream.payloads().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_form_body_is_rejected() {
    let app = TestApp::start().await;

    let resp = app
        .client
        .post(app.url("/submissions"))
        .json(&serde_json::json!({ "budget": "15" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["outcome"], "rejected");
    assert!(app.downstream.payloads().is_empty());
    assert_eq!(app.sink.stages(), vec![FailureStage::Submission]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_auto_approval_downstream_failure_reports_failed() {
    let app = TestApp::start().await;
    app.downstream.respond_with(500);

    let (status, outcome) = app.submit(&form("10")).await;
    assert_eq!(status, 500);
    assert_eq!(outcome, "failed");

    assert!(app.mailer.sent_to(SUBMITTER).is_empty());
    assert_eq!(app.sink.stages(), vec![FailureStage::Forwarding]);
    let report = &app.sink.reports()[0];
    assert!(report.message.contains("500"));
    assert!(report.request.is_some());
}

// ============================================================================
// Approval Links
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_approve_link_forwards_once() {
    let app = TestApp::start().await;
    let (approve, deny) = pending_request(&app, "150").await;

    let (status, page) = app.visit(Some(approve.as_str())).await;
    assert_eq!(status, 200);
    assert_eq!(page, pages::APPROVED);

    let payloads = app.downstream.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["budget"], "150");
    let mail = app.mailer.sent_to(SUBMITTER);
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].subject, "Your budget request was approved");

    // Revisiting either link is a dead link.
    let (_, page) = app.visit(Some(approve.as_str())).await;
    assert_eq!(page, pages::LINK_EXPIRED);
    let (_, page) = app.visit(Some(deny.as_str())).await;
    assert_eq!(page, pages::LINK_EXPIRED);

    assert_eq!(app.downstream.payloads().len(), 1);
    assert!(app.store.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deny_link_notifies_without_forwarding() {
    let app = TestApp::start().await;
    let (approve, deny) = pending_request(&app, "500").await;

    let (status, page) = app.visit(Some(deny.as_str())).await;
    assert_eq!(status, 200);
    assert_eq!(page, pages::DENIED);

    assert!(app.downstream.payloads().is_empty());
    let mail = app.mailer.sent_to(SUBMITTER);
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].subject, "Your budget request was denied");

    let (_, page) = app.visit(Some(approve.as_str())).await;
    assert_eq!(page, pages::LINK_EXPIRED);
    assert!(app.downstream.payloads().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_and_unknown_tokens_share_a_page() {
    let app = TestApp::start().await;

    let (status, missing) = app.visit(None).await;
    assert_eq!(status, 200);
    let (_, empty) = app.visit(Some("")).await;
    let (_, garbage) = app.visit(Some("not-a-token")).await;
    let (_, unknown) = app.visit(Some("approve-AAAAAAAAAAAAAAAAAAAAA")).await;

    assert_eq!(missing, pages::LINK_EXPIRED);
    assert_eq!(empty, pages::LINK_EXPIRED);
    assert_eq!(garbage, pages::LINK_EXPIRED);
    assert_eq!(unknown, pages::LINK_EXPIRED);
    assert!(app.sink.stages().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_link_does_nothing() {
    let app = TestApp::start_with_ttl(Duration::from_millis(50)).await;
    let (approve, _deny) = pending_request(&app, "150").await;

    tokio::time::sleep(Duration::from_millis(150)).await;

    let (_, page) = app.visit(Some(approve.as_str())).await;
    assert_eq!(page, pages::LINK_EXPIRED);
    assert!(app.downstream.payloads().is_empty());
    assert!(app.mailer.sent_to(SUBMITTER).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_downstream_failure_after_approval_shows_error_page() {
    let app = TestApp::start().await;
    let (approve, _deny) = pending_request(&app, "150").await;
    app.downstream.respond_with(500);

    let (status, page) = app.visit(Some(approve.as_str())).await;
    assert_eq!(status, 200);
    assert_eq!(page, pages::ERROR);

    assert!(app.mailer.sent_to(SUBMITTER).is_empty());
    assert_eq!(app.sink.stages(), vec![FailureStage::Forwarding]);

    // The decision was consumed; the link does not retry.
    app.downstream.respond_with(200);
    let (_, page) = app.visit(Some(approve.as_str())).await;
    assert_eq!(page, pages::LINK_EXPIRED);
    assert_eq!(app.downstream.payloads().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_clicks_resolve_once() {
    let app = TestApp::start().await;
    let (approve, deny) = pending_request(&app, "150").await;

    let mut visits = Vec::new();
    for i in 0..12 {
        let token = if i % 2 == 0 { approve.as_str() } else { deny.as_str() };
        visits.push(app.visit(Some(token)));
    }
    let results = futures_util::future::join_all(visits).await;

    let decided = results
        .iter()
        .filter(|(_, page)| *page == pages::APPROVED || *page == pages::DENIED)
        .count();
    let dead = results
        .iter()
        .filter(|(_, page)| *page == pages::LINK_EXPIRED)
        .count();
    assert_eq!(decided, 1);
    assert_eq!(dead, 11);
    assert_eq!(app.mailer.sent_to(SUBMITTER).len(), 1);
    assert!(app.downstream.payloads().len() <= 1);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_healthz_returns_ok() {
    let app = TestApp::start().await;

    let resp = app.client.get(app.url("/healthz")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
