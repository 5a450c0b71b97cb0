//! Email subjects and HTML bodies.
//!
//! Every value taken from a submission is HTML-escaped before it is
//! interpolated. Subjects are plain text and are not escaped.

use super::{CriticalReport, EmailMessage};
use crate::request::ApprovalRequest;
use crate::token::ApprovalLinks;

/// Escapes the five HTML-significant characters.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn request_table(request: &ApprovalRequest) -> String {
    format!(
        "<table>\
         <tr><td><strong>Requested by</strong></td><td>{}</td></tr>\
         <tr><td><strong>Budget</strong></td><td>${}</td></tr>\
         <tr><td><strong>Module</strong></td><td>{}</td></tr>\
         </table>",
        escape_html(request.submitter_email()),
        request.display_budget(),
        escape_html(request.module()),
    )
}

fn wrap(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"font-family: sans-serif;\">\
         <h2>{title}</h2>{body}</body></html>"
    )
}

/// Notice to the submitter that a request within the threshold went through.
#[must_use]
pub fn auto_approved(request: &ApprovalRequest) -> EmailMessage {
    EmailMessage {
        to: request.submitter_email().to_string(),
        subject: "Your budget request was approved".to_string(),
        html: wrap(
            "Budget request approved",
            &format!(
                "<p>Your request was within the automatic approval limit and has been \
                 sent for processing.</p>{}",
                request_table(request)
            ),
        ),
    }
}

/// Notice to the submitter that a manager approved the request.
#[must_use]
pub fn approved(request: &ApprovalRequest) -> EmailMessage {
    EmailMessage {
        to: request.submitter_email().to_string(),
        subject: "Your budget request was approved".to_string(),
        html: wrap(
            "Budget request approved",
            &format!(
                "<p>Your manager approved your request and it has been sent for \
                 processing.</p>{}",
                request_table(request)
            ),
        ),
    }
}

/// Notice to the submitter that a manager denied the request.
#[must_use]
pub fn denied(request: &ApprovalRequest) -> EmailMessage {
    EmailMessage {
        to: request.submitter_email().to_string(),
        subject: "Your budget request was denied".to_string(),
        html: wrap(
            "Budget request denied",
            &format!(
                "<p>Your manager denied your request. Contact them directly if you \
                 have questions.</p>{}",
                request_table(request)
            ),
        ),
    }
}

/// Request to the manager carrying both single-use links.
#[must_use]
pub fn approval_required(
    request: &ApprovalRequest,
    manager_email: &str,
    links: &ApprovalLinks,
) -> EmailMessage {
    EmailMessage {
        to: manager_email.to_string(),
        subject: format!(
            "Approval required: ${} budget request from {}",
            request.display_budget(),
            request.submitter_email()
        ),
        html: wrap(
            "Budget approval required",
            &format!(
                "<p>A budget request needs your decision.</p>{}\
                 <p><a href=\"{}\">Approve</a> &nbsp;|&nbsp; <a href=\"{}\">Deny</a></p>\
                 <p><small>Each link works once. Following either one closes the \
                 request.</small></p>",
                request_table(request),
                escape_html(&links.approve_url),
                escape_html(&links.deny_url),
            ),
        ),
    }
}

/// Alert to the operator with full diagnostic context.
#[must_use]
pub fn critical(report: &CriticalReport, operator_email: &str) -> EmailMessage {
    let context = match &report.request {
        Some(request) => request_table(request),
        None => "<p>No request context was available.</p>".to_string(),
    };
    EmailMessage {
        to: operator_email.to_string(),
        subject: format!("[budgetgate] Critical failure during {}", report.stage),
        html: wrap(
            "Critical failure",
            &format!(
                "<p><strong>Stage:</strong> {}</p>\
                 <p><strong>At:</strong> {}</p>\
                 <pre>{}</pre>{}",
                report.stage,
                report.occurred_at.to_rfc3339(),
                escape_html(&report.message),
                context
            ),
        ),
    }
}
