//! HTTP service around the budgetgate approval flow.
//!
//! The binary in `main.rs` wires configuration into an
//! [`budgetgate_core::ApprovalFlow`] and serves [`app::app_router`].

pub mod app;
pub mod logging_layer;
pub mod pages;
pub mod sweeper;
pub mod wiring;

pub use app::{AppState, SubmissionResponse, app_router, start_server, status_for};
pub use sweeper::spawn_sweeper;
pub use wiring::{Service, StartupError, build_mailer, build_service};
