//! Builds the approval flow and its collaborators from configuration.

use std::sync::Arc;

use budgetgate_core::config::{AppConfig, MailConfig, MailTransport};
use budgetgate_core::notify::{
    HttpMailer, HttpMailerConfig, LogMailer, MailCriticalSink, MailError,
};
use budgetgate_core::{ApprovalFlow, ForwardError, HttpForwarder, Mailer, Notifier, TokenStore};
use thiserror::Error;
use tracing::info;

/// Failures while assembling the service at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("mailer setup failed: {0}")]
    Mailer(#[from] MailError),

    #[error("downstream client setup failed: {0}")]
    Forwarder(#[from] ForwardError),
}

/// Everything `main` needs to serve and sweep.
#[derive(Debug)]
pub struct Service {
    pub flow: Arc<ApprovalFlow>,
    pub store: Arc<TokenStore>,
}

/// Choose the mailer named by `mail.transport`.
///
/// # Errors
///
/// Returns `MailError::NotConfigured` when the HTTP relay is selected but
/// its endpoint or sender is missing.
pub fn build_mailer(mail: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match mail.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer::new())),
        MailTransport::Http => {
            let config = HttpMailerConfig::new(
                mail.endpoint.clone().unwrap_or_default(),
                mail.api_key.clone().unwrap_or_default(),
                mail.from.clone().unwrap_or_default(),
            )
            .with_timeout(mail.timeout);
            Ok(Arc::new(HttpMailer::new(config)?))
        }
    }
}

/// Assemble store, forwarder, mailer, notifier and operator sink into a flow.
///
/// # Errors
///
/// Returns `StartupError` if an outbound client cannot be constructed.
pub fn build_service(config: &AppConfig) -> Result<Service, StartupError> {
    let store = Arc::new(TokenStore::new(config.store_config()));
    let forwarder = Arc::new(HttpForwarder::new(
        config.downstream.url.clone(),
        config.downstream.timeout,
    )?);
    let mailer = build_mailer(&config.mail)?;

    info!(
        mailer = mailer.name(),
        threshold = %config.routing.threshold,
        ttl_secs = config.links.ttl.as_secs(),
        "Approval flow configured"
    );

    let notifier = Notifier::new(Arc::clone(&mailer));
    let critical = Arc::new(MailCriticalSink::new(mailer, config.operator.email.clone()));
    let flow = Arc::new(ApprovalFlow::new(
        config.flow_settings(),
        Arc::clone(&store),
        forwarder,
        notifier,
        critical,
    ));

    Ok(Service { flow, store })
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetgate_core::config::OperatorConfig;

    fn config(transport: MailTransport) -> AppConfig {
        AppConfig {
            schema: 1,
            links: Default::default(),
            routing: Default::default(),
            downstream: Default::default(),
            mail: MailConfig {
                transport,
                ..Default::default()
            },
            operator: OperatorConfig {
                email: "ops@example.com".to_string(),
            },
            store: Default::default(),
        }
    }

    #[test]
    fn test_log_transport_builds_log_mailer() {
        let mailer = build_mailer(&config(MailTransport::Log).mail).unwrap();
        assert_eq!(mailer.name(), "log");
    }

    #[test]
    fn test_http_transport_without_endpoint_fails() {
        let Err(err) = build_mailer(&config(MailTransport::Http).mail) else {
            panic!("expected NotConfigured");
        };
        assert!(matches!(err, MailError::NotConfigured { .. }));
    }

    #[test]
    fn test_build_service_shares_store() {
        let service = build_service(&config(MailTransport::Log)).unwrap();
        assert!(Arc::ptr_eq(service.flow.store(), &service.store));
    }
}
