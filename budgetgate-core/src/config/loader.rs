//! Configuration loading and validation.
//!
//! Configuration is read once at startup: locate the file, substitute
//! `${VAR}` references, parse YAML, validate. Nothing re-reads it while the
//! service runs.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use super::error::{ConfigError, ValidationResult, ValidationWarning};
use super::schema::{AppConfig, MailTransport};
use crate::request::is_email_shaped;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "BUDGETGATE_CONFIG";

const MIN_TTL: Duration = Duration::from_secs(60);
const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Configuration file search paths (in priority order, after `--config`).
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(path));
    }
    paths.push(PathBuf::from("/etc/budgetgate/config.yaml"));
    paths.push(PathBuf::from("./config.yaml"));

    paths
}

/// Find the first existing config file from the search paths.
///
/// # Errors
///
/// Returns `ConfigError::ConfigFileNotFound` listing every searched path.
pub fn find_config_file(explicit_path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    // An explicit path is never silently replaced by a default.
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ConfigError::ConfigFileNotFound {
            searched: vec![path.to_path_buf()],
        });
    }

    let paths = default_config_paths();
    for path in &paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    Err(ConfigError::ConfigFileNotFound { searched: paths })
}

/// Load configuration from a file path without validating it.
///
/// # Errors
///
/// Returns `ConfigError` for I/O, substitution or YAML errors, or an empty
/// file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Err(ConfigError::EmptyConfigFile);
    }

    let contents = substitute_env_vars(&contents)?;
    let config: AppConfig = serde_saphyr::from_str(&contents)?;
    Ok(config)
}

/// Load and validate configuration.
///
/// # Errors
///
/// Returns the first loading or validation error.
pub fn load_and_validate(path: &Path) -> Result<(AppConfig, ValidationResult), ConfigError> {
    let config = load_config(path)?;
    let result = validate(&config)?;
    Ok((config, result))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment Variable Substitution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// SAFETY: .expect() on LazyLock with a compile-time literal regex pattern.
// The pattern is known-valid and tested by test_env_var_pattern_compiles().
static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("ENV_VAR_PATTERN is a valid regex")
});

/// Substitute environment variables in a string.
///
/// # Syntax
/// - `${VAR}` - Required, fail if not set
/// - `${VAR:-default}` - Optional with default
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` for the first required variable that
/// is not set.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |caps: &regex::Captures<'_>| {
        let var_name = &caps[1];
        match std::env::var(var_name) {
            Ok(value) => value,
            Err(_) => match caps.get(2) {
                Some(default) => default.as_str().to_string(),
                None => {
                    if missing.is_none() {
                        missing = Some(var_name.to_string());
                    }
                    String::new()
                }
            },
        }
    });

    if let Some(var) = missing {
        return Err(ConfigError::MissingEnvVar {
            var,
            field: "configuration".to_string(),
        });
    }

    Ok(result.into_owned())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Validate a configuration.
///
/// # Errors
///
/// Returns the first violated rule as a `ConfigError`.
pub fn validate(config: &AppConfig) -> Result<ValidationResult, ConfigError> {
    let mut warnings = Vec::new();

    if config.schema != 1 {
        return Err(ConfigError::UnsupportedSchemaVersion {
            version: config.schema,
        });
    }

    // links
    match &config.links.base_url {
        Some(url) => validate_url("links.base_url", url)?,
        None => warnings.push(ValidationWarning::MissingBaseUrl),
    }
    if config.links.ttl < MIN_TTL || config.links.ttl > MAX_TTL {
        return Err(ConfigError::InvalidTtl {
            ttl: humantime::format_duration(config.links.ttl).to_string(),
            min: humantime::format_duration(MIN_TTL).to_string(),
            max: humantime::format_duration(MAX_TTL).to_string(),
        });
    }

    // routing
    if config.routing.threshold.is_sign_negative() && !config.routing.threshold.is_zero() {
        return Err(ConfigError::InvalidThreshold {
            threshold: config.routing.threshold.to_string(),
        });
    }

    // downstream
    match &config.downstream.url {
        Some(url) => validate_url("downstream.url", url)?,
        None => warnings.push(ValidationWarning::MissingDownstreamUrl),
    }
    if config.downstream.timeout.is_zero() {
        return Err(ConfigError::MustBePositive {
            field: "downstream.timeout",
        });
    }

    // mail
    match config.mail.transport {
        MailTransport::Http => {
            let endpoint =
                config
                    .mail
                    .endpoint
                    .as_deref()
                    .ok_or(ConfigError::MissingSetting {
                        field: "mail.endpoint",
                        because: "mail.transport is 'http'",
                    })?;
            validate_url("mail.endpoint", endpoint)?;

            let from = config
                .mail
                .from
                .as_deref()
                .ok_or(ConfigError::MissingSetting {
                    field: "mail.from",
                    because: "mail.transport is 'http'",
                })?;
            validate_email("mail.from", from)?;
        }
        MailTransport::Log => warnings.push(ValidationWarning::LogMailTransport),
    }
    if config.mail.timeout.is_zero() {
        return Err(ConfigError::MustBePositive {
            field: "mail.timeout",
        });
    }

    // operator
    validate_email("operator.email", &config.operator.email)?;

    // store
    if config.store.max_entries == 0 {
        return Err(ConfigError::MustBePositive {
            field: "store.max_entries",
        });
    }
    if config.store.sweep_interval.is_zero() {
        return Err(ConfigError::MustBePositive {
            field: "store.sweep_interval",
        });
    }

    Ok(ValidationResult { warnings })
}

fn validate_url(field: &'static str, url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        field,
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            field,
            url: url.to_string(),
            message: format!("scheme must be http or https, found '{}'", parsed.scheme()),
        });
    }
    Ok(())
}

fn validate_email(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if !is_email_shaped(value) {
        return Err(ConfigError::InvalidEmail {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
