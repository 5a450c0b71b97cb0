//! YAML configuration: schema, loading, environment substitution and
//! validation.

pub mod duration_format;
pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ValidationResult, ValidationWarning};
pub use loader::{
    CONFIG_ENV_VAR, default_config_paths, find_config_file, load_and_validate, load_config,
    substitute_env_vars, validate,
};
pub use schema::{
    AppConfig, DownstreamConfig, LinksConfig, MailConfig, MailTransport, OperatorConfig,
    RoutingConfig, StoreConfig,
};
