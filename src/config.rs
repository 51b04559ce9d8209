//! Connection configuration for the Kubecost API
//!
//! Configuration is read once at startup from CLI flags, with environment
//! variable fallbacks handled by clap:
//! - `KUBECOST_BASE_URL` - API base URL (default `http://localhost:9090`)
//! - `KUBECOST_API_TOKEN` - bearer token
//! - `KUBECOST_USERNAME` / `KUBECOST_PASSWORD` - basic auth pair
//!
//! The result is an immutable [`KubecostConfig`] passed by reference into
//! the client. Nothing downstream reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use url::Url;

use crate::logging::{LogFormat, TracingConfig};

/// Per-request timeout applied to every Kubecost call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URL used when `KUBECOST_BASE_URL` is not set
pub const DEFAULT_BASE_URL: &str = "http://localhost:9090";

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors raised while building the connection configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("KUBECOST_BASE_URL environment variable is required")]
    MissingBaseUrl,

    #[error("Invalid KUBECOST_BASE_URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported KUBECOST_BASE_URL '{0}': expected an http:// or https:// URL")]
    UnsupportedBaseUrl(String),

    #[error("Either KUBECOST_API_TOKEN or both KUBECOST_USERNAME and KUBECOST_PASSWORD are required")]
    MissingCredentials,
}

// ============================================================================
// Configuration Arguments
// ============================================================================

/// Global configuration arguments
#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Kubecost API base URL
    ///
    /// Endpoint paths are appended to this URL's path, so a base of
    /// http://host/kubecost targets http://host/kubecost/model/budget.
    ///
    #[arg(long, env = "KUBECOST_BASE_URL", default_value = DEFAULT_BASE_URL, value_name = "http(s)://...")]
    pub base_url: String,

    /// Bearer token for the Kubecost API
    ///
    /// Takes precedence over --username/--password when both are given.
    ///
    #[arg(long, env = "KUBECOST_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Username for HTTP basic auth (requires --password)
    #[arg(long, env = "KUBECOST_USERNAME")]
    pub username: Option<String>,

    /// Password for HTTP basic auth (requires --username)
    #[arg(long, env = "KUBECOST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    // -------------------------------------------------------------------------
    // Logging/Tracing Options
    // -------------------------------------------------------------------------

    /// Enable verbose output (INFO level logging)
    ///
    /// Default is WARN level. Use -v for INFO, -d for DEBUG.
    ///
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Enable debug output (DEBUG level logging)
    #[arg(short = 'd', long, global = true, conflicts_with = "verbose")]
    pub debug: bool,

    /// Quiet mode - only show errors
    #[arg(short = 'q', long, global = true, conflicts_with_all = ["verbose", "debug"])]
    pub quiet: bool,

    /// Silent mode - suppress all terminal log output
    ///
    /// Log file output (if configured) is unaffected.
    ///
    #[arg(short = 's', long, global = true, conflicts_with_all = ["verbose", "debug", "quiet"])]
    pub silent: bool,

    /// Log output format (logs always go to stderr)
    #[arg(long, default_value = "pretty", value_enum, env = "KUBECOST_MCP_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Write debug logs to file
    #[arg(long, env = "KUBECOST_MCP_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl ConfigArgs {
    /// Build the tracing configuration from the logging flags
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            verbose: self.verbose,
            debug: self.debug,
            quiet: self.quiet,
            silent: self.silent,
            format: self.log_format.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

// ============================================================================
// Kubecost Configuration
// ============================================================================

/// Authentication mode for the Kubecost API
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <token>`
    Bearer { token: String },
    /// HTTP basic auth
    Basic { username: String, password: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Bearer { .. } => f.write_str("Bearer(<redacted>)"),
            Auth::Basic { username, .. } => write!(f, "Basic({}:<redacted>)", username),
        }
    }
}

/// Connection configuration for the Kubecost API
#[derive(Debug, Clone)]
pub struct KubecostConfig {
    pub base_url: Url,
    pub auth: Auth,
    pub timeout: Duration,
}

impl KubecostConfig {
    /// Validate and build a configuration.
    ///
    /// A token wins over basic credentials when both are supplied.
    /// Empty strings count as absent.
    pub fn new(
        base_url: &str,
        api_token: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(base_url)?;

        let auth = match (non_empty(api_token), non_empty(username), non_empty(password)) {
            (Some(token), _, _) => Auth::Bearer { token: token.to_string() },
            (None, Some(username), Some(password)) => Auth::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            _ => return Err(ConfigError::MissingCredentials),
        };

        Ok(Self {
            base_url,
            auth,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Build from parsed CLI/environment arguments
    pub fn from_args(args: &ConfigArgs) -> Result<Self, ConfigError> {
        Self::new(
            &args.base_url,
            args.api_token.as_deref(),
            args.username.as_deref(),
            args.password.as_deref(),
        )
    }

    /// Override the request timeout
    #[cfg(test)]
    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::MissingBaseUrl);
    }

    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::UnsupportedBaseUrl(raw.to_string()));
    }

    Ok(url)
}
