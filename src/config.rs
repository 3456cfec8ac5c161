//! Global options shared by every CLI command.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use thiserror::Error;
use url::Url;

use crate::console::{ConfirmationPolicy, LoadPolicy};

pub const DEFAULT_BASE_URL: &str = "https://artforapi.onrender.com";
pub const DEFAULT_SESSION_FILE: &str = "console-session.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base url '{0}': {1}")]
    InvalidUrl(String, String),
    #[error("unsupported url scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
}

/// Options every subcommand accepts, each overridable from the environment.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Root url of the admin service
    #[arg(long, global = true, env = "CONSOLE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// File holding the signed-in session
    #[arg(long, global = true, env = "CONSOLE_SESSION_FILE", default_value = DEFAULT_SESSION_FILE)]
    pub session_file: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "CONSOLE_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Apply collections that loaded even when others failed
    #[arg(long, global = true)]
    pub partial_load: bool,

    /// Ask for confirmation before wallet credit/debit too
    #[arg(long, global = true)]
    pub confirm_wallet: bool,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub base_url: Url,
    pub session_file: PathBuf,
    pub request_timeout: Option<Duration>,
    pub load_policy: LoadPolicy,
    pub confirmation: ConfirmationPolicy,
}

impl TryFrom<GlobalArgs> for ConsoleConfig {
    type Error = ConfigError;

    fn try_from(args: GlobalArgs) -> Result<Self, Self::Error> {
        let base_url = Url::parse(&args.base_url)
            .map_err(|e| ConfigError::InvalidUrl(args.base_url.clone(), e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.scheme().to_string()));
        }

        let request_timeout = match args.request_timeout_secs {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        let load_policy = if args.partial_load {
            LoadPolicy::PerCollection
        } else {
            LoadPolicy::AllOrNothing
        };

        let mut confirmation = ConfirmationPolicy::default();
        if args.confirm_wallet {
            confirmation.credit = true;
            confirmation.debit = true;
        }

        Ok(Self {
            base_url,
            session_file: args.session_file,
            request_timeout,
            load_policy,
            confirmation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(base_url: &str) -> GlobalArgs {
        GlobalArgs {
            base_url: base_url.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            request_timeout_secs: None,
            partial_load: false,
            confirm_wallet: false,
        }
    }

    #[test]
    fn defaults() {
        let config = ConsoleConfig::try_from(args(DEFAULT_BASE_URL)).unwrap();
        assert_eq!(config.base_url.as_str(), "https://artforapi.onrender.com/");
        assert_eq!(config.load_policy, LoadPolicy::AllOrNothing);
        assert_eq!(config.confirmation, ConfirmationPolicy::default());
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn flags_switch_policies() {
        let mut args = args("http://localhost:8080");
        args.partial_load = true;
        args.confirm_wallet = true;
        args.request_timeout_secs = Some(10);

        let config = ConsoleConfig::try_from(args).unwrap();
        assert_eq!(config.load_policy, LoadPolicy::PerCollection);
        assert_eq!(config.confirmation, ConfirmationPolicy::all());
        assert_eq!(config.request_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(matches!(
            ConsoleConfig::try_from(args("not a url")),
            Err(ConfigError::InvalidUrl(..))
        ));
        assert_eq!(
            ConsoleConfig::try_from(args("ftp://example.test")),
            Err(ConfigError::UnsupportedScheme("ftp".to_string()))
        );
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut args = args(DEFAULT_BASE_URL);
        args.request_timeout_secs = Some(0);
        assert_eq!(ConsoleConfig::try_from(args), Err(ConfigError::ZeroTimeout));
    }
}
