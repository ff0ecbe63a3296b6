use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::ValorantClient;
use crate::retrieve::{EndpointFamily, FamilyProfile, PlatformRouting, ReqwestTransport, RequestDispatcher, RetryPolicy};
use crate::state::ConnectionState;

/// Config file read when `--config-path` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "valorant.conf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid command line: {0}")]
    Cli(#[from] clap::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Client settings. Every field is optional so that layers can be merged;
/// [`ClientConfig::defaults`] fills in what a bare client uses.
#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Valorant game-data API client", version)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    #[clap(long, env = "VALORANT_TOKEN", help = "Token sent in the Authorization header to valorant-api.com.")]
    pub token: Option<String>,

    #[clap(long, env = "RIOT_API_KEY", help = "Riot API key sent as X-Riot-Token.")]
    pub riot_api_key: Option<String>,

    #[clap(long, env = "VALORANT_BASE_URL", help = "Override for the valorant-api.com base URL.")]
    pub base_url: Option<String>,

    #[clap(long, env = "VALORANT_RIOT_REGION", help = "Riot routing value (americas, euw1, na1, ...).")]
    pub riot_region: Option<String>,

    #[clap(long, env = "VALORANT_MAX_ATTEMPTS", help = "Attempts per request, first attempt included.")]
    pub max_attempts: Option<u32>,

    #[clap(long, env = "VALORANT_BACKOFF_BASE_SECS", help = "Delay in seconds before the first retry.")]
    pub backoff_base_secs: Option<f64>,

    #[clap(long, env = "VALORANT_BACKOFF_STEP_SECS", help = "Seconds added to the delay for every further retry.")]
    pub backoff_step_secs: Option<f64>,

    #[clap(long, env = "VALORANT_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "VALORANT_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "VALORANT_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn defaults() -> Self {
        let policy = RetryPolicy::default();
        ClientConfig {
            riot_region: Some(PlatformRouting::Americas.as_str().to_string()),
            max_attempts: Some(policy.max_attempts),
            backoff_base_secs: Some(policy.backoff_base.as_secs_f64()),
            backoff_step_secs: Some(policy.backoff_step.as_secs_f64()),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    /// `other` overrides `self` wherever it has a value.
    pub fn merge(self, other: ClientConfig) -> ClientConfig {
        ClientConfig {
            token: other.token.or(self.token),
            riot_api_key: other.riot_api_key.or(self.riot_api_key),
            base_url: other.base_url.or(self.base_url),
            riot_region: other.riot_region.or(self.riot_region),
            max_attempts: other.max_attempts.or(self.max_attempts),
            backoff_base_secs: other.backoff_base_secs.or(self.backoff_base_secs),
            backoff_step_secs: other.backoff_step_secs.or(self.backoff_step_secs),
            log_level: other.log_level.or(self.log_level),
            log_dir: other.log_dir.or(self.log_dir),
            config_path: other.config_path.or(self.config_path),
        }
    }

    /// Defaults, then the JSON config file, then environment and command line.
    pub fn load() -> Result<ClientConfig, ConfigError> {
        Self::load_from(std::env::args_os())
    }

    /// Same as [`ClientConfig::load`] over an explicit argument list.
    pub fn load_from<I, T>(args: I) -> Result<ClientConfig, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = ClientConfig::try_parse_from(args)?;
        let path = cli
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = ClientConfig::defaults();
        if let Some(file_config) = read_config_file(&path) {
            config = config.merge(file_config);
        }
        Ok(config.merge(cli))
    }

    /// The retry policy these settings describe.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let defaults = RetryPolicy::default();
        let max_attempts = self.max_attempts.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::Invalid("maxAttempts must be at least 1".into()));
        }
        Ok(RetryPolicy {
            max_attempts,
            backoff_base: seconds("backoffBaseSecs", self.backoff_base_secs)?.unwrap_or(defaults.backoff_base),
            backoff_step: seconds("backoffStepSecs", self.backoff_step_secs)?.unwrap_or(defaults.backoff_step),
            ..defaults
        })
    }

    pub fn region(&self) -> Result<PlatformRouting, ConfigError> {
        match &self.riot_region {
            Some(region) => region.parse().map_err(|e| ConfigError::Invalid(format!("{}", e))),
            None => Ok(PlatformRouting::Americas),
        }
    }

    /// A client over the production transport, configured from these
    /// settings.
    pub fn build_client(&self) -> Result<ValorantClient, ConfigError> {
        let mut community = FamilyProfile::community(self.token.clone());
        if let Some(base_url) = &self.base_url {
            community = community.with_base_url(base_url.clone());
        }
        let riot = FamilyProfile::riot(self.region()?, self.riot_api_key.clone());

        let http = RequestDispatcher::with_transport(Arc::new(ReqwestTransport::new()), self.retry_policy()?)
            .with_profile(EndpointFamily::Community, community)
            .with_profile(EndpointFamily::Riot, riot);
        Ok(ValorantClient::from_parts(http, ConnectionState::new()))
    }
}

fn read_config_file(path: &Path) -> Option<ClientConfig> {
    if !path.exists() {
        info!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
        return None;
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<ClientConfig>(&raw) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e);
            None
        }
    }
}

/// Upper bound for any configured delay.
const MAX_DELAY_SECS: f64 = 3600.0;

fn seconds(name: &str, value: Option<f64>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|_| secs <= MAX_DELAY_SECS)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("{} must be between 0 and {} seconds", name, MAX_DELAY_SECS))
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn merge_prefers_the_overriding_layer() {
        let base = ClientConfig {
            token: Some("file-token".into()),
            max_attempts: Some(5),
            ..Default::default()
        };
        let over = ClientConfig {
            max_attempts: Some(2),
            ..Default::default()
        };
        let merged = base.merge(over);
        assert_eq!(merged.token.as_deref(), Some("file-token"));
        assert_eq!(merged.max_attempts, Some(2));
    }

    #[test]
    fn file_values_sit_between_defaults_and_cli() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"maxAttempts": 3, "logLevel": "debug", "backoffStepSecs": 0.5}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config =
            ClientConfig::load_from(["valorant", "--config-path", path.as_str(), "--log-level", "warn"]).unwrap();

        assert_eq!(config.max_attempts, Some(3));
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.backoff_base_secs, Some(1.0));

        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.backoff(1), Duration::from_millis(1500));
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = ClientConfig::load_from(["valorant", "--config-path", path.as_str()]).unwrap();
        assert_eq!(config.riot_region.as_deref(), Some("americas"));
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = ClientConfig {
            max_attempts: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.retry_policy(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn negative_backoff_is_rejected() {
        let config = ClientConfig {
            backoff_base_secs: Some(-1.0),
            ..Default::default()
        };
        assert!(config.retry_policy().is_err());
    }

    #[test]
    fn oversized_backoff_is_rejected() {
        let config = ClientConfig {
            backoff_step_secs: Some(1e30),
            ..Default::default()
        };
        assert!(matches!(config.retry_policy(), Err(ConfigError::Invalid(_))));

        let config = ClientConfig {
            backoff_base_secs: Some(3600.0),
            backoff_step_secs: Some(3600.0),
            ..Default::default()
        };
        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.backoff(3), Duration::from_secs(4 * 3600));
    }

    #[test]
    fn region_parses_routing_values() {
        let config = ClientConfig {
            riot_region: Some("euw1".into()),
            ..Default::default()
        };
        assert_eq!(config.region().unwrap(), PlatformRouting::Euw1);

        let bad = ClientConfig {
            riot_region: Some("mars".into()),
            ..Default::default()
        };
        assert!(bad.region().is_err());
    }

    #[test]
    fn unknown_flags_are_a_cli_error() {
        assert!(matches!(
            ClientConfig::load_from(["valorant", "--no-such-flag"]),
            Err(ConfigError::Cli(_))
        ));
    }

    #[tokio::test]
    async fn build_client_applies_the_base_url_override() {
        let config = ClientConfig {
            base_url: Some("http://127.0.0.1:9/v1".into()),
            ..ClientConfig::defaults()
        };
        let client = config.build_client().unwrap();
        let profile = client.http().profile(EndpointFamily::Community).unwrap();
        assert_eq!(profile.base_url, "http://127.0.0.1:9/v1");
        assert_eq!(client.http().policy().max_attempts, 5);
    }
}
