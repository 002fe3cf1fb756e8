/// `load_config` module: reads the static YAML config and injects secrets from the environment.
///
/// The YAML file carries nothing sensitive: the account to watch, timings and the
/// composition settings. Webhook URLs and API keys come from environment variables
/// (a `.env` file is loaded by `main` through `dotenvy`).
///
/// # Environment
/// - `DISCORD_WEBHOOK_URL` (required to relay)
/// - `TRUTHSOCIAL_TOKEN` (optional bearer token)
/// - `AZURE_TRANSLATOR_KEY` and `AZURE_TRANSLATOR_LOCATION` (optional, both or neither)
/// - `IMGUR_CLIENT_ID` (optional, enables rehosting of large media)
///
/// # Errors
/// Failures surface as `anyhow::Error` at the CLI boundary.
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use truthcord_core::attachments::AttachmentLimits;
use truthcord_core::compose::ComposeSettings;

use crate::azure::AzureCredentials;
use crate::truthsocial::DEFAULT_API_BASE_URL;

pub const WEBHOOK_ENV: &str = "DISCORD_WEBHOOK_URL";
pub const TOKEN_ENV: &str = "TRUTHSOCIAL_TOKEN";
pub const AZURE_KEY_ENV: &str = "AZURE_TRANSLATOR_KEY";
pub const AZURE_LOCATION_ENV: &str = "AZURE_TRANSLATOR_LOCATION";
pub const IMGUR_ENV: &str = "IMGUR_CLIENT_ID";

#[derive(Debug, Deserialize)]
struct RawConfig {
    account: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_api_base_url")]
    api_base_url: String,
    #[serde(default)]
    compose: ComposeSettings,
    #[serde(default)]
    attachments: AttachmentLimits,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// Secrets injected from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub webhook_url: Option<String>,
    pub truthsocial_token: Option<String>,
    pub azure: Option<AzureCredentials>,
    pub imgur_client_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub account: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub api_base_url: String,
    pub compose: ComposeSettings,
    pub attachments: AttachmentLimits,
    pub secrets: Secrets,
}

impl AppConfig {
    /// The webhook URL; relaying without one is a startup error.
    pub fn require_webhook(&self) -> Result<String> {
        match &self.secrets.webhook_url {
            Some(url) => Ok(url.clone()),
            None => {
                error!(env = WEBHOOK_ENV, "Webhook URL missing in environment");
                Err(anyhow!("{WEBHOOK_ENV} must be set"))
            }
        }
    }
}

/// Loads a static YAML config file and merges in secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let account = match raw.account.map(|a| a.trim().trim_start_matches('@').to_string()) {
        Some(account) if !account.is_empty() => account,
        _ => {
            error!(config_path = ?path_ref, "No account configured");
            return Err(anyhow!("`account` must be set in {:?}", path_ref));
        }
    };
    if raw.poll_interval_secs == 0 {
        return Err(anyhow!("`poll_interval_secs` must be greater than zero"));
    }

    let secrets = secrets_from_env();
    info!(
        account = %account,
        webhook_set = secrets.webhook_url.is_some(),
        token_set = secrets.truthsocial_token.is_some(),
        translator_set = secrets.azure.is_some(),
        image_host_set = secrets.imgur_client_id.is_some(),
        "Configuration loaded"
    );

    Ok(AppConfig {
        account,
        poll_interval: Duration::from_secs(raw.poll_interval_secs),
        request_timeout: Duration::from_secs(raw.request_timeout_secs),
        api_base_url: raw.api_base_url.trim_end_matches('/').to_string(),
        compose: raw.compose,
        attachments: raw.attachments,
        secrets,
    })
}

fn secrets_from_env() -> Secrets {
    let azure = match (non_empty_env(AZURE_KEY_ENV), non_empty_env(AZURE_LOCATION_ENV)) {
        (Some(key), Some(location)) => Some(AzureCredentials { key, location }),
        (None, None) => None,
        _ => {
            warn!(
                "Only one of {AZURE_KEY_ENV} and {AZURE_LOCATION_ENV} is set; translation disabled"
            );
            None
        }
    };
    Secrets {
        webhook_url: non_empty_env(WEBHOOK_ENV),
        truthsocial_token: non_empty_env(TOKEN_ENV),
        azure,
        imgur_client_id: non_empty_env(IMGUR_ENV),
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
