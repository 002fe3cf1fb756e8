/// # truthcord CLI Interface (Module)
///
/// Command parsing and wiring: loads configuration, builds the HTTP collaborators and
/// hands them to the relay in [`truthcord-core`]. Message building and polling logic
/// live in the core crate.
///
/// ## Commands
/// - `run`: watch the configured account and relay new posts to the webhook.
/// - `render`: build the message for one stored post and print it, without delivering.
///
/// [`truthcord-core`]: ../../truthcord-core/
use crate::azure::{AzureTranslator, DEFAULT_AZURE_ENDPOINT};
use crate::discord::DiscordWebhook;
use crate::load_config::{load_config, AppConfig};
use crate::media::{HttpMediaFetcher, ImgurHost, DEFAULT_IMGUR_BASE_URL};
use crate::truthsocial::TruthSocialClient;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use truthcord_core::compose::{build_message, Collaborators};
use truthcord_core::post::Post;
use truthcord_core::relay::{Relay, RelayClients};

static OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)([dhms])").expect("valid offset regex"));

/// CLI for truthcord: relay Truth Social posts to a Discord webhook.
#[derive(Parser)]
#[clap(
    name = "truthcord",
    version,
    about = "Relay new Truth Social posts to a Discord webhook, optionally translated"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the configured account and relay new posts
    Run {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Relay posts newer than this offset from now, e.g. `-1d2h3m4s`
        #[clap(long, allow_hyphen_values = true)]
        pull_since: Option<String>,
        /// Run a single polling cycle and exit
        #[clap(long)]
        once: bool,
    },
    /// Build the message for a stored post (JSON) and print it without delivering
    Render {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Path to a post in upstream JSON form
        #[clap(long)]
        post: PathBuf,
    },
}

/// Parses a relative offset such as `-1d2h3m4s` into an instant before `now`.
///
/// Every component is optional; a repeated unit keeps its last value.
pub fn parse_pull_since(arg: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let Some(offset) = arg.strip_prefix('-') else {
        return Err(anyhow!("Time argument must start with '-', got {arg:?}"));
    };

    let (mut days, mut hours, mut minutes, mut seconds) = (0i64, 0i64, 0i64, 0i64);
    for capture in OFFSET_RE.captures_iter(offset) {
        let value: i64 = capture[1]
            .parse()
            .with_context(|| format!("Offset component {:?} is too large", &capture[0]))?;
        match &capture[2] {
            "d" => days = value,
            "h" => hours = value,
            "m" => minutes = value,
            _ => seconds = value,
        }
    }

    let out_of_range = || anyhow!("Offset {arg:?} is out of range");
    let delta = [
        TimeDelta::try_days(days),
        TimeDelta::try_hours(hours),
        TimeDelta::try_minutes(minutes),
        TimeDelta::try_seconds(seconds),
    ]
    .into_iter()
    .try_fold(TimeDelta::zero(), |total, part| total.checked_add(&part?))
    .ok_or_else(out_of_range)?;

    now.checked_sub_signed(delta).ok_or_else(out_of_range)
}

fn relay_clients(config: &AppConfig, webhook_url: String) -> Result<RelayClients> {
    let timeout = config.request_timeout;
    let secrets = &config.secrets;
    Ok(RelayClients {
        source: Box::new(TruthSocialClient::new(
            config.api_base_url.clone(),
            secrets.truthsocial_token.clone(),
            timeout,
        )?),
        fetcher: Box::new(HttpMediaFetcher::new(timeout)?),
        host: Box::new(ImgurHost::new(
            DEFAULT_IMGUR_BASE_URL,
            secrets.imgur_client_id.clone(),
            timeout,
        )?),
        translator: Box::new(AzureTranslator::new(
            DEFAULT_AZURE_ENDPOINT,
            secrets.azure.clone(),
            timeout,
        )?),
        deliverer: Box::new(DiscordWebhook::new(webhook_url, timeout)?),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}

/// Async CLI entrypoint shared by `main` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run {
            config,
            pull_since,
            once,
        } => {
            let config = load_config(config)?;
            let webhook_url = config.require_webhook()?;
            let pull_since = match pull_since {
                Some(arg) => parse_pull_since(&arg, Utc::now())?,
                None => Utc::now(),
            };
            let clients = relay_clients(&config, webhook_url)?;
            let mut relay = Relay::new(
                config.account.clone(),
                pull_since,
                config.compose.clone(),
                config.attachments.clone(),
                clients,
            );

            if once {
                let report = relay.check_once().await;
                tracing::info!(command = "run", ?report, "Single cycle complete");
            } else {
                relay.run_until(config.poll_interval, shutdown_signal()).await;
            }
            Ok(())
        }
        Commands::Render { config, post } => {
            let config = load_config(config)?;
            let raw = fs::read_to_string(&post)
                .with_context(|| format!("Failed to read post file {:?}", post))?;
            let post: Post = serde_json::from_str(&raw).context("Failed to parse post JSON")?;

            let timeout = config.request_timeout;
            let fetcher = HttpMediaFetcher::new(timeout)?;
            let host = ImgurHost::new(
                DEFAULT_IMGUR_BASE_URL,
                config.secrets.imgur_client_id.clone(),
                timeout,
            )?;
            let translator =
                AzureTranslator::new(DEFAULT_AZURE_ENDPOINT, config.secrets.azure.clone(), timeout)?;
            let collaborators = Collaborators {
                fetcher: &fetcher,
                host: &host,
                translator: &translator,
            };
            let message =
                build_message(&post, collaborators, &config.compose, &config.attachments).await;

            println!("{}", message.content);
            for file in &message.files {
                println!("[attachment] {} ({} bytes)", file.filename, file.bytes.len());
            }
            tracing::info!(command = "render", post_id = %post.id, "Rendered post");
            Ok(())
        }
    }
}
