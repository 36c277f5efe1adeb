use std::path::PathBuf;

use {
    clap::Parser,
    secrecy::Secret,
    subgate_telegram::{
        TelegramGateConfig,
        config::{DEFAULT_CHANNEL_HANDLE, DEFAULT_CHANNEL_ID},
    },
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "subgate", about = "Subgate — Telegram channel subscription gate")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Bot token from @BotFather.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Public handle of the gated channel (e.g. @my_channel). Empty to look
    /// up membership by numeric id only.
    #[arg(long, env = "CHANNEL_USERNAME", default_value = DEFAULT_CHANNEL_HANDLE)]
    channel_handle: String,

    /// Numeric id of the gated channel, used when the handle lookup fails.
    #[arg(
        long,
        env = "CHANNEL_ID",
        allow_hyphen_values = true,
        default_value_t = DEFAULT_CHANNEL_ID
    )]
    channel_id: i64,

    /// Timeout for a single membership lookup, in seconds.
    #[arg(long, env = "SUBGATE_LOOKUP_TIMEOUT_SECS", default_value_t = 10)]
    lookup_timeout_secs: u64,

    /// Directory containing the welcome banner.
    #[arg(long, env = "SUBGATE_BANNER_DIR", default_value = ".")]
    banner_dir: PathBuf,

    /// Banner file names, tried in order (comma separated).
    #[arg(long, env = "SUBGATE_BANNER_FILES", value_delimiter = ',')]
    banner_files: Vec<String>,
}

impl Cli {
    fn gate_config(&self) -> TelegramGateConfig {
        let defaults = TelegramGateConfig::default();
        TelegramGateConfig {
            token: Secret::new(self.token.clone().unwrap_or_default()),
            channel_handle: self.channel_handle.clone(),
            channel_id: Some(self.channel_id),
            lookup_timeout_secs: self.lookup_timeout_secs,
            banner_dir: self.banner_dir.clone(),
            banner_files: if self.banner_files.is_empty() {
                defaults.banner_files.clone()
            } else {
                self.banner_files.clone()
            },
            ..defaults
        }
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = cli.gate_config();
    info!(?config, "starting subgate");

    let cancel = subgate_telegram::start_polling(config).await?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("failed to listen for shutdown signal: {e}");
            }
            info!("shutting down");
        },
        () = cancel.cancelled() => {
            warn!("telegram polling stopped, exiting");
        },
    }
    cancel.cancel();

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn config_from_flags() {
        let cli = Cli::parse_from([
            "subgate",
            "--token",
            "123:ABC",
            "--channel-handle",
            "@news",
            "--channel-id",
            "-1002408689600",
            "--banner-files",
            "a.png,b.png",
        ]);
        let config = cli.gate_config();

        assert_eq!(config.token.expose_secret(), "123:ABC");
        assert_eq!(config.channel_handle, "@news");
        assert_eq!(config.channel_id, Some(-1002408689600));
        assert_eq!(config.banner_files, vec!["a.png", "b.png"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_token_fails_validation() {
        let cli = Cli::parse_from(["subgate", "--token", "", "--channel-handle", "@news"]);
        let config = cli.gate_config();

        assert_eq!(config.banner_files, vec![
            "Бот баннер.png",
            "bot_banner.png",
            "welcome.png"
        ]);
        assert_eq!(config.lookup_timeout_secs, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn token_alone_is_enough_to_start() {
        let cli = Cli::try_parse_from(["subgate", "--token", "123:ABC"]).expect("parse");
        let config = cli.gate_config();

        assert!(config.validate().is_ok());
        assert!(!config.membership_channels().is_empty());
    }

    #[test]
    fn empty_handle_falls_back_to_id_lookup() {
        let cli = Cli::parse_from([
            "subgate",
            "--token",
            "123:ABC",
            "--channel-handle",
            "",
            "--channel-id",
            "-100",
        ]);
        let config = cli.gate_config();

        assert!(config.validate().is_ok());
        assert_eq!(config.membership_channels().len(), 1);
        assert_eq!(config.channel().join_url(), None);
    }
}
