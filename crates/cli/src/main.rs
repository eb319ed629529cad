use anyhow::Context;
use clap::{Parser, Subcommand};
use onceover::config::Settings;
use onceover::supervisor::SupervisorExit;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "onceover")]
#[command(about = "Relay view-once media and answer status checks on a WhatsApp account", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory, a template config.json, and the auth directory.
    Init {
        /// Config file path (default: ONCEOVER_CONFIG_PATH or ~/.onceover/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Connect to WhatsApp and relay/respond until logged out or interrupted (Ctrl-C).
    Run {
        /// Config file path (default: ONCEOVER_CONFIG_PATH or ~/.onceover/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("onceover {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config }) => match run_bot(config).await {
            Ok(SupervisorExit::Shutdown) => {
                log::info!("stopped");
            }
            Ok(SupervisorExit::LoggedOut) => {
                eprintln!("session was logged out; run again to pair a new device");
                std::process::exit(2);
            }
            Err(e) => {
                log::error!("run failed: {:#}", e);
                std::process::exit(1);
            }
        },
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(onceover::config::default_config_path);
    let dir = onceover::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    println!("set \"groupDumper\" in {} before running", path.display());
    Ok(())
}

/// Load and validate config; any missing required key stops here, before connecting.
fn load_settings(config_path: Option<PathBuf>) -> anyhow::Result<Settings> {
    let (config, path) = onceover::config::load_config(config_path)?;
    onceover::init::require_initialized(&path)?;
    let settings = config
        .validate(&path)
        .with_context(|| format!("invalid config {}", path.display()))?;
    log::info!(
        "relaying view-once media to {}; trigger {:?}; timezone {}",
        settings.group_dumper,
        settings.trigger,
        settings.timezone
    );
    Ok(settings)
}

#[cfg(feature = "whatsapp")]
async fn run_bot(config_path: Option<PathBuf>) -> anyhow::Result<SupervisorExit> {
    use onceover::credentials::CredentialStore;
    use onceover::routing::MessageRouter;
    use onceover::supervisor::{Backoff, Supervisor};
    use std::sync::Arc;

    let settings = load_settings(config_path)?;
    let connector = whatsapp_channel::WhatsAppConnector::new(settings.auth_dir.join("device.db"));
    let supervisor = Supervisor::new(
        connector,
        Arc::new(MessageRouter::from_settings(&settings)),
        CredentialStore::new(settings.auth_dir.clone()),
        Backoff::new(
            settings.reconnect.initial_delay(),
            settings.reconnect.max_delay(),
        ),
    );
    supervisor
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("ctrl-c handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}

#[cfg(not(feature = "whatsapp"))]
async fn run_bot(config_path: Option<PathBuf>) -> anyhow::Result<SupervisorExit> {
    load_settings(config_path)?;
    anyhow::bail!(
        "built without WhatsApp support; rebuild with `cargo build -p onceover-cli --features whatsapp`"
    )
}
