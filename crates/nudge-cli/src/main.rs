mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use nudge_core::{config::level_filter, MonitorConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nudge")]
#[command(about = "Focus reminders driven by the active window", long_about = None)]
struct Cli {
    /// Path to a JSON or TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override `debug_level` from the configuration (0-3)
    #[arg(short, long, global = true)]
    debug_level: Option<u8>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Monitor the active window in the foreground
    Run,
    /// Print the active window title and whether it is a target
    Window,
    /// Print the effective configuration
    Config,
    /// Build a generation prompt, optionally sending and speaking it
    Prompt {
        #[arg(value_enum)]
        kind: PromptKind,
        /// Window the prompt is about
        #[arg(short, long, default_value = "Browser")]
        window: String,
        /// Target window for punishment prompts
        #[arg(short, long)]
        target: Option<String>,
        /// Focused seconds for praise prompts
        #[arg(short, long, default_value_t = 1800)]
        seconds: i64,
        /// Send the prompt to the completion service and speak the reply
        #[arg(long)]
        send: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PromptKind {
    Punish,
    Praise,
}

fn init_logging(debug_level: u8) {
    let default_filter = level_filter(debug_level).to_string();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, path) = MonitorConfig::load_or_default(cli.config.as_deref())?;
    init_logging(cli.debug_level.unwrap_or(config.debug_level));

    match &path {
        Some(p) => log::info!("Loaded configuration from {}", p.display()),
        None => log::info!("No configuration file found, using defaults"),
    }
    for warning in config.warnings() {
        log::warn!("{warning}");
    }

    match cli.command {
        Commands::Run => commands::run::run(&config).await,
        Commands::Window => commands::window::show_window(&config).await,
        Commands::Config => commands::config::show_config(&config, path.as_deref()),
        Commands::Prompt {
            kind,
            window,
            target,
            seconds,
            send,
        } => {
            let prompt = match kind {
                PromptKind::Punish => commands::prompt::punishment(&config, &window, target.as_deref()),
                PromptKind::Praise => commands::prompt::praise(&config, &window, seconds),
            };
            commands::prompt::handle_prompt(&config, &prompt, send).await
        }
    }
}
