/// Foreground monitoring
use anyhow::Result;
use nudge_core::{Daemon, MonitorConfig};

pub async fn run(config: &MonitorConfig) -> Result<()> {
    log::info!(
        "Watching for {} target app(s): {}",
        config.target_apps.len(),
        config.target_apps.join(", ")
    );
    if config.discord_presence {
        log::info!("Discord presence enabled");
    }

    let mut daemon = Daemon::new(config)?;
    daemon.run_with_signals().await
}
