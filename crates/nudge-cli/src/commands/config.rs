/// Configuration display
use anyhow::{Context, Result};
use nudge_core::MonitorConfig;
use std::path::Path;

pub fn show_config(config: &MonitorConfig, path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => println!("# Loaded from {}", p.display()),
        None => println!("# Built-in defaults (no configuration file found)"),
    }

    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}
