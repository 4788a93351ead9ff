use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::WindowInspector;

/// X11 inspector backed by `xdotool`
pub struct LinuxInspector;

impl LinuxInspector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinuxInspector {
    fn default() -> Self {
        Self::new()
    }
}

/// `xdotool search --name` takes a regular expression
fn escape_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

async fn run_xdotool(args: &[&str]) -> Result<String> {
    let output = Command::new("xdotool")
        .args(args)
        .output()
        .await
        .context("Failed to run xdotool")?;

    if !output.status.success() {
        anyhow::bail!(
            "xdotool {} failed: {}",
            args.first().unwrap_or(&""),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[async_trait]
impl WindowInspector for LinuxInspector {
    async fn current_title(&self) -> Result<Option<String>> {
        let title = run_xdotool(&["getactivewindow", "getwindowname"]).await?;
        Ok((!title.is_empty()).then_some(title))
    }

    async fn activate(&self, title: &str) -> Result<()> {
        let pattern = format!("^{}$", escape_regex(title));
        run_xdotool(&["search", "--limit", "1", "--name", &pattern, "windowactivate"])
            .await
            .with_context(|| format!("Window not found: {title}"))?;
        Ok(())
    }
}
