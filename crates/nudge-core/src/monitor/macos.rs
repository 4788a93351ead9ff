use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::WindowInspector;

/// Uses `osascript` to read and switch the frontmost application
pub struct MacOSInspector;

impl MacOSInspector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacOSInspector {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

async fn run_osascript(script: &str) -> Result<String> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .await
        .context("Failed to run osascript")?;

    if !output.status.success() {
        anyhow::bail!(
            "osascript failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[async_trait]
impl WindowInspector for MacOSInspector {
    async fn current_title(&self) -> Result<Option<String>> {
        // The frontmost application name is what target fragments match on macOS
        let script = r#"
            tell application "System Events"
                return name of first application process whose frontmost is true
            end tell
        "#;

        let name = run_osascript(script).await?;
        Ok((!name.is_empty()).then_some(name))
    }

    async fn activate(&self, title: &str) -> Result<()> {
        let script = format!("tell application \"{}\" to activate", escape_applescript(title));
        run_osascript(&script)
            .await
            .with_context(|| format!("Application not found: {title}"))?;
        Ok(())
    }
}
