use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "windows")]
pub mod windows;

/// Platform window inspector
#[async_trait]
pub trait WindowInspector: Send + Sync {
    /// Title of the focused window, if any
    async fn current_title(&self) -> Result<Option<String>>;

    /// Bring the window with the given title to the foreground
    async fn activate(&self, title: &str) -> Result<()>;
}

/// Create platform-specific inspector
///
/// # Errors
///
/// Returns an error if the current platform is not supported
pub fn create_inspector() -> Result<Arc<dyn WindowInspector>> {
    #[cfg(target_os = "macos")]
    {
        Ok(Arc::new(macos::MacOSInspector::new()))
    }

    #[cfg(target_os = "linux")]
    {
        Ok(Arc::new(linux::LinuxInspector::new()))
    }

    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsInspector::new()))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        anyhow::bail!("Unsupported platform")
    }
}

/// Samples the active window once per tick
pub struct WindowPoller {
    inspector: Arc<dyn WindowInspector>,
}

impl WindowPoller {
    #[must_use]
    pub fn new(inspector: Arc<dyn WindowInspector>) -> Self {
        Self { inspector }
    }

    /// Current title, or `None` when nothing is focused or the inspector fails
    pub async fn sample(&self) -> Option<String> {
        match self.inspector.current_title().await {
            Ok(Some(title)) if !title.trim().is_empty() => Some(title),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Active window lookup failed: {e:#}");
                None
            }
        }
    }
}
