use anyhow::Result;
use async_trait::async_trait;
use windows::core::{HSTRING, PCWSTR};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowW, GetForegroundWindow, GetWindowTextW, SetForegroundWindow, ShowWindow, SW_RESTORE,
};

use super::WindowInspector;

/// Win32 inspector
pub struct WindowsInspector;

impl WindowsInspector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsInspector {
    fn default() -> Self {
        Self::new()
    }
}

fn foreground_title() -> Option<String> {
    let mut buf = [0u16; 512];
    let len = unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd.0 == 0 {
            return None;
        }
        GetWindowTextW(hwnd, &mut buf)
    };
    let len = usize::try_from(len).ok()?;
    let title = String::from_utf16_lossy(&buf[..len]);
    (!title.is_empty()).then_some(title)
}

fn activate_window(title: &str) -> Result<()> {
    let name = HSTRING::from(title);
    unsafe {
        let hwnd = FindWindowW(PCWSTR::null(), &name);
        if hwnd.0 == 0 {
            anyhow::bail!("Window not found: {title}");
        }
        let _ = ShowWindow(hwnd, SW_RESTORE);
        if !SetForegroundWindow(hwnd).as_bool() {
            anyhow::bail!("Window refused focus: {title}");
        }
    }
    Ok(())
}

#[async_trait]
impl WindowInspector for WindowsInspector {
    async fn current_title(&self) -> Result<Option<String>> {
        Ok(foreground_title())
    }

    async fn activate(&self, title: &str) -> Result<()> {
        activate_window(title)
    }
}
