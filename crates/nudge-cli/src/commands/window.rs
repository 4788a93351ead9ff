use anyhow::Result;
use nudge_core::{monitor::create_inspector, FocusTracker, MonitorConfig};

pub async fn show_window(config: &MonitorConfig) -> Result<()> {
    let inspector = create_inspector()?;
    let tracker = FocusTracker::from_config(config);

    match inspector.current_title().await? {
        Some(title) => {
            let verdict = if tracker.is_target(&title) {
                "target"
            } else {
                "distraction"
            };
            println!("{title}");
            println!("  -> {verdict}");
        }
        None => println!("No focused window"),
    }
    Ok(())
}
