use anyhow::{Context, Result};
use nudge_ai::{PromptTemplates, SamplingParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::presence::PresenceButton;

const DEFAULT_PRESENCE_APP_ID: &str = "1133456581988732970";

/// Get the user configuration directory for nudge.
///
/// # Errors
///
/// Returns an error if the configuration directory cannot be determined.
pub fn get_config_dir() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Failed to get config dir"))?;
    path.push("nudge");
    Ok(path)
}

/// Map the numeric debug level onto a log filter.
///
/// 0 keeps only errors, 1 adds recoverable warnings, 2 adds state
/// transitions, 3 and above adds per-tick detail.
#[must_use]
pub fn level_filter(debug_level: u8) -> log::LevelFilter {
    match debug_level {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

/// Longest sleep or timeout handed to the runtime, one year
const MAX_WAIT_SECS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

fn wait_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.min(MAX_WAIT_SECS))
        .unwrap_or(Duration::from_secs_f64(MAX_WAIT_SECS))
}

/// Monitor configuration, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Window title fragments considered productive
    pub target_apps: Vec<String>,
    /// Seconds away from a target before the reminder sound plays
    pub reminder_interval: f64,
    /// Seconds away from a target before a rebuke is generated
    pub punishment_interval: f64,
    /// Seconds of continuous focus before a commendation is generated
    pub praise_interval: f64,
    /// Seconds between two window samples
    pub poll_interval: f64,
    pub edge_tts_voice: String,
    pub tts_command: String,
    pub prompt: String,
    pub punishment_subprompt: String,
    pub praise_subprompt: String,
    pub reminder_sound: PathBuf,
    /// Re-activate the last target window when a rebuke fires
    pub switch_back: bool,
    pub discord_presence: bool,
    pub presence_app_id: String,
    pub presence_focus_image: String,
    pub presence_unfocus_image: String,
    pub presence_large_text: String,
    pub presence_buttons: Vec<PresenceButton>,
    pub completion_url: String,
    /// Seconds before a completion request is abandoned
    pub request_timeout: f64,
    pub debug_level: u8,
    #[serde(flatten)]
    pub sampling: SamplingParams,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target_apps: vec!["Visual Studio Code".to_string()],
            reminder_interval: 30.0,
            punishment_interval: 60.0,
            praise_interval: 1800.0,
            poll_interval: 5.0,
            edge_tts_voice: "ru-RU-SvetlanaNeural".to_string(),
            tts_command: "edge-tts".to_string(),
            prompt: "You are helpfull assistant".to_string(),
            punishment_subprompt: "\n\nUser: \u{42f} \u{43e}\u{442}\u{432}\u{43b}\u{435}\u{43a}\u{441}\u{44f} \u{43e}\u{442} \u{441}\u{432}\u{43e}\u{435}\u{439} \u{440}\u{430}\u{431}\u{43e}\u{442}\u{44b} \u{432} \u{43e}\u{43a}\u{43d}\u{435} '{}' \u{438} \u{43f}\u{435}\u{440}\u{435}\u{43a}\u{43b}\u{44e}\u{447}\u{438}\u{43b}\u{441}\u{44f} \u{43d}\u{430} '{}' \u{431}\u{435}\u{437} \u{43d}\u{443}\u{436}\u{434}\u{44b}.\n\u{415}\u{432}\u{430}:"
                .to_string(),
            praise_subprompt: "\n\nUser: \u{42f} \u{440}\u{430}\u{431}\u{43e}\u{442}\u{430}\u{43b} \u{441}\u{444}\u{43e}\u{43a}\u{443}\u{441}\u{438}\u{440}\u{43e}\u{432}\u{430}\u{43d}\u{43d}\u{43e} \u{432} \u{43e}\u{43a}\u{43d}\u{435} '{}' \u{431}\u{435}\u{437} \u{43e}\u{442}\u{432}\u{43b}\u{435}\u{447}\u{435}\u{43d}\u{438}\u{439} \u{446}\u{435}\u{43b}\u{44b}\u{445} '{}' \u{441}\u{435}\u{43a}\u{443}\u{43d}\u{434}!\n\u{415}\u{432}\u{430}:"
                .to_string(),
            reminder_sound: PathBuf::from("H_WARNING.mp3"),
            switch_back: true,
            discord_presence: false,
            presence_app_id: DEFAULT_PRESENCE_APP_ID.to_string(),
            presence_focus_image: "cat".to_string(),
            presence_unfocus_image: "fix".to_string(),
            presence_large_text: "https://github.com/JErfurt/focuswithai".to_string(),
            presence_buttons: vec![
                PresenceButton {
                    label: "Repository".to_string(),
                    url: "https://github.com/JErfurt/focuswithai".to_string(),
                },
                PresenceButton {
                    label: "Example".to_string(),
                    url: "https://www.youtube.com/watch?v=AqjlrRfCPb8".to_string(),
                },
            ],
            completion_url: "http://127.0.0.1:8080/completion".to_string(),
            request_timeout: 60.0,
            debug_level: 0,
            sampling: SamplingParams::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a JSON or TOML file (chosen by extension)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let config: Self = if is_toml {
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse TOML config {}", path.display()))?
        } else {
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Locate the configuration file.
    ///
    /// Search order: `./config.json`, `./config.toml`, then
    /// `<config dir>/nudge/config.toml`.
    #[must_use]
    pub fn discover() -> Option<PathBuf> {
        let mut candidates = vec![PathBuf::from("config.json"), PathBuf::from("config.toml")];
        if let Ok(dir) = get_config_dir() {
            candidates.push(dir.join("config.toml"));
        }
        candidates.into_iter().find(|p| p.is_file())
    }

    /// Load from an explicit path, a discovered file, or fall back to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing, or if the chosen file
    /// fails to load
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        match Self::discover() {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Check intervals for values the tracker cannot work with
    ///
    /// # Errors
    ///
    /// Returns an error if any interval is not a positive, finite number
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("reminder_interval", self.reminder_interval),
            ("punishment_interval", self.punishment_interval),
            ("praise_interval", self.praise_interval),
            ("poll_interval", self.poll_interval),
            ("request_timeout", self.request_timeout),
        ] {
            if !value.is_finite() {
                anyhow::bail!("{name} must be a finite number of seconds");
            }
            if value <= 0.0 {
                anyhow::bail!("{name} must be greater than zero");
            }
        }

        Ok(())
    }

    /// Settings that are legal but probably not what the user meant
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.punishment_interval < self.reminder_interval {
            warnings.push(format!(
                "punishment_interval ({}s) is shorter than reminder_interval ({}s)",
                self.punishment_interval, self.reminder_interval
            ));
        }
        if self.target_apps.is_empty() {
            warnings.push("target_apps is empty, every window counts as a distraction".to_string());
        }
        warnings
    }

    #[must_use]
    pub fn templates(&self) -> PromptTemplates {
        PromptTemplates {
            base: self.prompt.clone(),
            punishment: self.punishment_subprompt.clone(),
            praise: self.praise_subprompt.clone(),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        wait_duration(self.poll_interval)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        wait_duration(self.request_timeout)
    }
}
