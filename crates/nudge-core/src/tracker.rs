//! Focus state machine.
//!
//! Given the sampled window title and the current time, the tracker mutates
//! the single [`FocusState`] and yields the intents for this tick. It performs
//! no I/O; the dispatcher turns intents into sounds, speech and presence.

use chrono::{DateTime, Duration, Utc};

use crate::config::MonitorConfig;


/// Focused or unfocused, as reported to the presence collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Focused,
    Unfocused,
}

impl PresenceStatus {
    /// Short status line shown above the details
    #[must_use]
    pub const fn label(&self) -> &'static str {
        "Time in full focus:"
    }

    #[must_use]
    pub const fn details(&self) -> &'static str {
        match self {
            Self::Focused => "Focus State",
            Self::Unfocused => "Unfocus State",
        }
    }
}

/// Side effect requested by one tick of the tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Play the reminder sound
    Reminder,
    /// Generate and speak a rebuke
    Punishment {
        distracting_window: String,
        target_window: Option<String>,
    },
    /// Generate and speak a commendation
    Praise {
        window: String,
        focused_seconds: i64,
    },
    /// Replace the presence session
    Presence {
        status: PresenceStatus,
        since: DateTime<Utc>,
    },
}

/// Timers and flags owned by the main cadence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusState {
    /// Last time a target window was observed
    pub last_active_time: DateTime<Utc>,
    /// Start of the current praise window
    pub last_focus_time: DateTime<Utc>,
    /// Start of the current focus streak, reported to presence
    pub start_focus_time: DateTime<Utc>,
    pub last_target_window: Option<String>,
    /// Focused presence already published
    pub focus_flag: bool,
    /// Unfocused presence already published
    pub unfocus_flag: bool,
}

impl FocusState {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_active_time: now,
            last_focus_time: now,
            start_focus_time: now,
            last_target_window: None,
            focus_flag: false,
            unfocus_flag: false,
        }
    }
}

/// Threshold-driven decision logic
#[derive(Debug, Clone)]
pub struct FocusTracker {
    targets: Vec<String>,
    reminder_interval: Duration,
    punishment_interval: Duration,
    praise_interval: Duration,
}

/// Whole milliseconds, saturating at `Duration::MAX` so that an absurdly
/// large interval means "never" instead of overflowing.
#[allow(clippy::cast_possible_truncation)]
fn seconds(value: f64) -> Duration {
    let millis = (value.max(0.0) * 1000.0).round() as i64;
    Duration::try_milliseconds(millis).unwrap_or(Duration::MAX)
}

impl FocusTracker {
    #[must_use]
    pub fn new(
        targets: Vec<String>,
        reminder_secs: f64,
        punishment_secs: f64,
        praise_secs: f64,
    ) -> Self {
        Self {
            targets,
            reminder_interval: seconds(reminder_secs),
            punishment_interval: seconds(punishment_secs),
            praise_interval: seconds(praise_secs),
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.target_apps.clone(),
            config.reminder_interval,
            config.punishment_interval,
            config.praise_interval,
        )
    }

    /// True if the title contains any configured target fragment
    #[must_use]
    pub fn is_target(&self, title: &str) -> bool {
        self.targets.iter().any(|fragment| title.contains(fragment.as_str()))
    }

    /// Advance the state machine by one observation.
    ///
    /// A `None` title leaves the state untouched. Reminder and punishment
    /// are level-triggered: they fire on every tick past their threshold
    /// until a target window is seen again.
    pub fn update(
        &self,
        title: Option<&str>,
        now: DateTime<Utc>,
        state: &mut FocusState,
    ) -> Vec<Intent> {
        let Some(title) = title else {
            return Vec::new();
        };

        log::debug!("Active window: {title}");

        if self.is_target(title) {
            self.on_target(title, now, state)
        } else {
            self.on_distraction(title, now, state)
        }
    }

    fn on_target(&self, title: &str, now: DateTime<Utc>, state: &mut FocusState) -> Vec<Intent> {
        let mut intents = Vec::new();

        state.last_active_time = now;
        state.last_target_window = Some(title.to_string());

        let focused = now - state.last_focus_time;
        log::debug!("Target window active: {title}, {}s focused", focused.num_seconds());
        if focused >= self.praise_interval {
            intents.push(Intent::Praise {
                window: title.to_string(),
                focused_seconds: focused.num_seconds(),
            });
            state.last_focus_time = now;
        }

        state.unfocus_flag = false;
        if !state.focus_flag {
            intents.push(Intent::Presence {
                status: PresenceStatus::Focused,
                since: state.start_focus_time,
            });
            state.focus_flag = true;
        }

        intents
    }

    fn on_distraction(
        &self,
        title: &str,
        now: DateTime<Utc>,
        state: &mut FocusState,
    ) -> Vec<Intent> {
        let mut intents = Vec::new();

        let inactive = now - state.last_active_time;
        log::debug!("Non-target window for {}s", inactive.num_seconds());

        if inactive >= self.reminder_interval {
            intents.push(Intent::Reminder);
            state.focus_flag = false;
            if !state.unfocus_flag {
                intents.push(Intent::Presence {
                    status: PresenceStatus::Unfocused,
                    since: state.start_focus_time,
                });
                state.unfocus_flag = true;
            }
        }

        if inactive >= self.punishment_interval {
            state.last_focus_time = now;
            state.start_focus_time = now;
            intents.push(Intent::Punishment {
                distracting_window: title.to_string(),
                target_window: state.last_target_window.clone(),
            });
        }

        intents
    }
}
