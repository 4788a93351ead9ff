//! Prompt assembly for generated rebukes and commendations.

use serde::{Deserialize, Serialize};

/// Substitute two positional values into a template.
///
/// Indexed placeholders (`{0}`, `{1}`) are honoured when present; otherwise
/// the first two `{}` placeholders are filled in order. Placeholders beyond
/// the second are left untouched.
#[must_use]
pub fn fill_slots(template: &str, first: &str, second: &str) -> String {
    if template.contains("{0}") || template.contains("{1}") {
        return template.replace("{0}", first).replace("{1}", second);
    }

    let mut out = String::with_capacity(template.len() + first.len() + second.len());
    let mut rest = template;
    for value in [first, second] {
        let Some(idx) = rest.find("{}") else {
            break;
        };
        out.push_str(&rest[..idx]);
        out.push_str(value);
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);
    out
}

/// The base prompt plus the two sub-templates appended to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplates {
    pub base: String,
    pub punishment: String,
    pub praise: String,
}

impl PromptTemplates {
    /// Prompt for a distraction. Slot order is (target window, distracting window).
    ///
    /// An unknown target window renders as an empty string.
    #[must_use]
    pub fn punishment_prompt(&self, distracting_window: &str, target_window: Option<&str>) -> String {
        let sub = fill_slots(
            &self.punishment,
            target_window.unwrap_or_default(),
            distracting_window,
        );
        format!("{}{sub}", self.base)
    }

    /// Prompt for a long focus streak. Slot order is (window, focused seconds).
    #[must_use]
    pub fn praise_prompt(&self, window: &str, focused_seconds: i64) -> String {
        let sub = fill_slots(&self.praise, window, &focused_seconds.to_string());
        format!("{}{sub}", self.base)
    }
}
