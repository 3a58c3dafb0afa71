use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_LANGUAGE: &str = "tr";

pub const LANGUAGES: &[&str] = &["tr", "en"];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_notifications")]
    pub notifications: bool,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_notifications() -> bool {
    true
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            notifications: default_notifications(),
            language: default_language(),
        }
    }
}

impl Settings {
    pub fn set_theme(&mut self, theme: Theme) {
        debug!(%theme, "theme set");
        self.theme = theme;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled());
        self.theme
    }

    pub fn toggle_notifications(&mut self) -> bool {
        self.notifications = !self.notifications;
        debug!(notifications = self.notifications, "notifications toggled");
        self.notifications
    }

    /// Any language code is accepted; [`LANGUAGES`] lists the ones offered.
    pub fn set_language(&mut self, language: &str) {
        debug!(language, "language set");
        self.language = language.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_fresh_install() {
        let settings = Settings::default();
        assert_eq!(settings.theme, Theme::Light);
        assert!(settings.notifications);
        assert_eq!(settings.language, "tr");
    }

    #[test]
    fn double_toggle_restores_notifications() {
        for start in [true, false] {
            let mut settings = Settings {
                notifications: start,
                ..Settings::default()
            };
            settings.toggle_notifications();
            assert_eq!(settings.notifications, !start);
            settings.toggle_notifications();
            assert_eq!(settings.notifications, start);
        }
    }

    #[test]
    fn theme_toggle_and_set() {
        let mut settings = Settings::default();
        assert_eq!(settings.toggle_theme(), Theme::Dark);
        settings.set_theme(Theme::Light);
        assert_eq!(settings.theme, Theme::Light);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert!(settings.notifications);
        assert_eq!(settings.language, DEFAULT_LANGUAGE);
    }
}
