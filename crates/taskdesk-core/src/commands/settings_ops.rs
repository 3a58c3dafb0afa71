use anyhow::anyhow;
use tracing::{instrument, warn};

use crate::cli::SettingsCommand;
use crate::render::Renderer;
use crate::settings::LANGUAGES;
use crate::state::AppState;
use crate::storage::LocalStorage;

#[instrument(skip(state, storage, renderer, cmd))]
pub(super) fn cmd_settings(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
    cmd: SettingsCommand,
) -> anyhow::Result<()> {
    let line = match cmd {
        SettingsCommand::Show => return renderer.print_settings(&state.settings),
        SettingsCommand::Theme { theme } => {
            let theme = match theme {
                Some(theme) => {
                    state.settings.set_theme(theme);
                    theme
                }
                None => state.settings.toggle_theme(),
            };
            renderer.set_theme(theme);
            format!("Theme set to {theme}.")
        }
        SettingsCommand::ToggleNotifications => {
            let on = state.settings.toggle_notifications();
            format!("Notifications {}.", if on { "on" } else { "off" })
        }
        SettingsCommand::Language { code } => {
            let code = code.trim();
            if code.is_empty() {
                return Err(anyhow!("language code cannot be empty"));
            }
            if !LANGUAGES.contains(&code) {
                warn!(language = code, offered = ?LANGUAGES, "language has no translation");
            }
            state.settings.set_language(code);
            format!("Language set to {code}.")
        }
    };

    state.save_settings(storage)?;
    renderer.message(&line)
}
