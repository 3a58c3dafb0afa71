mod auth_ops;
mod settings_ops;
mod task_ops;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::auth::AuthError;
use crate::cli::Command;
use crate::config::Config;
use crate::render::Renderer;
use crate::state::AppState;
use crate::storage::LocalStorage;
use crate::user::User;
use crate::validation::{FieldErrors, LoginForm, RegisterForm};

/// Runs one subcommand against the loaded state and writes back the keys it
/// touched.
#[instrument(skip(state, storage, cfg, renderer, command, now))]
pub fn dispatch(
    state: &mut AppState,
    storage: &LocalStorage,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    debug!(
        command = command_name(&command),
        authenticated = state.auth.is_authenticated(),
        "dispatching command"
    );

    match command {
        Command::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            let form = RegisterForm {
                name,
                email,
                password,
                confirm_password,
            };
            auth_ops::cmd_register(state, storage, renderer, &form, now)
        }
        Command::Login { email, password } => {
            let form = LoginForm { email, password };
            auth_ops::cmd_login(state, storage, renderer, &form)
        }
        Command::Logout => auth_ops::cmd_logout(state, storage, renderer),
        Command::Whoami => auth_ops::cmd_whoami(state, renderer),
        Command::ForgotPassword { email } => auth_ops::cmd_forgot_password(state, renderer, &email),
        Command::Profile(cmd) => {
            require_login(state)?;
            auth_ops::cmd_profile(state, storage, renderer, cmd)
        }
        Command::Dashboard => task_ops::cmd_dashboard(state, renderer),
        Command::Categories => {
            require_login(state)?;
            task_ops::cmd_categories(state, renderer)
        }
        Command::Task(cmd) => {
            require_login(state)?;
            task_ops::cmd_task(state, storage, cfg, renderer, cmd, now)
        }
        Command::Comment(cmd) => {
            require_login(state)?;
            task_ops::cmd_comment(state, storage, renderer, cmd, now)
        }
        Command::Subtask(cmd) => {
            require_login(state)?;
            task_ops::cmd_subtask(state, storage, renderer, cmd, now)
        }
        Command::Settings(cmd) => settings_ops::cmd_settings(state, storage, renderer, cmd),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Register { .. } => "register",
        Command::Login { .. } => "login",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::ForgotPassword { .. } => "forgot-password",
        Command::Profile(_) => "profile",
        Command::Dashboard => "dashboard",
        Command::Categories => "categories",
        Command::Task(_) => "task",
        Command::Comment(_) => "comment",
        Command::Subtask(_) => "subtask",
        Command::Settings(_) => "settings",
    }
}

fn require_login(state: &AppState) -> anyhow::Result<&User> {
    let session = state.auth.require_session()?;
    Ok(&session.user)
}

/// Puts the form field in front of the message, e.g.
/// `login failed: password: incorrect password`.
fn auth_failure(err: AuthError, action: &str) -> anyhow::Error {
    let field = err.field();
    let err = anyhow::Error::new(err);
    let err = match field {
        Some(field) => err.context(field.to_string()),
        None => err,
    };
    err.context(format!("{action} failed"))
}

fn form_rejected(errors: FieldErrors, action: &str) -> anyhow::Error {
    anyhow::Error::new(errors).context(format!("{action} failed"))
}
