use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use super::{auth_failure, require_login};
use crate::cli::ProfileCommand;
use crate::render::Renderer;
use crate::state::AppState;
use crate::storage::LocalStorage;
use crate::validation::{LoginForm, PasswordChangeForm, ProfileForm, RegisterForm};

#[instrument(skip(state, storage, renderer, form, now))]
pub(super) fn cmd_register(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
    form: &RegisterForm,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let user = state
        .auth
        .register(form, now)
        .map_err(|err| auth_failure(err, "register"))?;
    let line = format!("Registered {} and logged in.", user.email);

    state.save_auth(storage)?;
    renderer.message(&line)
}

#[instrument(skip(state, storage, renderer, form))]
pub(super) fn cmd_login(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
    form: &LoginForm,
) -> anyhow::Result<()> {
    let user = state
        .auth
        .login(form)
        .map_err(|err| auth_failure(err, "login"))?;
    let line = format!("Welcome back, {}.", user.name);

    state.save_auth(storage)?;
    renderer.message(&line)
}

#[instrument(skip(state, storage, renderer))]
pub(super) fn cmd_logout(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    match state.auth.logout() {
        Some(session) => {
            state.save_auth(storage)?;
            renderer.message(&format!("Logged out {}.", session.user.email))
        }
        None => renderer.message("Not logged in."),
    }
}

pub(super) fn cmd_whoami(state: &AppState, renderer: &mut Renderer) -> anyhow::Result<()> {
    let user = require_login(state)?;
    renderer.print_user(user)
}

/// Nothing is mailed; a match only confirms the address.
#[instrument(skip(state, renderer))]
pub(super) fn cmd_forgot_password(
    state: &AppState,
    renderer: &mut Renderer,
    email: &str,
) -> anyhow::Result<()> {
    state
        .auth
        .forgot_password(email)
        .map_err(|err| auth_failure(err, "password reset"))?;
    info!("password reset requested");
    renderer.message(&format!(
        "Password reset instructions sent to {}.",
        email.trim()
    ))
}

#[instrument(skip(state, storage, renderer, cmd))]
pub(super) fn cmd_profile(
    state: &mut AppState,
    storage: &LocalStorage,
    renderer: &mut Renderer,
    cmd: ProfileCommand,
) -> anyhow::Result<()> {
    match cmd {
        ProfileCommand::Update { name, email } => {
            let form = ProfileForm { name, email };
            state
                .auth
                .update_profile(&form)
                .map_err(|err| auth_failure(err, "profile update"))?;
            state.save_auth(storage)?;
            renderer.message("Profile updated.")
        }
        ProfileCommand::Password {
            current,
            new_password,
            confirm,
        } => {
            let form = PasswordChangeForm {
                current_password: current,
                new_password,
                confirm_password: confirm,
            };
            state
                .auth
                .change_password(&form)
                .map_err(|err| auth_failure(err, "password change"))?;
            state.save_auth(storage)?;
            renderer.message("Password changed.")
        }
    }
}
