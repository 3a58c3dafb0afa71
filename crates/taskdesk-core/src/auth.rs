//! Anonymous/Authenticated gate over the locally stored user list.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::task::new_id;
use crate::user::{Session, User};
use crate::validation::{
    Field, FieldErrors, LoginForm, PasswordChangeForm, ProfileForm, RegisterForm,
    validate_forgot_password, validate_login, validate_password_change, validate_profile,
    validate_register,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Invalid(#[from] FieldErrors),
    #[error("this email address is already registered")]
    DuplicateEmail,
    #[error("no account is registered with this email address")]
    UnknownEmail,
    #[error("incorrect password")]
    WrongPassword,
    #[error("current password is incorrect")]
    WrongCurrentPassword,
    #[error("login required")]
    NotAuthenticated,
}

impl AuthError {
    /// Form field the message belongs under, if any.
    pub fn field(&self) -> Option<Field> {
        match self {
            AuthError::DuplicateEmail | AuthError::UnknownEmail => Some(Field::Email),
            AuthError::WrongPassword => Some(Field::Password),
            AuthError::WrongCurrentPassword => Some(Field::CurrentPassword),
            AuthError::Invalid(_) | AuthError::NotAuthenticated => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    users: Vec<User>,
    session: Option<Session>,
}

impl AuthGate {
    /// Rebuilds the gate from the stored user list and session snapshot.
    pub fn restore(users: Vec<User>, snapshot: Option<User>) -> Self {
        if let Some(user) = &snapshot {
            debug!(user_id = %user.id, "restored session snapshot");
        }
        Self {
            users,
            session: snapshot.map(Session::for_user),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn state(&self) -> AuthState {
        if self.session.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session().map(|s| &s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    pub fn require_session(&self) -> Result<&Session, AuthError> {
        self.session().ok_or(AuthError::NotAuthenticated)
    }

    #[tracing::instrument(skip(self, form, now), fields(email = %form.email.trim()))]
    pub fn register(&mut self, form: &RegisterForm, now: DateTime<Utc>) -> Result<&User, AuthError> {
        validate_register(form)?;

        let email = form.email.trim();
        if self.users.iter().any(|u| u.email == email) {
            warn!("registration rejected: duplicate email");
            return Err(AuthError::DuplicateEmail);
        }

        let user = User {
            id: new_id(now),
            name: form.name.trim().to_string(),
            email: email.to_string(),
            password: form.password.clone(),
        };
        self.users.push(user.clone());
        info!(user_id = %user.id, users = self.users.len(), "registered user");

        Ok(self.enter(user))
    }

    /// Email is checked before password so the two failures stay distinct.
    #[tracing::instrument(skip(self, form), fields(email = %form.email.trim()))]
    pub fn login(&mut self, form: &LoginForm) -> Result<&User, AuthError> {
        validate_login(form)?;

        let email = form.email.trim();
        let Some(user) = self.users.iter().find(|u| u.email == email) else {
            warn!("login rejected: unknown email");
            return Err(AuthError::UnknownEmail);
        };
        if user.password != form.password {
            warn!("login rejected: wrong password");
            return Err(AuthError::WrongPassword);
        }

        let user = user.clone();
        info!(user_id = %user.id, "logged in");
        Ok(self.enter(user))
    }

    #[tracing::instrument(skip(self))]
    pub fn logout(&mut self) -> Option<Session> {
        let session = self.session.take()?;
        info!(user_id = %session.user.id, "logged out");
        Some(session)
    }

    /// Renames the current account. Email uniqueness is not re-checked.
    #[tracing::instrument(skip(self, form))]
    pub fn update_profile(&mut self, form: &ProfileForm) -> Result<&User, AuthError> {
        let id = self.require_session()?.user.id.clone();
        validate_profile(form)?;

        let name = form.name.trim();
        let email = form.email.trim();
        self.patch_user(&id, |u| {
            u.name = name.to_string();
            u.email = email.to_string();
        });
        info!(user_id = %id, "profile updated");
        self.require_session().map(|s| &s.user)
    }

    #[tracing::instrument(skip(self, form))]
    pub fn change_password(&mut self, form: &PasswordChangeForm) -> Result<(), AuthError> {
        let session = self.require_session()?;
        validate_password_change(form)?;

        if session.user.password != form.current_password {
            return Err(AuthError::WrongCurrentPassword);
        }

        let id = session.user.id.clone();
        let new_password = form.new_password.clone();
        self.patch_user(&id, |u| u.password = new_password.clone());
        info!(user_id = %id, "password changed");
        Ok(())
    }

    /// Only confirms that `email` belongs to the stored session snapshot.
    /// No reset link is actually sent.
    pub fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        validate_forgot_password(email)?;
        match self.current_user() {
            Some(user) if user.email == email.trim() => Ok(()),
            _ => Err(AuthError::UnknownEmail),
        }
    }

    fn enter(&mut self, user: User) -> &User {
        &self.session.insert(Session::for_user(user)).user
    }

    fn patch_user<F>(&mut self, id: &str, mut apply: F)
    where
        F: FnMut(&mut User),
    {
        for user in self.users.iter_mut().filter(|u| u.id == id) {
            apply(user);
        }
        if let Some(session) = self.session.as_mut().filter(|s| s.user.id == id) {
            apply(&mut session.user);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::user::MOCK_TOKEN;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap()
    }

    fn register_form(email: &str) -> RegisterForm {
        RegisterForm {
            name: "Grace Hopper".to_string(),
            email: email.to_string(),
            password: "cobol60".to_string(),
            confirm_password: "cobol60".to_string(),
        }
    }

    fn login_form(email: &str, password: &str) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn register_enters_session_with_mock_token() {
        let mut gate = AuthGate::default();
        let user = gate
            .register(&register_form(" grace@navy.mil "), now())
            .unwrap()
            .clone();

        assert_eq!(user.email, "grace@navy.mil");
        assert_eq!(user.id, now().timestamp_millis().to_string());
        assert_eq!(gate.users().len(), 1);
        assert_eq!(gate.session().unwrap().token, MOCK_TOKEN);
    }

    #[test]
    fn duplicate_email_is_rejected_without_touching_users() {
        let mut gate = AuthGate::default();
        gate.register(&register_form("grace@navy.mil"), now()).unwrap();
        gate.logout();
        let before = gate.users().to_vec();

        let err = gate
            .register(&register_form("grace@navy.mil"), now())
            .unwrap_err();

        assert_eq!(err, AuthError::DuplicateEmail);
        assert_eq!(err.field(), Some(Field::Email));
        assert_eq!(gate.users(), before.as_slice());
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn wrong_password_is_a_password_error() {
        let mut gate = AuthGate::default();
        gate.register(&register_form("grace@navy.mil"), now()).unwrap();
        gate.logout();

        let err = gate
            .login(&login_form("grace@navy.mil", "fortran"))
            .unwrap_err();
        assert_eq!(err, AuthError::WrongPassword);
        assert_eq!(err.field(), Some(Field::Password));

        let err = gate
            .login(&login_form("nobody@navy.mil", "fortran"))
            .unwrap_err();
        assert_eq!(err, AuthError::UnknownEmail);
        assert_eq!(err.field(), Some(Field::Email));

        assert!(gate.login(&login_form("grace@navy.mil", "cobol60")).is_ok());
        assert!(gate.is_authenticated());
    }

    #[test]
    fn invalid_forms_never_reach_the_user_list() {
        let mut gate = AuthGate::default();
        let err = gate.login(&LoginForm::default()).unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn logout_returns_to_anonymous() {
        let mut gate = AuthGate::default();
        gate.register(&register_form("grace@navy.mil"), now()).unwrap();

        assert!(gate.logout().is_some());
        assert_eq!(gate.state(), AuthState::Anonymous);
        assert!(gate.logout().is_none());
        assert_eq!(gate.require_session().unwrap_err(), AuthError::NotAuthenticated);
    }

    #[test]
    fn profile_and_password_updates_hit_list_and_session() {
        let mut gate = AuthGate::default();
        gate.register(&register_form("grace@navy.mil"), now()).unwrap();

        gate.update_profile(&ProfileForm {
            name: "Rear Admiral Hopper".to_string(),
            email: "hopper@navy.mil".to_string(),
        })
        .unwrap();
        assert_eq!(gate.users()[0].email, "hopper@navy.mil");
        assert_eq!(gate.current_user().unwrap().name, "Rear Admiral Hopper");

        let wrong = PasswordChangeForm {
            current_password: "nope".to_string(),
            new_password: "compiler".to_string(),
            confirm_password: "compiler".to_string(),
        };
        assert_eq!(
            gate.change_password(&wrong).unwrap_err(),
            AuthError::WrongCurrentPassword
        );

        let right = PasswordChangeForm {
            current_password: "cobol60".to_string(),
            ..wrong
        };
        gate.change_password(&right).unwrap();
        assert_eq!(gate.users()[0].password, "compiler");
        assert_eq!(gate.current_user().unwrap().password, "compiler");
    }

    #[test]
    fn forgot_password_matches_session_snapshot_only() {
        let mut gate = AuthGate::default();
        gate.register(&register_form("grace@navy.mil"), now()).unwrap();
        assert!(gate.forgot_password("grace@navy.mil").is_ok());
        assert_eq!(
            gate.forgot_password("other@navy.mil").unwrap_err(),
            AuthError::UnknownEmail
        );

        gate.logout();
        assert_eq!(
            gate.forgot_password("grace@navy.mil").unwrap_err(),
            AuthError::UnknownEmail
        );
    }

    #[test]
    fn restore_from_snapshot_is_authenticated() {
        let user = User {
            id: "1".to_string(),
            name: "Grace".to_string(),
            email: "grace@navy.mil".to_string(),
            password: "cobol60".to_string(),
        };
        let gate = AuthGate::restore(vec![user.clone()], Some(user));
        assert!(gate.is_authenticated());
        assert!(!AuthGate::restore(vec![], None).is_authenticated());
    }
}
