//! Form validation.
//!
//! Every form is checked before its mutation runs. A failed check yields a
//! [`FieldErrors`] holding one message per offending field, in the order the
//! form shows them, and the mutation is skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::task::{TaskDraft, parse_due_date};

pub const MIN_NAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    CurrentPassword,
    NewPassword,
    Title,
    DueDate,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm password",
            Field::CurrentPassword => "current password",
            Field::NewPassword => "new password",
            Field::Title => "title",
            Field::DueDate => "due date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<Field, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` unless `field` already has one.
    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.push(Field::Email, "Email address is required");
    } else if !is_valid_email(email) {
        errors.push(Field::Email, "Enter a valid email address");
    }
}

pub fn validate_login(form: &LoginForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_email(&mut errors, &form.email);
    if form.password.is_empty() {
        errors.push(Field::Password, "Password is required");
    }
    errors.into_result()
}

pub fn validate_register(form: &RegisterForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.push(Field::Name, "Name is required");
    } else if name.chars().count() < MIN_NAME_LEN {
        errors.push(
            Field::Name,
            format!("Name must be at least {MIN_NAME_LEN} characters"),
        );
    }

    check_email(&mut errors, &form.email);

    if form.password.is_empty() {
        errors.push(Field::Password, "Password is required");
    } else if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(
            Field::Password,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }

    if form.confirm_password.is_empty() {
        errors.push(Field::ConfirmPassword, "Password confirmation is required");
    } else if form.confirm_password != form.password {
        errors.push(Field::ConfirmPassword, "Passwords do not match");
    }

    errors.into_result()
}

pub fn validate_profile(form: &ProfileForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if form.name.trim().is_empty() {
        errors.push(Field::Name, "Name is required");
    }
    if form.email.trim().is_empty() {
        errors.push(Field::Email, "Email address is required");
    }
    errors.into_result()
}

pub fn validate_password_change(form: &PasswordChangeForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if form.current_password.is_empty() {
        errors.push(Field::CurrentPassword, "Current password is required");
    }
    if form.new_password.is_empty() {
        errors.push(Field::NewPassword, "New password is required");
    }
    if form.confirm_password.is_empty() {
        errors.push(Field::ConfirmPassword, "Password confirmation is required");
    }
    if errors.is_empty() && form.new_password != form.confirm_password {
        errors.push(Field::ConfirmPassword, "New passwords do not match");
    }
    errors.into_result()
}

pub fn validate_forgot_password(email: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if email.trim().is_empty() {
        errors.push(Field::Email, "Email address is required");
    }
    errors.into_result()
}

/// New-task form: only the title is mandatory.
pub fn validate_new_task(draft: &TaskDraft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_title(&mut errors, draft);
    let due = draft.due_date.trim();
    if !due.is_empty() && parse_due_date(due).is_none() {
        errors.push(Field::DueDate, "Due date must be YYYY-MM-DD");
    }
    errors.into_result()
}

/// Edit form: title and due date are both mandatory.
pub fn validate_edit_task(draft: &TaskDraft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check_title(&mut errors, draft);
    let due = draft.due_date.trim();
    if due.is_empty() {
        errors.push(Field::DueDate, "Due date is required");
    } else if parse_due_date(due).is_none() {
        errors.push(Field::DueDate, "Due date must be YYYY-MM-DD");
    }
    errors.into_result()
}

fn check_title(errors: &mut FieldErrors, draft: &TaskDraft) {
    if draft.title.trim().is_empty() {
        errors.push(Field::Title, "Title is required");
    }
}
