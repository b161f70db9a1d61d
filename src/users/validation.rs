use crate::{
    error::AppError,
    validation::{normalize_email, Violations, MIN_PASSWORD_LEN},
};

use super::dto::{CreateUserRequest, UpdateUserRequest};

/// A create payload that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// An update payload that passed every check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdateInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub old_password: Option<String>,
    pub password: Option<String>,
}

pub fn validate_create(req: CreateUserRequest) -> Result<NewUserInput, AppError> {
    let email = req.email.as_deref().map(normalize_email);
    let mut v = Violations::default();

    v.require("name", req.name.as_deref());
    match email.as_deref() {
        None => v.add("email", "is required"),
        Some(e) => v.email("email", e),
    }
    match req.password.as_deref() {
        None => v.add("password", "is required"),
        Some(p) => {
            v.min_chars("password", p, MIN_PASSWORD_LEN);
            check_confirmation(&mut v, p, req.password_confirmation.as_deref());
        }
    }
    v.finish()?;

    // finish() has already reported any missing field
    let (Some(name), Some(email), Some(password)) = (req.name, email, req.password) else {
        return Err(AppError::Validation(Vec::new()));
    };
    Ok(NewUserInput {
        name: name.trim().to_string(),
        email,
        password,
    })
}

pub fn validate_update(req: UpdateUserRequest) -> Result<UserUpdateInput, AppError> {
    let email = req.email.as_deref().map(normalize_email);
    let mut v = Violations::default();

    if let Some(name) = req.name.as_deref() {
        v.non_blank("name", name);
    }
    if let Some(e) = email.as_deref() {
        v.email("email", e);
    }
    if let Some(old) = req.old_password.as_deref() {
        v.min_chars("oldPassword", old, MIN_PASSWORD_LEN);
    }
    match (req.password.as_deref(), req.old_password.is_some()) {
        (Some(p), _) => {
            v.min_chars("password", p, MIN_PASSWORD_LEN);
            check_confirmation(&mut v, p, req.password_confirmation.as_deref());
        }
        (None, true) => v.add("password", "is required when oldPassword is given"),
        (None, false) => {}
    }
    v.finish()?;

    Ok(UserUpdateInput {
        name: req.name.map(|n| n.trim().to_string()),
        email,
        old_password: req.old_password,
        password: req.password,
    })
}

fn check_confirmation(v: &mut Violations, password: &str, confirmation: Option<&str>) {
    match confirmation {
        None => v.add("passwordConfirmation", "is required"),
        Some(c) if c != password => v.add("passwordConfirmation", "must match password"),
        Some(_) => {}
    }
}
