//! Request body validation for login and registration.
//!
//! Fields are checked in declaration order and the first failure wins. Every
//! check runs before any side effect.

use chrono::{Months, NaiveDate};
use email_address::EmailAddress;
use serde::Deserialize;

const MIN_PASSWORD_LENGTH: usize = 8;
const PASSWORD_SYMBOLS: &str = "!@#$%^&*";
const MIN_AGE_YEARS: u32 = 9;
const MAX_AGE_YEARS: u32 = 100;

const INVALID_USERNAME: &str = "You must provide a valid username !";
const INVALID_EMAIL: &str = "You must provide a valid email !";
const INVALID_PASSWORD: &str = "You must provide a valid password !";
const SHORT_PASSWORD: &str = "Your password must be at least 8 characters long";
const WEAK_PASSWORD: &str = "Your password must contain at least 1 uppercase, 1 lowercase, 1 number, 1 special character";
const INVALID_NAME: &str = "You must provide a valid name !";
const INVALID_DATE_OF_BIRTH: &str = "You must provide a valid date of birth !";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email_or_username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirmation: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// Login credentials that passed validation.
#[derive(Debug)]
pub struct LoginForm<'a> {
    pub identifier: &'a str,
    pub password: &'a str,
}

/// Registration fields that passed validation.
#[derive(Debug)]
pub struct RegistrationForm<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub display_name: &'a str,
    pub date_of_birth: NaiveDate,
}

/// Why a request body was rejected. Each message is safe to return as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_login(req: &LoginRequest) -> Result<LoginForm<'_>, ValidationError> {
    let identifier = req
        .email_or_username
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ValidationError::new("You must provide a valid email or username!"))?;

    let password = req
        .password
        .as_deref()
        .ok_or_else(|| ValidationError::new(INVALID_PASSWORD))?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new(SHORT_PASSWORD));
    }

    Ok(LoginForm {
        identifier,
        password,
    })
}

/// Validate a registration body against `today`'s date.
pub fn validate_registration(
    req: &RegisterRequest,
    today: NaiveDate,
) -> Result<RegistrationForm<'_>, ValidationError> {
    let username = validate_username(req.username.as_deref())?;
    let email = validate_email(req.email.as_deref())?;
    let password = validate_password(req.password.as_deref())?;
    let confirmation = validate_password(req.password_confirmation.as_deref())?;
    let display_name = validate_display_name(req.display_name.as_deref())?;
    let date_of_birth = validate_date_of_birth(req.date_of_birth.as_deref(), today)?;

    if password != confirmation {
        return Err(ValidationError::new("Passwords do not match"));
    }

    Ok(RegistrationForm {
        username,
        email,
        password,
        display_name,
        date_of_birth,
    })
}

fn validate_username(username: Option<&str>) -> Result<&str, ValidationError> {
    let username = username.ok_or_else(|| ValidationError::new(INVALID_USERNAME))?;

    if username.chars().count() < 2 {
        return Err(ValidationError::new(
            "Your username should at least contain 2 letters",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::new(
            "Your username cannot contain special characters",
        ));
    }

    Ok(username)
}

fn validate_email(email: Option<&str>) -> Result<&str, ValidationError> {
    let email = email.ok_or_else(|| ValidationError::new(INVALID_EMAIL))?;

    let parsed: EmailAddress = email
        .parse()
        .map_err(|_| ValidationError::new(INVALID_EMAIL))?;

    // Bare hosts like `user@localhost` are valid RFC 5322 but not deliverable.
    let domain = parsed.domain();
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::new(INVALID_EMAIL));
    }

    Ok(email)
}

fn validate_password(password: Option<&str>) -> Result<&str, ValidationError> {
    let password = password.ok_or_else(|| ValidationError::new(INVALID_PASSWORD))?;

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new(SHORT_PASSWORD));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

    if !(has_lower && has_upper && has_digit && has_symbol) {
        return Err(ValidationError::new(WEAK_PASSWORD));
    }

    Ok(password)
}

fn validate_display_name(name: Option<&str>) -> Result<&str, ValidationError> {
    let name = name.ok_or_else(|| ValidationError::new(INVALID_NAME))?;

    if name.chars().count() < 2 {
        return Err(ValidationError::new(
            "Your name should at least contain 2 letters",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c.is_whitespace())
    {
        return Err(ValidationError::new(
            "Your name cannot contain special characters",
        ));
    }

    Ok(name)
}

fn validate_date_of_birth(
    date_of_birth: Option<&str>,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    let invalid = || ValidationError::new(INVALID_DATE_OF_BIRTH);

    let raw = date_of_birth.ok_or_else(invalid)?;
    if raw.len() != 10 {
        return Err(invalid());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;

    let youngest = today
        .checked_sub_months(Months::new(MIN_AGE_YEARS * 12))
        .ok_or_else(invalid)?;
    let oldest = today
        .checked_sub_months(Months::new(MAX_AGE_YEARS * 12))
        .ok_or_else(invalid)?;

    if date > today || date > youngest || date < oldest {
        return Err(invalid());
    }

    Ok(date)
}
