//! Client-side form validation.
//!
//! Forms are checked before anything is sent; a failing form yields a
//! [`ValidationErrors`] map keyed by field name and no network call is made.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{PaymentIntentRequest, RentalWindow};
use crate::types::Currency;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PAYMENT_AMOUNT: f64 = 0.50;
pub const SUPPORTED_CURRENCIES: [&str; 4] = ["pln", "eur", "usd", "gbp"];

/// Field name to message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msg)| format!("{}: {}", field, msg))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Email shape check: one `@`, no whitespace, a dot inside the domain and no
/// `..` in the local part.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || local.contains("..") {
        return false;
    }

    // Some dot with at least one character on each side.
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Invalid email format");
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.is_empty() {
        errors.add("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }
}

fn check_terms(errors: &mut ValidationErrors, accept: bool) {
    if !accept {
        errors.add("accept", "You must accept the terms");
    }
}

/// Email and password as sent to `POST /api/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub accept: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        check_terms(&mut errors, self.accept);
        errors.into_result(Credentials::new(&self.email, &self.password))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub accept: bool,
    pub phone: Option<String>,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.first_name.trim().chars().count() < MIN_NAME_LEN {
            errors.add(
                "first_name",
                format!("First name must be at least {} characters", MIN_NAME_LEN),
            );
        }
        if self.last_name.trim().chars().count() < MIN_NAME_LEN {
            errors.add(
                "last_name",
                format!("Last name must be at least {} characters", MIN_NAME_LEN),
            );
        }
        check_email(&mut errors, &self.email);
        check_password(&mut errors, &self.password);
        if self.password != self.confirm {
            errors.add("confirm", "Passwords do not match");
        }
        check_terms(&mut errors, self.accept);

        errors.into_result(Registration {
            email: self.email.clone(),
            password: self.password.clone(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RentalForm {
    pub equipment_id: i64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub quantity: u32,
}

impl RentalForm {
    /// Check the period against `today` and the quantity against what the
    /// catalog reports as available.
    pub fn validate(&self, today: NaiveDate, available: u32) -> Result<RentalWindow, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self.start {
            None => errors.add("start_date", "Start date is required"),
            Some(start) if start < today => errors.add("start_date", "Start date cannot be in the past"),
            Some(_) => {}
        }
        match (self.start, self.end) {
            (_, None) => errors.add("end_date", "End date is required"),
            (Some(start), Some(end)) if end <= start => {
                errors.add("end_date", "End date must be after the start date")
            }
            _ => {}
        }

        if self.quantity == 0 {
            errors.add("quantity", "Quantity must be at least 1");
        } else if self.quantity > available {
            errors.add("quantity", format!("Only {} available", available));
        }

        match (self.start, self.end) {
            (Some(start), Some(end)) if errors.is_empty() => Ok(RentalWindow::from_dates(
                self.equipment_id,
                start,
                end,
                self.quantity,
            )),
            _ => Err(errors),
        }
    }
}

/// Whole days covered by a period, rounded up.
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let secs = (end - start).num_seconds().abs();
    (secs + 86_399) / 86_400
}

#[derive(Debug, Clone, Default)]
pub struct PaymentForm {
    pub rental_id: Option<i64>,
    pub amount: f64,
    pub currency: Option<String>,
}

impl PaymentForm {
    pub fn validate(&self) -> Result<PaymentIntentRequest, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.amount.is_finite() || self.amount <= 0.0 {
            errors.add("amount", "Amount must be positive");
        } else if self.amount < MIN_PAYMENT_AMOUNT {
            errors.add(
                "amount",
                format!("Minimum payment amount is {:.2}", MIN_PAYMENT_AMOUNT),
            );
        }

        let currency = match self.currency.as_deref().map(str::trim) {
            None | Some("") => Currency::default(),
            Some(raw) => Currency::new(raw.to_lowercase()),
        };
        if !SUPPORTED_CURRENCIES.contains(&currency.as_str()) {
            errors.add(
                "currency",
                format!("Unsupported currency. Use one of: {}", SUPPORTED_CURRENCIES.join(", ")),
            );
        }

        errors.into_result(PaymentIntentRequest {
            rental_id: self.rental_id,
            amount: self.amount,
            currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn valid_register() -> RegisterForm {
        RegisterForm {
            first_name: "Anna".to_string(),
            last_name: "Nowak".to_string(),
            email: "anna@example.com".to_string(),
            password: "secret1".to_string(),
            confirm: "secret1".to_string(),
            accept: true,
            phone: None,
        }
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("first.last@sub.example.pl"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user..name@example.com"));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
    }

    #[test]
    fn test_empty_register_form() {
        let errors = RegisterForm::default().validate().unwrap_err();
        for field in ["first_name", "last_name", "email", "password", "accept"] {
            assert!(errors.contains(field), "missing error for {}", field);
        }
        assert!(!errors.contains("confirm"));
        assert_eq!(errors.get("email"), Some("Email is required"));
    }

    #[test]
    fn test_register_password_mismatch_only() {
        let form = RegisterForm {
            password: "password123".to_string(),
            confirm: "different".to_string(),
            ..valid_register()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["confirm"]);
    }

    #[test]
    fn test_register_trims_names() {
        let form = RegisterForm {
            first_name: "  A ".to_string(),
            ..valid_register()
        };
        assert!(form.validate().unwrap_err().contains("first_name"));

        let form = RegisterForm {
            last_name: " Nowak ".to_string(),
            phone: Some("  ".to_string()),
            ..valid_register()
        };
        let body = form.validate().unwrap();
        assert_eq!(body.last_name, "Nowak");
        assert!(body.phone.is_none());
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm {
            email: "bad".to_string(),
            password: "12345".to_string(),
            accept: false,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("email"), Some("Invalid email format"));

        let form = LoginForm {
            email: "test@example.com".to_string(),
            password: "123456".to_string(),
            accept: true,
        };
        assert_eq!(form.validate().unwrap(), Credentials::new("test@example.com", "123456"));
    }

    #[test]
    fn test_rental_form_valid() {
        let form = RentalForm {
            equipment_id: 4,
            start: Some(date(2025, 6, 2)),
            end: Some(date(2025, 6, 5)),
            quantity: 2,
        };
        let window = form.validate(date(2025, 6, 1), 3).unwrap();
        assert_eq!(window.equipment_id, 4);
        assert_eq!(days_between(window.start_date, window.end_date), 3);
    }

    #[test]
    fn test_rental_form_errors() {
        let form = RentalForm {
            equipment_id: 4,
            start: Some(date(2025, 5, 30)),
            end: Some(date(2025, 5, 30)),
            quantity: 5,
        };
        let errors = form.validate(date(2025, 6, 1), 3).unwrap_err();
        assert!(errors.contains("start_date"));
        assert!(errors.contains("end_date"));
        assert_eq!(errors.get("quantity"), Some("Only 3 available"));

        let errors = RentalForm::default().validate(date(2025, 6, 1), 3).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_days_between_rounds_up() {
        let start = "2025-06-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let end = "2025-06-02T13:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(days_between(start, end), 2);
        assert_eq!(days_between(end, start), 2);
        assert_eq!(days_between(start, start), 0);
    }

    #[test]
    fn test_payment_form() {
        let form = PaymentForm {
            rental_id: Some(9),
            amount: 149.5,
            currency: Some("EUR".to_string()),
        };
        let req = form.validate().unwrap();
        assert_eq!(req.currency.as_str(), "eur");

        let req = PaymentForm {
            amount: 10.0,
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(req.currency.as_str(), "pln");
    }

    #[test]
    fn test_payment_form_errors() {
        let errors = PaymentForm {
            amount: 0.49,
            currency: Some("chf".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("amount"), Some("Minimum payment amount is 0.50"));
        assert!(errors.contains("currency"));

        let errors = PaymentForm::default().validate().unwrap_err();
        assert_eq!(errors.get("amount"), Some("Amount must be positive"));
    }

    #[test]
    fn test_display_lists_fields() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Email is required");
        errors.add("accept", "You must accept the terms");
        errors.add("email", "ignored");
        assert_eq!(
            errors.to_string(),
            "accept: You must accept the terms; email: Email is required"
        );
    }
}
