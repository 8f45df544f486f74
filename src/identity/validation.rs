//! Pure validation of registration and login payloads.
//! Every rule runs independently so the caller sees all violations at once.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MIN_SECRET_LEN: usize = 7;

// local-part "@" domain-with-dot
static HANDLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("handle pattern"));

/// Field name -> ordered violation messages. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn push(&mut self, field: &str, message: &str) {
        self.0.entry(field.to_string()).or_default().push(message.to_string());
    }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn get(&self, field: &str) -> Option<&[String]> { self.0.get(field).map(|v| v.as_slice()) }
    pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }
    pub fn fields(&self) -> impl Iterator<Item = &str> { self.0.keys().map(|k| k.as_str()) }
}

/// How strictly display names are checked. Deployments pick one; `Lenient`
/// only requires a non-blank value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayNamePolicy {
    #[default]
    Lenient,
    Strict { min: usize, max: usize },
}

impl DisplayNamePolicy {
    pub fn strict() -> Self { DisplayNamePolicy::Strict { min: 3, max: 32 } }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterPayload {
    #[serde(default, alias = "email")]
    pub handle: Option<String>,
    #[serde(default, alias = "username", alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, alias = "password")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    #[serde(default, alias = "email")]
    pub handle: Option<String>,
    #[serde(default, alias = "password")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRegistration {
    pub handle: String,
    pub display_name: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLogin {
    pub handle: String,
    pub secret: String,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub fn is_valid_handle(handle: &str) -> bool {
    HANDLE_PATTERN.is_match(handle)
}

fn check_handle(raw: &Option<String>, errors: &mut FieldErrors) -> Option<String> {
    match non_blank(raw) {
        Some(h) if is_valid_handle(h) => Some(h.to_string()),
        _ => {
            errors.push("handle", "must be a valid email");
            None
        }
    }
}

fn check_display_name(raw: &Option<String>, policy: &DisplayNamePolicy, errors: &mut FieldErrors) -> Option<String> {
    let Some(name) = non_blank(raw) else {
        errors.push("display_name", "must not be blank");
        return None;
    };
    if let DisplayNamePolicy::Strict { min, max } = *policy {
        let mut ok = true;
        let len = name.chars().count();
        if len < min || len > max {
            errors.push("display_name", &format!("length must be between {} and {} characters", min, max));
            ok = false;
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            errors.push("display_name", "may only contain letters, digits, '_' and '-'");
            ok = false;
        }
        if !ok { return None; }
    }
    Some(name.to_string())
}

fn check_secret_present(raw: &Option<String>, errors: &mut FieldErrors) -> Option<String> {
    // Presence only: the value itself is passed on untrimmed.
    match raw {
        Some(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => {
            errors.push("secret", "must not be blank");
            None
        }
    }
}

/// Validate and normalize a registration payload.
pub fn validate_registration(payload: &RegisterPayload, policy: &DisplayNamePolicy) -> AppResult<NormalizedRegistration> {
    let mut errors = FieldErrors::default();
    let handle = check_handle(&payload.handle, &mut errors);
    let display_name = check_display_name(&payload.display_name, policy, &mut errors);
    let mut secret = check_secret_present(&payload.secret, &mut errors);
    if let Some(s) = &secret {
        if s.chars().count() < MIN_SECRET_LEN {
            errors.push("secret", &format!("length must be at least {} characters", MIN_SECRET_LEN));
            secret = None;
        }
    }
    match (handle, display_name, secret) {
        (Some(handle), Some(display_name), Some(secret)) if errors.is_empty() => {
            Ok(NormalizedRegistration { handle, display_name, secret })
        }
        _ => Err(AppError::validation(errors)),
    }
}

/// Validate a login payload. No length rule here: login must not reveal the
/// registration policy.
pub fn validate_login(payload: &LoginPayload) -> AppResult<NormalizedLogin> {
    let mut errors = FieldErrors::default();
    let handle = check_handle(&payload.handle, &mut errors);
    let secret = check_secret_present(&payload.secret, &mut errors);
    match (handle, secret) {
        (Some(handle), Some(secret)) if errors.is_empty() => Ok(NormalizedLogin { handle, secret }),
        _ => Err(AppError::validation(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(handle: Option<&str>, name: Option<&str>, secret: Option<&str>) -> RegisterPayload {
        RegisterPayload {
            handle: handle.map(String::from),
            display_name: name.map(String::from),
            secret: secret.map(String::from),
        }
    }

    fn details(err: AppError) -> FieldErrors {
        match err {
            AppError::Validation { details, .. } => details,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_and_trims() {
        let out = validate_registration(&reg(Some("  user@example.com "), Some(" alice "), Some(" 1234567")), &DisplayNamePolicy::Lenient).unwrap();
        assert_eq!(out.handle, "user@example.com");
        assert_eq!(out.display_name, "alice");
        assert_eq!(out.secret, " 1234567");
    }

    #[test]
    fn secret_length_boundary() {
        let ok = validate_registration(&reg(Some("user@example.com"), Some("alice"), Some("1234567")), &DisplayNamePolicy::Lenient);
        assert!(ok.is_ok());
        let err = validate_registration(&reg(Some("user@example.com"), Some("alice"), Some("123456")), &DisplayNamePolicy::Lenient).unwrap_err();
        assert_eq!(err.code_str(), "validation_error");
        assert_eq!(err.message(), "invalid fields");
        let d = details(err);
        assert_eq!(d.get("secret").unwrap(), &["length must be at least 7 characters".to_string()]);
        assert!(!d.contains("handle"));
    }

    #[test]
    fn every_short_secret_fails() {
        for n in 0..MIN_SECRET_LEN {
            let s = "x".repeat(n);
            let err = validate_registration(&reg(Some("user@example.com"), Some("alice"), Some(&s)), &DisplayNamePolicy::Lenient).unwrap_err();
            assert!(details(err).contains("secret"), "len {n} should fail");
        }
        for n in MIN_SECRET_LEN..MIN_SECRET_LEN + 5 {
            let s = "x".repeat(n);
            assert!(validate_registration(&reg(Some("user@example.com"), Some("alice"), Some(&s)), &DisplayNamePolicy::Lenient).is_ok());
        }
    }

    #[test]
    fn missing_secret_reports_blank_only() {
        let err = validate_registration(&reg(Some("user@example.com"), Some("alice"), None), &DisplayNamePolicy::Lenient).unwrap_err();
        assert_eq!(details(err).get("secret").unwrap(), &["must not be blank".to_string()]);
        let err = validate_registration(&reg(Some("user@example.com"), Some("alice"), Some("   ")), &DisplayNamePolicy::Lenient).unwrap_err();
        assert_eq!(details(err).get("secret").unwrap().len(), 1);
    }

    #[test]
    fn handle_shapes() {
        assert!(is_valid_handle("user@example.com"));
        for bad in ["invalid-email", "@example.com", "test@", "user@example", "a b@example.com", "user@@example.com"] {
            assert!(!is_valid_handle(bad), "{bad} should be rejected");
            let err = validate_registration(&reg(Some(bad), Some("alice"), Some("1234567")), &DisplayNamePolicy::Lenient).unwrap_err();
            assert_eq!(details(err).get("handle").unwrap(), &["must be a valid email".to_string()]);
        }
    }

    #[test]
    fn collects_all_violations() {
        let err = validate_registration(&reg(None, Some(" "), Some("abc")), &DisplayNamePolicy::Lenient).unwrap_err();
        let d = details(err);
        let fields: Vec<&str> = d.fields().collect();
        assert_eq!(fields, vec!["display_name", "handle", "secret"]);
    }

    #[test]
    fn strict_display_name_policy() {
        let strict = DisplayNamePolicy::strict();
        assert!(validate_registration(&reg(Some("u@example.com"), Some("al_ice-1"), Some("1234567")), &strict).is_ok());
        let err = validate_registration(&reg(Some("u@example.com"), Some("al"), Some("1234567")), &strict).unwrap_err();
        assert!(details(err).contains("display_name"));
        let err = validate_registration(&reg(Some("u@example.com"), Some("alice smith"), Some("1234567")), &strict).unwrap_err();
        assert!(details(err).contains("display_name"));
        // Lenient accepts the same names
        assert!(validate_registration(&reg(Some("u@example.com"), Some("al"), Some("1234567")), &DisplayNamePolicy::Lenient).is_ok());
    }

    #[test]
    fn login_requires_fields_but_no_length() {
        let ok = validate_login(&LoginPayload { handle: Some(" user@example.com".into()), secret: Some("x".into()) }).unwrap();
        assert_eq!(ok.handle, "user@example.com");
        let err = validate_login(&LoginPayload::default()).unwrap_err();
        let d = details(err);
        assert!(d.contains("handle") && d.contains("secret"));
    }

    #[test]
    fn payload_accepts_original_field_names() {
        let p: RegisterPayload = serde_json::from_str(r#"{"email":"a@b.co","username":"ann","password":"1234567"}"#).unwrap();
        assert_eq!(p.handle.as_deref(), Some("a@b.co"));
        assert_eq!(p.display_name.as_deref(), Some("ann"));
        assert_eq!(p.secret.as_deref(), Some("1234567"));
        let p: LoginPayload = serde_json::from_str(r#"{"handle":"a@b.co"}"#).unwrap();
        assert!(p.secret.is_none());
    }
}
