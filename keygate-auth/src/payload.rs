/// Request payloads for session operations
///
/// Payloads carry their own validation rules; every session operation
/// calls `validate()` before touching the database, and violations map to
/// [`AuthError::BadRequest`](crate::error::AuthError::BadRequest).

use serde::Deserialize;
use validator::Validate;

/// Payload for creating an account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterPayload {
    /// Desired login name
    #[validate(length(min = 1, max = 50, message = "Login must be 1-50 characters"))]
    pub login: String,

    /// Contact email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Plaintext password; hashed before storage
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
}

/// Payload for authenticating with an existing account
#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    /// Login name or email address
    #[validate(length(min = 1, message = "Identifier must not be empty"))]
    pub identifier: String,

    /// Plaintext password
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
}

/// Payload for changing credentials; `None` fields are left untouched
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCredentials {
    /// New login name
    #[validate(length(min = 1, max = 50, message = "Login must be 1-50 characters"))]
    pub login: Option<String>,

    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// The current password, required when setting a new one
    pub current_password: Option<String>,

    /// New plaintext password
    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub new_password: Option<String>,
}

impl UpdateCredentials {
    /// Returns true when the payload would change nothing.
    pub fn is_noop(&self) -> bool {
        self.login.is_none() && self.email.is_none() && self.new_password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_payload_accepts_valid_input() {
        let payload = RegisterPayload {
            login: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct horse battery staple".to_string(),
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_register_payload_rejects_empty_login() {
        let payload = RegisterPayload {
            login: String::new(),
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_register_payload_rejects_long_login() {
        let payload = RegisterPayload {
            login: "a".repeat(51),
            email: "ada@example.com".to_string(),
            password: "pw".to_string(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_register_payload_rejects_bad_email() {
        let payload = RegisterPayload {
            login: "ada".to_string(),
            email: "not-an-email".to_string(),
            password: "pw".to_string(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_login_payload_rejects_empty_identifier() {
        let payload = LoginPayload {
            identifier: String::new(),
            password: "pw".to_string(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_update_credentials_noop_detection() {
        assert!(UpdateCredentials::default().is_noop());

        let with_login = UpdateCredentials {
            login: Some("new-login".to_string()),
            ..Default::default()
        };
        assert!(!with_login.is_noop());

        // A bare current_password changes nothing on its own.
        let only_current = UpdateCredentials {
            current_password: Some("pw".to_string()),
            ..Default::default()
        };
        assert!(only_current.is_noop());
    }

    #[test]
    fn test_update_credentials_validates_set_fields_only() {
        let valid = UpdateCredentials {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let invalid = UpdateCredentials {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }
}
