//! Authentication request and response payloads.
//!
//! Requests carry raw caller input; shape checks run through the business
//! rule runner inside [`super::AuthService`] so every rejection has a code.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::views::UserView;

/// Caller-supplied password, wiped from memory on drop and redacted from
/// debug output.
///
/// # Examples
/// ```
/// use duty_backend::domain::Password;
///
/// let password = Password::new("correct horse");
/// assert_eq!(password.expose(), "correct horse");
/// assert_eq!(format!("{password:?}"), "Password(***)");
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Wrap a password.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Password text for hashing or verification.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Login attempt. An identifier containing `@` is treated as an email
/// address, anything else as a username.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub identifier: String,
    pub password: Password,
}

impl LoginRequest {
    /// Build a login request.
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: Password::new(password),
        }
    }
}

/// Issued session returned by a completed login or MFA verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

/// Account registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: Password,
    /// Require an emailed second factor on login.
    #[serde(default)]
    pub mfa_enabled: bool,
}

impl RegisterRequest {
    /// Build a registration request with MFA disabled.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: Password::new(password),
            mfa_enabled: false,
        }
    }

    /// Enable MFA for the new account.
    pub fn with_mfa(mut self) -> Self {
        self.mfa_enabled = true;
        self
    }
}

/// Redemption of an emailed one-time code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub identifier: String,
    pub code: String,
}

impl VerifyCodeRequest {
    /// Build a verification request.
    pub fn new(identifier: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            code: code.into(),
        }
    }
}

/// Password reset using a code sent by `forgot_password`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub identifier: String,
    pub code: String,
    pub new_password: Password,
}

impl ResetPasswordRequest {
    /// Build a reset request.
    pub fn new(
        identifier: impl Into<String>,
        code: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            code: code.into(),
            new_password: Password::new(new_password),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for credential handling.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn debug_output_redacts_passwords() {
        let request = LoginRequest::new("ada", "hunter22");
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("ada"));
    }

    #[rstest]
    fn requests_deserialise_from_camel_case() {
        let request: ResetPasswordRequest = serde_json::from_str(
            r#"{"identifier":"ada","code":"123456","newPassword":"s3cret-pass"}"#,
        )
        .expect("valid payload");
        assert_eq!(request.new_password.expose(), "s3cret-pass");
    }
}
