//! User account aggregate with credentials, one-time codes and session token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Audit, EntityId, define_entity};
use super::query::FieldValue;

/// Coarse account role passed to the token issuer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular member.
    #[default]
    Member,
    /// Administrator.
    Admin,
}

impl Role {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl From<Role> for FieldValue {
    fn from(value: Role) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

/// Time-boxed numeric code stored on the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeCode {
    /// Digits the user must echo back.
    pub value: String,
    /// Instant after which the code is rejected.
    pub expires_at: DateTime<Utc>,
}

impl OneTimeCode {
    /// Whether the code has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Which one-time code slot an operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePurpose {
    /// Login second factor.
    Mfa,
    /// Email address confirmation.
    EmailVerification,
    /// Password reset.
    PasswordReset,
}

impl CodePurpose {
    /// Human-readable label used in messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mfa => "verification code",
            Self::EmailVerification => "email confirmation code",
            Self::PasswordReset => "password reset code",
        }
    }
}

/// Persisted user account.
///
/// Sensitive columns (hash, salt, codes, token) never leave the domain; the
/// outward shape is [`super::UserView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    /// Identity.
    pub id: EntityId,
    /// Unique login name.
    pub username: String,
    /// Unique, lower-cased email address.
    pub email: String,
    /// Hex password digest.
    pub password_hash: String,
    /// Hex salt mixed into the digest.
    pub password_salt: String,
    /// Account role.
    pub role: Role,
    /// Whether login requires an emailed second factor.
    pub mfa_enabled: bool,
    /// Whether the email address has been confirmed.
    pub email_confirmed: bool,
    /// Pending MFA code.
    pub mfa_code: Option<OneTimeCode>,
    /// Pending email confirmation code.
    pub verification_code: Option<OneTimeCode>,
    /// Pending password reset code.
    pub reset_code: Option<OneTimeCode>,
    /// Token of the current session; `None` when logged out.
    pub active_token: Option<String>,
    /// Audit columns.
    pub audit: Audit,
}

impl UserAccount {
    /// Unsaved account with member role and no pending codes.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        password_salt: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::unassigned(),
            username: username.into(),
            email: email.into().to_lowercase(),
            password_hash: password_hash.into(),
            password_salt: password_salt.into(),
            role: Role::default(),
            mfa_enabled: false,
            email_confirmed: false,
            mfa_code: None,
            verification_code: None,
            reset_code: None,
            active_token: None,
            audit: Audit::default(),
        }
    }

    /// Code slot for `purpose`.
    pub fn code(&self, purpose: CodePurpose) -> Option<&OneTimeCode> {
        match purpose {
            CodePurpose::Mfa => self.mfa_code.as_ref(),
            CodePurpose::EmailVerification => self.verification_code.as_ref(),
            CodePurpose::PasswordReset => self.reset_code.as_ref(),
        }
    }

    /// Mutable code slot for `purpose`.
    pub fn code_mut(&mut self, purpose: CodePurpose) -> &mut Option<OneTimeCode> {
        match purpose {
            CodePurpose::Mfa => &mut self.mfa_code,
            CodePurpose::EmailVerification => &mut self.verification_code,
            CodePurpose::PasswordReset => &mut self.reset_code,
        }
    }
}

/// Column-level changes to one account, written without rewriting the
/// rest of the row.
///
/// Unset fields leave the stored value untouched, so a concurrent write to a
/// different column (such as a freshly issued reset code) survives.
///
/// # Examples
/// ```
/// use duty_backend::domain::{AccountChanges, UserAccount};
///
/// let mut account = UserAccount::new("ada", "ada@example.com", "h", "s");
/// account.active_token = Some("old".to_owned());
/// AccountChanges::default().end_session().apply_to(&mut account);
/// assert_eq!(account.active_token, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    /// New active token; `Some(None)` ends the session.
    pub active_token: Option<Option<String>>,
    /// New email confirmation flag.
    pub email_confirmed: Option<bool>,
    /// New password hash and salt.
    pub credentials: Option<(String, String)>,
    /// Code to store in its purpose's slot.
    pub issued_code: Option<(CodePurpose, OneTimeCode)>,
}

impl AccountChanges {
    /// Record `token` as the active session.
    #[must_use]
    pub fn start_session(mut self, token: impl Into<String>) -> Self {
        self.active_token = Some(Some(token.into()));
        self
    }

    /// Clear the active session.
    #[must_use]
    pub fn end_session(mut self) -> Self {
        self.active_token = Some(None);
        self
    }

    /// Mark the email address as confirmed.
    #[must_use]
    pub fn confirm_email(mut self) -> Self {
        self.email_confirmed = Some(true);
        self
    }

    /// Replace the password digest.
    #[must_use]
    pub fn credentials(mut self, hash: impl Into<String>, salt: impl Into<String>) -> Self {
        self.credentials = Some((hash.into(), salt.into()));
        self
    }

    /// Store `code` in the `purpose` slot.
    #[must_use]
    pub fn issue_code(mut self, purpose: CodePurpose, code: OneTimeCode) -> Self {
        self.issued_code = Some((purpose, code));
        self
    }

    /// The code to store in `purpose`'s slot, if any.
    pub fn code_for(&self, purpose: CodePurpose) -> Option<&OneTimeCode> {
        self.issued_code
            .as_ref()
            .filter(|(slot, _)| *slot == purpose)
            .map(|(_, code)| code)
    }

    /// Write the set fields onto `account`.
    pub fn apply_to(&self, account: &mut UserAccount) {
        if let Some(token) = &self.active_token {
            account.active_token.clone_from(token);
        }
        if let Some(confirmed) = self.email_confirmed {
            account.email_confirmed = confirmed;
        }
        if let Some((hash, salt)) = &self.credentials {
            account.password_hash.clone_from(hash);
            account.password_salt.clone_from(salt);
        }
        if let Some((purpose, code)) = &self.issued_code {
            *account.code_mut(*purpose) = Some(code.clone());
        }
    }
}

define_entity! {
    UserAccount as "users",
    /// Filterable columns of [`UserAccount`].
    fields UserAccountField {
        Id => "id": |row| row.id,
        Username => "username": |row| row.username.as_str(),
        Email => "email": |row| row.email.as_str(),
        Role => "role": |row| row.role,
        MfaEnabled => "mfa_enabled": |row| row.mfa_enabled,
        EmailConfirmed => "email_confirmed": |row| row.email_confirmed,
        ActiveToken => "active_token": |row| row.active_token.clone(),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for code slots and field access.
    use super::*;
    use crate::domain::{Entity, EntityField};
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0)
            .single()
            .expect("valid time")
    }

    #[rstest]
    #[case(at(0), false)]
    #[case(at(1), false)]
    #[case(at(2), true)]
    fn codes_expire_strictly_after_their_deadline(
        #[case] now: DateTime<Utc>,
        #[case] expired: bool,
    ) {
        let code = OneTimeCode {
            value: "123456".to_owned(),
            expires_at: at(1),
        };
        assert_eq!(code.is_expired(now), expired);
    }

    #[rstest]
    fn code_slots_are_independent() {
        let mut user = UserAccount::new("ada", "Ada@Example.com", "hash", "salt");
        *user.code_mut(CodePurpose::PasswordReset) = Some(OneTimeCode {
            value: "654321".to_owned(),
            expires_at: at(5),
        });

        assert!(user.code(CodePurpose::Mfa).is_none());
        assert_eq!(
            user.code(CodePurpose::PasswordReset).map(|c| c.value.as_str()),
            Some("654321")
        );
        assert_eq!(user.email, "ada@example.com");
    }

    #[rstest]
    fn exposes_columns_by_name() {
        let user = UserAccount::new("ada", "ada@example.com", "hash", "salt");
        assert_eq!(
            UserAccountField::from_name("username"),
            Some(UserAccountField::Username)
        );
        assert_eq!(
            user.value(UserAccountField::ActiveToken),
            FieldValue::Null
        );
        assert_eq!(user.value(UserAccountField::Role), FieldValue::from("member"));
    }

    #[rstest]
    fn changes_only_touch_the_fields_they_set() {
        let reset = OneTimeCode {
            value: "654321".to_owned(),
            expires_at: at(5),
        };
        let mut user = UserAccount::new("ada", "ada@example.com", "hash", "salt");
        user.reset_code = Some(reset.clone());

        AccountChanges::default()
            .start_session("token-1")
            .confirm_email()
            .issue_code(CodePurpose::Mfa, reset.clone())
            .apply_to(&mut user);

        assert_eq!(user.active_token.as_deref(), Some("token-1"));
        assert!(user.email_confirmed);
        assert_eq!(user.reset_code, Some(reset.clone()));
        assert_eq!(user.mfa_code, Some(reset));
        assert_eq!(user.password_hash, "hash");
    }
}
