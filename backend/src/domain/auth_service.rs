//! Authentication flows: registration, email verification, login with an
//! optional emailed second factor, password reset and logout.
//!
//! Every public operation returns a settled [`ServiceResult`]. Input shape
//! is validated by the rule runner before any I/O; one-time codes are
//! redeemed through the repository's atomic compare-and-clear, and later
//! writes go through column-level [`AccountChanges`] so they never restore a
//! stale copy of the account.

use std::sync::Arc;

use chrono::TimeDelta;
use mockable::Clock;
use rand::Rng;
use serde_json::json;
use tracing::info;

use crate::domain::message_codes::auth;
use crate::domain::ports::{
    MailEnvelope, Mailer, PasswordHasher, Repository, TokenClaims, TokenIssuer,
    UserAccountRepository,
};
use crate::domain::rules::{self, BusinessRules};
use crate::domain::{
    AccountChanges, CodePurpose, Filter, LoginRequest, LoginResponse, Message, OneTimeCode,
    Outcome, RegisterRequest, ResetPasswordRequest, ServiceError, ServiceResult, Tracking,
    UserAccount, UserAccountField, UserView, VerifyCodeRequest, settle,
};

const MIN_PASSWORD_LENGTH: usize = 8;
const CODE_DIGITS: usize = 6;
const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Validity windows of the emailed one-time codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLifetimes {
    /// Login second factor.
    pub mfa: TimeDelta,
    /// Email address confirmation.
    pub email_verification: TimeDelta,
    /// Password reset.
    pub password_reset: TimeDelta,
}

impl CodeLifetimes {
    fn for_purpose(&self, purpose: CodePurpose) -> TimeDelta {
        match purpose {
            CodePurpose::Mfa => self.mfa,
            CodePurpose::EmailVerification => self.email_verification,
            CodePurpose::PasswordReset => self.password_reset,
        }
    }
}

impl Default for CodeLifetimes {
    fn default() -> Self {
        Self {
            mfa: TimeDelta::minutes(1),
            email_verification: TimeDelta::hours(24),
            password_reset: TimeDelta::minutes(15),
        }
    }
}

/// Authentication service over a user account repository and its
/// collaborators.
#[derive(Clone)]
pub struct AuthService<U> {
    users: Arc<U>,
    mailer: Arc<dyn Mailer>,
    tokens: Arc<dyn TokenIssuer>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    lifetimes: CodeLifetimes,
}

impl<U> AuthService<U> {
    /// Create a service with default code lifetimes.
    pub fn new(
        users: Arc<U>,
        mailer: Arc<dyn Mailer>,
        tokens: Arc<dyn TokenIssuer>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            mailer,
            tokens,
            hasher,
            clock,
            lifetimes: CodeLifetimes::default(),
        }
    }

    /// Replace the code lifetimes.
    pub fn with_lifetimes(mut self, lifetimes: CodeLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }
}

impl<U> AuthService<U>
where
    U: UserAccountRepository,
{
    /// Create an account and email its confirmation code.
    ///
    /// A mail failure does not undo the registration: the result is a
    /// warning carrying the new user and `extraData.verificationSent=false`.
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<UserView> {
        settle("register", self.try_register(&request).await)
    }

    /// Confirm the email address with its code and open a session.
    pub async fn verify_email(&self, request: VerifyCodeRequest) -> ServiceResult<LoginResponse> {
        settle("verify_email", self.try_verify_email(&request).await)
    }

    /// Check credentials; either open a session or issue an MFA challenge.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<LoginResponse> {
        settle("login", self.try_login(&request).await)
    }

    /// Redeem an MFA challenge code and open a session.
    pub async fn verify_mfa(&self, request: VerifyCodeRequest) -> ServiceResult<LoginResponse> {
        settle("verify_mfa", self.try_verify_mfa(&request).await)
    }

    /// Email a password reset code.
    pub async fn forgot_password(&self, identifier: &str) -> ServiceResult<()> {
        settle("forgot_password", self.try_forgot_password(identifier).await)
    }

    /// Redeem a reset code and replace the password. Any open session is
    /// closed.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> ServiceResult<UserView> {
        settle("reset_password", self.try_reset_password(&request).await)
    }

    /// Close the session holding `token`. An unknown token is a failure.
    pub async fn logout(&self, token: &str) -> ServiceResult<()> {
        settle("logout", self.try_logout(token).await)
    }

    async fn try_register(
        &self,
        request: &RegisterRequest,
    ) -> Result<Outcome<UserView>, ServiceError> {
        let username = request.username.trim();
        let email = request.email.trim().to_lowercase();
        let password = request.password.expose();
        BusinessRules::new()
            .rule(auth::USERNAME_REQUIRED, || {
                rules::required(username, "username")
            })
            .rule(auth::EMAIL_INVALID, || rules::email_format(&email))
            .rule(auth::PASSWORD_REQUIRED, || {
                rules::required(password, "password")
            })
            .rule(auth::PASSWORD_TOO_SHORT, || {
                rules::min_length(password, MIN_PASSWORD_LENGTH, "password")
            })
            .run()?;

        let by_username = Filter::all()
            .equals(UserAccountField::Username, username)
            .include_deleted();
        let by_email = Filter::all()
            .equals(UserAccountField::Email, email.as_str())
            .include_deleted();
        if self.users.count(&by_username).await? > 0 || self.users.count(&by_email).await? > 0 {
            return Err(ServiceError::conflict(
                auth::USER_ALREADY_EXISTS,
                "an account with this username or email already exists",
            ));
        }

        let digest = self.hasher.create_hash(password);
        let mut account = UserAccount::new(username, email, digest.hash, digest.salt);
        account.mfa_enabled = request.mfa_enabled;
        let code = self.one_time_code(CodePurpose::EmailVerification);
        account.verification_code = Some(code.clone());
        let account = self.users.add(account, None).await?;
        info!(user_id = %account.id, "account registered");

        let view = UserView::from(&account);
        match self.deliver(&account, CodePurpose::EmailVerification, &code).await {
            Ok(()) => Ok(Outcome::done(view)),
            Err(reason) => Ok(Outcome::Warning {
                message: Message::warning(
                    auth::VERIFICATION_NOT_SENT,
                    format!("account created but the confirmation email failed: {reason}"),
                ),
                data: Some(view),
                extra: vec![("verificationSent", json!(false))],
            }),
        }
    }

    async fn try_verify_email(
        &self,
        request: &VerifyCodeRequest,
    ) -> Result<Outcome<LoginResponse>, ServiceError> {
        Self::validate_code_request(request)?;
        let account = self.require_account(&request.identifier).await?;
        self.redeem(&account, CodePurpose::EmailVerification, &request.code)
            .await?;
        info!(user_id = %account.id, "email confirmed");
        self.open_session(&account, AccountChanges::default().confirm_email())
            .await
            .map(Outcome::done)
    }

    async fn try_login(
        &self,
        request: &LoginRequest,
    ) -> Result<Outcome<LoginResponse>, ServiceError> {
        let identifier = request.identifier.trim();
        let password = request.password.expose();
        BusinessRules::new()
            .rule(auth::IDENTIFIER_REQUIRED, || {
                rules::required(identifier, "username or email")
            })
            .rule(auth::PASSWORD_REQUIRED, || {
                rules::required(password, "password")
            })
            .run()?;

        let Some(account) = self.find_account(identifier).await? else {
            return Err(ServiceError::not_found(auth::USER_NOT_FOUND, INVALID_CREDENTIALS));
        };
        if !self
            .hasher
            .verify(password, &account.password_hash, &account.password_salt)
        {
            return Err(ServiceError::conflict(auth::WRONG_PASSWORD, INVALID_CREDENTIALS));
        }

        if !account.mfa_enabled {
            return self
                .open_session(&account, AccountChanges::default())
                .await
                .map(Outcome::done);
        }

        let code = self.one_time_code(CodePurpose::Mfa);
        let account = self
            .users
            .apply_changes(
                account.id,
                &AccountChanges::default().issue_code(CodePurpose::Mfa, code.clone()),
                None,
            )
            .await?;
        self.deliver(&account, CodePurpose::Mfa, &code)
            .await
            .map_err(ServiceError::collaborator)?;
        info!(user_id = %account.id, "mfa challenge issued");
        Ok(Outcome::Warning {
            message: Message::warning(
                auth::MFA_REQUIRED,
                "a verification code was sent to your email address",
            ),
            data: None,
            extra: vec![("useMFA", json!(true))],
        })
    }

    async fn try_verify_mfa(
        &self,
        request: &VerifyCodeRequest,
    ) -> Result<Outcome<LoginResponse>, ServiceError> {
        Self::validate_code_request(request)?;
        let account = self.require_account(&request.identifier).await?;
        self.redeem(&account, CodePurpose::Mfa, &request.code)
            .await?;
        self.open_session(&account, AccountChanges::default())
            .await
            .map(Outcome::done)
    }

    async fn try_forgot_password(&self, identifier: &str) -> Result<Outcome<()>, ServiceError> {
        let identifier = identifier.trim();
        BusinessRules::new()
            .rule(auth::IDENTIFIER_REQUIRED, || {
                rules::required(identifier, "username or email")
            })
            .run()?;

        let account = self.require_account(identifier).await?;
        let code = self.one_time_code(CodePurpose::PasswordReset);
        let account = self
            .users
            .apply_changes(
                account.id,
                &AccountChanges::default().issue_code(CodePurpose::PasswordReset, code.clone()),
                None,
            )
            .await?;
        self.deliver(&account, CodePurpose::PasswordReset, &code)
            .await
            .map_err(ServiceError::collaborator)?;
        info!(user_id = %account.id, "password reset code issued");
        Ok(Outcome::Success {
            data: (),
            note: Some(Message::info(
                auth::RESET_CODE_SENT,
                "a password reset code was sent to your email address",
            )),
        })
    }

    async fn try_reset_password(
        &self,
        request: &ResetPasswordRequest,
    ) -> Result<Outcome<UserView>, ServiceError> {
        let identifier = request.identifier.trim();
        let password = request.new_password.expose();
        BusinessRules::new()
            .rule(auth::IDENTIFIER_REQUIRED, || {
                rules::required(identifier, "username or email")
            })
            .rule(auth::CODE_FORMAT, || {
                rules::numeric_code(&request.code, CODE_DIGITS)
            })
            .rule(auth::PASSWORD_REQUIRED, || {
                rules::required(password, "password")
            })
            .rule(auth::PASSWORD_TOO_SHORT, || {
                rules::min_length(password, MIN_PASSWORD_LENGTH, "password")
            })
            .run()?;

        let account = self.require_account(identifier).await?;
        self.redeem(&account, CodePurpose::PasswordReset, &request.code)
            .await?;
        let digest = self.hasher.create_hash(password);
        let changes = AccountChanges::default()
            .credentials(digest.hash, digest.salt)
            .end_session();
        let account = self.users.apply_changes(account.id, &changes, None).await?;
        info!(user_id = %account.id, "password reset");
        Ok(Outcome::done(UserView::from(&account)))
    }

    async fn try_logout(&self, token: &str) -> Result<Outcome<()>, ServiceError> {
        let token = token.trim();
        BusinessRules::new()
            .rule(auth::TOKEN_REQUIRED, || rules::required(token, "token"))
            .run()?;

        let Some(account) = self
            .users
            .find(
                Filter::all().equals(UserAccountField::ActiveToken, token),
                Tracking::Enabled,
            )
            .first()
            .await?
        else {
            return Err(ServiceError::not_found(
                auth::SESSION_NOT_FOUND,
                "no active session for this token",
            ));
        };
        self.users
            .apply_changes(account.id, &AccountChanges::default().end_session(), Some(account.id))
            .await?;
        info!(user_id = %account.id, "session closed");
        Ok(Outcome::done(()))
    }

    fn validate_code_request(request: &VerifyCodeRequest) -> Result<(), ServiceError> {
        let identifier = request.identifier.trim();
        BusinessRules::new()
            .rule(auth::IDENTIFIER_REQUIRED, || {
                rules::required(identifier, "username or email")
            })
            .rule(auth::CODE_FORMAT, || {
                rules::numeric_code(&request.code, CODE_DIGITS)
            })
            .run()?;
        Ok(())
    }

    async fn find_account(&self, identifier: &str) -> Result<Option<UserAccount>, ServiceError> {
        let identifier = identifier.trim();
        let filter = if identifier.contains('@') {
            Filter::all().equals(UserAccountField::Email, identifier.to_lowercase())
        } else {
            Filter::all().equals(UserAccountField::Username, identifier)
        };
        Ok(self.users.find(filter, Tracking::Enabled).first().await?)
    }

    async fn require_account(&self, identifier: &str) -> Result<UserAccount, ServiceError> {
        self.find_account(identifier).await?.ok_or_else(|| {
            ServiceError::not_found(auth::USER_NOT_FOUND, "no account matches this identifier")
        })
    }

    /// Check the pending code, then clear it atomically.
    async fn redeem(
        &self,
        account: &UserAccount,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<(), ServiceError> {
        let now = self.clock.utc();
        let Some(pending) = account.code(purpose) else {
            return Err(ServiceError::conflict(
                auth::CODE_NOT_PENDING,
                format!("no {} is pending", purpose.label()),
            ));
        };
        if pending.value != code {
            return Err(ServiceError::conflict(
                auth::CODE_MISMATCH,
                format!("the {} is incorrect", purpose.label()),
            ));
        }
        if pending.is_expired(now) {
            return Err(ServiceError::conflict(
                auth::CODE_EXPIRED,
                format!("the {} has expired", purpose.label()),
            ));
        }
        if !self
            .users
            .consume_code(account.id, purpose, code, now)
            .await?
        {
            return Err(ServiceError::conflict(
                auth::CODE_ALREADY_USED,
                format!("the {} was already used", purpose.label()),
            ));
        }
        Ok(())
    }

    /// Issue a token and record it as the active session together with
    /// `changes`.
    async fn open_session(
        &self,
        account: &UserAccount,
        changes: AccountChanges,
    ) -> Result<LoginResponse, ServiceError> {
        let claims = TokenClaims {
            user_id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            is_refresh: false,
        };
        let issued = self.tokens.generate(&claims).ok_or_else(|| {
            ServiceError::collaborator(Message::error(
                auth::TOKEN_NOT_ISSUED,
                "a session token could not be issued",
            ))
        })?;
        let account = self
            .users
            .apply_changes(
                account.id,
                &changes.start_session(issued.token.clone()),
                Some(account.id),
            )
            .await?;
        info!(user_id = %account.id, "session opened");
        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: UserView::from(&account),
        })
    }

    fn one_time_code(&self, purpose: CodePurpose) -> OneTimeCode {
        let value = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000_u32));
        OneTimeCode {
            value,
            expires_at: self.clock.utc() + self.lifetimes.for_purpose(purpose),
        }
    }

    /// Email `code` to the account holder. Returns the mailer's failure
    /// message, or a generic one when the mailer supplied none.
    async fn deliver(
        &self,
        account: &UserAccount,
        purpose: CodePurpose,
        code: &OneTimeCode,
    ) -> Result<(), Message> {
        let subject = match purpose {
            CodePurpose::Mfa => "Your sign-in code",
            CodePurpose::EmailVerification => "Confirm your email address",
            CodePurpose::PasswordReset => "Reset your password",
        };
        let body = format!(
            "Your {} is {}. It expires at {}.",
            purpose.label(),
            code.value,
            code.expires_at.to_rfc3339()
        );
        let result = self
            .mailer
            .send(&MailEnvelope::new(account.email.as_str(), subject, body))
            .await;
        if !result.has_failed() {
            return Ok(());
        }
        Err(result.first_message().cloned().unwrap_or_else(|| {
            Message::error(auth::CODE_NOT_SENT, "the code could not be sent")
        }))
    }
}

#[cfg(test)]
#[path = "auth_service_tests.rs"]
mod tests;
