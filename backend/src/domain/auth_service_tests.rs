//! Regression coverage for the authentication flows.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::domain::message_codes::general;
use crate::domain::ports::{IssuedToken, MockPasswordHasher, MockTokenIssuer, PasswordDigest};
use crate::domain::{EntityId, MessageCode, ResultStatus};
use crate::outbound::memory::{MemoryRepository, MemoryStore};
use crate::test_support::{MutableClock, RecordingMailer, sample_now};
use rstest::{fixture, rstest};

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "analytical-engine";

type Users = MemoryRepository<UserAccount>;

struct Harness {
    clock: Arc<MutableClock>,
    mailer: Arc<RecordingMailer>,
    users: Arc<Users>,
    service: AuthService<Users>,
}

fn stub_hasher() -> MockPasswordHasher {
    let mut hasher = MockPasswordHasher::new();
    hasher.expect_create_hash().returning(|password| PasswordDigest {
        hash: format!("hashed:{password}"),
        salt: "salt".to_owned(),
    });
    hasher
        .expect_verify()
        .returning(|password, hash, _salt| hash == format!("hashed:{password}"));
    hasher
}

fn stub_tokens() -> MockTokenIssuer {
    let issued = AtomicUsize::new(0);
    let mut tokens = MockTokenIssuer::new();
    tokens.expect_generate().returning(move |claims| {
        let n = issued.fetch_add(1, Ordering::SeqCst);
        Some(IssuedToken {
            token: format!("token-{}-{n}", claims.username),
            expires_at: sample_now() + TimeDelta::hours(1),
        })
    });
    tokens
}

fn build(mailer: RecordingMailer, tokens: MockTokenIssuer) -> Harness {
    let clock = Arc::new(MutableClock::new(sample_now()));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let users = Arc::new(MemoryRepository::new(store));
    let mailer = Arc::new(mailer);
    let service = AuthService::new(
        Arc::clone(&users),
        mailer.clone(),
        Arc::new(tokens),
        Arc::new(stub_hasher()),
        clock.clone(),
    );
    Harness {
        clock,
        mailer,
        users,
        service,
    }
}

#[fixture]
fn harness() -> Harness {
    build(RecordingMailer::new(), stub_tokens())
}

fn code_of<T>(result: &ServiceResult<T>) -> Option<MessageCode> {
    result.first_message().map(|message| message.code().clone())
}

/// A six-digit code guaranteed to differ from `code`.
fn other_than(code: &str) -> String {
    if code == "000000" {
        "111111".to_owned()
    } else {
        "000000".to_owned()
    }
}

impl Harness {
    async fn register(&self, request: RegisterRequest) -> UserView {
        self.service
            .register(request)
            .await
            .into_data()
            .expect("registration succeeds")
    }

    async fn account(&self, id: EntityId) -> UserAccount {
        self.users
            .get_by_id(id)
            .await
            .expect("read account")
            .expect("account exists")
    }

    fn mailed_code(&self) -> String {
        self.mailer.last_code_for(EMAIL).expect("code mailed")
    }

    async fn open_session(&self) -> LoginResponse {
        self.service
            .login(LoginRequest::new("ada", PASSWORD))
            .await
            .into_data()
            .expect("login succeeds")
    }
}

#[rstest]
#[tokio::test]
async fn register_stores_account_and_mails_confirmation_code(harness: Harness) {
    let view = harness
        .register(RegisterRequest::new(" ada ", "Ada@Example.com", PASSWORD))
        .await;

    assert_eq!(view.username, "ada");
    assert_eq!(view.email, EMAIL);
    assert!(!view.email_confirmed);
    let stored = harness.account(view.id).await;
    assert_eq!(stored.password_hash, format!("hashed:{PASSWORD}"));
    let pending = stored.verification_code.expect("code pending");
    assert_eq!(pending.expires_at, sample_now() + TimeDelta::hours(24));
    assert_eq!(harness.mailed_code(), pending.value);
}

#[rstest]
#[case::blank_username(RegisterRequest::new("  ", EMAIL, PASSWORD), auth::USERNAME_REQUIRED)]
#[case::bad_email(RegisterRequest::new("ada", "ada.example.com", PASSWORD), auth::EMAIL_INVALID)]
#[case::blank_password(RegisterRequest::new("ada", EMAIL, ""), auth::PASSWORD_REQUIRED)]
#[case::short_password(RegisterRequest::new("ada", EMAIL, "short"), auth::PASSWORD_TOO_SHORT)]
#[tokio::test]
async fn register_rejects_malformed_input(
    harness: Harness,
    #[case] request: RegisterRequest,
    #[case] expected: MessageCode,
) {
    let result = harness.service.register(request).await;

    assert!(result.has_failed());
    assert_eq!(code_of(&result), Some(expected));
    assert!(harness.mailer.sent().is_empty());
}

#[rstest]
#[case::same_username(RegisterRequest::new("ada", "other@example.com", PASSWORD))]
#[case::same_email(RegisterRequest::new("lovelace", "ADA@example.com", PASSWORD))]
#[tokio::test]
async fn register_rejects_taken_identity(harness: Harness, #[case] request: RegisterRequest) {
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;

    let result = harness.service.register(request).await;

    assert_eq!(code_of(&result), Some(auth::USER_ALREADY_EXISTS));
}

#[rstest]
#[tokio::test]
async fn register_with_failing_mailer_warns_but_keeps_account() {
    let harness = build(
        RecordingMailer::failing(Message::error(general::UNEXPECTED, "smtp unavailable")),
        stub_tokens(),
    );

    let result = harness
        .service
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;

    assert_eq!(result.status(), ResultStatus::Warning);
    assert_eq!(code_of(&result), Some(auth::VERIFICATION_NOT_SENT));
    assert_eq!(result.extra("verificationSent"), Some(&json!(false)));
    let view = result.data().expect("warning carries the new user");
    assert!(harness.users.get_by_id(view.id).await.expect("read").is_some());
}

#[rstest]
#[tokio::test]
async fn verify_email_confirms_address_and_opens_session(harness: Harness) {
    let view = harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;

    let response = harness
        .service
        .verify_email(VerifyCodeRequest::new(EMAIL, harness.mailed_code()))
        .await
        .into_data()
        .expect("verification succeeds");

    assert!(response.user.email_confirmed);
    let stored = harness.account(view.id).await;
    assert!(stored.email_confirmed);
    assert!(stored.verification_code.is_none());
    assert_eq!(stored.active_token, Some(response.token));
}

#[rstest]
#[tokio::test]
async fn verify_email_code_cannot_be_reused(harness: Harness) {
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;
    let code = harness.mailed_code();
    let first = harness
        .service
        .verify_email(VerifyCodeRequest::new("ada", code.clone()))
        .await;
    assert!(first.is_success());

    let second = harness
        .service
        .verify_email(VerifyCodeRequest::new("ada", code))
        .await;

    assert_eq!(code_of(&second), Some(auth::CODE_NOT_PENDING));
}

#[rstest]
#[tokio::test]
async fn login_without_mfa_opens_session(harness: Harness) {
    let view = harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;

    let response = harness.open_session().await;

    assert_eq!(response.user.id, view.id);
    assert_eq!(response.expires_at, sample_now() + TimeDelta::hours(1));
    let stored = harness.account(view.id).await;
    assert_eq!(stored.active_token, Some(response.token));
    assert_eq!(stored.audit.updated_by, Some(view.id));
}

#[rstest]
#[tokio::test]
async fn login_accepts_email_identifier_case_insensitively(harness: Harness) {
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;

    let result = harness
        .service
        .login(LoginRequest::new("ADA@example.com", PASSWORD))
        .await;

    assert!(result.is_success());
}

#[rstest]
#[tokio::test]
async fn login_failures_share_a_description_but_not_a_code(harness: Harness) {
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;

    let unknown = harness
        .service
        .login(LoginRequest::new("grace", PASSWORD))
        .await;
    let wrong = harness
        .service
        .login(LoginRequest::new("ada", "not-the-password"))
        .await;

    assert_eq!(code_of(&unknown), Some(auth::USER_NOT_FOUND));
    assert_eq!(code_of(&wrong), Some(auth::WRONG_PASSWORD));
    let describe = |result: &ServiceResult<LoginResponse>| {
        result
            .first_message()
            .map(|message| message.description().to_owned())
    };
    assert_eq!(describe(&unknown), describe(&wrong));
}

#[rstest]
#[tokio::test]
async fn login_rejects_blank_identifier_before_any_lookup(harness: Harness) {
    let result = harness.service.login(LoginRequest::new(" ", PASSWORD)).await;

    assert_eq!(code_of(&result), Some(auth::IDENTIFIER_REQUIRED));
}

#[rstest]
#[tokio::test]
async fn mfa_login_issues_challenge_then_session(harness: Harness) {
    let view = harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD).with_mfa())
        .await;

    let challenge = harness
        .service
        .login(LoginRequest::new("ada", PASSWORD))
        .await;

    assert_eq!(challenge.status(), ResultStatus::Warning);
    assert_eq!(code_of(&challenge), Some(auth::MFA_REQUIRED));
    assert_eq!(challenge.extra("useMFA"), Some(&json!(true)));
    assert!(challenge.data().is_none());
    assert!(harness.account(view.id).await.active_token.is_none());

    let response = harness
        .service
        .verify_mfa(VerifyCodeRequest::new("ada", harness.mailed_code()))
        .await
        .into_data()
        .expect("mfa verification succeeds");

    let stored = harness.account(view.id).await;
    assert_eq!(stored.active_token, Some(response.token));
    assert!(stored.mfa_code.is_none());
}

#[rstest]
#[tokio::test]
async fn verify_mfa_rejects_wrong_code_and_keeps_it_pending(harness: Harness) {
    let view = harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD).with_mfa())
        .await;
    harness
        .service
        .login(LoginRequest::new("ada", PASSWORD))
        .await;
    let code = harness.mailed_code();

    let result = harness
        .service
        .verify_mfa(VerifyCodeRequest::new("ada", other_than(&code)))
        .await;

    assert_eq!(code_of(&result), Some(auth::CODE_MISMATCH));
    let stored = harness.account(view.id).await;
    assert_eq!(stored.mfa_code.map(|pending| pending.value), Some(code));
}

#[rstest]
#[tokio::test]
async fn verify_mfa_rejects_expired_code(harness: Harness) {
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD).with_mfa())
        .await;
    harness
        .service
        .login(LoginRequest::new("ada", PASSWORD))
        .await;
    let code = harness.mailed_code();

    harness.clock.advance_seconds(61);
    let result = harness
        .service
        .verify_mfa(VerifyCodeRequest::new("ada", code))
        .await;

    assert_eq!(code_of(&result), Some(auth::CODE_EXPIRED));
}

#[rstest]
#[tokio::test]
async fn verify_mfa_accepts_code_at_its_expiry_instant(harness: Harness) {
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD).with_mfa())
        .await;
    harness
        .service
        .login(LoginRequest::new("ada", PASSWORD))
        .await;
    let code = harness.mailed_code();

    harness.clock.advance_seconds(60);
    let result = harness
        .service
        .verify_mfa(VerifyCodeRequest::new("ada", code))
        .await;

    assert!(result.is_success());
}

#[rstest]
#[case::letters("12a456")]
#[case::too_short("12345")]
#[tokio::test]
async fn verify_mfa_rejects_malformed_code(harness: Harness, #[case] code: &str) {
    let result = harness
        .service
        .verify_mfa(VerifyCodeRequest::new("ada", code))
        .await;

    assert_eq!(code_of(&result), Some(auth::CODE_FORMAT));
}

#[rstest]
#[tokio::test]
async fn mfa_login_fails_when_challenge_cannot_be_mailed() {
    let harness = build(
        RecordingMailer::failing(Message::error(general::UNEXPECTED, "smtp unavailable")),
        stub_tokens(),
    );
    harness
        .service
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD).with_mfa())
        .await;

    let result = harness
        .service
        .login(LoginRequest::new("ada", PASSWORD))
        .await;

    assert!(result.has_failed());
    assert_eq!(code_of(&result), Some(general::UNEXPECTED));
    assert_eq!(
        result.first_message().map(Message::description),
        Some("smtp unavailable")
    );
}

#[rstest]
#[tokio::test]
async fn login_fails_when_no_token_is_issued() {
    let mut tokens = MockTokenIssuer::new();
    tokens.expect_generate().returning(|_| None);
    let harness = build(RecordingMailer::new(), tokens);
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;

    let result = harness
        .service
        .login(LoginRequest::new("ada", PASSWORD))
        .await;

    assert_eq!(code_of(&result), Some(auth::TOKEN_NOT_ISSUED));
}

#[rstest]
#[tokio::test]
async fn forgot_then_reset_replaces_password_and_closes_session(harness: Harness) {
    let view = harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;
    let session = harness.open_session().await;

    let forgot = harness.service.forgot_password(EMAIL).await;
    assert!(forgot.is_success());
    assert_eq!(code_of(&forgot), Some(auth::RESET_CODE_SENT));

    let reset = harness
        .service
        .reset_password(ResetPasswordRequest::new(
            "ada",
            harness.mailed_code(),
            "difference-engine",
        ))
        .await;
    assert!(reset.is_success());

    let stored = harness.account(view.id).await;
    assert!(stored.active_token.is_none());
    assert!(stored.reset_code.is_none());
    let stale = harness.service.logout(&session.token).await;
    assert_eq!(code_of(&stale), Some(auth::SESSION_NOT_FOUND));
    let old = harness
        .service
        .login(LoginRequest::new("ada", PASSWORD))
        .await;
    assert_eq!(code_of(&old), Some(auth::WRONG_PASSWORD));
    let new = harness
        .service
        .login(LoginRequest::new("ada", "difference-engine"))
        .await;
    assert!(new.is_success());
}

#[rstest]
#[tokio::test]
async fn opening_a_session_keeps_a_reset_code_issued_meanwhile() {
    let clock = Arc::new(MutableClock::new(sample_now()));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let users = Arc::new(MemoryRepository::new(store));
    let reset = OneTimeCode {
        value: "424242".to_owned(),
        expires_at: sample_now() + TimeDelta::minutes(15),
    };
    let racing = Arc::clone(&users);
    let racing_code = reset.clone();
    let mut tokens = MockTokenIssuer::new();
    tokens.expect_generate().returning(move |claims| {
        // A reset code lands after the account was read for the session.
        let changes =
            AccountChanges::default().issue_code(CodePurpose::PasswordReset, racing_code.clone());
        futures::executor::block_on(racing.apply_changes(claims.user_id, &changes, None))
            .expect("reset code stored");
        Some(IssuedToken {
            token: format!("token-{}", claims.username),
            expires_at: sample_now() + TimeDelta::hours(1),
        })
    });
    let mailer = Arc::new(RecordingMailer::new());
    let service = AuthService::new(
        Arc::clone(&users),
        mailer.clone(),
        Arc::new(tokens),
        Arc::new(stub_hasher()),
        clock,
    );
    let view = service
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD).with_mfa())
        .await
        .into_data()
        .expect("registration succeeds");
    service.login(LoginRequest::new("ada", PASSWORD)).await;
    let mfa_code = mailer.last_code_for(EMAIL).expect("mfa code mailed");

    let verified = service
        .verify_mfa(VerifyCodeRequest::new("ada", mfa_code))
        .await;

    assert!(verified.is_success());
    let stored = users
        .get_by_id(view.id)
        .await
        .expect("read account")
        .expect("account exists");
    assert_eq!(stored.reset_code, Some(reset.clone()));
    assert_eq!(stored.active_token.as_deref(), Some("token-ada"));
    let reset_result = service
        .reset_password(ResetPasswordRequest::new("ada", reset.value, "difference-engine"))
        .await;
    assert!(reset_result.is_success());
}

#[rstest]
#[tokio::test]
async fn reset_password_expires_after_fifteen_minutes(harness: Harness) {
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;
    harness.service.forgot_password("ada").await;
    let code = harness.mailed_code();

    harness.clock.advance_seconds(15 * 60 + 1);
    let result = harness
        .service
        .reset_password(ResetPasswordRequest::new("ada", code, "difference-engine"))
        .await;

    assert_eq!(code_of(&result), Some(auth::CODE_EXPIRED));
}

#[rstest]
#[tokio::test]
async fn reset_password_without_pending_code_is_refused(harness: Harness) {
    harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;

    let result = harness
        .service
        .reset_password(ResetPasswordRequest::new("ada", "123456", "difference-engine"))
        .await;

    assert_eq!(code_of(&result), Some(auth::CODE_NOT_PENDING));
}

#[rstest]
#[tokio::test]
async fn forgot_password_for_unknown_account_is_not_found(harness: Harness) {
    let result = harness.service.forgot_password("nobody@example.com").await;

    assert_eq!(code_of(&result), Some(auth::USER_NOT_FOUND));
    assert!(harness.mailer.sent().is_empty());
}

#[rstest]
#[tokio::test]
async fn logout_clears_the_token_once(harness: Harness) {
    let view = harness
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await;
    let session = harness.open_session().await;

    let first = harness.service.logout(&session.token).await;
    let second = harness.service.logout(&session.token).await;

    assert!(first.is_success());
    assert_eq!(code_of(&second), Some(auth::SESSION_NOT_FOUND));
    assert!(harness.account(view.id).await.active_token.is_none());
}

#[rstest]
#[tokio::test]
async fn logout_requires_a_token(harness: Harness) {
    let result = harness.service.logout("   ").await;

    assert_eq!(code_of(&result), Some(auth::TOKEN_REQUIRED));
}

#[rstest]
#[tokio::test]
async fn configured_lifetimes_shape_code_expiry() {
    let harness = build(RecordingMailer::new(), stub_tokens());
    let service = harness.service.clone().with_lifetimes(CodeLifetimes {
        email_verification: TimeDelta::minutes(5),
        ..CodeLifetimes::default()
    });

    let view = service
        .register(RegisterRequest::new("ada", EMAIL, PASSWORD))
        .await
        .into_data()
        .expect("registration succeeds");

    let pending = harness
        .account(view.id)
        .await
        .verification_code
        .expect("code pending");
    assert_eq!(pending.expires_at, sample_now() + TimeDelta::minutes(5));
}
