//! End-to-end authentication flows over the in-memory store and the real
//! hashing and token adapters.

use std::sync::Arc;

use duty_backend::domain::message_codes::auth;
use duty_backend::domain::ports::Repository;
use duty_backend::domain::{
    AuthService, LoginRequest, RegisterRequest, ResetPasswordRequest, ResultStatus, UserAccount,
    VerifyCodeRequest,
};
use duty_backend::outbound::hashing::Sha256PasswordHasher;
use duty_backend::outbound::memory::{MemoryRepository, MemoryStore};
use duty_backend::outbound::token::OpaqueTokenIssuer;
use duty_backend::test_support::{MutableClock, RecordingMailer, sample_now};
use rstest::{fixture, rstest};

const EMAIL: &str = "grace@example.com";

struct Flow {
    clock: Arc<MutableClock>,
    mailer: Arc<RecordingMailer>,
    users: Arc<MemoryRepository<UserAccount>>,
    service: AuthService<MemoryRepository<UserAccount>>,
}

impl Flow {
    fn code(&self) -> String {
        self.mailer.last_code_for(EMAIL).expect("a code should be mailed")
    }
}

#[fixture]
fn flow() -> Flow {
    let clock = Arc::new(MutableClock::new(sample_now()));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let users = Arc::new(MemoryRepository::new(store));
    let mailer = Arc::new(RecordingMailer::new());
    let service = AuthService::new(
        Arc::clone(&users),
        mailer.clone(),
        Arc::new(OpaqueTokenIssuer::new(clock.clone())),
        Arc::new(Sha256PasswordHasher),
        clock.clone(),
    );
    Flow {
        clock,
        mailer,
        users,
        service,
    }
}

#[rstest]
#[tokio::test]
async fn register_confirm_login_logout(flow: Flow) {
    let registered = flow
        .service
        .register(RegisterRequest::new("grace", EMAIL, "cobol-forever"))
        .await;
    let user = registered.into_data().expect("registration succeeds");

    let stored = flow
        .users
        .get_by_id(user.id)
        .await
        .expect("read")
        .expect("stored");
    assert_ne!(stored.password_hash, "cobol-forever");
    assert_eq!(stored.password_salt.len(), 32);

    let confirmed = flow
        .service
        .verify_email(VerifyCodeRequest::new(EMAIL, flow.code()))
        .await
        .into_data()
        .expect("confirmation succeeds");
    assert!(confirmed.user.email_confirmed);
    assert_eq!(confirmed.token.len(), 64);

    let session = flow
        .service
        .login(LoginRequest::new("grace", "cobol-forever"))
        .await
        .into_data()
        .expect("login succeeds");
    assert_ne!(session.token, confirmed.token);

    assert!(flow.service.logout(&session.token).await.is_success());
    let stored = flow
        .users
        .get_by_id(user.id)
        .await
        .expect("read")
        .expect("stored");
    assert!(stored.active_token.is_none());
}

#[rstest]
#[tokio::test]
async fn mfa_challenge_expires_after_a_minute(flow: Flow) {
    flow.service
        .register(RegisterRequest::new("grace", EMAIL, "cobol-forever").with_mfa())
        .await
        .into_data()
        .expect("registration succeeds");

    let challenge = flow
        .service
        .login(LoginRequest::new(EMAIL, "cobol-forever"))
        .await;
    assert_eq!(challenge.status(), ResultStatus::Warning);
    let stale = flow.code();

    flow.clock.advance_seconds(90);
    let expired = flow
        .service
        .verify_mfa(VerifyCodeRequest::new(EMAIL, stale))
        .await;
    assert_eq!(
        expired.first_message().map(|m| m.code().clone()),
        Some(auth::CODE_EXPIRED)
    );

    flow.service
        .login(LoginRequest::new(EMAIL, "cobol-forever"))
        .await;
    let verified = flow
        .service
        .verify_mfa(VerifyCodeRequest::new(EMAIL, flow.code()))
        .await;
    assert!(verified.is_success());
}

#[rstest]
#[tokio::test]
async fn password_reset_round_trip(flow: Flow) {
    flow.service
        .register(RegisterRequest::new("grace", EMAIL, "cobol-forever"))
        .await
        .into_data()
        .expect("registration succeeds");

    assert!(flow.service.forgot_password("grace").await.is_success());
    let reset = flow
        .service
        .reset_password(ResetPasswordRequest::new("grace", flow.code(), "flow-matic-1959"))
        .await;
    assert!(reset.is_success());

    let old = flow
        .service
        .login(LoginRequest::new("grace", "cobol-forever"))
        .await;
    let new = flow
        .service
        .login(LoginRequest::new("grace", "flow-matic-1959"))
        .await;
    assert_eq!(
        old.first_message().map(|m| m.code().clone()),
        Some(auth::WRONG_PASSWORD)
    );
    assert!(new.is_success());
}
