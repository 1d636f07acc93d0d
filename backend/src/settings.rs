//! Runtime configuration loaded via OrthoConfig.
//!
//! Each settings struct reads command-line flags, environment variables with
//! its prefix, and configuration files, in OrthoConfig's usual precedence.

use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::CodeLifetimes;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/duties";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Lifetimes of the emailed one-time codes, in seconds.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AUTH")]
pub struct AuthSettings {
    /// MFA code lifetime.
    pub mfa_code_ttl_secs: Option<i64>,
    /// Email confirmation code lifetime.
    pub verification_code_ttl_secs: Option<i64>,
    /// Password reset code lifetime.
    pub reset_code_ttl_secs: Option<i64>,
}

impl AuthSettings {
    /// Code lifetimes, with unset or non-positive values falling back to the
    /// service defaults.
    pub fn lifetimes(&self) -> CodeLifetimes {
        let defaults = CodeLifetimes::default();
        let pick = |secs: Option<i64>, fallback: TimeDelta| {
            secs.filter(|secs| *secs > 0)
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(fallback)
        };
        CodeLifetimes {
            mfa: pick(self.mfa_code_ttl_secs, defaults.mfa),
            email_verification: pick(
                self.verification_code_ttl_secs,
                defaults.email_verification,
            ),
            password_reset: pick(self.reset_code_ttl_secs, defaults.password_reset),
        }
    }
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DATABASE")]
pub struct DatabaseSettings {
    /// Connection URL.
    pub url: Option<String>,
    /// Maximum pool size.
    pub max_connections: Option<u32>,
    /// Checkout timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
}

impl DatabaseSettings {
    /// Configured URL, falling back to a local database.
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    /// Pool configuration derived from these settings.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.url())
            .with_max_size(self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .with_connection_timeout(Duration::from_secs(
                self.connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_auth() -> AuthSettings {
        AuthSettings::load_from_iter([OsString::from("duty-backend")])
            .expect("config should load")
    }

    fn load_database() -> DatabaseSettings {
        DatabaseSettings::load_from_iter([OsString::from("duty-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn auth_defaults_are_used_when_missing() {
        let _guard = lock_env([
            ("AUTH_MFA_CODE_TTL_SECS", None::<String>),
            ("AUTH_VERIFICATION_CODE_TTL_SECS", None::<String>),
            ("AUTH_RESET_CODE_TTL_SECS", None::<String>),
        ]);

        assert_eq!(load_auth().lifetimes(), CodeLifetimes::default());
    }

    #[rstest]
    fn auth_environment_overrides_are_respected() {
        let _guard = lock_env([
            ("AUTH_MFA_CODE_TTL_SECS", Some("120".to_owned())),
            ("AUTH_VERIFICATION_CODE_TTL_SECS", Some("0".to_owned())),
            ("AUTH_RESET_CODE_TTL_SECS", Some("600".to_owned())),
        ]);

        let lifetimes = load_auth().lifetimes();
        assert_eq!(lifetimes.mfa, TimeDelta::minutes(2));
        assert_eq!(
            lifetimes.email_verification,
            CodeLifetimes::default().email_verification
        );
        assert_eq!(lifetimes.password_reset, TimeDelta::minutes(10));
    }

    #[rstest]
    fn database_defaults_are_used_when_missing() {
        let _guard = lock_env([
            ("DATABASE_URL", None::<String>),
            ("DATABASE_MAX_CONNECTIONS", None::<String>),
            ("DATABASE_CONNECT_TIMEOUT_SECS", None::<String>),
        ]);

        let config = load_database().pool_config();
        assert_eq!(config.database_url(), DEFAULT_DATABASE_URL);
        assert_eq!(config.max_size(), DEFAULT_MAX_CONNECTIONS);
        assert_eq!(
            config.connection_timeout(),
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        );
    }

    #[rstest]
    fn database_environment_overrides_are_respected() {
        let _guard = lock_env([
            ("DATABASE_URL", Some("postgres://db.internal/duties".to_owned())),
            ("DATABASE_MAX_CONNECTIONS", Some("4".to_owned())),
            ("DATABASE_CONNECT_TIMEOUT_SECS", Some("5".to_owned())),
        ]);

        let config = load_database().pool_config();
        assert_eq!(config.database_url(), "postgres://db.internal/duties");
        assert_eq!(config.max_size(), 4);
        assert_eq!(config.connection_timeout(), Duration::from_secs(5));
    }
}
