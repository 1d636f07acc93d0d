//! Internal error taxonomy of the services and the boundary that folds it
//! into a [`ServiceResult`].
//!
//! Service bodies are written as `Result<Outcome<T>, ServiceError>` so `?`
//! propagates failures; [`settle`] then performs the single envelope
//! transition. Unexpected repository failures are logged and surfaced only
//! as the generic `GEN-00001` message.

use serde_json::Value;
use tracing::{debug, error, warn};

use super::message::{Message, MessageCode};
use super::message_codes::general;
use super::ports::RepositoryError;
use super::rules::RuleViolation;
use super::service_result::ServiceResult;

/// Failure of a service operation before it reaches the boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    /// Input rejected by a business rule before any I/O.
    #[error(transparent)]
    Validation(#[from] RuleViolation),
    /// A referenced entity is absent.
    #[error("{0}")]
    NotFound(Message),
    /// A business rule on existing state was violated.
    #[error("{0}")]
    Conflict(Message),
    /// A downstream collaborator reported failure.
    #[error("{0}")]
    Collaborator(Message),
    /// Storage failed unexpectedly.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Not-found failure with `code`.
    pub fn not_found(code: MessageCode, description: impl Into<String>) -> Self {
        Self::NotFound(Message::error(code, description))
    }

    /// Conflict failure with `code`.
    pub fn conflict(code: MessageCode, description: impl Into<String>) -> Self {
        Self::Conflict(Message::error(code, description))
    }

    /// Collaborator failure carrying the collaborator's message.
    pub fn collaborator(message: Message) -> Self {
        Self::Collaborator(message)
    }

    /// Log the failure and convert it into the one message the caller sees.
    pub fn into_message(self, operation: &'static str) -> Message {
        match self {
            Self::Validation(violation) => {
                debug!(operation, code = %violation.code, "input rejected");
                violation.into()
            }
            Self::NotFound(message) | Self::Conflict(message) => {
                debug!(operation, code = %message.code(), "operation refused");
                message
            }
            Self::Collaborator(message) => {
                warn!(operation, code = %message.code(), description = message.description(), "collaborator failed");
                message
            }
            Self::Repository(err) => {
                error!(operation, error = %err, "unexpected repository failure");
                Message::error(general::UNEXPECTED, "an unexpected error occurred")
            }
        }
    }
}

/// Non-failing result of a service body.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Full success with an optional informational note.
    Success {
        /// Primary payload.
        data: T,
        /// Informational message.
        note: Option<Message>,
    },
    /// Partial success that needs a follow-up step from the caller.
    Warning {
        /// Why the caller must act.
        message: Message,
        /// Payload, when there is one.
        data: Option<T>,
        /// Auxiliary items for the extra-data bag.
        extra: Vec<(&'static str, Value)>,
    },
}

impl<T> Outcome<T> {
    /// Success without a note.
    pub fn done(data: T) -> Self {
        Self::Success { data, note: None }
    }
}

/// Fold a service body's result into a settled envelope.
pub fn settle<T>(
    operation: &'static str,
    outcome: Result<Outcome<T>, ServiceError>,
) -> ServiceResult<T> {
    let mut result = ServiceResult::pending();
    match outcome {
        Ok(Outcome::Success { data, note }) => result.set_data(data, note),
        Ok(Outcome::Warning {
            message,
            data,
            extra,
        }) => {
            result.warning(message, data);
            for (name, value) in extra {
                result.insert_extra(name, value);
            }
        }
        Err(err) => result.fail(err.into_message(operation)),
    }
    result
}

#[cfg(test)]
mod tests {
    //! Regression coverage for boundary conversion.
    use super::*;
    use crate::domain::EntityId;
    use crate::domain::message_codes::{auth, project};
    use crate::domain::{ResultStatus, Severity};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn repository_failures_surface_as_generic_code() {
        let result = settle::<u32>(
            "test",
            Err(RepositoryError::connection("pool exhausted").into()),
        );

        assert!(result.has_failed());
        let message = result.first_message().expect("failure message");
        assert_eq!(message.code(), &general::UNEXPECTED);
        assert!(!message.description().contains("pool"));
    }

    #[rstest]
    fn validation_failures_keep_rule_code() {
        let violation = RuleViolation {
            code: auth::PASSWORD_REQUIRED,
            description: "password is required".to_owned(),
        };
        let result = settle::<u32>("test", Err(violation.into()));

        let message = result.first_message().expect("failure message");
        assert_eq!(message.code(), &auth::PASSWORD_REQUIRED);
        assert_eq!(message.severity(), Severity::Error);
    }

    #[rstest]
    fn not_found_keeps_its_message() {
        let result = settle::<u32>(
            "test",
            Err(ServiceError::not_found(project::PROJECT_NOT_FOUND, "gone")),
        );
        assert_eq!(
            result.first_message().map(|m| m.code().clone()),
            Some(project::PROJECT_NOT_FOUND)
        );
    }

    #[rstest]
    fn warnings_fill_the_extra_data_bag() {
        let result = settle(
            "test",
            Ok(Outcome::Warning {
                message: Message::warning(auth::MFA_REQUIRED, "verify"),
                data: None::<EntityId>,
                extra: vec![("useMFA", json!(true))],
            }),
        );

        assert_eq!(result.status(), ResultStatus::Warning);
        assert_eq!(result.extra("useMFA"), Some(&json!(true)));
        assert!(result.data().is_none());
    }
}
