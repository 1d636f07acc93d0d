//! Coded messages attached to service results.
//!
//! Messages are transport agnostic. The code is a stable `DOMAIN-NNNNN`
//! identifier clients branch on and logs correlate by; the description is
//! for humans.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]{2,5}-[0-9]{5}$").unwrap_or_else(|err| panic!("code pattern compiles: {err}"))
});

/// Validation errors emitted by the message constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageValidationError {
    /// Codes must look like `AUTH-00001`.
    #[error("message code must match DOMAIN-NNNNN, got {0:?}")]
    InvalidCode(String),
    /// Descriptions must be non-empty once trimmed.
    #[error("message description must not be empty")]
    EmptyDescription,
}

/// Stable domain-prefixed message code.
///
/// # Examples
/// ```
/// use duty_backend::domain::MessageCode;
///
/// let code = MessageCode::parse("AUTH-00003").expect("valid code");
/// assert_eq!(code.domain(), "AUTH");
/// assert!(MessageCode::parse("auth-3").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageCode(Cow<'static, str>);

impl MessageCode {
    /// Wrap a compile-time code. Callers are responsible for the format;
    /// the catalogue in [`super::message_codes`] is covered by tests.
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    /// Validate and wrap a runtime code.
    pub fn parse(code: impl Into<String>) -> Result<Self, MessageValidationError> {
        let code = code.into();
        if !CODE_PATTERN.is_match(&code) {
            return Err(MessageValidationError::InvalidCode(code));
        }
        Ok(Self(Cow::Owned(code)))
    }

    /// Code as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Domain prefix, e.g. `AUTH`.
    pub fn domain(&self) -> &str {
        self.0.split_once('-').map_or(self.as_str(), |(domain, _)| domain)
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MessageCode {
    type Error = MessageValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<MessageCode> for String {
    fn from(value: MessageCode) -> Self {
        value.0.into_owned()
    }
}

/// How a message should be treated by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The operation failed.
    #[default]
    Error,
    /// The operation partially succeeded or needs a follow-up step.
    Warning,
    /// Informational note on a successful operation.
    Info,
}

/// A `(code, description, severity)` triple.
///
/// ## Invariants
/// - `description` is non-empty once trimmed of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MessageDto", into = "MessageDto")]
pub struct Message {
    code: MessageCode,
    description: String,
    severity: Severity,
}

impl Message {
    /// Create a message, panicking if validation fails.
    pub fn new(code: MessageCode, description: impl Into<String>, severity: Severity) -> Self {
        match Self::try_new(code, description, severity) {
            Ok(value) => value,
            Err(err) => panic!("messages must satisfy validation: {err}"),
        }
    }

    /// Fallible constructor that validates the description.
    pub fn try_new(
        code: MessageCode,
        description: impl Into<String>,
        severity: Severity,
    ) -> Result<Self, MessageValidationError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(MessageValidationError::EmptyDescription);
        }
        Ok(Self {
            code,
            description,
            severity,
        })
    }

    /// Convenience constructor for [`Severity::Error`].
    pub fn error(code: MessageCode, description: impl Into<String>) -> Self {
        Self::new(code, description, Severity::Error)
    }

    /// Convenience constructor for [`Severity::Warning`].
    pub fn warning(code: MessageCode, description: impl Into<String>) -> Self {
        Self::new(code, description, Severity::Warning)
    }

    /// Convenience constructor for [`Severity::Info`].
    pub fn info(code: MessageCode, description: impl Into<String>) -> Self {
        Self::new(code, description, Severity::Info)
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &MessageCode {
        &self.code
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Same code and description with a different severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MessageDto {
    code: MessageCode,
    description: String,
    #[serde(default)]
    severity: Severity,
}

impl From<Message> for MessageDto {
    fn from(value: Message) -> Self {
        Self {
            code: value.code,
            description: value.description,
            severity: value.severity,
        }
    }
}

impl TryFrom<MessageDto> for Message {
    type Error = MessageValidationError;

    fn try_from(value: MessageDto) -> Result<Self, Self::Error> {
        let MessageDto {
            code,
            description,
            severity,
        } = value;
        Message::try_new(code, description, severity)
    }
}
