//! Port for outbound email delivery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ServiceResult;

/// A single email to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailEnvelope {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl MailEnvelope {
    /// Build an envelope.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Delivery acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailReceipt {
    /// Transport-assigned message identifier.
    pub message_id: String,
}

/// Mail delivery collaborator.
///
/// Failures are reported as a failed [`ServiceResult`] whose first message
/// carries the transport's code and description.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `envelope`.
    async fn send(&self, envelope: &MailEnvelope) -> ServiceResult<MailReceipt>;
}
