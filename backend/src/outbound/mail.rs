//! Mail adapter that writes deliveries to the trace log.
//!
//! Useful for local runs where no transport is configured. Bodies carry
//! one-time codes, so only the recipient and subject are logged.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{MailEnvelope, MailReceipt, Mailer};
use crate::domain::{Message, ServiceResult, message_codes::general};

/// [`Mailer`] that records each delivery as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, envelope: &MailEnvelope) -> ServiceResult<MailReceipt> {
        if envelope.to.trim().is_empty() {
            return ServiceResult::failure(Message::error(
                general::UNEXPECTED,
                "mail recipient is missing",
            ));
        }
        let message_id = Uuid::new_v4().to_string();
        info!(to = %envelope.to, subject = %envelope.subject, %message_id, "mail delivered");
        ServiceResult::success(MailReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the logging mailer.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn delivers_to_a_recipient() {
        let result = TracingMailer
            .send(&MailEnvelope::new("ada@example.com", "Hi", "body"))
            .await;
        assert!(result.is_success());
    }

    #[rstest]
    #[tokio::test]
    async fn refuses_blank_recipients() {
        let result = TracingMailer.send(&MailEnvelope::new(" ", "Hi", "body")).await;
        assert!(result.has_failed());
    }
}
