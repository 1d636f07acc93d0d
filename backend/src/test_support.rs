//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{MailEnvelope, MailReceipt, Mailer};
use crate::domain::{Message, ServiceResult};

/// Fixed instant used as "now" across test suites.
pub fn sample_now() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single() {
        Some(now) => now,
        None => panic!("sample instant must be unambiguous"),
    }
}

/// Clock whose reading only moves when a test advances it.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `seconds`.
    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Mailer that keeps every envelope it is asked to send.
///
/// A failing mailer still records the attempt before reporting failure.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailEnvelope>>,
    failure: Option<Message>,
}

impl RecordingMailer {
    /// Mailer that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailer that rejects everything with `failure`.
    pub fn failing(failure: Message) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(failure),
        }
    }

    /// Envelopes seen so far, oldest first.
    pub fn sent(&self) -> Vec<MailEnvelope> {
        self.lock_sent().clone()
    }

    /// The six-digit code in the latest envelope sent to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.lock_sent()
            .iter()
            .rev()
            .find(|envelope| envelope.to == to)
            .and_then(|envelope| {
                envelope
                    .body
                    .split(|c: char| !c.is_ascii_digit())
                    .find(|word| word.len() == 6)
                    .map(str::to_owned)
            })
    }

    fn lock_sent(&self) -> MutexGuard<'_, Vec<MailEnvelope>> {
        match self.sent.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("mailbox mutex"),
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, envelope: &MailEnvelope) -> ServiceResult<MailReceipt> {
        let mut sent = self.lock_sent();
        sent.push(envelope.clone());
        match &self.failure {
            Some(failure) => ServiceResult::failure(failure.clone()),
            None => ServiceResult::success(MailReceipt {
                message_id: format!("recorded-{}", sent.len()),
            }),
        }
    }
}
