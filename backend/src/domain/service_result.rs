//! Result envelope returned by every service operation.
//!
//! An envelope starts [`ResultStatus::Pending`] and transitions exactly once
//! to success, failure or warning. Failures never carry data; successes
//! always do. Auxiliary signals such as "MFA required" travel in the ordered
//! extra-data bag rather than in the primary payload.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::message::Message;

/// Lifecycle state of a [`ServiceResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Not yet settled.
    #[default]
    Pending,
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
    /// Operation partially succeeded; the caller must take a further step.
    Warning,
}

/// One named item in the extra-data bag.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraItem {
    /// Item name, unique within the bag.
    pub name: String,
    /// Item payload.
    pub value: Value,
}

/// Ordered bag of named auxiliary payloads.
///
/// Serialises as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraData(Vec<ExtraItem>);

impl ExtraData {
    /// Insert or replace an item. Replacement keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|item| item.name == name) {
            Some(item) => item.value = value,
            None => self.0.push(ExtraItem { name, value }),
        }
    }

    /// Look up an item by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|item| item.name == name)
            .map(|item| &item.value)
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtraItem> {
        self.0.iter()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ExtraData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for item in &self.0 {
            map.serialize_entry(&item.name, &item.value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtraData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExtraDataVisitor;

        impl<'de> Visitor<'de> for ExtraDataVisitor {
            type Value = ExtraData;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of extra data items")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ExtraData, A::Error> {
                let mut extra = ExtraData::default();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    extra.insert(name, value);
                }
                Ok(extra)
            }
        }

        deserializer.deserialize_map(ExtraDataVisitor)
    }
}

/// Success, failure or warning envelope around an optional payload.
///
/// # Examples
/// ```
/// use duty_backend::domain::{Message, ResultStatus, ServiceResult, message_codes::auth};
///
/// let mut result = ServiceResult::<u32>::pending();
/// result.fail(Message::error(auth::USER_NOT_FOUND, "user not found"));
/// assert!(result.has_failed());
/// assert!(result.data().is_none());
/// assert_eq!(result.status(), ResultStatus::Failure);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    try_from = "ServiceResultDto<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct ServiceResult<T> {
    status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "ExtraData::is_empty")]
    extra_data: ExtraData,
}

impl<T> Default for ServiceResult<T> {
    fn default() -> Self {
        Self::pending()
    }
}

impl<T> ServiceResult<T> {
    /// Empty envelope awaiting its single transition.
    pub fn pending() -> Self {
        Self {
            status: ResultStatus::Pending,
            data: None,
            messages: Vec::new(),
            extra_data: ExtraData::default(),
        }
    }

    /// Settled success envelope.
    pub fn success(data: T) -> Self {
        let mut result = Self::pending();
        result.set_data(data, None);
        result
    }

    /// Settled failure envelope.
    pub fn failure(message: impl Into<Message>) -> Self {
        let mut result = Self::pending();
        result.fail(message);
        result
    }

    fn guard_transition(&self) {
        debug_assert_eq!(
            self.status,
            ResultStatus::Pending,
            "service results transition exactly once"
        );
    }

    /// Transition to success with `data` and an optional informational
    /// message.
    pub fn set_data(&mut self, data: T, message: Option<Message>) {
        self.guard_transition();
        self.status = ResultStatus::Success;
        self.data = Some(data);
        self.messages.extend(message);
    }

    /// Transition to failure. Earlier messages are kept; any data is
    /// dropped.
    pub fn fail(&mut self, message: impl Into<Message>) {
        self.guard_transition();
        self.status = ResultStatus::Failure;
        self.data = None;
        self.messages.push(message.into());
    }

    /// Transition to a partial success that may still carry data.
    pub fn warning(&mut self, message: impl Into<Message>, data: Option<T>) {
        self.guard_transition();
        self.status = ResultStatus::Warning;
        self.data = data;
        self.messages.push(message.into());
    }

    /// Add an informational message without transitioning.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Insert or replace an extra-data item.
    pub fn insert_extra(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.extra_data.insert(name, value);
    }

    /// Look up an extra-data item.
    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.extra_data.get(name)
    }

    /// Extra-data bag.
    pub fn extra_data(&self) -> &ExtraData {
        &self.extra_data
    }

    /// Current status.
    pub fn status(&self) -> ResultStatus {
        self.status
    }

    /// Whether the envelope settled as a failure.
    pub fn has_failed(&self) -> bool {
        self.status == ResultStatus::Failure
    }

    /// Whether the envelope settled as a success.
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Primary payload, if any.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consume the envelope, returning the payload.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Messages in the order they were attached.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// First message, which for failures is the failure reason.
    pub fn first_message(&self) -> Option<&Message> {
        self.messages.first()
    }

    /// Convert the payload while keeping status, messages and extra data.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServiceResult<U> {
        ServiceResult {
            status: self.status,
            data: self.data.map(f),
            messages: self.messages,
            extra_data: self.extra_data,
        }
    }
}

/// Status and payload combinations a deserialised envelope may not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// A failed or pending envelope carried a payload.
    #[error("a {0:?} envelope must not carry data")]
    UnexpectedData(ResultStatus),
    /// A successful envelope carried no payload.
    #[error("a success envelope must carry data")]
    MissingData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceResultDto<T> {
    status: ResultStatus,
    data: Option<T>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    extra_data: ExtraData,
}

impl<T> TryFrom<ServiceResultDto<T>> for ServiceResult<T> {
    type Error = EnvelopeError;

    fn try_from(value: ServiceResultDto<T>) -> Result<Self, Self::Error> {
        match (value.status, value.data.is_some()) {
            (ResultStatus::Failure | ResultStatus::Pending, true) => {
                return Err(EnvelopeError::UnexpectedData(value.status));
            }
            (ResultStatus::Success, false) => return Err(EnvelopeError::MissingData),
            _ => {}
        }
        Ok(Self {
            status: value.status,
            data: value.data,
            messages: value.messages,
            extra_data: value.extra_data,
        })
    }
}
