//! The response envelope shared by every operation.
//!
//! # Design
//! Servers may answer either with an already enveloped body
//! (`{"success": true, "data": ...}`) or with a bare payload. `normalize`
//! folds both into `Envelope<Value>`: an object carrying a `success` key is
//! treated as enveloped, and that key is the discriminant. It must be a
//! boolean, and `false` means failure even on a 2xx status. Typed access goes
//! through `Envelope::decode` after that check, so a malformed tag is reported
//! as a deserialization error instead of being silently coerced.

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Current time as an RFC 3339 UTC timestamp with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Uniform success wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
            timestamp: None,
        }
    }

    /// A success carrying no payload (logout, delete, change-password).
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            code: None,
            timestamp: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(now_timestamp());
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            code: self.code,
            timestamp: self.timestamp,
        }
    }

    /// Take the payload, failing when the server sent none.
    pub fn into_data(self) -> Result<T, ApiError> {
        self.data
            .ok_or_else(|| ApiError::Deserialization("response carries no data".to_string()))
    }
}

impl Envelope<Value> {
    /// Deserialize the payload into `T`. A JSON `null` payload becomes `None`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Envelope<T>, ApiError> {
        let data = match self.data {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value(value)
                    .map_err(|e| ApiError::Deserialization(e.to_string()))?,
            ),
        };
        Ok(Envelope {
            success: self.success,
            data,
            message: self.message,
            code: self.code,
            timestamp: self.timestamp,
        })
    }
}

/// Fold a parsed 2xx body into an envelope.
///
/// Enveloped bodies are returned unchanged; anything else is wrapped as
/// `{success: true, data: body, timestamp: now}`.
pub fn normalize(body: Value) -> Result<Envelope<Value>, ApiError> {
    let tag = match &body {
        Value::Object(map) => map.get("success").cloned(),
        _ => None,
    };

    match tag {
        None => {
            let data = match body {
                Value::Null => None,
                other => Some(other),
            };
            Ok(Envelope {
                success: true,
                data,
                message: None,
                code: None,
                timestamp: Some(now_timestamp()),
            })
        }
        Some(Value::Bool(true)) => serde_json::from_value(body)
            .map_err(|e| ApiError::Deserialization(format!("malformed envelope: {e}"))),
        Some(Value::Bool(false)) => Err(failure_from_body(body)),
        Some(other) => Err(ApiError::Deserialization(format!(
            "`success` tag must be a boolean, got {other}"
        ))),
    }
}

fn failure_from_body(body: Value) -> ApiError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string();
    let code = body
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(0);
    ApiError::from_status(code, message, Some(body))
}

/// Page of results returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Uniform failure wrapper. `success` is always `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, code: u16, details: Option<Value>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code,
            details,
            timestamp: now_timestamp(),
        }
    }
}
