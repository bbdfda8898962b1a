//! `securecheck.envelope.v1`: the single JSON document every command prints.
//!
//! Reads that could not reach the store still succeed and carry a
//! `connection_error` warning; reads that matched nothing carry
//! `no_result_found`. Everything else that fails becomes an `ok: false`
//! envelope wrapped in [`EnvelopeCommandFailure`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::gateway::{GatewayError, Table};
use crate::utils::time::generated_at_utc_now;

pub const ENVELOPE_SCHEMA_VERSION: &str = "securecheck.envelope.v1";
pub const WARNING_CONNECTION_ERROR: &str = "connection_error";
pub const WARNING_NO_RESULT_FOUND: &str = "no_result_found";

pub type EnvelopeMeta = BTreeMap<String, Value>;

/// Shape shared by warnings and the error slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeNotice {
    pub code: String,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    pub command: String,
    pub generated_at_utc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub meta: EnvelopeMeta,
    pub warnings: Vec<EnvelopeNotice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeNotice>,
}

/// An `ok: false` envelope travelling up through `anyhow` to `main`.
#[derive(Debug, Clone, Error)]
#[error("{}", encode(.envelope))]
pub struct EnvelopeCommandFailure {
    envelope: Envelope,
}

impl EnvelopeCommandFailure {
    #[must_use]
    pub fn new(envelope: Envelope) -> Self {
        Self { envelope }
    }
}

fn encode(envelope: &Envelope) -> String {
    serde_json::to_string(envelope)
        .unwrap_or_else(|error| format!("{{\"ok\":false,\"encode_error\":\"{error}\"}}"))
}

impl Envelope {
    fn stamped(command: impl Into<String>, ok: bool, data: Option<Value>) -> Self {
        Self {
            ok,
            command: command.into(),
            generated_at_utc: generated_at_utc_now(),
            data,
            meta: EnvelopeMeta::from([(
                "schema_version".to_string(),
                json!(ENVELOPE_SCHEMA_VERSION),
            )]),
            warnings: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn ok(command: impl Into<String>, data: Value) -> Self {
        Self::stamped(command, true, Some(data))
    }

    /// Tabular result; `row_count` lands in meta.
    #[must_use]
    pub fn table(command: impl Into<String>, table: &Table) -> Self {
        Self::ok(command, json!(table)).with_meta("row_count", json!(table.row_count()))
    }

    #[must_use]
    pub fn error(
        command: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut envelope = Self::stamped(command, false, None);
        envelope.error = Some(EnvelopeNotice {
            code: code.into(),
            message: message.into(),
            details: None,
        });
        envelope
    }

    #[must_use]
    pub fn gateway_error(command: impl Into<String>, error: &GatewayError) -> Self {
        Self::error(command, error.code(), error.to_string()).with_error_details(error.details())
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_error_details(mut self, details: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.details = Some(details);
        }
        self
    }

    /// Records that the store was unreachable and the result is empty by
    /// necessity rather than by content.
    #[must_use]
    pub fn with_connection_warning(mut self, error: Option<&GatewayError>) -> Self {
        if let Some(error) = error {
            self.warnings.push(EnvelopeNotice {
                code: WARNING_CONNECTION_ERROR.to_string(),
                message: error.to_string(),
                details: Some(error.details()),
            });
        }
        self
    }

    #[must_use]
    pub fn with_no_result_warning(mut self, nothing_found: bool) -> Self {
        if nothing_found {
            self.warnings.push(EnvelopeNotice {
                code: WARNING_NO_RESULT_FOUND.to_string(),
                message: "No Result Found".to_string(),
                details: None,
            });
        }
        self
    }

    #[must_use]
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|warning| warning.code == code)
    }
}
