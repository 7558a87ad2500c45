//! Diagnostic construction
//!
//! The factory owns the [`DiagnosticConfig`] and is the single place where raw
//! inputs become records. Normalisation is idempotent: an existing
//! [`Diagnostic`] always comes back unchanged.

use super::input::{ErrorValue, LogInput, LogParts};
use super::status::StatusCode;
use super::{Diagnostic, Record};
use crate::config::DiagnosticConfig;
use crate::error::ArgumentShapeError;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Builds diagnostic records with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct DiagnosticFactory {
    config: Arc<DiagnosticConfig>,
}

macro_rules! status_constructors {
    ($($(#[$doc:meta])* $name:ident => $code:expr),* $(,)?) => {
        impl DiagnosticFactory {
            $(
                $(#[$doc])*
                pub fn $name(&self, message: impl Into<String>) -> Diagnostic {
                    self.record($code, message)
                }
            )*
        }
    };
}

status_constructors! {
    ok => StatusCode::OK,
    created => StatusCode::CREATED,
    accepted => StatusCode::ACCEPTED,
    no_content => StatusCode::NO_CONTENT,

    bad_request => StatusCode::BAD_REQUEST,
    unauthorized => StatusCode::UNAUTHORIZED,
    forbidden => StatusCode::FORBIDDEN,
    not_found => StatusCode::NOT_FOUND,
    method_not_allowed => StatusCode::METHOD_NOT_ALLOWED,
    not_acceptable => StatusCode::NOT_ACCEPTABLE,
    request_timeout => StatusCode::REQUEST_TIMEOUT,
    conflict => StatusCode::CONFLICT,
    gone => StatusCode::GONE,

    /// 500, independent of the configured default status
    internal_server_error => StatusCode::INTERNAL_SERVER_ERROR,
    not_implemented => StatusCode::NOT_IMPLEMENTED,
    service_unavailable => StatusCode::SERVICE_UNAVAILABLE,
}

impl DiagnosticFactory {
    pub fn new(config: DiagnosticConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DiagnosticConfig {
        &self.config
    }

    /// Turn any accepted input into a chain
    pub fn normalize(&self, input: impl Into<LogInput>) -> Diagnostic {
        match input.into() {
            LogInput::Empty => Diagnostic::None,
            LogInput::Diagnostic(diagnostic) => diagnostic,
            LogInput::Error(error) => self.from_error(None, error, None),
            LogInput::Status(status) => self.build(Some(status), None, None),
            LogInput::Message(message) => self.build(None, Some(message), None),
            LogInput::Parts(parts) => {
                let (status, error, message, payload) = parts.into_fields();
                match error {
                    Some(error) => self.from_error(status, error, payload),
                    None => self.build(status, message, payload),
                }
            }
        }
    }

    /// Validate and normalise a parts builder
    pub fn from_parts(&self, parts: LogParts) -> Result<Diagnostic, ArgumentShapeError> {
        LogInput::try_from(parts).map(|input| self.normalize(input))
    }

    /// Normalise both sides, then merge `next` on top of `prev`
    pub fn chain(&self, prev: impl Into<LogInput>, next: impl Into<LogInput>) -> Diagnostic {
        Diagnostic::merge(self.normalize(prev), self.normalize(next))
    }

    /// A record for a bare status code; 200 alone is the sentinel
    pub fn status(&self, status: u16) -> Diagnostic {
        self.build(Some(status), None, None)
    }

    /// A record with an explicit status and message
    pub fn record(&self, status: u16, message: impl Into<String>) -> Diagnostic {
        self.build(Some(status), Some(message.into()), None)
    }

    fn from_error(
        &self,
        status: Option<u16>,
        error: ErrorValue,
        payload: Option<Map<String, Value>>,
    ) -> Diagnostic {
        let status = status
            .or(error.status())
            .unwrap_or(self.config.default_status);
        self.make(status, Some(error.message().to_string()), payload)
    }

    fn build(
        &self,
        status: Option<u16>,
        message: Option<String>,
        payload: Option<Map<String, Value>>,
    ) -> Diagnostic {
        let explicit_non_ok = status.is_some_and(|s| s != StatusCode::OK);
        if message.is_none() && payload.is_none() && !explicit_non_ok {
            return Diagnostic::None;
        }
        self.make(
            status.unwrap_or(self.config.default_status),
            message,
            payload,
        )
    }

    fn make(
        &self,
        status: u16,
        message: Option<String>,
        payload: Option<Map<String, Value>>,
    ) -> Diagnostic {
        Record::new(
            status,
            message,
            self.config.display.clone(),
            payload.unwrap_or_default(),
        )
        .into()
    }
}
