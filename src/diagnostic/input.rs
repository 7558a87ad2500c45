//! Typed inputs accepted wherever a diagnostic can be reported
//!
//! Every shape a caller may hand to a context or continuation is one variant
//! of [`LogInput`]. The only shape that can be invalid is a [`LogParts`] with
//! both an error and a message, and that is rejected when the parts are
//! converted, before anything runs.

use super::Diagnostic;
use crate::error::ArgumentShapeError;
use serde_json::{Map, Value};

/// An error value reduced to what a diagnostic record needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    message: String,
    status: Option<u16>,
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Capture any error's rendered message
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(err.to_string())
    }

    /// Attach the status this error already carries
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl From<anyhow::Error> for ErrorValue {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{:#}", err))
    }
}

impl From<std::io::Error> for ErrorValue {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<crate::error::Error> for ErrorValue {
    fn from(err: crate::error::Error) -> Self {
        match err {
            crate::error::Error::Failed { status, message } => Self::new(message).with_status(status),
            other => Self::new(other.to_string()),
        }
    }
}

/// Status, error or message, and payload in any combination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogParts {
    status: Option<u16>,
    error: Option<ErrorValue>,
    message: Option<String>,
    payload: Option<Map<String, Value>>,
}

impl LogParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Wrap an error. Mutually exclusive with [`LogParts::message`].
    pub fn error(mut self, error: impl Into<ErrorValue>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Set a message. Mutually exclusive with [`LogParts::error`].
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = Some(payload);
        self
    }

    fn check(self) -> Result<CheckedParts, ArgumentShapeError> {
        if self.error.is_some() && self.message.is_some() {
            return Err(ArgumentShapeError::mutually_exclusive("error", "message"));
        }
        Ok(CheckedParts(self))
    }
}

/// A [`LogParts`] that passed the shape check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedParts(LogParts);

impl CheckedParts {
    pub(crate) fn into_fields(
        self,
    ) -> (
        Option<u16>,
        Option<ErrorValue>,
        Option<String>,
        Option<Map<String, Value>>,
    ) {
        let LogParts {
            status,
            error,
            message,
            payload,
        } = self.0;
        (status, error, message, payload)
    }
}

/// Anything that can be folded into a diagnostic chain
#[derive(Debug, Clone, Default)]
pub enum LogInput {
    /// Nothing to report
    #[default]
    Empty,
    /// An existing chain, passed through unchanged
    Diagnostic(Diagnostic),
    Error(ErrorValue),
    /// A bare status code
    Status(u16),
    Message(String),
    Parts(CheckedParts),
}

impl From<()> for LogInput {
    fn from(_: ()) -> Self {
        LogInput::Empty
    }
}

impl<T: Into<LogInput>> From<Option<T>> for LogInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(LogInput::Empty, Into::into)
    }
}

impl From<Diagnostic> for LogInput {
    fn from(diagnostic: Diagnostic) -> Self {
        LogInput::Diagnostic(diagnostic)
    }
}

impl From<u16> for LogInput {
    fn from(status: u16) -> Self {
        LogInput::Status(status)
    }
}

impl From<&str> for LogInput {
    fn from(message: &str) -> Self {
        LogInput::Message(message.to_string())
    }
}

impl From<String> for LogInput {
    fn from(message: String) -> Self {
        LogInput::Message(message)
    }
}

impl From<ErrorValue> for LogInput {
    fn from(error: ErrorValue) -> Self {
        LogInput::Error(error)
    }
}

impl From<anyhow::Error> for LogInput {
    fn from(err: anyhow::Error) -> Self {
        LogInput::Error(err.into())
    }
}

impl From<std::io::Error> for LogInput {
    fn from(err: std::io::Error) -> Self {
        LogInput::Error(err.into())
    }
}

impl TryFrom<LogParts> for LogInput {
    type Error = ArgumentShapeError;

    fn try_from(parts: LogParts) -> Result<Self, ArgumentShapeError> {
        parts.check().map(LogInput::Parts)
    }
}
