use thiserror::Error;

/// Two inputs that cannot be supplied together were both present.
///
/// Raised synchronously while a diagnostic input is being assembled, before
/// any orchestration step has a chance to run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Argument shape error: `{first}` and `{second}` are mutually exclusive")]
pub struct ArgumentShapeError {
    pub first: &'static str,
    pub second: &'static str,
}

impl ArgumentShapeError {
    pub fn mutually_exclusive(first: &'static str, second: &'static str) -> Self {
        Self { first, second }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ArgumentShape(#[from] ArgumentShapeError),

    /// Every continuation that could still advance the run was dropped unused.
    #[error("{primitive} abandoned at {position}: no continuation can complete it")]
    Abandoned {
        primitive: &'static str,
        position: String,
    },

    #[error("[{status}] {message}")]
    Failed { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn abandoned(primitive: &'static str, position: impl ToString) -> Self {
        Self::Abandoned {
            primitive,
            position: position.to_string(),
        }
    }

    /// HTTP-style status for reporting this error across a host boundary
    pub fn status(&self) -> u16 {
        match self {
            Self::ArgumentShape(_) => 400,
            Self::Failed { status, .. } => *status,
            Self::Abandoned { .. } | Self::Config(_) | Self::Toml(_) | Self::Io(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
