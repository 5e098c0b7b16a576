//! Error types for tensor-gpu

use thiserror::Error;

/// Result type alias using the crate's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or running GPU programs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A size or enumerated argument violated a constructor precondition
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// An input buffer does not match the element count of its binding
    #[error("Shape mismatch for input '{name}': expected {expected} elements, got {got}")]
    ShapeMismatch {
        /// Binding name
        name: String,
        /// Element count declared by the program
        expected: usize,
        /// Element count supplied by the caller
        got: usize,
    },

    /// Wrong number of inputs supplied for a program
    #[error("Program expects {expected} inputs, got {got}")]
    InputCount {
        /// Number of declared input bindings
        expected: usize,
        /// Number of buffers supplied
        got: usize,
    },

    /// A setup hook asked for a uniform the program does not declare
    #[error("Unknown uniform '{name}'")]
    UnknownUniform {
        /// The requested uniform name
        name: String,
    },

    /// The requested backend is not compiled in or has no device
    #[error("Backend '{backend}' is not available")]
    BackendUnavailable {
        /// Backend name
        backend: &'static str,
    },

    /// Compilation or dispatch failure reported by the device
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    pub(crate) fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
