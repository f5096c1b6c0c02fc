//! Typed failures surfaced by capability calls and hierarchy setup.
//!
//! Composition itself never fails: null-like values pass through and missing
//! capability sets are skipped. Errors only arise when a caller invokes a
//! member, or when a capability or native method rejects its inputs.

use thiserror::Error;

pub type ExtendResult<T> = Result<T, ExtendError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtendError {
    /// The resolved member is a plain value, not a method.
    #[error("'{name}' is not a function")]
    NotCallable { name: String },

    /// A native method was invoked with a receiver of the wrong kind.
    #[error("{method}() requires a {expected} receiver")]
    IncompatibleReceiver {
        method: String,
        expected: &'static str,
    },

    /// A method rejected one of its arguments.
    #[error("{method}(): {reason}")]
    InvalidArgument { method: String, reason: String },

    /// A type declaration would break the hierarchy.
    #[error("cannot declare type '{name}': {reason}")]
    InvalidType { name: String, reason: String },
}

impl ExtendError {
    pub(crate) fn invalid_argument(method: &str, reason: impl Into<String>) -> Self {
        ExtendError::InvalidArgument {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn receiver(method: &str, expected: &'static str) -> Self {
        ExtendError::IncompatibleReceiver {
            method: method.to_string(),
            expected,
        }
    }
}
