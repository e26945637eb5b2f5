/*
 * Error Module
 *
 * Crate-wide error type. Parameter validation failures are reported before
 * any state is touched; non-finite values appearing mid-run abort the run.
 */

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// A simulation parameter is out of its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An explicit initial state does not line up with the parameters.
    #[error("state mismatch: expected {expected} birds, found {found}")]
    StateMismatch { expected: usize, found: usize },

    /// A position or heading became NaN or infinite during a step.
    #[error("numeric anomaly at frame {frame}: non-finite {quantity} for bird {index}")]
    NumericAnomaly {
        frame: usize,
        index: usize,
        quantity: &'static str,
    },
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }
}
