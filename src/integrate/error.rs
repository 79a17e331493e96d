use thiserror::Error;

/// Errors surfaced by the integration engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A caller-side precondition was violated (bad counts, reversed bounds, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The integrand panicked or produced a non-finite value.
    #[error("integrand failed at ({x}, {y}): {reason}")]
    IntegrandFault { x: f64, y: f64, reason: String },

    /// A worker thread died outside of integrand evaluation.
    #[error("worker thread panicked during integration")]
    WorkerPanicked,
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Bail out of the current function with [`EngineError::InvalidArgument`]
/// unless the condition holds.
macro_rules! ensure_arg {
    ($cond:expr, $($fmt:tt)+) => {
        if !$cond {
            return Err($crate::integrate::EngineError::invalid(format!($($fmt)+)));
        }
    };
}

pub(crate) use ensure_arg;
