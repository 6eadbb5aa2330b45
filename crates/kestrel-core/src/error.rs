use crate::dtype::DType;
use crate::shape::Shape;

/// All errors that can occur within Kestrel.
///
/// Operator-level failures come in two kinds: precondition violations
/// (`InvalidArgument`) and structural limits of the op graph
/// (`UnsupportedOperation`). The remaining variants belong to the tensor
/// runtime and the reference executor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A precondition on operator arguments failed (arity, dtype kind, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested operation is not defined for this operator.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Shape mismatch between two tensors.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    /// DType mismatch between a tensor and what the operator requires.
    #[error("dtype mismatch: expected {expected:?}, got {got:?}")]
    DTypeMismatch { expected: DType, got: DType },

    /// Axis index out of range for the tensor's rank.
    #[error("dimension out of range: dim {dim} for tensor with {rank} dimensions")]
    DimOutOfRange { dim: i64, rank: usize },

    /// Element count mismatch when creating from a slice.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    pub fn invalid_argument(s: impl Into<String>) -> Self {
        Error::InvalidArgument(s.into())
    }

    pub fn unsupported(s: impl Into<String>) -> Self {
        Error::UnsupportedOperation(s.into())
    }
}

/// Convenience Result type used throughout Kestrel.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}

/// Early return with `Error::InvalidArgument` unless `cond` holds.
///
/// The precondition-check helper used by every datatype-inference rule:
/// `ensure!(dtypes.len() == 3, "expected 3 inputs, got {:?}", dtypes)`.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::Error::InvalidArgument(format!($($arg)*)));
        }
    };
}
