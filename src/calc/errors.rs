/// Errors from parsing and evaluating calc expressions.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// The expression text is malformed.
    #[error("syntax error at position {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// A bare symbol did not name an input.
    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("'{func}' expects {expected} argument(s), got {got}")]
    Arity {
        func: String,
        expected: &'static str,
        got: usize,
    },

    /// `read` referenced an input that was not given.
    #[error("input {index} does not exist ({count} inputs given)")]
    InputIndex { index: usize, count: usize },

    #[error("band {index} does not exist (value has {count} bands)")]
    BandIndex { index: usize, count: usize },

    #[error("shapes {left:?} and {right:?} cannot be broadcast together")]
    Shape { left: Vec<usize>, right: Vec<usize> },

    /// An argument had the wrong kind of value.
    #[error("'{func}' expects {expected}")]
    Type {
        func: String,
        expected: &'static str,
    },

    #[error("unknown dtype '{0}'")]
    Dtype(String),

    /// A GDAL algorithm (`fillnodata`, `sieve`) failed.
    #[error("{func} failed: {message}")]
    Native { func: &'static str, message: String },

    /// The final value cannot be written as a raster.
    #[error("result must be a 2-D or 3-D array, got {0}")]
    Result(String),
}
