/// Band math: a small Lisp-like expression language evaluated over `ndarray`
/// arrays.
pub mod errors;
pub mod eval;
pub mod parse;

pub use errors::CalcError;
pub use eval::{Context, Input, Value, into_bands};
pub use parse::parse;

/// Parse and evaluate `src` against `inputs`.
///
/// # Errors
///
/// Returns `CalcError` for syntax and evaluation failures.
pub fn evaluate(src: &str, inputs: &[Input]) -> Result<Value, CalcError> {
    let expr = parse(src)?;
    tracing::debug!(?expr, "parsed calc expression");
    Context::new(inputs).eval(&expr)
}
