/// Command dispatch: routes `Command` enum variants to their implementations.
pub mod calc;
pub mod edit;
pub mod env;
pub mod info;

use crate::cli::OutputCtx;
use crate::cli::args::Command;
use crate::raster::RasterError;

/// Dispatch a parsed `Command` to its handler.
///
/// # Errors
///
/// Returns `RasterError` on any command failure.
pub fn dispatch(command: &Command, ctx: &OutputCtx) -> Result<(), RasterError> {
    match command {
        Command::Info(args) => info::run(args, ctx),
        Command::Edit(args) => edit::run(args, ctx),
        Command::Env(args) => env::run(args, ctx),
        Command::Calc(args) => calc::run(args, ctx),
    }
}
