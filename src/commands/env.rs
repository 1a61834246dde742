/// `env` command: report the GDAL environment.
use crate::cli::OutputCtx;
use crate::cli::args::EnvArgs;
use crate::cli::output::{write_drivers, write_env};
use crate::native::{self, raster_drivers};
use crate::raster::RasterError;
use crate::types::{DriverOutput, EnvOutput};

/// Run `rasmeta env`.
///
/// # Errors
///
/// Returns `RasterError::Json` if JSON output cannot be serialized.
pub fn run(args: &EnvArgs, ctx: &OutputCtx) -> Result<(), RasterError> {
    let drivers = raster_drivers();

    if args.formats {
        let output: Vec<DriverOutput> = drivers.into_iter().map(DriverOutput::from).collect();
        return write_drivers(&output, ctx);
    }

    let env = EnvOutput {
        gdal_release: native::config::release_name(),
        gdal_version: native::config::version_num(),
        raster_drivers: drivers.len(),
        creatable_drivers: drivers.iter().filter(|d| d.create).count(),
        cpl_debug: native::config::cpl_debug(),
    };
    write_env(&env, ctx)
}
