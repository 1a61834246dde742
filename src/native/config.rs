/// Process-wide GDAL setup: driver registration, config options, and routing
/// of GDAL diagnostics into `tracing`.
use gdal::DriverManager;
use gdal::errors::{CplErrType, GdalError};

/// Verbosity above which GDAL's own debug output is switched on.
const CPL_DEBUG_VERBOSITY: i8 = 2;

/// Register drivers, install the error handler and apply config options.
///
/// # Errors
///
/// Returns `GdalError` if a config option cannot be set.
pub fn configure(verbosity: i8) -> Result<(), GdalError> {
    DriverManager::register_all();
    gdal::config::set_error_handler(route_to_tracing);

    let cpl_debug = if verbosity > CPL_DEBUG_VERBOSITY { "ON" } else { "OFF" };
    gdal::config::set_config_option("CPL_DEBUG", cpl_debug)?;
    tracing::debug!(verbosity, cpl_debug, "GDAL configured");
    Ok(())
}

/// Whether GDAL debug output is enabled.
#[must_use]
pub fn cpl_debug() -> bool {
    gdal::config::get_config_option("CPL_DEBUG", "OFF")
        .map(|v| v.eq_ignore_ascii_case("ON") || v.eq_ignore_ascii_case("YES"))
        .unwrap_or(false)
}

#[must_use]
pub fn release_name() -> String {
    gdal::version::version_info("RELEASE_NAME")
}

#[must_use]
pub fn version_num() -> String {
    gdal::version::version_info("VERSION_NUM")
}

// Failures are reported through our own error type, so GDAL's copy is only
// interesting at debug level.
fn route_to_tracing(class: CplErrType, code: i32, msg: &str) {
    match class {
        CplErrType::None => {}
        CplErrType::Debug => tracing::trace!(target: "gdal", code, "{msg}"),
        CplErrType::Warning => tracing::warn!(target: "gdal", code, "{msg}"),
        CplErrType::Failure => tracing::debug!(target: "gdal", code, "{msg}"),
        CplErrType::Fatal => tracing::error!(target: "gdal", code, "{msg}"),
    }
}
