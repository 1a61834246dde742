/// Errors from the raster domain layer.
use gdal::errors::GdalError;
use thiserror::Error;

use crate::calc::CalcError;

/// Errors that can occur while inspecting or editing a raster dataset.
#[derive(Debug, Error)]
pub enum RasterError {
    /// A user-supplied option value failed validation.
    #[error("Invalid value for '--{param}': {reason}")]
    BadParameter {
        /// Option name without leading dashes.
        param: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The input path does not exist.
    #[error("Path '{path}' does not exist")]
    PathNotFound {
        /// The path as given on the command line.
        path: String,
    },

    /// The path exists but GDAL could not open it as a raster.
    #[error("'{path}' could not be opened as a raster dataset: {source}")]
    OpenFailed {
        /// The path as given on the command line.
        path: String,
        /// Underlying GDAL error.
        #[source]
        source: GdalError,
    },

    /// No registered format driver matched the requested name.
    #[error("No format driver matches '{name}'")]
    DriverNotFound {
        /// The requested driver name.
        name: String,
        /// Close matches among registered drivers.
        candidates: Vec<String>,
    },

    /// A `calc` expression failed to parse or evaluate.
    #[error("Expression error: {0}")]
    Calc(#[from] CalcError),

    /// Any other GDAL failure while reading or writing.
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalError),

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing output failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RasterError {
    /// Shorthand for [`RasterError::BadParameter`].
    #[must_use]
    pub fn bad_parameter(param: &'static str, reason: impl Into<String>) -> Self {
        Self::BadParameter {
            param,
            reason: reason.into(),
        }
    }

    /// Return the CLI exit code for this error.
    ///
    /// Usage and validation problems exit 2, operational failures exit 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BadParameter { .. } | Self::PathNotFound { .. } | Self::DriverNotFound { .. } => 2,
            Self::OpenFailed { .. }
            | Self::Calc(_)
            | Self::Gdal(_)
            | Self::Io(_)
            | Self::Json(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_exit_2() {
        assert_eq!(RasterError::bad_parameter("nodata", "out of range").exit_code(), 2);
        assert_eq!(
            RasterError::PathNotFound {
                path: "nope.tif".to_owned()
            }
            .exit_code(),
            2
        );
    }

    #[test]
    fn test_operational_errors_exit_1() {
        let err = RasterError::OpenFailed {
            path: "tests".to_owned(),
            source: GdalError::BadArgument("not a raster".to_owned()),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_bad_parameter_message() {
        let err = RasterError::bad_parameter("crs", "'LOL:WUT' is not a recognized CRS");
        assert_eq!(
            err.to_string(),
            "Invalid value for '--crs': 'LOL:WUT' is not a recognized CRS"
        );
    }
}
