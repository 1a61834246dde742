/// Shared serializable output types for all commands.
///
/// These types are what gets written to stdout, either as JSON or rendered
/// as text or a table. They are decoupled from the GDAL handles they are
/// read from.
use serde::Serialize;

use crate::native::DriverInfo;
use crate::raster::{BandStats, RasterError};

/// Dataset summary printed by `info`.
#[derive(Debug, Clone, Serialize)]
pub struct InfoOutput {
    /// Short name of the format driver, e.g. `GTiff`.
    pub driver: String,
    /// Pixel type of band 1, e.g. `uint8`.
    pub dtype: String,
    pub nodata: Option<f64>,
    pub width: usize,
    pub height: usize,
    /// Band count.
    pub count: usize,
    /// `AUTH:CODE` or a PROJ string; null without a CRS.
    pub crs: Option<String>,
    /// Affine coefficients in native order `a b c d e f`.
    pub transform: [f64; 6],
    /// `(height, width)`.
    pub shape: [usize; 2],
    /// `(left, bottom, right, top)`.
    pub bounds: [f64; 4],
    pub res: [f64; 2],
    /// Longitude and latitude of the center; null without a CRS.
    pub lnglat: Option<[f64; 2]>,
    pub blockxsize: usize,
    pub blockysize: usize,
    pub tiled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interleave: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<String>,
    /// Per-band statistics, only with `--tell-me-more`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Vec<BandStatsOutput>>,
    /// Per-band checksums, only with `--tell-me-more`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Vec<i32>>,
}

/// Masked statistics of one band.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BandStatsOutput {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl From<BandStats> for BandStatsOutput {
    fn from(s: BandStats) -> Self {
        Self {
            min: s.min,
            max: s.max,
            mean: s.mean,
        }
    }
}

/// A registered format driver, as listed by `env --formats`.
#[derive(Debug, Clone, Serialize)]
pub struct DriverOutput {
    pub short_name: String,
    pub long_name: String,
    /// Whether the driver can create new datasets (usable by `calc`).
    pub create: bool,
}

impl From<DriverInfo> for DriverOutput {
    fn from(d: DriverInfo) -> Self {
        Self {
            short_name: d.short_name,
            long_name: d.long_name,
            create: d.create,
        }
    }
}

/// GDAL environment summary printed by `env`.
#[derive(Debug, Clone, Serialize)]
pub struct EnvOutput {
    pub gdal_release: String,
    pub gdal_version: String,
    pub raster_drivers: usize,
    pub creatable_drivers: usize,
    pub cpl_debug: bool,
}

/// A structured error envelope for JSON error output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
    /// Always `false`.
    pub ok: bool,
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail in the JSON error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (snake_case).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Close matches, for unknown driver names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<String>>,
}

impl ErrorOutput {
    /// Construct from a `RasterError`.
    #[must_use]
    pub fn from_raster_error(err: &RasterError) -> Self {
        let (code, candidates) = match err {
            RasterError::BadParameter { .. } => ("bad_parameter", None),
            RasterError::PathNotFound { .. } => ("path_not_found", None),
            RasterError::OpenFailed { .. } => ("open_failed", None),
            RasterError::DriverNotFound { candidates, .. } => {
                ("driver_not_found", Some(candidates.clone()))
            }
            RasterError::Calc(_) => ("calc_error", None),
            RasterError::Gdal(_) => ("gdal_error", None),
            RasterError::Io(_) => ("io_error", None),
            RasterError::Json(_) => ("json_error", None),
        };
        Self {
            ok: false,
            error: ErrorDetail {
                code: code.to_owned(),
                message: err.to_string(),
                candidates,
            },
        }
    }
}
