/// Affine georeferencing transforms and their two accepted orderings.
use gdal::GeoTransform;

use super::errors::RasterError;

/// Six-coefficient affine transform in native order:
/// `x = a*col + b*row + c`, `y = d*col + e*row + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

/// Dataset extent as `(left, bottom, right, top)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    #[must_use]
    pub fn to_array(self) -> [f64; 4] {
        [self.left, self.bottom, self.right, self.top]
    }

    #[must_use]
    pub fn center(self) -> (f64, f64) {
        ((self.left + self.right) / 2.0, (self.bottom + self.top) / 2.0)
    }
}

impl Affine {
    #[must_use]
    pub fn identity() -> Self {
        Self::from_array([1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
    }

    #[must_use]
    pub fn from_array(v: [f64; 6]) -> Self {
        Self {
            a: v[0],
            b: v[1],
            c: v[2],
            d: v[3],
            e: v[4],
            f: v[5],
        }
    }

    /// Build from GDAL order `c a b f d e`.
    #[must_use]
    pub fn from_gdal(gt: &GeoTransform) -> Self {
        Self {
            a: gt[1],
            b: gt[2],
            c: gt[0],
            d: gt[4],
            e: gt[5],
            f: gt[3],
        }
    }

    #[must_use]
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    #[must_use]
    pub fn to_gdal(&self) -> GeoTransform {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Extent of a `width` x `height` raster.
    ///
    /// Uses the upper-left origin and the diagonal terms only, so rotated
    /// transforms report the unrotated box.
    #[must_use]
    pub fn bounds(&self, width: usize, height: usize) -> Bounds {
        Bounds {
            left: self.c,
            bottom: self.f + self.e * height as f64,
            right: self.c + self.a * width as f64,
            top: self.f,
        }
    }

    /// Pixel size `(x, y)`, positive for north-up rasters.
    #[must_use]
    pub fn res(&self) -> (f64, f64) {
        if self.b == 0.0 && self.d == 0.0 {
            (self.a, -self.e)
        } else {
            (self.a.hypot(self.d), self.b.hypot(self.e))
        }
    }
}

/// Whether a 6-sequence looks GDAL-ordered: zero rotation terms at positions
/// 2 and 4, a positive x pixel size and a negative y pixel size.
#[must_use]
pub fn tastes_like_gdal(seq: &[f64; 6]) -> bool {
    seq[2] == 0.0 && seq[4] == 0.0 && seq[1] > 0.0 && seq[5] < 0.0
}

/// Parse a `--transform` argument: a JSON array of exactly six numbers in
/// either native or GDAL order.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` if the value is not JSON, not an array
/// of numbers, or not six elements long.
pub fn parse_transform(raw: &str) -> Result<Affine, RasterError> {
    let bad = |reason: &str| {
        RasterError::bad_parameter(
            "transform",
            format!("'{raw}' is not recognized as an affine array: {reason}"),
        )
    };

    let values: Vec<f64> = serde_json::from_str(raw).map_err(|e| bad(&e.to_string()))?;
    let seq: [f64; 6] = values
        .try_into()
        .map_err(|v: Vec<f64>| bad(&format!("expected 6 coefficients, got {}", v.len())))?;

    if tastes_like_gdal(&seq) {
        tracing::debug!("transform taken as GDAL-ordered");
        Ok(Affine::from_gdal(&seq))
    } else {
        Ok(Affine::from_array(seq))
    }
}
