/// Pixel data types, their value ranges, and nodata validation.
use gdal::raster::{GdalDataType, GdalType};

use super::errors::RasterError;

/// Pixel data type of a raster band, named the way NumPy names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    /// Map a GDAL band type. Complex and unknown types have no counterpart.
    #[must_use]
    pub fn from_gdal(t: GdalDataType) -> Option<Self> {
        match t {
            GdalDataType::UInt8 => Some(Self::UInt8),
            GdalDataType::Int8 => Some(Self::Int8),
            GdalDataType::UInt16 => Some(Self::UInt16),
            GdalDataType::Int16 => Some(Self::Int16),
            GdalDataType::UInt32 => Some(Self::UInt32),
            GdalDataType::Int32 => Some(Self::Int32),
            GdalDataType::UInt64 => Some(Self::UInt64),
            GdalDataType::Int64 => Some(Self::Int64),
            GdalDataType::Float32 => Some(Self::Float32),
            GdalDataType::Float64 => Some(Self::Float64),
            _ => None,
        }
    }

    /// Parse a NumPy-style name. `ubyte` is accepted as an alias of `uint8`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "uint8" | "ubyte" => Some(Self::UInt8),
            "int8" => Some(Self::Int8),
            "uint16" => Some(Self::UInt16),
            "int16" => Some(Self::Int16),
            "uint32" => Some(Self::UInt32),
            "int32" => Some(Self::Int32),
            "uint64" => Some(Self::UInt64),
            "int64" => Some(Self::Int64),
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::Int8 => "int8",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::UInt32 => "uint32",
            Self::Int32 => "int32",
            Self::UInt64 => "uint64",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// `(min, max)` of representable values, as `f64`.
    ///
    /// For the 64-bit integer types `max` is the first power of two past the
    /// type and is itself excluded; see [`DataType::contains`].
    #[must_use]
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::UInt8 => (0.0, f64::from(u8::MAX)),
            Self::Int8 => (f64::from(i8::MIN), f64::from(i8::MAX)),
            Self::UInt16 => (0.0, f64::from(u16::MAX)),
            Self::Int16 => (f64::from(i16::MIN), f64::from(i16::MAX)),
            Self::UInt32 => (0.0, f64::from(u32::MAX)),
            Self::Int32 => (f64::from(i32::MIN), f64::from(i32::MAX)),
            Self::UInt64 => (0.0, 2f64.powi(64)),
            Self::Int64 => (-(2f64.powi(63)), 2f64.powi(63)),
            Self::Float32 => (f64::from(f32::MIN), f64::from(f32::MAX)),
            Self::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Whether `value` can be stored in this type. `NaN` fits float types only.
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        if value.is_nan() {
            return self.is_float();
        }
        let (min, max) = self.range();
        match self {
            Self::UInt64 | Self::Int64 => min <= value && value < max,
            _ => min <= value && value <= max,
        }
    }
}

/// Parse a `--nodata` argument the way Python's `float()` would.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` if `raw` is not a number.
pub fn parse_nodata(raw: &str) -> Result<f64, RasterError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| RasterError::bad_parameter("nodata", format!("'{raw}' is not a number")))
}

/// Check that a nodata value fits the band's pixel type.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` when the value is outside the type's range.
pub fn validate_nodata(value: f64, dtype: DataType) -> Result<f64, RasterError> {
    if dtype.contains(value) {
        Ok(value)
    } else {
        Err(RasterError::bad_parameter(
            "nodata",
            format!("{value} is outside the range of the file's data type ({})", dtype.name()),
        ))
    }
}

/// Conversion from the `f64` working type of `calc` into a band's storage type.
///
/// Float-to-integer casts saturate at the type bounds and map `NaN` to zero.
pub trait FromF64: GdalType + Copy {
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_from_f64 {
    ($($t:ty),+) => {
        $(
            impl FromF64 for $t {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn from_f64(v: f64) -> Self {
                    v as $t
                }
            }
        )+
    };
}

impl_from_f64!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Round-trip a value through a storage type, as `astype` would.
#[must_use]
pub fn cast_through(v: f64, dtype: DataType) -> f64 {
    match dtype {
        DataType::UInt8 => f64::from(u8::from_f64(v)),
        DataType::Int8 => f64::from(i8::from_f64(v)),
        DataType::UInt16 => f64::from(u16::from_f64(v)),
        DataType::Int16 => f64::from(i16::from_f64(v)),
        DataType::UInt32 => f64::from(u32::from_f64(v)),
        DataType::Int32 => f64::from(i32::from_f64(v)),
        DataType::UInt64 => u64::from_f64(v) as f64,
        DataType::Int64 => i64::from_f64(v) as f64,
        DataType::Float32 => f64::from(f32::from_f64(v)),
        DataType::Float64 => v,
    }
}
