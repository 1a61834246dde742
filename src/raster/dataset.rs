/// Opening datasets and reading/writing their metadata.
use std::path::Path;

use gdal::raster::RasterBand;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::{Dataset, DatasetOptions, GdalOpenFlags, Metadata};
use ndarray::Array3;

use super::crs::{self, CrsSpec};
use super::dtype::DataType;
use super::errors::RasterError;
use super::transform::{Affine, Bounds};
use crate::calc::CalcError;
use crate::native::ffi;

/// Open a raster dataset read-only.
///
/// # Errors
///
/// Returns `RasterError::PathNotFound` if the path does not exist and
/// `RasterError::OpenFailed` if GDAL cannot open it as a raster.
pub fn open(path: &Path) -> Result<Dataset, RasterError> {
    open_with(path, GdalOpenFlags::GDAL_OF_READONLY | GdalOpenFlags::GDAL_OF_RASTER)
}

/// Open a raster dataset for in-place update.
///
/// # Errors
///
/// Same as [`open`].
pub fn open_update(path: &Path) -> Result<Dataset, RasterError> {
    open_with(path, GdalOpenFlags::GDAL_OF_UPDATE | GdalOpenFlags::GDAL_OF_RASTER)
}

fn open_with(path: &Path, open_flags: GdalOpenFlags) -> Result<Dataset, RasterError> {
    if !path.exists() {
        return Err(RasterError::PathNotFound {
            path: path.display().to_string(),
        });
    }
    let options = DatasetOptions {
        open_flags,
        allowed_drivers: None,
        open_options: None,
        sibling_files: None,
    };
    Dataset::open_ex(path, options).map_err(|source| RasterError::OpenFailed {
        path: path.display().to_string(),
        source,
    })
}

/// Pixel type of band 1.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` for unsupported (complex) band types.
pub fn dtype(ds: &Dataset) -> Result<DataType, RasterError> {
    let band = ds.rasterband(1)?;
    let band_type = band.band_type();
    DataType::from_gdal(band_type).ok_or_else(|| {
        RasterError::bad_parameter("input", format!("unsupported band type {band_type:?}"))
    })
}

/// Affine transform in native order; identity when none is set.
#[must_use]
pub fn affine(ds: &Dataset) -> Affine {
    ds.geo_transform()
        .map(|gt| Affine::from_gdal(&gt))
        .unwrap_or_else(|_| Affine::identity())
}

#[must_use]
pub fn bounds(ds: &Dataset) -> Bounds {
    let (width, height) = ds.raster_size();
    affine(ds).bounds(width, height)
}

/// The dataset's CRS, if one is set.
#[must_use]
pub fn spatial_ref(ds: &Dataset) -> Option<SpatialRef> {
    if ds.projection().trim().is_empty() {
        return None;
    }
    ds.spatial_ref().ok()
}

/// The dataset's CRS as reported by `info`, empty when none is set.
#[must_use]
pub fn crs_string(ds: &Dataset) -> Option<String> {
    let srs = spatial_ref(ds)?;
    let proj4 = srs.to_proj4().unwrap_or_default();
    let authority = ffi::authority(&srs);
    Some(crs::describe(
        authority.as_ref().map(|(name, code)| (name.as_str(), code.as_str())),
        &proj4,
    ))
}

/// Longitude and latitude of the dataset's center, or `None` without a CRS.
///
/// # Errors
///
/// Returns `RasterError::Gdal` when the coordinate transformation fails.
pub fn lnglat(ds: &Dataset) -> Result<Option<(f64, f64)>, RasterError> {
    let Some(mut src) = spatial_ref(ds) else {
        return Ok(None);
    };
    let mut wgs84 = SpatialRef::from_epsg(4326)?;
    src.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    wgs84.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    let transform = CoordTransform::new(&src, &wgs84)?;

    let (cx, cy) = bounds(ds).center();
    let mut xs = [cx];
    let mut ys = [cy];
    let mut zs: [f64; 0] = [];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
    Ok(Some((xs[0], ys[0])))
}

/// Nodata value of band 1.
///
/// # Errors
///
/// Returns `RasterError::Gdal` if the dataset has no bands.
pub fn nodata(ds: &Dataset) -> Result<Option<f64>, RasterError> {
    Ok(ds.rasterband(1)?.no_data_value())
}

/// Tags in a metadata namespace (`None` for the default one), in file order.
#[must_use]
pub fn tags(ds: &Dataset, namespace: Option<&str>) -> Vec<(String, String)> {
    ds.metadata_domain(namespace.unwrap_or(""))
        .unwrap_or_default()
        .iter()
        .map(|item| parse_metadata_item(item))
        .collect()
}

fn parse_metadata_item(item: &str) -> (String, String) {
    match item.split_once('=') {
        Some((k, v)) => (k.to_owned(), v.to_owned()),
        None => (item.to_owned(), String::new()),
    }
}

/// Parse repeated `--tag KEY=VALUE` arguments.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` for a tag without `=` or with an empty
/// key. Keys and values are kept verbatim.
pub fn parse_tags(raw: &[String]) -> Result<Vec<(String, String)>, RasterError> {
    raw.iter()
        .map(|t| match t.split_once('=') {
            Some((k, v)) if !k.is_empty() => Ok((k.to_owned(), v.to_owned())),
            _ => Err(RasterError::bad_parameter(
                "tag",
                format!("'{t}' is not a KEY=VALUE pair"),
            )),
        })
        .collect()
}

/// Masked min/max/mean of one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Statistics over all valid pixels of band `bidx` (1-based).
///
/// Pixels equal to the nodata value and `NaN`s are excluded. A band with no
/// valid pixels yields `NaN` for every field.
///
/// # Errors
///
/// Returns `RasterError::Gdal` if the band cannot be read.
pub fn band_stats(ds: &Dataset, bidx: usize) -> Result<BandStats, RasterError> {
    let band = ds.rasterband(bidx)?;
    let nodata = band.no_data_value();
    let buffer = band.read_band_as::<f64>()?;
    Ok(masked_stats(buffer.data(), nodata))
}

/// Statistics over `values`, ignoring `nodata` and `NaN`.
#[must_use]
pub fn masked_stats(values: &[f64], nodata: Option<f64>) -> BandStats {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut n = 0usize;

    for &v in values {
        if v.is_nan() || nodata.is_some_and(|nd| v == nd) {
            continue;
        }
        min = min.min(v);
        max = max.max(v);
        sum += v;
        n += 1;
    }

    if n == 0 {
        return BandStats {
            min: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
        };
    }
    BandStats {
        min,
        max,
        mean: sum / n as f64,
    }
}

/// All bands as one `(bands, rows, cols)` array of `f64`.
///
/// # Errors
///
/// Returns `RasterError::Gdal` if a band cannot be read.
pub fn read_bands(ds: &Dataset) -> Result<Array3<f64>, RasterError> {
    let (cols, rows) = ds.raster_size();
    let count = ds.raster_count();
    let mut data = Vec::with_capacity(count * rows * cols);
    for bidx in 1..=count {
        let buffer = ds.rasterband(bidx)?.read_band_as::<f64>()?;
        data.extend_from_slice(buffer.data());
    }
    Array3::from_shape_vec((count, rows, cols), data)
        .map_err(|e| RasterError::Calc(CalcError::Result(e.to_string())))
}

/// Check a 1-based band index against the dataset's band count.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` when out of range.
pub fn check_bidx(ds: &Dataset, bidx: usize) -> Result<usize, RasterError> {
    let count = ds.raster_count();
    if bidx == 0 || bidx > count {
        return Err(RasterError::bad_parameter(
            "bidx",
            format!("band {bidx} is out of range (dataset has {count} bands)"),
        ));
    }
    Ok(bidx)
}

/// Image structure details reported by the driver.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    pub block_size: (usize, usize),
    pub interleave: Option<String>,
    pub compress: Option<String>,
}

impl Structure {
    /// Tiled when blocks do not span the full raster width.
    #[must_use]
    pub fn tiled(&self, width: usize) -> bool {
        self.block_size.0 < width
    }
}

/// Block size and image-structure metadata of band 1.
///
/// # Errors
///
/// Returns `RasterError::Gdal` if the dataset has no bands.
pub fn structure(ds: &Dataset) -> Result<Structure, RasterError> {
    let band = ds.rasterband(1)?;
    Ok(Structure {
        block_size: band.block_size(),
        interleave: ds
            .metadata_item("INTERLEAVE", "IMAGE_STRUCTURE")
            .map(|s| s.to_ascii_lowercase()),
        compress: ds
            .metadata_item("COMPRESSION", "IMAGE_STRUCTURE")
            .map(|s| s.to_ascii_lowercase()),
    })
}

/// Checksum of band `bidx` (1-based).
///
/// # Errors
///
/// Returns `RasterError::Gdal` if the band does not exist.
pub fn checksum(ds: &Dataset, bidx: usize) -> Result<i32, RasterError> {
    let band = ds.rasterband(bidx)?;
    Ok(ffi::checksum(&band))
}

// --- Editing ---

/// Requested change to the nodata value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodataEdit {
    Set(f64),
    Unset,
}

/// Requested change to the CRS.
#[derive(Debug, Clone, PartialEq)]
pub enum CrsEdit {
    Set(CrsSpec),
    Unset,
}

/// A validated set of metadata changes, applied in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataEdit {
    pub nodata: Option<NodataEdit>,
    pub crs: Option<CrsEdit>,
    pub transform: Option<Affine>,
    pub tags: Vec<(String, String)>,
}

impl MetadataEdit {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodata.is_none() && self.crs.is_none() && self.transform.is_none() && self.tags.is_empty()
    }
}

/// Set or clear the nodata value of one band.
///
/// `Int64` and `UInt64` bands take the value through their integer setters;
/// `value` must already be in range for `dtype`.
///
/// # Errors
///
/// Returns `RasterError::Gdal` when the driver rejects the value.
pub fn set_band_nodata(
    band: &mut RasterBand<'_>,
    value: Option<f64>,
    dtype: DataType,
) -> Result<(), RasterError> {
    match (value, dtype) {
        (Some(v), DataType::Int64) => ffi::set_nodata_int64(band, v as i64)?,
        (Some(v), DataType::UInt64) => ffi::set_nodata_uint64(band, v as u64)?,
        _ => band.set_no_data_value(value)?,
    }
    Ok(())
}

/// Apply `edit` to the dataset at `path`.
///
/// The CRS is resolved and the nodata value range-checked before anything is
/// written, so a rejected edit leaves the file untouched.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` for values the dataset cannot hold and
/// `RasterError::Gdal` for write failures.
pub fn apply_edit(path: &Path, edit: &MetadataEdit) -> Result<(), RasterError> {
    let srs = match &edit.crs {
        Some(CrsEdit::Set(spec)) => Some(spec.to_spatial_ref()?),
        _ => None,
    };

    let mut ds = open_update(path)?;

    if let Some(NodataEdit::Set(value)) = edit.nodata {
        super::dtype::validate_nodata(value, dtype(&ds)?)?;
    }

    if let Some(nodata) = edit.nodata {
        let value = match nodata {
            NodataEdit::Set(v) => Some(v),
            NodataEdit::Unset => None,
        };
        let dtype = dtype(&ds)?;
        for bidx in 1..=ds.raster_count() {
            let mut band = ds.rasterband(bidx)?;
            set_band_nodata(&mut band, value, dtype)?;
        }
        tracing::info!(?value, "nodata updated");
    }

    match (&edit.crs, srs) {
        (Some(CrsEdit::Set(spec)), Some(srs)) => {
            ds.set_spatial_ref(&srs)?;
            tracing::info!(crs = %spec, "crs updated");
        }
        (Some(CrsEdit::Unset), _) => {
            ds.set_projection("")?;
            tracing::info!("crs removed");
        }
        _ => {}
    }

    if let Some(transform) = edit.transform {
        ds.set_geo_transform(&transform.to_gdal())?;
        tracing::info!(transform = ?transform.to_array(), "transform updated");
    }

    for (key, value) in &edit.tags {
        ds.set_metadata_item(key, value, "")?;
        tracing::debug!(%key, %value, "tag set");
    }

    Ok(())
}
