/// Raw `gdal-sys` calls not covered by the safe bindings.
use std::ffi::{CStr, c_int};
use std::ptr;

use gdal::errors::GdalError;
use gdal::raster::RasterBand;
use gdal_sys::CPLErr;
use gdal::spatial_ref::SpatialRef;

/// Root authority `(name, code)` of a spatial reference, if it has one.
#[must_use]
pub fn authority(srs: &SpatialRef) -> Option<(String, String)> {
    // SAFETY: the handle is owned by `srs` and outlives both calls; the
    // returned strings are owned by the SRS and copied before returning.
    unsafe {
        let handle = srs.to_c_hsrs();
        let name = gdal_sys::OSRGetAuthorityName(handle, std::ptr::null());
        let code = gdal_sys::OSRGetAuthorityCode(handle, std::ptr::null());
        if name.is_null() || code.is_null() {
            return None;
        }
        Some((
            CStr::from_ptr(name).to_string_lossy().into_owned(),
            CStr::from_ptr(code).to_string_lossy().into_owned(),
        ))
    }
}

/// GDAL's 16-bit image checksum over the full band.
#[must_use]
pub fn checksum(band: &RasterBand) -> i32 {
    let (width, height) = band.size();
    let width = c_int::try_from(width).unwrap_or(c_int::MAX);
    let height = c_int::try_from(height).unwrap_or(c_int::MAX);
    // SAFETY: the band handle stays valid while `band` is borrowed.
    unsafe { gdal_sys::GDALChecksumImage(band.c_rasterband(), 0, 0, width, height) }
}

/// Turn the pending CPL error into a `GdalError`, clearing it.
fn last_cpl_error(class: CPLErr::Type) -> GdalError {
    // SAFETY: CPL keeps the last error per thread; the message is copied
    // before the reset invalidates it.
    unsafe {
        let number = gdal_sys::CPLGetLastErrorNo();
        let msg = CStr::from_ptr(gdal_sys::CPLGetLastErrorMsg())
            .to_string_lossy()
            .into_owned();
        gdal_sys::CPLErrorReset();
        GdalError::CplError { class, number, msg }
    }
}

fn check(rv: CPLErr::Type) -> Result<(), GdalError> {
    if rv == CPLErr::CE_None {
        Ok(())
    } else {
        Err(last_cpl_error(rv))
    }
}

/// Set the nodata value of an `Int64` band, which refuses the `f64` setter.
///
/// # Errors
///
/// Returns the CPL error raised by the driver.
pub fn set_nodata_int64(band: &RasterBand, value: i64) -> Result<(), GdalError> {
    // SAFETY: the band handle stays valid while `band` is borrowed.
    check(unsafe { gdal_sys::GDALSetRasterNoDataValueAsInt64(band.c_rasterband(), value) })
}

/// Set the nodata value of a `UInt64` band.
///
/// # Errors
///
/// Returns the CPL error raised by the driver.
pub fn set_nodata_uint64(band: &RasterBand, value: u64) -> Result<(), GdalError> {
    // SAFETY: the band handle stays valid while `band` is borrowed.
    check(unsafe { gdal_sys::GDALSetRasterNoDataValueAsUInt64(band.c_rasterband(), value) })
}

/// Interpolate the invalid pixels of `target` in place with `GDALFillNodata`.
///
/// Without `mask`, validity comes from the band's own nodata mask.
///
/// # Errors
///
/// Returns the CPL error raised by the algorithm.
pub fn fill_nodata(
    target: &RasterBand,
    mask: Option<&RasterBand>,
    max_search_distance: f64,
    smoothing_iterations: u32,
) -> Result<(), GdalError> {
    let smoothing = c_int::try_from(smoothing_iterations).unwrap_or(c_int::MAX);
    // SAFETY: both handles outlive the call; no options or progress callback.
    check(unsafe {
        let mask = match mask {
            Some(band) => band.c_rasterband(),
            None => ptr::null_mut(),
        };
        gdal_sys::GDALFillNodata(
            target.c_rasterband(),
            mask,
            max_search_distance,
            0,
            smoothing,
            ptr::null_mut(),
            None,
            ptr::null_mut(),
        )
    })
}

/// Remove connected regions smaller than `threshold` pixels from `src` into
/// `dst` with `GDALSieveFilter`. `connectedness` is 4 or 8.
///
/// # Errors
///
/// Returns the CPL error raised by the algorithm.
pub fn sieve(
    src: &RasterBand,
    dst: &RasterBand,
    threshold: usize,
    connectedness: u8,
) -> Result<(), GdalError> {
    let threshold = c_int::try_from(threshold).unwrap_or(c_int::MAX);
    // SAFETY: both handles outlive the call; no mask, options or progress.
    check(unsafe {
        gdal_sys::GDALSieveFilter(
            src.c_rasterband(),
            ptr::null_mut(),
            dst.c_rasterband(),
            threshold,
            c_int::from(connectedness),
            ptr::null_mut(),
            None,
            ptr::null_mut(),
        )
    })
}
