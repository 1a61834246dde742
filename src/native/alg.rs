/// GDAL raster algorithms applied to in-memory arrays through `MEM` datasets.
use gdal::errors::GdalError;
use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager};
use ndarray::{Array2, ArrayView2};

use super::ffi;
use crate::raster::dtype::FromF64;

/// One-band `MEM` dataset holding `data` cast to `T`.
fn mem_band<T: FromF64>(data: ArrayView2<'_, f64>) -> Result<Dataset, GdalError> {
    let (rows, cols) = data.dim();
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let ds = driver.create_with_band_type::<T, _>("", cols, rows, 1)?;
    let values: Vec<T> = data.iter().map(|&v| T::from_f64(v)).collect();
    let mut buffer = Buffer::new((cols, rows), values);
    ds.rasterband(1)?.write((0, 0), (cols, rows), &mut buffer)?;
    Ok(ds)
}

fn read_band(ds: &Dataset, rows: usize, cols: usize) -> Result<Array2<f64>, GdalError> {
    let buffer = ds.rasterband(1)?.read_band_as::<f64>()?;
    Array2::from_shape_vec((rows, cols), buffer.data().to_vec())
        .map_err(|e| GdalError::BadArgument(e.to_string()))
}

/// Fill invalid pixels of `image` by inverse-distance interpolation.
///
/// A non-zero `mask` pixel is valid, zero is to be filled. Without a mask the
/// `NaN` pixels are filled.
///
/// # Errors
///
/// Returns `GdalError` if the `MEM` driver is missing or the algorithm fails.
pub fn fill_nodata(
    image: ArrayView2<'_, f64>,
    mask: Option<ArrayView2<'_, f64>>,
    max_search_distance: f64,
    smoothing_iterations: u32,
) -> Result<Array2<f64>, GdalError> {
    let (rows, cols) = image.dim();
    let target = mem_band::<f64>(image)?;
    let mut band = target.rasterband(1)?;

    let mask_ds = match mask {
        Some(m) => Some(mem_band::<u8>(m.mapv(|v| if v == 0.0 { 0.0 } else { 1.0 }).view())?),
        None => {
            band.set_no_data_value(Some(f64::NAN))?;
            None
        }
    };
    let mask_band = mask_ds.as_ref().map(|ds| ds.rasterband(1)).transpose()?;

    ffi::fill_nodata(&band, mask_band.as_ref(), max_search_distance, smoothing_iterations)?;
    read_band(&target, rows, cols)
}

/// Replace connected regions smaller than `size` pixels with their largest
/// neighbour. Values are truncated to `i32` first.
///
/// # Errors
///
/// Returns `GdalError` if the `MEM` driver is missing or the algorithm fails.
pub fn sieve(
    image: ArrayView2<'_, f64>,
    size: usize,
    connectedness: u8,
) -> Result<Array2<f64>, GdalError> {
    let (rows, cols) = image.dim();
    let src = mem_band::<i32>(image)?;
    let dst = mem_band::<i32>(image)?;
    ffi::sieve(&src.rasterband(1)?, &dst.rasterband(1)?, size, connectedness)?;
    read_band(&dst, rows, cols)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn register() {
        DriverManager::register_all();
    }

    #[test]
    fn test_fill_nan_holes() {
        register();
        let image = array![[1.0, 1.0, 1.0], [1.0, f64::NAN, 1.0], [1.0, 1.0, 1.0]];
        let filled = fill_nodata(image.view(), None, 10.0, 0).unwrap();
        assert!((filled[[1, 1]] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_with_mask() {
        register();
        let image = array![[2.0, 2.0, 2.0], [2.0, 99.0, 2.0], [2.0, 2.0, 2.0]];
        let mask = array![[1.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0]];
        let filled = fill_nodata(image.view(), Some(mask.view()), 10.0, 0).unwrap();
        assert!((filled[[1, 1]] - 2.0).abs() < 1e-9);
        assert_eq!(filled[[0, 0]], 2.0);
    }

    #[test]
    fn test_sieve_removes_single_pixel() {
        register();
        let image = array![[5.0, 5.0, 5.0], [5.0, 7.0, 5.0], [5.0, 5.0, 5.0]];
        let out = sieve(image.view(), 2, 4).unwrap();
        assert_eq!(out[[1, 1]], 5.0);
        assert_eq!(out.sum(), 45.0);
    }
}
