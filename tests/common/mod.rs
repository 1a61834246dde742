//! Shared fixtures for CLI integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use gdal::raster::{Buffer, GdalType};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use tempfile::TempDir;

pub const WIDTH: usize = 512;
pub const HEIGHT: usize = 512;

/// GDAL-ordered transform whose extent is 101985..339315 x 2611485..2826915.
pub const GEO_TRANSFORM: [f64; 6] = [101_985.0, 463.535_156_25, 0.0, 2_826_915.0, 0.0, -420.761_718_75];

pub fn rasmeta() -> Command {
    Command::cargo_bin("rasmeta").expect("Failed to find rasmeta binary")
}

/// A temporary directory holding a freshly written 3-band `uint8` GeoTIFF in
/// UTM zone 18N with nodata 0 and no explicit tags.
///
/// Every row of every band holds `x % 256`, so the valid (non-zero) pixels of
/// each band have min 1, max 255 and mean 128.
pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    pub fn rgb_byte() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("RGB.byte.tif");
        write_rgb_byte(&path)?;
        Ok(Self { dir, path })
    }

    /// A 4x4 single-band GeoTIFF of pixel type `T` filled with `value`.
    pub fn single_band<T: GdalType + Copy>(name: &str, value: T) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(name);
        DriverManager::register_all();
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let ds = driver.create_with_band_type::<T, _>(&path, 4, 4, 1)?;
        let mut buffer = Buffer::new((4, 4), vec![value; 16]);
        ds.rasterband(1)?.write((0, 0), (4, 4), &mut buffer)?;
        drop(ds);
        Ok(Self { dir, path })
    }

    pub fn path_str(&self) -> &str {
        self.path.to_str().expect("temp path is UTF-8")
    }

    /// A path next to the fixture that does not exist yet.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn open(&self) -> anyhow::Result<Dataset> {
        Ok(Dataset::open(&self.path)?)
    }
}

fn write_rgb_byte(path: &Path) -> anyhow::Result<()> {
    DriverManager::register_all();
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver.create_with_band_type::<u8, _>(path, WIDTH, HEIGHT, 3)?;
    ds.set_geo_transform(&GEO_TRANSFORM)?;
    ds.set_spatial_ref(&SpatialRef::from_epsg(32618)?)?;

    let row: Vec<u8> = (0..WIDTH).map(|x| (x % 256) as u8).collect();
    let data: Vec<u8> = row.iter().copied().cycle().take(WIDTH * HEIGHT).collect();
    for bidx in 1..=3 {
        let mut band = ds.rasterband(bidx)?;
        let mut buffer = Buffer::new((WIDTH, HEIGHT), data.clone());
        band.write((0, 0), (WIDTH, HEIGHT), &mut buffer)?;
        band.set_no_data_value(Some(0.0))?;
    }
    Ok(())
}
