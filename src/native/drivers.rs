/// Format driver enumeration and name resolution.
use gdal::{Driver, DriverManager, Metadata};
use nucleo_matcher::{
    Matcher, Utf32Str,
    pattern::{CaseMatching, Normalization, Pattern},
};

use crate::raster::RasterError;

/// Maximum number of "did you mean" candidates reported for an unknown driver.
const MAX_CANDIDATES: usize = 5;

/// A registered format driver.
#[derive(Debug, Clone)]
pub struct DriverInfo {
    /// Short name, e.g. `GTiff`.
    pub short_name: String,
    /// Long name, e.g. `GeoTIFF`.
    pub long_name: String,
    /// Whether the driver handles raster data.
    pub raster: bool,
    /// Whether the driver can create new datasets.
    pub create: bool,
}

/// All registered drivers, sorted by short name.
#[must_use]
pub fn list_drivers() -> Vec<DriverInfo> {
    let mut drivers: Vec<DriverInfo> = (0..DriverManager::count())
        .filter_map(|i| DriverManager::get_driver(i).ok())
        .map(|d| DriverInfo {
            short_name: d.short_name(),
            long_name: d.long_name(),
            raster: d.metadata_item("DCAP_RASTER", "").is_some(),
            create: d.metadata_item("DCAP_CREATE", "").is_some(),
        })
        .collect();
    drivers.sort_by(|a, b| a.short_name.cmp(&b.short_name));
    drivers
}

/// Registered drivers that handle raster data.
#[must_use]
pub fn raster_drivers() -> Vec<DriverInfo> {
    list_drivers().into_iter().filter(|d| d.raster).collect()
}

/// Resolve a driver name (case-insensitive) to a raster driver that can
/// create datasets.
///
/// # Errors
///
/// Returns `RasterError::DriverNotFound` with fuzzy candidates when nothing
/// matches exactly, or `RasterError::BadParameter` when the driver cannot
/// create raster datasets.
pub fn resolve_driver(name: &str) -> Result<Driver, RasterError> {
    let drivers = raster_drivers();
    let Some(info) = drivers
        .iter()
        .find(|d| d.short_name.eq_ignore_ascii_case(name))
    else {
        let names: Vec<String> = drivers.into_iter().map(|d| d.short_name).collect();
        return Err(RasterError::DriverNotFound {
            name: name.to_owned(),
            candidates: closest_names(&names, name, MAX_CANDIDATES),
        });
    };

    if !info.create {
        return Err(RasterError::bad_parameter(
            "driver",
            format!("driver '{}' cannot create new datasets", info.short_name),
        ));
    }

    Ok(DriverManager::get_driver_by_name(&info.short_name)?)
}

/// Fuzzy-rank `names` against `query`, best match first.
#[must_use]
pub fn closest_names(names: &[String], query: &str, limit: usize) -> Vec<String> {
    let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
    let mut matcher = Matcher::new(nucleo_matcher::Config::DEFAULT);

    let mut scored: Vec<(u32, &String)> = names
        .iter()
        .filter_map(|name| {
            let mut buf = Vec::new();
            let haystack = Utf32Str::new(name, &mut buf);
            pattern.score(haystack, &mut matcher).map(|score| (score, name))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(limit).map(|(_, n)| n.clone()).collect()
}
