/// Thin layer over the native GDAL library.
pub mod alg;
pub mod config;
pub mod drivers;
pub mod ffi;

pub use config::configure;
pub use drivers::{DriverInfo, raster_drivers, resolve_driver};
