/// Raster domain layer: data types, CRS and transform normalization, dataset
/// metadata access.
pub mod crs;
pub mod dataset;
pub mod dtype;
pub mod errors;
pub mod transform;

pub use crs::CrsSpec;
pub use dataset::{BandStats, CrsEdit, MetadataEdit, NodataEdit};
pub use dtype::DataType;
pub use errors::RasterError;
pub use transform::parse_transform;
