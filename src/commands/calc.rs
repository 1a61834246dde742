/// `calc` command: evaluate a band-math expression over input datasets and
/// write the result as a new dataset.
use std::path::{Path, PathBuf};

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, Driver, GeoTransform};
use ndarray::Array3;

use crate::calc::{self, CalcError, Input};
use crate::cli::OutputCtx;
use crate::cli::args::CalcArgs;
use crate::native::resolve_driver;
use crate::raster::dtype::FromF64;
use crate::raster::{DataType, RasterError, dataset};

/// Georeferencing copied from the first input onto the output.
struct Georef {
    transform: Option<GeoTransform>,
    srs: Option<SpatialRef>,
    nodata: Option<f64>,
}

/// Run `rasmeta calc`.
///
/// # Errors
///
/// Returns `RasterError::BadParameter` or `DriverNotFound` for bad options,
/// `RasterError::Calc` when the expression fails, and open/GDAL errors for
/// unreadable inputs or an unwritable output.
pub fn run(args: &CalcArgs, ctx: &OutputCtx) -> Result<(), RasterError> {
    let (output, sources) = inputs(args)?;
    let dtype = DataType::from(args.dtype);
    let mut driver = args.driver.as_deref().map(resolve_driver).transpose()?;

    let t_read = ctx.timer("read_inputs");
    let mut georef = None;
    let mut inputs = Vec::with_capacity(sources.len());
    for (name, path) in sources {
        let ds = dataset::open(&path)?;
        if georef.is_none() {
            if driver.is_none() {
                driver = Some(resolve_driver(&ds.driver().short_name())?);
            }
            georef = Some(Georef {
                transform: ds.geo_transform().ok(),
                srs: dataset::spatial_ref(&ds),
                nodata: dataset::nodata(&ds)?,
            });
        }
        inputs.push(Input {
            name,
            data: dataset::read_bands(&ds)?,
        });
    }
    drop(t_read);
    let (Some(georef), Some(driver)) = (georef, driver) else {
        return Err(no_inputs());
    };

    let t_eval = ctx.timer("evaluate");
    let bands = calc::into_bands(calc::evaluate(&args.command, &inputs)?)?;
    drop(t_eval);

    let first = inputs[0].data.shape();
    let (_, rows, cols) = bands.dim();
    if (rows, cols) != (first[1], first[2]) {
        return Err(CalcError::Shape {
            left: bands.shape().to_vec(),
            right: first.to_vec(),
        }
        .into());
    }

    let _t = ctx.timer("write_output");
    tracing::info!(
        output = %output.display(),
        driver = %driver.short_name(),
        dtype = dtype.name(),
        bands = bands.dim().0,
        "writing calc result"
    );
    match dtype {
        DataType::UInt8 => write_output::<u8>(&driver, &output, &bands, &georef, dtype),
        DataType::Int8 => write_output::<i8>(&driver, &output, &bands, &georef, dtype),
        DataType::UInt16 => write_output::<u16>(&driver, &output, &bands, &georef, dtype),
        DataType::Int16 => write_output::<i16>(&driver, &output, &bands, &georef, dtype),
        DataType::UInt32 => write_output::<u32>(&driver, &output, &bands, &georef, dtype),
        DataType::Int32 => write_output::<i32>(&driver, &output, &bands, &georef, dtype),
        DataType::UInt64 => write_output::<u64>(&driver, &output, &bands, &georef, dtype),
        DataType::Int64 => write_output::<i64>(&driver, &output, &bands, &georef, dtype),
        DataType::Float32 => write_output::<f32>(&driver, &output, &bands, &georef, dtype),
        DataType::Float64 => write_output::<f64>(&driver, &output, &bands, &georef, dtype),
    }
}

/// Split positional files into inputs and output; named inputs come first.
fn inputs(args: &CalcArgs) -> Result<(PathBuf, Vec<(Option<String>, PathBuf)>), RasterError> {
    let Some((output, positional)) = args.files.split_last() else {
        return Err(no_inputs());
    };

    let mut sources = args
        .names
        .iter()
        .map(|raw| parse_name(raw).map(|(n, p)| (Some(n), p)))
        .collect::<Result<Vec<_>, _>>()?;
    sources.extend(positional.iter().map(|p| (None, p.clone())));

    if sources.is_empty() {
        return Err(no_inputs());
    }
    Ok((output.clone(), sources))
}

/// Parse `--name NAME=PATH`. Names are alphabetic only.
fn parse_name(raw: &str) -> Result<(String, PathBuf), RasterError> {
    match raw.split_once('=') {
        Some((name, path))
            if !name.is_empty() && name.chars().all(char::is_alphabetic) && !path.is_empty() =>
        {
            Ok((name.to_owned(), PathBuf::from(path)))
        }
        _ => Err(RasterError::bad_parameter(
            "name",
            format!("'{raw}' is not a NAME=PATH pair with an alphabetic name"),
        )),
    }
}

fn no_inputs() -> RasterError {
    RasterError::bad_parameter("files", "at least one input dataset and an output path are required")
}

fn write_output<T: FromF64>(
    driver: &Driver,
    path: &Path,
    bands: &Array3<f64>,
    georef: &Georef,
    dtype: DataType,
) -> Result<(), RasterError> {
    let (count, rows, cols) = bands.dim();
    let mut ds: Dataset = driver.create_with_band_type::<T, _>(path, cols, rows, count)?;

    if let Some(gt) = &georef.transform {
        ds.set_geo_transform(gt)?;
    }
    if let Some(srs) = &georef.srs {
        ds.set_spatial_ref(srs)?;
    }
    let nodata = georef.nodata.filter(|&nd| dtype.contains(nd));

    for (i, values) in bands.outer_iter().enumerate() {
        let mut band = ds.rasterband(i + 1)?;
        let data: Vec<T> = values.iter().map(|&v| T::from_f64(v)).collect();
        let mut buffer = Buffer::new((cols, rows), data);
        band.write((0, 0), (cols, rows), &mut buffer)?;
        if nodata.is_some() {
            dataset::set_band_nodata(&mut band, nodata, dtype)?;
        }
    }
    Ok(())
}
