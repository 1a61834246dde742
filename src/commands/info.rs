/// `info` command: print dataset metadata as JSON or a single member as text.
use std::collections::BTreeMap;

use gdal::Dataset;

use crate::cli::OutputCtx;
use crate::cli::args::{InfoArgs, MetaMember};
use crate::cli::output::{print_json, py_float};
use crate::raster::{RasterError, dataset};
use crate::types::{BandStatsOutput, InfoOutput};

/// Run `rasmeta info`.
///
/// # Errors
///
/// Returns `RasterError` when the dataset cannot be opened or read, or when
/// `--bidx` is out of range.
pub fn run(args: &InfoArgs, ctx: &OutputCtx) -> Result<(), RasterError> {
    let t_open = ctx.timer("open");
    let ds = dataset::open(&args.input)?;
    drop(t_open);

    let bidx = if args.reads_band() {
        dataset::check_bidx(&ds, args.bidx)?
    } else {
        args.bidx
    };

    if args.tags {
        let tags: BTreeMap<String, String> = dataset::tags(&ds, args.namespace.as_deref())
            .into_iter()
            .collect();
        return print_json(&tags, args.indent);
    }

    if let Some(member) = args.member() {
        let _t = ctx.timer("member");
        println!("{}", member_text(&ds, member, bidx)?);
        return Ok(());
    }

    let t_info = ctx.timer("summary");
    let mut info = summary(&ds)?;
    drop(t_info);

    if args.tell_me_more {
        let _t = ctx.timer("tell_me_more");
        let count = ds.raster_count();
        info.stats = Some(
            (1..=count)
                .map(|i| dataset::band_stats(&ds, i).map(BandStatsOutput::from))
                .collect::<Result<_, _>>()?,
        );
        info.checksum = Some(
            (1..=count)
                .map(|i| dataset::checksum(&ds, i))
                .collect::<Result<_, _>>()?,
        );
    }

    print_json(&info, args.indent)
}

/// Gather the full metadata summary.
///
/// # Errors
///
/// Returns `RasterError` if band 1 cannot be read or its type is unsupported.
pub fn summary(ds: &Dataset) -> Result<InfoOutput, RasterError> {
    let (width, height) = ds.raster_size();
    let affine = dataset::affine(ds);
    let structure = dataset::structure(ds)?;
    let (xres, yres) = affine.res();

    Ok(InfoOutput {
        driver: ds.driver().short_name(),
        dtype: dataset::dtype(ds)?.name().to_owned(),
        nodata: dataset::nodata(ds)?,
        width,
        height,
        count: ds.raster_count(),
        crs: dataset::crs_string(ds),
        transform: affine.to_array(),
        shape: [height, width],
        bounds: affine.bounds(width, height).to_array(),
        res: [xres, yres],
        lnglat: dataset::lnglat(ds)?.map(|(lng, lat)| [lng, lat]),
        blockxsize: structure.block_size.0,
        blockysize: structure.block_size.1,
        tiled: structure.tiled(width),
        interleave: structure.interleave,
        compress: structure.compress,
        stats: None,
        checksum: None,
    })
}

/// Render one member the way Python's `str` prints it; sequences are
/// space-joined and a missing value is an empty line.
fn member_text(ds: &Dataset, member: MetaMember, bidx: usize) -> Result<String, RasterError> {
    let (width, height) = ds.raster_size();
    let text = match member {
        MetaMember::Count => ds.raster_count().to_string(),
        MetaMember::Dtype => dataset::dtype(ds)?.name().to_owned(),
        MetaMember::Nodata => dataset::nodata(ds)?.map(py_float).unwrap_or_default(),
        MetaMember::Driver => ds.driver().short_name(),
        MetaMember::Shape => format!("{height} {width}"),
        MetaMember::Height => height.to_string(),
        MetaMember::Width => width.to_string(),
        MetaMember::Crs => dataset::crs_string(ds).unwrap_or_default(),
        MetaMember::Bounds => join_floats(&dataset::bounds(ds).to_array()),
        MetaMember::Res => {
            let (x, y) = dataset::affine(ds).res();
            join_floats(&[x, y])
        }
        MetaMember::Lnglat => dataset::lnglat(ds)?
            .map(|(lng, lat)| join_floats(&[lng, lat]))
            .unwrap_or_default(),
        MetaMember::Stats => {
            let s = dataset::band_stats(ds, bidx)?;
            format!("{} {} {}", percent_f(s.min), percent_f(s.max), percent_f(s.mean))
        }
        MetaMember::Checksum => dataset::checksum(ds, bidx)?.to_string(),
    };
    Ok(text)
}

fn join_floats(values: &[f64]) -> String {
    values.iter().map(|&v| py_float(v)).collect::<Vec<_>>().join(" ")
}

/// Python's `"%f" % v`.
fn percent_f(v: f64) -> String {
    if v.is_nan() {
        "nan".to_owned()
    } else if v.is_infinite() {
        py_float(v)
    } else {
        format!("{v:.6}")
    }
}
