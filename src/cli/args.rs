/// CLI argument definitions via clap derive.
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::raster::DataType;

/// rasmeta: inspect and edit raster dataset metadata.
#[derive(Debug, Parser)]
#[command(
    name = "rasmeta",
    about = "Inspect and edit raster dataset metadata from the CLI",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Decrease verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Output format for listings and errors. Auto-detects: table when TTY,
    /// text when piped.
    #[arg(long, global = true, value_name = "FORMAT", default_value = "auto")]
    pub output: OutputFormat,

    /// Shorthand for --output json.
    #[arg(long, global = true, conflicts_with = "output")]
    pub json: bool,

    /// Omit table headers (useful for awk/cut processing).
    #[arg(long, global = true)]
    pub no_header: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Net verbosity: `-v` count minus `-q` count.
    #[must_use]
    pub fn verbosity(&self) -> i8 {
        let v = i8::try_from(self.verbose).unwrap_or(i8::MAX);
        let q = i8::try_from(self.quiet).unwrap_or(i8::MAX);
        v.saturating_sub(q)
    }
}

/// Output format variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Auto-detect: table when stdout is a TTY, text when piped.
    #[default]
    Auto,
    /// JSON (Python `json.dumps` layout).
    Json,
    /// Plain text, one record per line.
    Text,
    /// Aligned table with headers (human-readable).
    Table,
}

/// All subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print information about a raster dataset.
    Info(InfoArgs),
    /// Edit nodata, CRS, transform and tags of a dataset in place.
    Edit(EditArgs),
    /// Print information about the GDAL environment.
    Env(EnvArgs),
    /// Evaluate a band-math expression and write the result.
    Calc(CalcArgs),
}

/// A single metadata member selected by one of the `info` member flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaMember {
    Count,
    Dtype,
    Nodata,
    Driver,
    Shape,
    Height,
    Width,
    Crs,
    Bounds,
    Res,
    Lnglat,
    Stats,
    Checksum,
}

/// Arguments for `rasmeta info`.
#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input raster dataset.
    pub input: PathBuf,

    /// Print the band count.
    #[arg(long, group = "member")]
    pub count: bool,

    /// Print the data type of band 1.
    #[arg(long, group = "member")]
    pub dtype: bool,

    /// Print the nodata value.
    #[arg(long, group = "member")]
    pub nodata: bool,

    /// Print the format driver.
    #[arg(short = 'f', long = "format", visible_alias = "driver", group = "member")]
    pub driver: bool,

    /// Print the (height, width) shape.
    #[arg(long, group = "member")]
    pub shape: bool,

    /// Print the height in pixels.
    #[arg(long, group = "member")]
    pub height: bool,

    /// Print the width in pixels.
    #[arg(long, group = "member")]
    pub width: bool,

    /// Print the CRS.
    #[arg(long, group = "member")]
    pub crs: bool,

    /// Print the bounds as "left bottom right top".
    #[arg(long, group = "member")]
    pub bounds: bool,

    /// Print the pixel size as "x y".
    #[arg(short = 'r', long, group = "member")]
    pub res: bool,

    /// Print the longitude and latitude of the dataset center.
    #[arg(long, group = "member")]
    pub lnglat: bool,

    /// Print min, max and mean of band `--bidx`.
    #[arg(long, group = "member")]
    pub stats: bool,

    /// Print the checksum of band `--bidx`.
    #[arg(long, group = "member")]
    pub checksum: bool,

    /// Band index (1-based) for --stats and --checksum.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub bidx: usize,

    /// Print the tags of a namespace as JSON.
    #[arg(long, conflicts_with = "member")]
    pub tags: bool,

    /// Metadata namespace for --tags.
    #[arg(long, value_name = "NS")]
    pub namespace: Option<String>,

    /// Indentation level for JSON output.
    #[arg(long, value_name = "N")]
    pub indent: Option<usize>,

    /// Add per-band statistics and checksums to the JSON output.
    #[arg(short = 'v', long = "tell-me-more", visible_alias = "verbose")]
    pub tell_me_more: bool,
}

impl InfoArgs {
    /// The member flag given, if any. Clap guarantees at most one.
    #[must_use]
    pub fn member(&self) -> Option<MetaMember> {
        [
            (self.count, MetaMember::Count),
            (self.dtype, MetaMember::Dtype),
            (self.nodata, MetaMember::Nodata),
            (self.driver, MetaMember::Driver),
            (self.shape, MetaMember::Shape),
            (self.height, MetaMember::Height),
            (self.width, MetaMember::Width),
            (self.crs, MetaMember::Crs),
            (self.bounds, MetaMember::Bounds),
            (self.res, MetaMember::Res),
            (self.lnglat, MetaMember::Lnglat),
            (self.stats, MetaMember::Stats),
            (self.checksum, MetaMember::Checksum),
        ]
        .into_iter()
        .find_map(|(set, member)| set.then_some(member))
    }

    /// Whether `--bidx` selects a band that will be read.
    #[must_use]
    pub fn reads_band(&self) -> bool {
        self.tell_me_more || matches!(self.member(), Some(MetaMember::Stats | MetaMember::Checksum))
    }
}

/// Arguments for `rasmeta edit`.
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Raster dataset to edit in place.
    pub input: PathBuf,

    /// New nodata value for all bands.
    #[arg(long, value_name = "NUMBER", allow_hyphen_values = true)]
    pub nodata: Option<String>,

    /// Remove the nodata value.
    #[arg(long, conflicts_with = "nodata")]
    pub unset_nodata: bool,

    /// New CRS: authority code, PROJ string, JSON object or WKT.
    #[arg(long, value_name = "CRS", allow_hyphen_values = true)]
    pub crs: Option<String>,

    /// Remove the CRS.
    #[arg(long, conflicts_with = "crs")]
    pub unset_crs: bool,

    /// New affine transform as a JSON array of six numbers, native or GDAL order.
    #[arg(long, value_name = "JSON", allow_hyphen_values = true)]
    pub transform: Option<String>,

    /// Set a tag (repeatable).
    #[arg(long = "tag", value_name = "KEY=VAL", action = ArgAction::Append)]
    pub tags: Vec<String>,
}

/// Arguments for `rasmeta env`.
#[derive(Debug, Args)]
pub struct EnvArgs {
    /// List registered raster format drivers.
    #[arg(long)]
    pub formats: bool,
}

/// Output pixel types accepted by `calc --dtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum CalcDtype {
    Ubyte,
    Uint8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    #[default]
    Float64,
}

impl From<CalcDtype> for DataType {
    fn from(d: CalcDtype) -> Self {
        match d {
            CalcDtype::Ubyte | CalcDtype::Uint8 => Self::UInt8,
            CalcDtype::Uint16 => Self::UInt16,
            CalcDtype::Int16 => Self::Int16,
            CalcDtype::Uint32 => Self::UInt32,
            CalcDtype::Int32 => Self::Int32,
            CalcDtype::Float32 => Self::Float32,
            CalcDtype::Float64 => Self::Float64,
        }
    }
}

/// Arguments for `rasmeta calc`.
#[derive(Debug, Args)]
pub struct CalcArgs {
    /// Expression, e.g. "(+ 2 (* 0.95 (read 1)))".
    pub command: String,

    /// Input datasets followed by the output path.
    #[arg(value_name = "INPUTS... OUTPUT", num_args = 1.., required = true)]
    pub files: Vec<PathBuf>,

    /// Named input, e.g. `--name a=tests/data/RGB.byte.tif` (repeatable).
    #[arg(long = "name", value_name = "NAME=PATH", action = ArgAction::Append)]
    pub names: Vec<String>,

    /// Output pixel type.
    #[arg(long, value_enum, default_value_t = CalcDtype::Float64)]
    pub dtype: CalcDtype,

    /// Output format driver (default: the first input's driver).
    #[arg(short = 'f', long = "format", visible_alias = "driver")]
    pub driver: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("rasmeta").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_is_net_count() {
        assert_eq!(parse(&["-vv", "env"]).unwrap().verbosity(), 2);
        assert_eq!(parse(&["-v", "-qq", "env"]).unwrap().verbosity(), -1);
    }

    #[test]
    fn test_info_members_are_exclusive() {
        assert!(parse(&["info", "a.tif", "--count", "--bounds"]).is_err());
        assert!(parse(&["info", "a.tif", "--count", "--tags"]).is_err());
        let cli = parse(&["info", "a.tif", "-r"]).unwrap();
        let Command::Info(args) = cli.command else {
            panic!("expected info");
        };
        assert_eq!(args.member(), Some(MetaMember::Res));
    }

    #[test]
    fn test_info_reads_band_only_for_band_members() {
        let info = |argv: &[&str]| match parse(argv).unwrap().command {
            Command::Info(args) => args,
            _ => panic!("expected info"),
        };
        assert!(!info(&["info", "a.tif", "--count", "--bidx", "9"]).reads_band());
        assert!(!info(&["info", "a.tif"]).reads_band());
        assert!(info(&["info", "a.tif", "--stats"]).reads_band());
        assert!(info(&["info", "a.tif", "--checksum"]).reads_band());
        assert!(info(&["info", "a.tif", "--tell-me-more"]).reads_band());
    }

    #[test]
    fn test_info_verbose_is_tell_me_more() {
        let cli = parse(&["info", "a.tif", "-v"]).unwrap();
        assert_eq!(cli.verbosity(), 0);
        let Command::Info(args) = cli.command else {
            panic!("expected info");
        };
        assert!(args.tell_me_more);
    }

    #[test]
    fn test_edit_accepts_negative_values() {
        let cli = parse(&["edit", "a.tif", "--nodata", "-1", "--tag", "a=1", "--tag", "b=2"]).unwrap();
        let Command::Edit(args) = cli.command else {
            panic!("expected edit");
        };
        assert_eq!(args.nodata.as_deref(), Some("-1"));
        assert_eq!(args.tags.len(), 2);
    }

    #[test]
    fn test_edit_unset_conflicts_with_set() {
        assert!(parse(&["edit", "a.tif", "--nodata", "0", "--unset-nodata"]).is_err());
        assert!(parse(&["edit", "a.tif", "--crs", "EPSG:4326", "--unset-crs"]).is_err());
    }

    #[test]
    fn test_calc_defaults() {
        let cli = parse(&["calc", "(read 1)", "in.tif", "out.tif"]).unwrap();
        let Command::Calc(args) = cli.command else {
            panic!("expected calc");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.dtype, CalcDtype::Float64);
        assert_eq!(args.driver, None);
        assert_eq!(DataType::from(CalcDtype::Ubyte), DataType::UInt8);
    }
}
