/// Output formatting: Python-compatible JSON, plain text, tables. TTY detection.
use std::io::{self, IsTerminal, Write};

use comfy_table::{Table, presets::UTF8_BORDERS_ONLY};
use serde::Serialize;
use serde_json::ser::Formatter;

use super::args::OutputFormat;
use crate::raster::RasterError;
use crate::types::{DriverOutput, EnvOutput, ErrorOutput};

/// Resolve the effective output format, handling `--json` flag and TTY auto-detection.
#[must_use]
pub fn resolve_format(fmt: OutputFormat, json_flag: bool) -> OutputFormat {
    if json_flag {
        return OutputFormat::Json;
    }
    if fmt == OutputFormat::Auto {
        if io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Text
        }
    } else {
        fmt
    }
}

/// Output context passed to all formatters.
pub struct OutputCtx {
    pub format: OutputFormat,
    pub no_header: bool,
}

impl OutputCtx {
    /// Construct from CLI args.
    #[must_use]
    pub fn new(fmt: OutputFormat, json_flag: bool, no_header: bool) -> Self {
        Self {
            format: resolve_format(fmt, json_flag),
            no_header,
        }
    }

    /// Start a named timer that logs its elapsed time at debug level on drop.
    #[must_use]
    pub fn timer(&self, label: &'static str) -> DebugTimer {
        DebugTimer::new(label)
    }
}

// --- Python-compatible JSON ---

/// Format a float the way Python's `repr`/`str` does.
///
/// Integral values keep a trailing `.0`; magnitudes from `1e16` up or below
/// `1e-4` use exponent notation with a signed, two-digit exponent.
#[must_use]
pub fn py_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_owned();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let s = format!("{v:e}");
        let (mantissa, exp) = s.split_once('e').unwrap_or((s.as_str(), "0"));
        let (sign, digits) = match exp.strip_prefix('-') {
            Some(d) => ('-', d),
            None => ('+', exp),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    let s = v.to_string();
    if s.contains('.') { s } else { format!("{s}.0") }
}

/// A `serde_json` formatter producing Python `json.dumps` layout:
/// `", "` and `": "` separators, or newline-separated items with `indent`.
pub struct PyFormatter {
    indent: Option<Vec<u8>>,
    level: usize,
    has_value: bool,
}

impl PyFormatter {
    #[must_use]
    pub fn new(indent: Option<usize>) -> Self {
        Self {
            indent: indent.map(|n| vec![b' '; n]),
            level: 0,
            has_value: false,
        }
    }

    fn newline<W: ?Sized + Write>(&self, writer: &mut W) -> io::Result<()> {
        if let Some(indent) = &self.indent {
            writer.write_all(b"\n")?;
            for _ in 0..self.level {
                writer.write_all(indent)?;
            }
        }
        Ok(())
    }

    fn open<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        writer.write_all(bracket)
    }

    fn close<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.level -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(bracket)
    }

    fn item<W: ?Sized + Write>(&self, writer: &mut W, first: bool) -> io::Result<()> {
        match (&self.indent, first) {
            (None, true) => Ok(()),
            (None, false) => writer.write_all(b", "),
            (Some(_), first) => {
                if !first {
                    writer.write_all(b",")?;
                }
                self.newline(writer)
            }
        }
    }
}

impl Formatter for PyFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"[")
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.item(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"{")
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.item(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    /// Non-ASCII characters become `\uXXXX` escapes (surrogate pairs above
    /// the BMP), as with Python's `ensure_ascii`.
    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn write_f64<W: ?Sized + Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(py_float(value).as_bytes())
    }

    fn write_f32<W: ?Sized + Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        self.write_f64(writer, f64::from(value))
    }
}

/// Serialize with sorted keys and Python layout.
///
/// # Errors
///
/// Returns `serde_json::Error` if `value` cannot be represented as JSON.
pub fn to_py_json<T: Serialize + ?Sized>(value: &T, indent: Option<usize>) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PyFormatter::new(indent));
    value.serialize(&mut ser)?;
    // Only UTF-8 is ever written.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Print `value` as one JSON document on stdout.
///
/// # Errors
///
/// Returns `RasterError::Json` on serialization failure.
pub fn print_json<T: Serialize + ?Sized>(value: &T, indent: Option<usize>) -> Result<(), RasterError> {
    println!("{}", to_py_json(value, indent)?);
    Ok(())
}

// --- Drivers ---

/// Write the driver list to stdout.
///
/// # Errors
///
/// Returns `RasterError::Json` on serialization failure.
pub fn write_drivers(drivers: &[DriverOutput], ctx: &OutputCtx) -> Result<(), RasterError> {
    match ctx.format {
        OutputFormat::Json => print_json(drivers, None)?,
        OutputFormat::Text => {
            for d in drivers {
                println!("{}: {}", d.short_name, d.long_name);
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            if !ctx.no_header {
                table.set_header(["DRIVER", "NAME", "CREATE"]);
            }
            for d in drivers {
                table.add_row([
                    d.short_name.as_str(),
                    d.long_name.as_str(),
                    if d.create { "yes" } else { "no" },
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

// --- Environment summary ---

/// Write the environment summary to stdout.
///
/// # Errors
///
/// Returns `RasterError::Json` on serialization failure.
pub fn write_env(env: &EnvOutput, ctx: &OutputCtx) -> Result<(), RasterError> {
    let rows = [
        ("gdal_release", env.gdal_release.clone()),
        ("gdal_version", env.gdal_version.clone()),
        ("raster_drivers", env.raster_drivers.to_string()),
        ("creatable_drivers", env.creatable_drivers.to_string()),
        ("cpl_debug", env.cpl_debug.to_string()),
    ];
    match ctx.format {
        OutputFormat::Json => print_json(env, None)?,
        OutputFormat::Text => {
            for (key, value) in rows {
                println!("{key}: {value}");
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            if !ctx.no_header {
                table.set_header(["KEY", "VALUE"]);
            }
            for (key, value) in rows {
                table.add_row([key, value.as_str()]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

// --- Error output ---

/// Write a structured error to stderr.
pub fn write_error(err: &ErrorOutput, format: OutputFormat, json_flag: bool) {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    if json_flag || format == OutputFormat::Json {
        let s = to_py_json(err, Some(2)).unwrap_or_default();
        let _ = writeln!(out, "{s}");
        return;
    }
    let _ = writeln!(out, "Error: {}", err.error.message);
    if let Some(candidates) = &err.error.candidates {
        let _ = writeln!(out, "  Candidates:");
        for c in candidates {
            let _ = writeln!(out, "    {c}");
        }
    }
}

// --- Debug timer ---

/// A RAII timer that logs elapsed milliseconds at debug level on drop.
///
/// Created via [`OutputCtx::timer`].
pub struct DebugTimer {
    label: &'static str,
    start: std::time::Instant,
}

impl DebugTimer {
    #[must_use]
    fn new(label: &'static str) -> Self {
        Self {
            label,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for DebugTimer {
    fn drop(&mut self) {
        let ms = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(label = self.label, elapsed_ms = format_args!("{ms:.2}"), "timing");
    }
}
