//! Text encodings of a finished temperature grid.

use crate::error::{InputError, SimError};
use crate::grid::{Dimensions, Grid};
use crate::hotspot::Coordinate;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Values above this render as [`HeatToken::Saturated`].
pub const SATURATION_THRESHOLD: f64 = 0.9;
/// Upward bias added before bucketing into tenths.
pub const BUCKET_BIAS: f64 = 0.09;

/// One quantized cell of the dense heatmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeatToken {
    Saturated,
    Bucket(i64),
}

impl fmt::Display for HeatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatToken::Saturated => f.write_char('X'),
            HeatToken::Bucket(n) => write!(f, "{n}"),
        }
    }
}

/// `X` above 0.9, otherwise `floor((v + 0.09) * 10)`.
pub fn quantize(value: f32) -> HeatToken {
    let v = f64::from(value);
    if v > SATURATION_THRESHOLD {
        HeatToken::Saturated
    } else {
        HeatToken::Bucket(((v + BUCKET_BIAS) * 10.0).floor() as i64)
    }
}

/// How the final grid is reported; chosen once per run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", content = "coordinates", rename_all = "lowercase")]
pub enum OutputMode {
    Dense,
    Sparse(Vec<Coordinate>),
}

impl OutputMode {
    pub fn from_coordinates(coords: Option<Vec<Coordinate>>) -> OutputMode {
        match coords {
            Some(c) => OutputMode::Sparse(c),
            None => OutputMode::Dense,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputMode::Dense => "dense",
            OutputMode::Sparse(_) => "sparse",
        }
    }

    /// Sparse coordinates must all address cells of `dims`.
    pub fn validate(&self, dims: Dimensions) -> Result<(), InputError> {
        if let OutputMode::Sparse(coords) = self {
            for c in coords {
                dims.check(c.x, c.y)?;
            }
        }
        Ok(())
    }

    pub fn encode(&self, grid: &Grid<f32>) -> Result<String, InputError> {
        match self {
            OutputMode::Dense => Ok(encode_dense(grid)),
            OutputMode::Sparse(coords) => encode_sparse(grid, coords),
        }
    }
}

/// One line per row, tokens concatenated.
pub fn encode_dense(grid: &Grid<f32>) -> String {
    let mut out = String::with_capacity(grid.len() + grid.dims().height());
    for row in grid.rows() {
        for &v in row {
            let _ = write!(out, "{}", quantize(v));
        }
        out.push('\n');
    }
    out
}

/// Unquantized values at `coords`, in request order.
pub fn sample_values(grid: &Grid<f32>, coords: &[Coordinate]) -> Result<Vec<f32>, InputError> {
    let dims = grid.dims();
    coords
        .iter()
        .map(|c| dims.check(c.x, c.y).map(|idx| grid.as_slice()[idx]))
        .collect()
}

/// Raw values at `coords`, in order, one per line.
pub fn encode_sparse(grid: &Grid<f32>, coords: &[Coordinate]) -> Result<String, InputError> {
    let mut out = String::new();
    for v in sample_values(grid, coords)? {
        out.push_str(&format_general(f64::from(v)));
        out.push('\n');
    }
    Ok(out)
}

/// Console rendering: every token followed by a space.
pub fn render_preview(grid: &Grid<f32>) -> String {
    let mut out = String::new();
    for row in grid.rows() {
        for &v in row {
            let _ = write!(out, "{} ", quantize(v));
        }
        out.push('\n');
    }
    out
}

/// Formats like C's `%g`: six significant digits, trailing zeros dropped,
/// scientific notation for exponents below -4 or from 6 up.
pub fn format_general(value: f64) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "inf" } else { "-inf" });
    }
    if value == 0.0 {
        return String::from(if value.is_sign_negative() { "-0" } else { "0" });
    }

    let sci = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Replaces whatever is at `path` with the encoded grid. Coordinates are
/// checked before anything is written, and the text goes to a sibling
/// temporary file that is renamed over `path` only once fully written, so a
/// failed write never leaves a truncated artifact.
pub fn write_output(path: &Path, grid: &Grid<f32>, mode: &OutputMode) -> Result<(), SimError> {
    let text = mode.encode(grid)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| SimError::Io(e.error))?;
    debug!(path = %path.display(), mode = mode.name(), bytes = text.len(), "wrote output");
    Ok(())
}
