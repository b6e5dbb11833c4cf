//! Integer tables: a header line followed by comma or whitespace separated rows.

use crate::error::{InputError, SimError};
use crate::hotspot::{Coordinate, Hotspot};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parses every row after the header into exactly `columns` non-negative integers.
/// Blank lines are skipped; anything else malformed is an error naming its line.
pub fn parse_table(text: &str, columns: usize) -> Result<Vec<Vec<u32>>, InputError> {
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate().skip(1) {
        let line_no = i + 1;
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != columns {
            return Err(InputError::Table {
                line: line_no,
                reason: format!("expected {columns} fields, found {}", fields.len()),
            });
        }
        let row = fields
            .iter()
            .map(|t| {
                t.parse::<u32>().map_err(|_| InputError::Table {
                    line: line_no,
                    reason: format!("`{t}` is not a non-negative integer"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Rows `x,y,startRound,endRound`.
pub fn parse_hotspots(text: &str) -> Result<Vec<Hotspot>, InputError> {
    Ok(parse_table(text, 4)?
        .into_iter()
        .map(|r| Hotspot::new(r[0], r[1], r[2], r[3]))
        .collect())
}

/// Rows `x,y`.
pub fn parse_coordinates(text: &str) -> Result<Vec<Coordinate>, InputError> {
    Ok(parse_table(text, 2)?
        .into_iter()
        .map(|r| Coordinate::new(r[0], r[1]))
        .collect())
}

pub fn read_hotspots(path: &Path) -> Result<Vec<Hotspot>, SimError> {
    let hotspots = parse_hotspots(&fs::read_to_string(path)?)?;
    debug!(path = %path.display(), rows = hotspots.len(), "read hotspot table");
    Ok(hotspots)
}

pub fn read_coordinates(path: &Path) -> Result<Vec<Coordinate>, SimError> {
    let coords = parse_coordinates(&fs::read_to_string(path)?)?;
    debug!(path = %path.display(), rows = coords.len(), "read coordinate table");
    Ok(coords)
}

/// Renders hotspots as a table `parse_hotspots` reads back.
pub fn format_hotspots(hotspots: &[Hotspot]) -> String {
    let mut out = String::from("x,y,startround,endround\n");
    for h in hotspots {
        out.push_str(&format!(
            "{},{},{},{}\n",
            h.x, h.y, h.start_round, h.end_round
        ));
    }
    out
}
