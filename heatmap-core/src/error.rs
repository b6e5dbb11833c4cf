//! Error types for loading, simulating and encoding a heatmap run.

use std::fmt;
use std::io;

/// Rejected input: malformed tables, bad dimensions or coordinates outside the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// A table row could not be parsed.
    Table {
        /// 1-based line number in the source text.
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },
    /// A coordinate does not address a cell of the grid.
    OutOfBounds {
        x: u32,
        y: u32,
        width: usize,
        height: usize,
    },
    /// Width or height is zero.
    InvalidDimensions { width: usize, height: usize },
    /// A numeric parameter is outside its accepted range.
    InvalidParameter { name: &'static str, reason: String },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { line, reason } => write!(f, "line {line}: {reason}"),
            Self::OutOfBounds {
                x,
                y,
                width,
                height,
            } => write!(f, "coordinate ({x}, {y}) outside {width}x{height} grid"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "grid dimensions must be positive, got {width}x{height}")
            }
            Self::InvalidParameter { name, reason } => write!(f, "invalid {name}: {reason}"),
        }
    }
}

impl std::error::Error for InputError {}

/// Failure reported by an update kernel for a single round.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    /// One of the grids handed to the kernel has the wrong number of cells.
    ShapeMismatch {
        grid: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The backend could not execute the update.
    ExecutionFailed { reason: String },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch {
                grid,
                expected,
                actual,
            } => write!(f, "{grid} grid has {actual} cells, expected {expected}"),
            Self::ExecutionFailed { reason } => write!(f, "kernel execution failed: {reason}"),
        }
    }
}

impl std::error::Error for KernelError {}

/// Top-level error of a simulation run. Every variant is fatal.
#[derive(Debug)]
pub enum SimError {
    Input(InputError),
    /// Buffers or a compute backend could not be acquired.
    Resource { reason: String },
    /// The update for `round` failed; no result is produced.
    Kernel { round: u32, source: KernelError },
    /// The simulation already failed and cannot continue.
    Aborted,
    Io(io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "invalid input: {e}"),
            Self::Resource { reason } => write!(f, "resource acquisition failed: {reason}"),
            Self::Kernel { round, source } => write!(f, "round {round} failed: {source}"),
            Self::Aborted => write!(f, "simulation was aborted by an earlier failure"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Input(e) => Some(e),
            Self::Kernel { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            Self::Resource { .. } | Self::Aborted => None,
        }
    }
}

impl From<InputError> for SimError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<io::Error> for SimError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn kernel_error_is_source_of_sim_error() {
        let err = SimError::Kernel {
            round: 3,
            source: KernelError::ExecutionFailed {
                reason: "boom".into(),
            },
        };
        assert_eq!(err.to_string(), "round 3 failed: kernel execution failed: boom");
        assert!(err.source().is_some());
    }

    #[test]
    fn out_of_bounds_message_names_grid() {
        let err = InputError::OutOfBounds {
            x: 5,
            y: 1,
            width: 4,
            height: 2,
        };
        assert_eq!(err.to_string(), "coordinate (5, 1) outside 4x2 grid");
    }
}
