//! Flat row-major 2-D grids.

use crate::error::{InputError, SimError};
use serde::{Deserialize, Serialize};

/// Size of the widest cell type stored in a grid (`f32` temperatures, `u32` rounds).
const CELL_BYTES: usize = 4;

/// Width and height of the simulated area, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    width: usize,
    height: usize,
}

impl Dimensions {
    /// Rejects empty grids and cell counts that do not fit in memory addressing.
    pub fn new(width: usize, height: usize) -> Result<Dimensions, SimError> {
        if width == 0 || height == 0 {
            return Err(InputError::InvalidDimensions { width, height }.into());
        }
        // Every grid stores 4-byte cells; the largest buffer must fit `isize::MAX` bytes.
        let fits = width
            .checked_mul(height)
            .and_then(|cells| cells.checked_mul(CELL_BYTES))
            .is_some_and(|bytes| bytes <= isize::MAX as usize);
        if !fits {
            return Err(SimError::Resource {
                reason: format!("{width}x{height} cells overflow the address space"),
            });
        }
        Ok(Dimensions { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (x as usize) < self.width && (y as usize) < self.height
    }

    /// Bounds check for externally supplied coordinates.
    pub fn check(&self, x: u32, y: u32) -> Result<usize, InputError> {
        if self.contains(x, y) {
            Ok(self.index(x as usize, y as usize))
        } else {
            Err(InputError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// A fixed-size grid of `T`, indexed by `x + y * width`.
///
/// Accessors do not validate coordinates beyond the slice index check;
/// external coordinates go through [`Dimensions::check`] first.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    dims: Dimensions,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Allocates a grid with every cell set to `value`. An allocation that
    /// cannot be satisfied is a resource failure, not a panic.
    pub fn filled(dims: Dimensions, value: T) -> Result<Grid<T>, SimError> {
        let n = dims.cell_count();
        let mut cells = Vec::new();
        cells.try_reserve_exact(n).map_err(|e| SimError::Resource {
            reason: format!(
                "{}x{} grid buffer: {e}",
                dims.width(),
                dims.height()
            ),
        })?;
        cells.resize(n, value);
        Ok(Grid { dims, cells })
    }

    /// Wraps existing row-major data; the length must match the dimensions.
    pub fn from_vec(dims: Dimensions, cells: Vec<T>) -> Result<Grid<T>, InputError> {
        if cells.len() != dims.cell_count() {
            return Err(InputError::InvalidParameter {
                name: "grid data",
                reason: format!(
                    "{} values for a {}x{} grid",
                    cells.len(),
                    dims.width(),
                    dims.height()
                ),
            });
        }
        Ok(Grid { dims, cells })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.cells[self.dims.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.dims.index(x, y);
        self.cells[idx] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.cells
    }

    pub fn rows(&self) -> std::slice::Chunks<'_, T> {
        self.cells.chunks(self.dims.width())
    }
}
