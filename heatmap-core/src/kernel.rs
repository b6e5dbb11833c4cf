//! Per-round forcing and diffusion update.
//!
//! A kernel turns the state after round `i - 1` into the state after round `i`.
//! For every cell `c`:
//!
//! ```text
//! forced(c)  => next[c] = source_level
//! otherwise  => next[c] = (1 - k) * cur[c] + k * (up + down + left + right) / 4
//! ```
//!
//! Neighbours outside the grid are replaced by the cell itself (zero-flux
//! edges). With `0 <= k <= 1` each new value is a convex combination of old
//! values, so the update never diverges.

use crate::error::{InputError, KernelError, SimError};
use crate::grid::{Dimensions, Grid};
use crate::hotspot::is_forced;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coefficients of the diffusion stencil.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffusionParams {
    /// Weight `k` given to the neighbourhood mean.
    pub coefficient: f32,
    /// Value written to forced cells.
    pub source_level: f32,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        DiffusionParams {
            coefficient: 0.5,
            source_level: 1.0,
        }
    }
}

impl DiffusionParams {
    pub fn with_coefficient(coefficient: f32) -> Result<DiffusionParams, InputError> {
        let params = DiffusionParams {
            coefficient,
            ..DiffusionParams::default()
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if !(0.0..=1.0).contains(&self.coefficient) {
            return Err(InputError::InvalidParameter {
                name: "coefficient",
                reason: format!("{} is outside [0, 1]", self.coefficient),
            });
        }
        if !self.source_level.is_finite() {
            return Err(InputError::InvalidParameter {
                name: "source level",
                reason: format!("{} is not finite", self.source_level),
            });
        }
        Ok(())
    }
}

/// One synchronous round update. `current` is read-only; every cell of
/// `next` is written before the call returns.
pub trait UpdateKernel: Send + Sync {
    fn update(
        &self,
        round: u32,
        start: &Grid<u32>,
        end: &Grid<u32>,
        current: &Grid<f32>,
        next: &mut Grid<f32>,
    ) -> Result<(), KernelError>;

    fn name(&self) -> &'static str;
}

fn check_shapes(
    start: &Grid<u32>,
    end: &Grid<u32>,
    current: &Grid<f32>,
    next: &Grid<f32>,
) -> Result<Dimensions, KernelError> {
    let dims = current.dims();
    let expected = dims.cell_count();
    for (grid, actual) in [
        ("hotspot start", start.len()),
        ("hotspot end", end.len()),
        ("next", next.len()),
    ] {
        if actual != expected {
            return Err(KernelError::ShapeMismatch {
                grid,
                expected,
                actual,
            });
        }
    }
    Ok(dims)
}

/// Writes row `y` of the next state.
#[inline]
#[allow(clippy::too_many_arguments)]
fn update_row(
    params: &DiffusionParams,
    round: u32,
    y: usize,
    dims: Dimensions,
    start: &[u32],
    end: &[u32],
    cur: &[f32],
    out: &mut [f32],
) {
    let w = dims.width();
    let h = dims.height();
    let k = params.coefficient;
    let row = y * w;

    for (x, o) in out.iter_mut().enumerate() {
        let i = row + x;
        if is_forced(start[i], end[i], round) {
            *o = params.source_level;
            continue;
        }

        let u = cur[i];
        let left = if x > 0 { cur[i - 1] } else { u };
        let right = if x + 1 < w { cur[i + 1] } else { u };
        let up = if y > 0 { cur[i - w] } else { u };
        let down = if y + 1 < h { cur[i + w] } else { u };

        let mean = (up + down + left + right) * 0.25;
        *o = (1.0 - k) * u + k * mean;
    }
}

/// Single-threaded row-major update.
#[derive(Clone, Debug, Default)]
pub struct SerialKernel {
    params: DiffusionParams,
}

impl SerialKernel {
    pub fn new(params: DiffusionParams) -> SerialKernel {
        SerialKernel { params }
    }
}

impl UpdateKernel for SerialKernel {
    fn update(
        &self,
        round: u32,
        start: &Grid<u32>,
        end: &Grid<u32>,
        current: &Grid<f32>,
        next: &mut Grid<f32>,
    ) -> Result<(), KernelError> {
        let dims = check_shapes(start, end, current, next)?;
        let (s, e, cur) = (start.as_slice(), end.as_slice(), current.as_slice());
        for (y, out) in next.as_mut_slice().chunks_mut(dims.width()).enumerate() {
            update_row(&self.params, round, y, dims, s, e, cur, out);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}

/// Data-parallel update, one rayon task per row. Returns only after every
/// row is written.
pub struct ParallelKernel {
    params: DiffusionParams,
    pool: Option<rayon::ThreadPool>,
}

impl ParallelKernel {
    /// Runs on rayon's global pool.
    pub fn new(params: DiffusionParams) -> ParallelKernel {
        ParallelKernel { params, pool: None }
    }

    /// Runs on a dedicated pool of `threads` workers.
    pub fn with_threads(params: DiffusionParams, threads: usize) -> Result<ParallelKernel, SimError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("heatmap-worker-{i}"))
            .build()
            .map_err(|e| SimError::Resource {
                reason: format!("thread pool with {threads} workers: {e}"),
            })?;
        Ok(ParallelKernel {
            params,
            pool: Some(pool),
        })
    }

    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl UpdateKernel for ParallelKernel {
    fn update(
        &self,
        round: u32,
        start: &Grid<u32>,
        end: &Grid<u32>,
        current: &Grid<f32>,
        next: &mut Grid<f32>,
    ) -> Result<(), KernelError> {
        let dims = check_shapes(start, end, current, next)?;
        let (s, e, cur) = (start.as_slice(), end.as_slice(), current.as_slice());
        let params = &self.params;
        let run = |out: &mut [f32]| {
            out.par_chunks_mut(dims.width())
                .enumerate()
                .for_each(|(y, row)| update_row(params, round, y, dims, s, e, cur, row));
        };
        match &self.pool {
            Some(pool) => pool.install(|| run(next.as_mut_slice())),
            None => run(next.as_mut_slice()),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "parallel"
    }
}

/// Available update backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Serial,
    #[default]
    Parallel,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Serial, Backend::Parallel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Serial => "serial",
            Backend::Parallel => "parallel",
        }
    }

    /// `threads` only applies to the parallel backend.
    pub fn build_kernel(
        &self,
        params: DiffusionParams,
        threads: Option<usize>,
    ) -> Result<Box<dyn UpdateKernel>, SimError> {
        params.validate()?;
        Ok(match (self, threads) {
            (Backend::Serial, _) => Box::new(SerialKernel::new(params)),
            (Backend::Parallel, Some(n)) => Box::new(ParallelKernel::with_threads(params, n)?),
            (Backend::Parallel, None) => Box::new(ParallelKernel::new(params)),
        })
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(Backend::Serial),
            "parallel" => Ok(Backend::Parallel),
            other => Err(InputError::InvalidParameter {
                name: "backend",
                reason: format!("unknown backend `{other}` (expected serial or parallel)"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotspot::{Hotspot, HotspotField};
    use approx::assert_relative_eq;

    fn dims(w: usize, h: usize) -> Dimensions {
        Dimensions::new(w, h).unwrap()
    }

    fn step(kernel: &dyn UpdateKernel, field: &HotspotField, round: u32, cur: &Grid<f32>) -> Grid<f32> {
        let mut next = Grid::filled(cur.dims(), f32::NAN).unwrap();
        kernel
            .update(round, &field.start, &field.end, cur, &mut next)
            .unwrap();
        next
    }

    #[test]
    fn forced_cell_takes_source_level() {
        let d = dims(3, 3);
        let field = HotspotField::load(d, &[Hotspot::new(1, 1, 2, 4)]).unwrap();
        let cur = Grid::filled(d, 0.25).unwrap();
        let k = SerialKernel::default();
        assert_eq!(step(&k, &field, 1, &cur).get(1, 1), 0.25);
        assert_eq!(step(&k, &field, 2, &cur).get(1, 1), 1.0);
        assert_eq!(step(&k, &field, 4, &cur).get(1, 1), 1.0);
        assert_eq!(step(&k, &field, 5, &cur).get(1, 1), 0.25);
    }

    #[test]
    fn uniform_field_is_a_fixed_point() {
        let d = dims(4, 3);
        let field = HotspotField::empty(d).unwrap();
        let cur = Grid::filled(d, 0.4).unwrap();
        let next = step(&SerialKernel::default(), &field, 1, &cur);
        assert!(next.as_slice().iter().all(|&v| (v - 0.4).abs() < 1e-6));
    }

    #[test]
    fn interior_cell_moves_toward_neighbour_mean() {
        let d = dims(3, 3);
        let field = HotspotField::empty(d).unwrap();
        let mut cur = Grid::filled(d, 0.0).unwrap();
        cur.set(1, 1, 1.0);
        let next = step(&SerialKernel::default(), &field, 1, &cur);
        // k = 0.5: centre keeps half, each direct neighbour gets 0.5 * 1/4
        assert_relative_eq!(next.get(1, 1), 0.5);
        assert_relative_eq!(next.get(0, 1), 0.125);
        assert_relative_eq!(next.get(1, 0), 0.125);
        assert_relative_eq!(next.get(0, 0), 0.0);
    }

    #[test]
    fn corner_uses_clamped_neighbours() {
        let d = dims(2, 2);
        let field = HotspotField::empty(d).unwrap();
        let mut cur = Grid::filled(d, 0.0).unwrap();
        cur.set(0, 0, 1.0);
        let next = step(&SerialKernel::default(), &field, 1, &cur);
        // two of the four neighbours are the cell itself: mean = 0.5
        assert_relative_eq!(next.get(0, 0), 0.75);
        assert_relative_eq!(next.get(1, 0), 0.125);
    }

    #[test]
    fn heat_is_conserved_without_sources() {
        let d = dims(5, 4);
        let field = HotspotField::empty(d).unwrap();
        let mut cur = Grid::filled(d, 0.0).unwrap();
        cur.set(0, 0, 1.0);
        cur.set(3, 2, 0.5);
        let next = step(&SerialKernel::default(), &field, 1, &cur);
        let before: f32 = cur.as_slice().iter().sum();
        let after: f32 = next.as_slice().iter().sum();
        assert_relative_eq!(before, after, epsilon = 1e-5);
    }

    #[test]
    fn zero_coefficient_copies_state() {
        let d = dims(3, 2);
        let field = HotspotField::empty(d).unwrap();
        let cur = Grid::from_vec(d, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        let k = SerialKernel::new(DiffusionParams::with_coefficient(0.0).unwrap());
        assert_eq!(step(&k, &field, 1, &cur), cur);
    }

    #[test]
    fn parallel_matches_serial_bit_for_bit() {
        let d = dims(17, 9);
        let field = HotspotField::load(
            d,
            &[
                Hotspot::new(0, 0, 0, 10),
                Hotspot::new(16, 8, 1, 3),
                Hotspot::new(8, 4, 2, 2),
            ],
        )
        .unwrap();
        let serial = SerialKernel::default();
        let parallel = ParallelKernel::with_threads(DiffusionParams::default(), 3).unwrap();
        let mut a = field.initial.clone();
        let mut b = field.initial.clone();
        for round in 1..=6 {
            a = step(&serial, &field, round, &a);
            b = step(&parallel, &field, round, &b);
            assert_eq!(a, b, "round {round}");
        }
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let field = HotspotField::empty(dims(3, 3)).unwrap();
        let cur = Grid::filled(dims(3, 3), 0.0).unwrap();
        let mut next = Grid::filled(dims(2, 2), 0.0).unwrap();
        let err = SerialKernel::default()
            .update(1, &field.start, &field.end, &cur, &mut next)
            .unwrap_err();
        assert_eq!(
            err,
            KernelError::ShapeMismatch {
                grid: "next",
                expected: 9,
                actual: 4
            }
        );
    }

    #[test]
    fn coefficient_must_be_in_unit_range() {
        assert!(DiffusionParams::with_coefficient(1.5).is_err());
        assert!(DiffusionParams::with_coefficient(-0.1).is_err());
        assert!(DiffusionParams::with_coefficient(f32::NAN).is_err());
        assert!(DiffusionParams::with_coefficient(1.0).is_ok());
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("Serial".parse::<Backend>().unwrap(), Backend::Serial);
        assert_eq!("parallel".parse::<Backend>().unwrap(), Backend::Parallel);
        assert!("gpu".parse::<Backend>().is_err());
        assert_eq!(Backend::default().to_string(), "parallel");
    }

    #[test]
    fn build_kernel_names_backend() {
        let k = Backend::Serial.build_kernel(DiffusionParams::default(), None).unwrap();
        assert_eq!(k.name(), "serial");
        let k = Backend::Parallel
            .build_kernel(DiffusionParams::default(), Some(2))
            .unwrap();
        assert_eq!(k.name(), "parallel");
    }
}
