//! Heat diffusion on a 2-D grid driven by time-windowed hotspots.
//!
//! Hotspot records are encoded into activation grids ([`HotspotField`]), a
//! [`Simulation`] advances the double-buffered temperature grid one round at a
//! time through an [`UpdateKernel`], and [`OutputMode`] turns the final grid
//! into text.

pub mod error;
pub mod grid;
pub mod hotspot;
pub mod kernel;
pub mod output;
pub mod simulation;
pub mod table;

pub use error::{InputError, KernelError, SimError};
pub use grid::{Dimensions, Grid};
pub use hotspot::{Coordinate, Hotspot, HotspotField};
pub use kernel::{Backend, DiffusionParams, ParallelKernel, SerialKernel, UpdateKernel};
pub use output::{
    HeatToken, OutputMode, encode_dense, encode_sparse, quantize, render_preview, sample_values,
    write_output,
};
pub use simulation::{RunConfig, Simulation, SimulationState};

/// Loads `hotspots`, runs `config.rounds` rounds and returns the final grid.
pub fn simulate(config: &RunConfig, hotspots: &[Hotspot]) -> Result<Grid<f32>, SimError> {
    let field = HotspotField::load(config.dims, hotspots)?;
    Simulation::new(config, field)?.into_final_state()
}
