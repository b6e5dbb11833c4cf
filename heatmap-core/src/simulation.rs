//! Double-buffered round driver.

use crate::error::{InputError, SimError};
use crate::grid::{Dimensions, Grid};
use crate::hotspot::HotspotField;
use crate::kernel::{Backend, DiffusionParams, UpdateKernel};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

/// Everything needed to drive one run, passed explicitly instead of living in globals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub dims: Dimensions,
    pub rounds: u32,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub params: DiffusionParams,
}

impl RunConfig {
    pub fn new(dims: Dimensions, rounds: u32) -> RunConfig {
        RunConfig {
            dims,
            rounds,
            backend: Backend::default(),
            threads: None,
            params: DiffusionParams::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
    Initialized,
    Running { round: u32 },
    Completed,
    Failed,
}

/// Owns the activation grids and the two temperature buffers.
///
/// The buffer roles start out reversed (`old` is the empty buffer, `new` holds
/// the seeded state) and are swapped before every update, so round `i` reads
/// the state left by round `i - 1` and writes the other buffer. After zero
/// rounds `new` is still the seeded state.
pub struct Simulation {
    kernel: Box<dyn UpdateKernel>,
    start: Grid<u32>,
    end: Grid<u32>,
    old: Grid<f32>,
    new: Grid<f32>,
    round: u32,
    rounds: u32,
    state: SimulationState,
}

impl Simulation {
    /// Builds the kernel named by `config.backend` and takes ownership of the loaded field.
    pub fn new(config: &RunConfig, field: HotspotField) -> Result<Simulation, SimError> {
        if field.dims() != config.dims {
            return Err(InputError::InvalidParameter {
                name: "hotspot field",
                reason: format!(
                    "loaded for {}x{}, run configured for {}x{}",
                    field.dims().width(),
                    field.dims().height(),
                    config.dims.width(),
                    config.dims.height()
                ),
            }
            .into());
        }
        let kernel = config.backend.build_kernel(config.params, config.threads)?;
        Simulation::with_kernel(field, config.rounds, kernel)
    }

    pub fn with_kernel(
        field: HotspotField,
        rounds: u32,
        kernel: Box<dyn UpdateKernel>,
    ) -> Result<Simulation, SimError> {
        let dims = field.dims();
        if field.start.dims() != dims || field.end.dims() != dims {
            return Err(SimError::Resource {
                reason: "activation grids do not match the temperature grid".into(),
            });
        }
        debug!(
            width = dims.width(),
            height = dims.height(),
            rounds,
            kernel = kernel.name(),
            "simulation initialized"
        );
        Ok(Simulation {
            kernel,
            start: field.start,
            end: field.end,
            old: Grid::filled(dims, 0.0)?,
            new: field.initial,
            round: 0,
            rounds,
            state: SimulationState::Initialized,
        })
    }

    pub fn dims(&self) -> Dimensions {
        self.new.dims()
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Rounds completed so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }

    /// The most recently written buffer.
    pub fn current(&self) -> &Grid<f32> {
        &self.new
    }

    /// Raises the round target by `extra`, reopening a completed run.
    pub fn extend(&mut self, extra: u32) {
        self.rounds = self.rounds.saturating_add(extra);
        if self.state == SimulationState::Completed && self.round < self.rounds {
            self.state = SimulationState::Running { round: self.round };
        }
    }

    /// Executes the next round, or marks the run completed once the target is reached.
    pub fn step(&mut self) -> Result<SimulationState, SimError> {
        match self.state {
            SimulationState::Failed => return Err(SimError::Aborted),
            SimulationState::Completed => return Ok(self.state),
            SimulationState::Initialized | SimulationState::Running { .. } => {}
        }
        if self.round >= self.rounds {
            self.state = SimulationState::Completed;
            return Ok(self.state);
        }

        let round = self.round + 1;
        std::mem::swap(&mut self.old, &mut self.new);
        if let Err(source) = self
            .kernel
            .update(round, &self.start, &self.end, &self.old, &mut self.new)
        {
            error!(round, %source, "update failed, aborting run");
            self.state = SimulationState::Failed;
            return Err(SimError::Kernel { round, source });
        }
        trace!(round, "round complete");

        self.round = round;
        self.state = if round == self.rounds {
            SimulationState::Completed
        } else {
            SimulationState::Running { round }
        };
        Ok(self.state)
    }

    /// Runs every remaining round and returns the final state.
    pub fn run_to_completion(&mut self) -> Result<&Grid<f32>, SimError> {
        while self.step()? != SimulationState::Completed {}
        Ok(&self.new)
    }

    /// Consumes the simulation; only a completed run yields a result.
    pub fn into_final_state(mut self) -> Result<Grid<f32>, SimError> {
        self.run_to_completion()?;
        Ok(self.new)
    }
}
