use clap::Args;
use heatmap_core::table::{read_coordinates, read_hotspots};
use heatmap_core::{
    Backend, Dimensions, DiffusionParams, HotspotField, OutputMode, RunConfig, Simulation,
    render_preview, write_output,
};
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Grid width in cells
    pub width: usize,

    /// Grid height in cells
    pub height: usize,

    /// Number of rounds to simulate
    pub rounds: u32,

    /// Hotspot table (header, then x,y,startRound,endRound rows)
    pub hotspots: PathBuf,

    /// Coordinate table (header, then x,y rows); switches to raw value output
    pub coords: Option<PathBuf>,

    /// Output file, replaced if it exists
    #[arg(long, default_value = "output.txt")]
    pub output: PathBuf,

    /// Update backend (serial|parallel)
    #[arg(long, default_value = "parallel")]
    pub backend: Backend,

    /// Worker threads for the parallel backend
    #[arg(long)]
    pub threads: Option<usize>,

    /// Weight of the neighbour mean in the diffusion stencil, in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    pub coefficient: f32,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Print the heatmap to stdout
    #[arg(long)]
    pub print: bool,
}

#[derive(Serialize, Debug)]
pub struct RunSummary {
    pub config: RunConfig,
    pub hotspot_count: usize,
    pub output_mode: &'static str,
    pub output: PathBuf,
    pub kernel: &'static str,
    pub compute_seconds: f64,
    pub overall_seconds: f64,
}

pub fn execute(args: &RunArgs) -> Result<RunSummary, Box<dyn Error>> {
    let overall = Instant::now();

    // All input is validated before the simulation starts.
    let dims = Dimensions::new(args.width, args.height)?;
    let config = RunConfig {
        dims,
        rounds: args.rounds,
        backend: args.backend,
        threads: args.threads,
        params: DiffusionParams::with_coefficient(args.coefficient)?,
    };
    let hotspots = read_hotspots(&args.hotspots)?;
    let coords = args.coords.as_deref().map(read_coordinates).transpose()?;
    let mode = OutputMode::from_coordinates(coords);
    mode.validate(dims)?;
    let field = HotspotField::load(dims, &hotspots)?;

    let mut sim = Simulation::new(&config, field)?;
    info!("Using backend: {}", sim.kernel_name());

    let compute = Instant::now();
    let final_state = sim.run_to_completion()?;
    let compute_seconds = compute.elapsed().as_secs_f64();
    info!("Simulation runtime: {compute_seconds:.6}s ({} rounds)", args.rounds);

    write_output(&args.output, final_state, &mode)?;
    if args.print {
        print!("{}", render_preview(final_state));
    }

    let summary = RunSummary {
        kernel: sim.kernel_name(),
        config,
        hotspot_count: hotspots.len(),
        output_mode: mode.name(),
        output: args.output.clone(),
        compute_seconds,
        overall_seconds: overall.elapsed().as_secs_f64(),
    };
    if let Some(path) = &args.summary {
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, &summary)?;
        w.write_all(b"\n")?;
        w.flush()?;
    }

    info!("Overall runtime: {:.6}s", summary.overall_seconds);
    Ok(summary)
}
