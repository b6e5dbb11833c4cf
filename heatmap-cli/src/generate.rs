use clap::Args;
use heatmap_core::table::format_hotspots;
use heatmap_core::{Dimensions, Hotspot};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Grid width the hotspots must fit in
    #[arg(long)]
    pub width: usize,

    /// Grid height the hotspots must fit in
    #[arg(long)]
    pub height: usize,

    /// Number of hotspot rows
    #[arg(long, default_value_t = 10)]
    pub count: usize,

    /// Latest round any window may end at
    #[arg(long, default_value_t = 100)]
    pub max_round: u32,

    /// RNG seed (reproducibility)
    #[arg(long, default_value_t = 123)]
    pub seed: u64,

    /// Output table path
    #[arg(long)]
    pub out: PathBuf,
}

/// Hotspots inside `dims` with `start <= end <= max_round`.
pub fn random_hotspots<R: Rng>(
    rng: &mut R,
    dims: Dimensions,
    count: usize,
    max_round: u32,
) -> Vec<Hotspot> {
    (0..count)
        .map(|_| {
            let x = rng.gen_range(0..dims.width()) as u32;
            let y = rng.gen_range(0..dims.height()) as u32;
            let start = rng.gen_range(0..=max_round);
            let end = rng.gen_range(start..=max_round);
            Hotspot::new(x, y, start, end)
        })
        .collect()
}

pub fn execute(args: &GenerateArgs) -> Result<usize, Box<dyn Error>> {
    let dims = Dimensions::new(args.width, args.height)?;
    if u32::try_from(args.width).is_err() || u32::try_from(args.height).is_err() {
        return Err("width and height must fit in 32 bits".into());
    }

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let hotspots = random_hotspots(&mut rng, dims, args.count, args.max_round);

    let mut w = BufWriter::new(File::create(&args.out)?);
    w.write_all(format_hotspots(&hotspots).as_bytes())?;
    w.flush()?;

    info!(seed = args.seed, count = hotspots.len(), "generated hotspot table");
    Ok(hotspots.len())
}
