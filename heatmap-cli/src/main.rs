mod generate;
mod run;

use clap::{Parser, Subcommand};
use heatmap_core::{Backend, DiffusionParams, ParallelKernel};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate heat diffusion and write the final heatmap
    Run(run::RunArgs),
    /// Write a random hotspot table
    Generate(generate::GenerateArgs),
    /// List the available update backends
    Backends,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `run --print` output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run(args) => {
            run::execute(&args)?;
        }
        Command::Generate(args) => {
            let written = generate::execute(&args)?;
            println!("Wrote {} hotspots to: {}", written, args.out.display());
        }
        Command::Backends => {
            for backend in Backend::ALL {
                match backend {
                    Backend::Serial => println!("{backend}: 1 thread"),
                    Backend::Parallel => println!(
                        "{backend}: {} threads",
                        ParallelKernel::new(DiffusionParams::default()).threads()
                    ),
                }
            }
        }
    }

    Ok(())
}
