use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use nasr_builder::{build_all, load_config, write_manifest, BuildConfig, Dataset};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nasr-build", version, about = "Build aviation datasets from the FAA NASR CSV bundle")]
struct Cli {
    /// Configuration file (defaults to ./nasr.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the NASR CSV extracts
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Directory receiving the JSON documents
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build datasets (all of them when none are named)
    Build {
        datasets: Vec<Dataset>,
    },
    /// Write aviation_manifest.json for the documents in the output directory
    Manifest {
        /// Data cycle effective date, YYYY-MM-DD
        #[arg(long)]
        cycle: Option<String>,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = match (verbose, quiet) {
        (_, true) => EnvFilter::new("error"),
        (0, false) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        (1, false) => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<BuildConfig> {
    let mut config = load_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    if let Some(input) = &cli.input {
        config = config.with_input_dir(input);
    }
    if let Some(output) = &cli.output {
        config = config.with_output_dir(output);
    }
    Ok(config)
}

fn run_build(config: &BuildConfig, datasets: &[Dataset]) -> Result<()> {
    let datasets = if datasets.is_empty() {
        Dataset::ALL.to_vec()
    } else {
        datasets.to_vec()
    };

    println!("🛫 Building {} dataset(s) from {}", datasets.len(), config.input_dir.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let reports = build_all(&datasets, config)?;
    for report in &reports {
        println!("✓ {}", report.diagnostics.summary());
        println!("  → {}", report.path.display());
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let total: usize = reports.iter().map(|r| r.entities).sum();
    println!("✅ {} entities written to {}", total, config.output_dir.display());
    Ok(())
}

fn run_manifest(config: &BuildConfig, cycle: Option<String>) -> Result<()> {
    let cycle = cycle
        .or_else(|| config.cycle.clone())
        .ok_or_else(|| anyhow::anyhow!("No data cycle given: pass --cycle YYYY-MM-DD or set `cycle` in the config"))?;

    let manifest = write_manifest(config, &cycle)?;
    println!("📋 Manifest for cycle {} ({})", manifest.faa_cycle, manifest.build_timestamp);
    for (dataset, count) in &manifest.counts {
        println!("  {:<12} {}", dataset, count);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Build { datasets } => run_build(&config, &datasets),
        Command::Manifest { cycle } => run_manifest(&config, cycle),
    }
}
