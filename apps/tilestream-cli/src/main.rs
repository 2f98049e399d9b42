use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use tilestream_common::{ContentRef, StreamConfig, TileCoord};
use tilestream_stream::{
    AuthoredGrid, MemoryLoader, PassStats, Schedule, TileStreamer, desired_set, diff,
    naming_table, tile_at,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tilestream-cli", about = "CLI tool for tile streaming operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    stream: StreamArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Streaming settings: an optional YAML file, then per-flag overrides.
#[derive(Args)]
struct StreamArgs {
    /// YAML file with streaming settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// World units per tile edge
    #[arg(long)]
    tile_size: Option<f32>,
    /// Edge length of the authored grid
    #[arg(long)]
    grid_dimension: Option<u32>,
    /// Neighborhood half-width in tiles
    #[arg(long)]
    load_radius: Option<u32>,
    /// Delay between load/unload operations, in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,
    /// Number of authored table entries (defaults to the full grid)
    #[arg(long)]
    table_len: Option<usize>,
}

impl StreamArgs {
    fn resolve(&self) -> anyhow::Result<(StreamConfig, Vec<ContentRef>)> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_yaml::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => StreamConfig::default(),
        };
        if let Some(tile_size) = self.tile_size {
            config.tile_size = tile_size;
        }
        if let Some(grid_dimension) = self.grid_dimension {
            config.grid_dimension = grid_dimension;
        }
        if let Some(load_radius) = self.load_radius {
            config.load_radius = load_radius;
        }
        if let Some(pacing_ms) = self.pacing_ms {
            config.pacing_interval_ms = pacing_ms;
        }
        config.validate()?;

        let mut references = naming_table(config.grid_dimension);
        if let Some(len) = self.table_len {
            references.truncate(len);
        }
        Ok((config, references))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective streaming settings
    Info,
    /// Show which tile and authored content a world position maps to
    Locate {
        #[arg(allow_negative_numbers = true)]
        x: f32,
        #[arg(allow_negative_numbers = true)]
        z: f32,
    },
    /// Show the unload/load work for an observer moving between two positions
    Plan {
        #[arg(long, allow_negative_numbers = true, default_value = "0")]
        from_x: f32,
        #[arg(long, allow_negative_numbers = true, default_value = "0")]
        from_z: f32,
        #[arg(long, allow_negative_numbers = true)]
        to_x: f32,
        #[arg(long, allow_negative_numbers = true)]
        to_z: f32,
    },
    /// Walk an observer in a straight line through an in-memory loader
    Simulate {
        #[arg(long, allow_negative_numbers = true, default_value = "0")]
        from_x: f32,
        #[arg(long, allow_negative_numbers = true, default_value = "0")]
        from_z: f32,
        #[arg(long, allow_negative_numbers = true, default_value = "2500")]
        to_x: f32,
        #[arg(long, allow_negative_numbers = true, default_value = "0")]
        to_z: f32,
        /// Number of frames the walk takes
        #[arg(short, long, default_value = "300")]
        steps: u32,
        /// Frame length in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,
        /// Simulated loader latency per operation, in milliseconds
        #[arg(long, default_value = "0")]
        latency_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let (config, references) = cli.stream.resolve()?;

    match cli.command {
        Commands::Info => {
            println!("tilestream-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("authored entries: {}", references.len());
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Commands::Locate { x, z } => {
            let grid = AuthoredGrid::new(config.grid_dimension, references);
            let tile = tile_at(Vec3::new(x, 0.0, z), config.tile_size);
            let cell = grid.cell_for(tile);
            println!("tile: {tile}");
            println!("grid cell: row={}, col={}", cell.row, cell.col);
            println!("table index: {}", grid.index_for(tile));
            match grid.reference_for(tile) {
                Some(reference) => println!("content: {reference}"),
                None => println!("content: none (past the end of the authored table)"),
            }
        }
        Commands::Plan {
            from_x,
            from_z,
            to_x,
            to_z,
        } => {
            let grid = AuthoredGrid::new(config.grid_dimension, references);
            let from = tile_at(Vec3::new(from_x, 0.0, from_z), config.tile_size);
            let to = tile_at(Vec3::new(to_x, 0.0, to_z), config.tile_size);

            // Assume the starting neighborhood has fully converged.
            let resident = desired_set(from, config.load_radius)
                .into_iter()
                .filter(|coord| grid.has_content(*coord))
                .collect();
            let desired = desired_set(to, config.load_radius);
            let work = diff(&desired, &resident, &grid);

            println!("move {from} -> {to}, desired {} tiles", desired.len());
            println!("unload ({}): {}", work.to_unload.len(), join(&work.to_unload));
            println!("load ({}): {}", work.to_load.len(), join(&work.to_load));
            println!("no content: {}", work.out_of_range);
        }
        Commands::Simulate {
            from_x,
            from_z,
            to_x,
            to_z,
            steps,
            frame_ms,
            latency_ms,
        } => {
            let walk = Walk {
                from: Vec3::new(from_x, 0.0, from_z),
                to: Vec3::new(to_x, 0.0, to_z),
                steps,
                frame: Duration::from_millis(frame_ms.max(1)),
                latency: Duration::from_millis(latency_ms),
            };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            runtime.block_on(simulate(config, references, walk))?;
        }
    }

    Ok(())
}

struct Walk {
    from: Vec3,
    to: Vec3,
    steps: u32,
    frame: Duration,
    latency: Duration,
}

async fn simulate(
    config: StreamConfig,
    references: Vec<ContentRef>,
    walk: Walk,
) -> anyhow::Result<()> {
    let loader = MemoryLoader::with_latency(walk.latency);
    let mut streamer = TileStreamer::new(loader.clone(), config, references)?;
    let mut frame = tokio::time::interval(walk.frame);
    let mut reported = 0;

    for step in 0..=walk.steps {
        frame.tick().await;
        let t = step as f32 / walk.steps.max(1) as f32;
        match streamer.tick(Some(walk.from.lerp(walk.to, t)))? {
            Schedule::Started(center) => println!("frame {step}: pass started around {center}"),
            Schedule::Deferred => tracing::debug!(step, "tile change deferred behind running pass"),
            Schedule::Unchanged | Schedule::NoObserver => {}
        }
        if streamer.completed_passes() > reported {
            reported = streamer.completed_passes();
            if let Some(stats) = streamer.last_stats() {
                print_pass(stats);
            }
        }
    }

    // Let the last pass finish, then pick up a change it may have hidden.
    while let Some(result) = streamer.finish_pass().await {
        print_pass(&result?);
        if let Schedule::Started(center) = streamer.schedule()? {
            println!("end of walk: pass started around {center}");
        }
    }

    println!(
        "resident: {} tiles, live handles: {}",
        streamer.resident_count(),
        loader.live_count()
    );
    let timer = streamer.pass_timer();
    println!(
        "passes: {} (avg {:?}, min {:?}, max {:?})",
        streamer.completed_passes(),
        timer.average(),
        timer.min(),
        timer.max()
    );

    let report = streamer.shutdown().await;
    println!(
        "teardown: unloaded={}, failed={}, live handles left={}",
        report.unloaded,
        report.failed,
        loader.live_count()
    );
    Ok(())
}

fn print_pass(stats: &PassStats) {
    println!(
        "  pass {}: unloaded={} loaded={} failed_unloads={} no_content={} resident={} in {:?}",
        stats.center,
        stats.tiles_unloaded,
        stats.tiles_loaded,
        stats.failed_unloads,
        stats.skipped_out_of_range,
        stats.total_resident,
        stats.elapsed
    );
}

fn join(coords: &[TileCoord]) -> String {
    if coords.is_empty() {
        return "-".into();
    }
    coords
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
