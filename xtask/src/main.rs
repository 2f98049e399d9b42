use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for tilestream")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Run the stream planning benchmarks
    Bench,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
}

const FMT: &[&str] = &["fmt", "--all", "--", "--check"];
const CLIPPY: &[&str] = &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"];
const TEST: &[&str] = &["test", "--workspace"];
const BENCH: &[&str] = &["bench", "-p", "tilestream-stream", "--bench", "bench_stream_plan"];
const DOC: &[&str] = &["doc", "--workspace", "--no-deps"];
const BUILD: &[&str] = &["build", "--workspace"];

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            for args in [FMT, CLIPPY, TEST, DOC] {
                cargo(args)?;
            }
        }
        Commands::Fmt => cargo(FMT)?,
        Commands::Clippy => cargo(CLIPPY)?,
        Commands::Test => cargo(TEST)?,
        Commands::Bench => cargo(BENCH)?,
        Commands::Doc => cargo(DOC)?,
        Commands::Build => cargo(BUILD)?,
    }

    Ok(())
}

fn cargo(args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args[0]);
    }
    Ok(())
}
