use anyhow::{
    Context,
    Result,
    ensure,
};
use clap::{
    Parser,
    Subcommand,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    process::Command,
};

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Miner tycoon helper tasks (clippy, unit and session tests)",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run clippy for the entire workspace with warnings-as-errors
    Clippy,
    /// Run unit tests and the feature-gated session integration tests
    Test {
        /// Only run the session integration tests
        #[arg(long)]
        integration_only: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = repo_root()?;

    match cli.command {
        Commands::Clippy => run_clippy(&root)?,
        Commands::Test { integration_only } => {
            if !integration_only {
                run_unit_tests(&root)?;
            }
            run_integration_tests(&root)?;
        }
    }

    Ok(())
}

fn repo_root() -> Result<PathBuf> {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .context("xtask has no parent directory")
}

fn run_clippy(root: &Path) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("clippy")
        .arg("--workspace")
        .arg("--all-targets")
        .arg("--all-features")
        .arg("--")
        .arg("-D")
        .arg("warnings")
        .current_dir(root);
    run_command(cmd, "cargo clippy")
}

fn run_unit_tests(root: &Path) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("test")
        .arg("--workspace")
        .arg("--lib")
        .arg("--bins")
        .current_dir(root);
    run_command(cmd, "cargo test --workspace --lib --bins")
}

fn run_integration_tests(root: &Path) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.arg("test")
        .arg("-p")
        .arg("miner-tycoon")
        .arg("--features")
        .arg("test-helpers")
        .arg("--test")
        .arg("integration_tests")
        .current_dir(root);
    run_command(cmd, "cargo test -p miner-tycoon --test integration_tests")
}

fn run_command(mut cmd: Command, label: &str) -> Result<()> {
    println!("Running: {label}");
    let status = cmd
        .status()
        .with_context(|| format!("failed to run {label}"))?;
    ensure!(status.success(), "{label} failed with status {status}");
    Ok(())
}
