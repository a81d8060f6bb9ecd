use clap::{Args, Parser, Subcommand, ValueEnum};
use nullability::config::{NullcheckConfig, OutputFormat};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub mod check;
pub mod dump;

pub const LOG_ENV: &str = "NULLCHECK_LOG";

#[derive(Parser)]
#[command(name = "nullcheck")]
#[command(about = "Nullability inference and optional-type checking for imported C APIs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check host source files against an imported module
    Check(CheckArgs),
    /// Print the projected interface of a module
    DumpModule(DumpArgs),
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Format {
    Plain,
    Pretty,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Plain => OutputFormat::Plain,
            Format::Pretty => OutputFormat::Pretty,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Args)]
pub struct CheckArgs {
    /// Module manifest (TOML or JSON)
    #[arg(short, long)]
    pub module: PathBuf,

    /// Config file; defaults to $NULLCHECK_CONFIG or ./nullcheck.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format, overriding the config
    #[arg(short, long, value_enum)]
    pub format: Option<Format>,

    /// Source files to check
    #[arg(name = "FILE", required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Module manifest (TOML or JSON)
    #[arg(name = "MANIFEST")]
    pub module: PathBuf,

    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// An explicit config path must load; otherwise discovery falls back quietly.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<NullcheckConfig> {
    use anyhow::Context;

    match explicit {
        Some(path) => NullcheckConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("failed to read working directory")?;
            Ok(NullcheckConfig::discover(&cwd))
        }
    }
}
