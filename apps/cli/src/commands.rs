//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use contextpairs_archive::HttpArchiveClient;
use contextpairs_core::{
    CheckpointStore, FileCheckpoint, PipelineConfig, PipelineSummary, ProgressReporter,
    estimate_rows, run_pipeline,
};
use contextpairs_shared::{
    AppConfig, ArchiveConfig, AssemblyConfig, WalkerConfig, init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// contextpairs: turn exported replies into context/response training pairs.
#[derive(Parser)]
#[command(
    name = "contextpairs",
    version,
    about = "Rebuild thread context for exported replies and write sanitized training pairs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build (or resume building) the dataset from a reply export.
    Build {
        /// Reply export CSV.
        #[arg(short, long)]
        input: PathBuf,

        /// NDJSON output file, appended to.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: BuildOverrides,

        /// Ignore any existing checkpoint and start at the first row.
        #[arg(long)]
        fresh: bool,
    },

    /// Print the estimated number of rows in a reply export.
    Estimate {
        /// Reply export CSV.
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Inspect or reset the resume checkpoint.
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags that override values from the config file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct BuildOverrides {
    /// Checkpoint file (defaults to `assembly.checkpoint_file`).
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Records buffered between flushes.
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Archive API base URL.
    #[arg(long, env = "CONTEXTPAIRS_ARCHIVE_URL")]
    pub archive_url: Option<String>,
}

/// Checkpoint subcommands.
#[derive(Subcommand)]
pub(crate) enum CheckpointAction {
    /// Print the current checkpoint id.
    Show {
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Delete the checkpoint so the next build starts over.
    Clear {
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "contextpairs=info",
        1 => "contextpairs=debug",
        _ => "contextpairs=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            input,
            output,
            overrides,
            fresh,
        } => cmd_build(input, output, &overrides, fresh).await,
        Command::Estimate { input } => cmd_estimate(&input),
        Command::Checkpoint { action } => match action {
            CheckpointAction::Show { checkpoint } => cmd_checkpoint_show(checkpoint.as_deref()),
            CheckpointAction::Clear { checkpoint } => cmd_checkpoint_clear(checkpoint.as_deref()),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Apply command-line overrides on top of the loaded config.
fn apply_overrides(mut config: AppConfig, overrides: &BuildOverrides) -> Result<AppConfig> {
    if let Some(size) = overrides.buffer_size {
        config.assembly.buffer_size = size;
    }
    if let Some(url) = &overrides.archive_url {
        config.archive.base_url = url.clone();
    }
    if let Some(path) = &overrides.checkpoint {
        config.assembly.checkpoint_file = path.to_string_lossy().into_owned();
    }
    config.validate()?;
    Ok(config)
}

fn checkpoint_store(path: Option<&Path>) -> Result<FileCheckpoint> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => AssemblyConfig::from(&load_config()?).checkpoint_path,
    };
    Ok(FileCheckpoint::new(path))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(
    input: PathBuf,
    output: PathBuf,
    overrides: &BuildOverrides,
    fresh: bool,
) -> Result<()> {
    let config = apply_overrides(load_config()?, overrides)?;

    if !input.is_file() {
        return Err(eyre!("input '{}' is not a readable file", input.display()));
    }

    let pipeline_config = PipelineConfig {
        input,
        output,
        assembly: AssemblyConfig::from(&config),
        walker: WalkerConfig::from(&config),
        fresh,
    };
    let archive = HttpArchiveClient::new(&ArchiveConfig::from(&config))?;

    info!(
        input = %pipeline_config.input.display(),
        output = %pipeline_config.output.display(),
        archive = %config.archive.base_url,
        buffer_size = pipeline_config.assembly.buffer_size,
        fresh,
        "building dataset"
    );

    let reporter = CliProgress::new();
    let summary = run_pipeline(&pipeline_config, archive, &reporter).await?;

    let stats = &summary.stats;
    println!();
    println!("  Dataset build finished");
    println!("  Rows read:          {}", stats.rows_seen);
    println!("  Resumed past:       {}", stats.rows_resumed_past);
    println!("  Records written:    {}", stats.records_written);
    println!("  No parent:          {}", stats.rows_without_parent);
    println!("  Malformed:          {}", stats.rows_malformed);
    println!("  Archive failures:   {}", stats.transport_failures);
    println!("  Unresolved roots:   {}", stats.roots_unresolved);
    println!(
        "  Checkpoint:         {}",
        summary.checkpoint.as_deref().unwrap_or("(none)")
    );
    println!("  Time:               {:.1}s", summary.elapsed.as_secs_f64());
    if summary.checkpoint_missing {
        println!();
        println!("  Checkpoint id was not found in the input; nothing was emitted.");
        println!("  Run with --fresh to start over.");
    }
    println!();

    Ok(())
}

fn cmd_estimate(input: &Path) -> Result<()> {
    let count = estimate_rows(input)?;
    println!("{count}");
    Ok(())
}

fn cmd_checkpoint_show(path: Option<&Path>) -> Result<()> {
    let store = checkpoint_store(path)?;
    match store.load()? {
        Some(id) => println!("{id}"),
        None => println!("no checkpoint at {}", store.path().display()),
    }
    Ok(())
}

fn cmd_checkpoint_clear(path: Option<&Path>) -> Result<()> {
    let mut store = checkpoint_store(path)?;
    store.clear()?;
    println!("Checkpoint cleared: {}", store.path().display());
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar sized by the row estimate.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, estimated_rows: usize, resume_from: Option<&str>) {
        self.bar.set_length(estimated_rows as u64);
        match resume_from {
            Some(id) => self.bar.set_message(format!("seeking {id}")),
            None => self.bar.set_message("starting"),
        }
    }

    fn row(&self, current: usize, estimated_rows: usize) {
        if current as u64 > self.bar.length().unwrap_or(0) {
            self.bar.set_length(current.max(estimated_rows) as u64);
        }
        self.bar.set_position(current as u64);
    }

    fn flushed(&self, records_written: usize, checkpoint: &str) {
        self.bar
            .set_message(format!("{records_written} written, checkpoint {checkpoint}"));
    }

    fn done(&self, _summary: &PipelineSummary) {
        self.bar.finish_and_clear();
    }
}
