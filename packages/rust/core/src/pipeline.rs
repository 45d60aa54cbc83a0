//! End-to-end `build` workflow: CSV in, NDJSON out, checkpoint kept current.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use contextpairs_archive::ArchiveClient;
use contextpairs_shared::{AssemblyConfig, Result, WalkerConfig};
use tracing::{info, instrument, warn};

use crate::assembler::{Assembler, AssemblyState, AssemblyStats};
use crate::checkpoint::{CheckpointStore, FileCheckpoint};
use crate::rows::{RowReader, estimate_rows};
use crate::sink::JsonlSink;
use crate::walker::ThreadWalker;

/// Configuration for [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Reply export to read.
    pub input: PathBuf,
    /// NDJSON file to append records to.
    pub output: PathBuf,
    /// Buffer size and checkpoint location.
    pub assembly: AssemblyConfig,
    /// Retry and depth settings for the ancestor walk.
    pub walker: WalkerConfig,
    /// Clear the checkpoint before starting.
    pub fresh: bool,
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub stats: AssemblyStats,
    /// Checkpoint id after the run.
    pub checkpoint: Option<String>,
    /// Row estimate used for progress display.
    pub estimated_rows: usize,
    /// True when the run ended without finding its checkpoint id.
    pub checkpoint_missing: bool,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called once before the first row, with the estimated row count.
    fn started(&self, estimated_rows: usize, resume_from: Option<&str>);
    /// Called after each row is processed.
    fn row(&self, current: usize, estimated_rows: usize);
    /// Called after each flush to the output.
    fn flushed(&self, records_written: usize, checkpoint: &str);
    /// Called when the pipeline completes.
    fn done(&self, summary: &PipelineSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn started(&self, _estimated_rows: usize, _resume_from: Option<&str>) {}
    fn row(&self, _current: usize, _estimated_rows: usize) {}
    fn flushed(&self, _records_written: usize, _checkpoint: &str) {}
    fn done(&self, _summary: &PipelineSummary) {}
}

/// Run the full `build` pipeline.
///
/// 1. Open the input and estimate its row count
/// 2. Load (or clear) the checkpoint
/// 3. Feed every row through the assembler
/// 4. Flush the remainder and report
#[instrument(skip_all, fields(input = %config.input.display(), output = %config.output.display()))]
pub async fn run_pipeline<A: ArchiveClient>(
    config: &PipelineConfig,
    archive: A,
    progress: &dyn ProgressReporter,
) -> Result<PipelineSummary> {
    let start = Instant::now();

    let reader = RowReader::open(&config.input)?;
    let estimated_rows = estimate_rows(&config.input)?;

    let mut store = FileCheckpoint::new(&config.assembly.checkpoint_path);
    if config.fresh {
        info!(path = %store.path().display(), "clearing checkpoint");
        store.clear()?;
    }
    let checkpoint = store.load()?;
    match &checkpoint {
        Some(id) => info!(checkpoint = %id, "resuming after checkpoint"),
        None => info!("starting from first row"),
    }

    let sink = JsonlSink::open(&config.output)?;
    let walker = ThreadWalker::new(archive, config.walker.clone());
    let mut assembler = Assembler::new(walker, sink, store, config.assembly.buffer_size);

    progress.started(estimated_rows, checkpoint.as_deref());
    let mut state = AssemblyState::resume_from(checkpoint);

    for (index, item) in reader.enumerate() {
        let flushes_before = state.stats().flushes;
        state = assembler.process_row(state, item?).await?;

        progress.row(index + 1, estimated_rows);
        if state.stats().flushes > flushes_before {
            if let Some(id) = state.checkpoint() {
                progress.flushed(state.stats().records_written, id);
            }
        }
    }

    let flushes_before = state.stats().flushes;
    let state = assembler.finish(state)?;
    if state.stats().flushes > flushes_before {
        if let Some(id) = state.checkpoint() {
            progress.flushed(state.stats().records_written, id);
        }
    }

    let summary = PipelineSummary {
        stats: state.stats().clone(),
        checkpoint: state.checkpoint().map(String::from),
        estimated_rows,
        checkpoint_missing: state.is_seeking(),
        elapsed: start.elapsed(),
    };

    if summary.stats.transport_failures > 0 {
        warn!(
            rows = summary.stats.transport_failures,
            "some rows were built with degraded context after archive failures"
        );
    }
    info!(
        rows = summary.stats.rows_seen,
        written = summary.stats.records_written,
        skipped_no_parent = summary.stats.rows_without_parent,
        malformed = summary.stats.rows_malformed,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "pipeline complete"
    );

    progress.done(&summary);
    Ok(summary)
}
