//! Context reconstruction and checkpointed dataset assembly.
//!
//! This crate ties together the archive client, the sanitizer, the CSV row
//! source, and crash-safe output into the end-to-end `run_pipeline` workflow.

pub mod assembler;
pub mod checkpoint;
pub mod pipeline;
pub mod rows;
pub mod sink;
pub mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use assembler::{Assembler, AssemblyState, AssemblyStats};
pub use checkpoint::{CheckpointStore, FileCheckpoint};
pub use pipeline::{PipelineConfig, PipelineSummary, ProgressReporter, SilentProgress, run_pipeline};
pub use rows::{RowItem, RowReader, estimate_rows};
pub use sink::{JsonlSink, RecordSink};
pub use walker::{ChainEnd, RootOutcome, ThreadContext, ThreadWalker};
