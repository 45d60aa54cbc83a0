//! Checkpointed assembly: turn replies into training records, one row at a time.
//!
//! All mutable progress lives in an [`AssemblyState`] value that is passed into
//! and returned from every step. The [`Assembler`] owns the side-effecting
//! dependencies (walker, sink, checkpoint store) and applies the protocol:
//!
//! 1. skip rows up to and including the checkpointed id
//! 2. walk the thread and sanitize context + response
//! 3. buffer the record
//! 4. once the buffer holds `capacity` records, append them to the sink and
//!    persist the current row's id as the checkpoint
//!
//! Output is written before the checkpoint, so a crash between the two only
//! ever re-emits records (at-least-once), never skips them.

use contextpairs_archive::ArchiveClient;
use contextpairs_sanitize::{flatten_newlines, sanitize};
use contextpairs_shared::{Reply, Result, TrainingRecord};
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::rows::RowItem;
use crate::sink::RecordSink;
use crate::walker::{ThreadContext, ThreadWalker};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where the run is relative to the checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResumeCursor {
    /// Skipping rows until this id has been seen.
    Seeking(String),
    /// Processing every row.
    Active,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Rows read, including skipped ones.
    pub rows_seen: usize,
    /// Rows skipped while seeking the checkpoint (the checkpoint row included).
    pub rows_resumed_past: usize,
    /// Rows with no parent reference.
    pub rows_without_parent: usize,
    pub rows_malformed: usize,
    /// Records built and buffered.
    pub records_built: usize,
    /// Records appended to the sink.
    pub records_written: usize,
    pub flushes: usize,
    /// Rows whose context lost a lookup to a transport failure.
    pub transport_failures: usize,
    /// Rows whose discussion root did not resolve.
    pub roots_unresolved: usize,
}

/// Everything that changes while assembling: buffer, checkpoint, cursor, stats.
#[derive(Debug, Clone)]
pub struct AssemblyState {
    buffer: Vec<TrainingRecord>,
    checkpoint: Option<String>,
    cursor: ResumeCursor,
    stats: AssemblyStats,
}

impl AssemblyState {
    /// Start at the first row.
    pub fn fresh() -> Self {
        Self::resume_from(None)
    }

    /// Start after `checkpoint`, or at the first row when there is none.
    pub fn resume_from(checkpoint: Option<String>) -> Self {
        let cursor = match &checkpoint {
            Some(id) => ResumeCursor::Seeking(id.clone()),
            None => ResumeCursor::Active,
        };
        Self {
            buffer: Vec::new(),
            checkpoint,
            cursor,
            stats: AssemblyStats::default(),
        }
    }

    /// Records waiting for the next flush.
    pub fn buffered(&self) -> &[TrainingRecord] {
        &self.buffer
    }

    /// Last persisted checkpoint id.
    pub fn checkpoint(&self) -> Option<&str> {
        self.checkpoint.as_deref()
    }

    pub fn stats(&self) -> &AssemblyStats {
        &self.stats
    }

    /// True while rows are still being skipped toward the checkpoint.
    pub fn is_seeking(&self) -> bool {
        matches!(self.cursor, ResumeCursor::Seeking(_))
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Applies the per-row protocol against injected walker, sink, and store.
pub struct Assembler<A, S, C> {
    walker: ThreadWalker<A>,
    sink: S,
    store: C,
    capacity: usize,
}

impl<A, S, C> Assembler<A, S, C>
where
    A: ArchiveClient,
    S: RecordSink,
    C: CheckpointStore,
{
    /// `capacity` is clamped to at least one record.
    pub fn new(walker: ThreadWalker<A>, sink: S, store: C, capacity: usize) -> Self {
        Self {
            walker,
            sink,
            store,
            capacity: capacity.max(1),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Process one input row and return the updated state.
    ///
    /// Only sink or checkpoint failures are errors; archive trouble degrades the
    /// row's context instead.
    pub async fn process_row(
        &mut self,
        mut state: AssemblyState,
        item: RowItem,
    ) -> Result<AssemblyState> {
        state.stats.rows_seen += 1;

        if let ResumeCursor::Seeking(target) = &state.cursor {
            if matches!(&item, RowItem::Reply(reply) if &reply.id == target) {
                info!(id = %target, "checkpoint reached, resuming at next row");
                state.cursor = ResumeCursor::Active;
            }
            state.stats.rows_resumed_past += 1;
            return Ok(state);
        }

        let reply = match item {
            RowItem::Reply(reply) => reply,
            RowItem::Malformed { line, message } => {
                warn!(line, %message, "skipping malformed row");
                state.stats.rows_malformed += 1;
                return Ok(state);
            }
        };

        if !reply.has_parent() {
            debug!(id = %reply.id, "no parent reference, skipping");
            state.stats.rows_without_parent += 1;
            return Ok(state);
        }

        let (record, thread) = self.build_record(&reply).await;
        if thread.had_transport_failure() {
            state.stats.transport_failures += 1;
        }
        if !thread.root.is_resolved() {
            state.stats.roots_unresolved += 1;
        }
        info!(
            id = %reply.id,
            ancestors = thread.chain.len(),
            chain_end = %thread.chain_end,
            root = %thread.root,
            "row assembled"
        );

        state.buffer.push(record);
        state.stats.records_built += 1;

        if state.buffer.len() >= self.capacity {
            self.flush(&mut state, &reply.id)?;
        }
        Ok(state)
    }

    /// Build the training record for a reply that has a parent.
    pub async fn build_record(&self, reply: &Reply) -> (TrainingRecord, ThreadContext) {
        let thread = self
            .walker
            .walk(&reply.parent_reference, &reply.discussion_link)
            .await;

        let record = TrainingRecord {
            date: reply.date.clone(),
            message_id: reply.id.clone(),
            community: reply.community.clone(),
            author: String::new(),
            context: sanitize(&thread.context_text()),
            response: sanitize(&flatten_newlines(&reply.body)),
        };
        (record, thread)
    }

    /// Flush whatever is left at end of input.
    ///
    /// The last buffered record's id becomes the checkpoint, so a completed run
    /// resumes with nothing to redo.
    pub fn finish(&mut self, mut state: AssemblyState) -> Result<AssemblyState> {
        if let Some(last) = state.buffer.last().map(|r| r.message_id.clone()) {
            self.flush(&mut state, &last)?;
        }
        if let ResumeCursor::Seeking(target) = &state.cursor {
            warn!(
                checkpoint = %target,
                rows = state.stats.rows_seen,
                "checkpoint id never appeared in input, nothing was emitted"
            );
        }
        Ok(state)
    }

    fn flush(&mut self, state: &mut AssemblyState, checkpoint_id: &str) -> Result<()> {
        let count = state.buffer.len();
        self.sink.append(&state.buffer)?;
        self.store.save(checkpoint_id)?;

        state.buffer.clear();
        state.checkpoint = Some(checkpoint_id.to_string());
        state.stats.records_written += count;
        state.stats.flushes += 1;

        info!(
            records = count,
            total = state.stats.records_written,
            checkpoint = checkpoint_id,
            "flushed"
        );
        Ok(())
    }
}
