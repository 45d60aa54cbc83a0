//! In-memory fakes shared by the walker, assembler, and pipeline tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use contextpairs_archive::ArchiveClient;
use contextpairs_shared::{
    Comment, ContextPairsError, Reply, Result, Submission, TrainingRecord,
};

use crate::checkpoint::CheckpointStore;
use crate::sink::RecordSink;

/// Archive backed by hash maps, with scripted failures.
#[derive(Default)]
pub(crate) struct FakeArchive {
    comments: HashMap<String, Comment>,
    submissions: HashMap<String, Submission>,
    broken: HashSet<String>,
    flaky: Mutex<HashMap<String, u32>>,
    calls: Mutex<Vec<String>>,
}

impl FakeArchive {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn comment(mut self, id: &str, body: &str, parent: &str, link: &str) -> Self {
        self.comments.insert(
            id.to_string(),
            Comment {
                id: id.to_string(),
                body: body.to_string(),
                parent_reference: parent.to_string(),
                discussion_link: link.to_string(),
            },
        );
        self
    }

    pub(crate) fn submission(mut self, id: &str, title: &str, selftext: &str) -> Self {
        self.submissions.insert(
            id.to_string(),
            Submission {
                title: title.to_string(),
                selftext: selftext.to_string(),
            },
        );
        self
    }

    /// Every lookup of `id` fails with a transport error.
    pub(crate) fn broken(mut self, id: &str) -> Self {
        self.broken.insert(id.to_string());
        self
    }

    /// The first `failures` lookups of `id` fail, later ones succeed.
    pub(crate) fn flaky(self, id: &str, failures: u32) -> Self {
        self.flaky.lock().unwrap().insert(id.to_string(), failures);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, kind: &str, id: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{kind}:{id}"));
        if self.broken.contains(id) {
            return Err(ContextPairsError::Network(format!("{id}: connection reset")));
        }
        let mut flaky = self.flaky.lock().unwrap();
        if let Some(remaining) = flaky.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ContextPairsError::Network(format!("{id}: HTTP 502")));
            }
        }
        Ok(())
    }
}

impl ArchiveClient for FakeArchive {
    async fn fetch_comment(&self, id: &str) -> Result<Option<Comment>> {
        self.check("comment", id)?;
        Ok(self.comments.get(id).cloned())
    }

    async fn fetch_submission(&self, id: &str) -> Result<Option<Submission>> {
        self.check("submission", id)?;
        Ok(self.submissions.get(id).cloned())
    }
}

/// Checkpoint held in memory, counting writes.
#[derive(Default)]
pub(crate) struct MemoryCheckpoint {
    pub(crate) id: Option<String>,
    pub(crate) saves: usize,
}

impl MemoryCheckpoint {
    pub(crate) fn at(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            saves: 0,
        }
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.id.clone())
    }

    fn save(&mut self, id: &str) -> Result<()> {
        self.id = Some(id.to_string());
        self.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.id = None;
        Ok(())
    }
}

/// Sink that keeps every appended batch.
#[derive(Default)]
pub(crate) struct VecSink {
    pub(crate) batches: Vec<Vec<TrainingRecord>>,
}

impl VecSink {
    pub(crate) fn records(&self) -> Vec<&TrainingRecord> {
        self.batches.iter().flatten().collect()
    }

    pub(crate) fn ids(&self) -> Vec<&str> {
        self.records().iter().map(|r| r.message_id.as_str()).collect()
    }
}

impl RecordSink for VecSink {
    fn append(&mut self, records: &[TrainingRecord]) -> Result<()> {
        self.batches.push(records.to_vec());
        Ok(())
    }
}

pub(crate) fn reply(id: &str, parent: &str, body: &str, link: &str) -> Reply {
    Reply {
        id: id.to_string(),
        body: body.to_string(),
        date: "2023-04-01".to_string(),
        discussion_link: link.to_string(),
        parent_reference: parent.to_string(),
        community: "rust".to_string(),
    }
}

/// Unique scratch directory under the system temp dir.
pub(crate) fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cp-{label}-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
