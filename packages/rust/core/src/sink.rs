//! Append-only NDJSON output.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contextpairs_shared::{ContextPairsError, Result, TrainingRecord};

/// Destination for flushed records, injected into the assembler.
pub trait RecordSink {
    /// Durably append `records` in order.
    fn append(&mut self, records: &[TrainingRecord]) -> Result<()>;
}

/// One compact JSON object per line, appended to a file.
pub struct JsonlSink {
    path: PathBuf,
    file: File,
}

impl JsonlSink {
    /// Open (or create) `path` for appending. Existing lines are kept.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ContextPairsError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ContextPairsError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl RecordSink for JsonlSink {
    fn append(&mut self, records: &[TrainingRecord]) -> Result<()> {
        let mut writer = BufWriter::new(&mut self.file);
        for record in records {
            serde_json::to_writer(&mut writer, record)
                .map_err(|e| ContextPairsError::io(&self.path, e.into()))?;
            writer
                .write_all(b"\n")
                .map_err(|e| ContextPairsError::io(&self.path, e))?;
        }
        writer
            .flush()
            .map_err(|e| ContextPairsError::io(&self.path, e))?;
        drop(writer);

        self.file
            .sync_data()
            .map_err(|e| ContextPairsError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scratch_dir;

    fn record(id: &str, context: &str) -> TrainingRecord {
        TrainingRecord {
            date: "2023-04-01".into(),
            message_id: id.into(),
            community: "rust".into(),
            author: String::new(),
            context: context.into(),
            response: "ok".into(),
        }
    }

    #[test]
    fn appends_one_object_per_line() {
        let dir = scratch_dir("sink-lines");
        let path = dir.join("out.jsonl");

        let mut sink = JsonlSink::open(&path).unwrap();
        sink.append(&[record("a", "first"), record("b", "second")])
            .unwrap();
        sink.append(&[record("c", "third")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        let parsed: TrainingRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.message_id, "b");
        assert!(lines[0].contains("\"subreddit\":\"rust\""));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reopening_keeps_existing_output() {
        let dir = scratch_dir("sink-reopen");
        let path = dir.join("out.jsonl");

        JsonlSink::open(&path)
            .unwrap()
            .append(&[record("a", "x")])
            .unwrap();
        JsonlSink::open(&path)
            .unwrap()
            .append(&[record("b", "y")])
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn non_ascii_is_written_verbatim() {
        let dir = scratch_dir("sink-utf8");
        let path = dir.join("out.jsonl");

        let mut sink = JsonlSink::open(&path).unwrap();
        sink.append(&[record("a", "naïve café ✓")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("naïve café ✓"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
