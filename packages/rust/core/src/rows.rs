//! CSV row source and row-count estimator.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use contextpairs_shared::{ContextPairsError, Reply, Result};
use regex::Regex;

/// Header names every input export must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = ["id", "body", "date", "link", "parent", "subreddit"];

/// One item read from the input, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowItem {
    Reply(Reply),
    /// A row that could not be decoded into a [`Reply`].
    Malformed { line: u64, message: String },
}

/// Streaming reader over a reply export.
///
/// Unreadable input is an `Err`; a bad individual row is
/// `Ok(RowItem::Malformed)` so the caller can skip it and continue.
pub struct RowReader {
    path: PathBuf,
    records: csv::DeserializeRecordsIntoIter<File, Reply>,
}

impl RowReader {
    /// Open an export and check its header row.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ContextPairsError::io(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| ContextPairsError::Input(format!("{}: {e}", path.display())))?;
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(ContextPairsError::Input(format!(
                    "{}: missing required column '{column}'",
                    path.display()
                )));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            records: reader.into_deserialize(),
        })
    }
}

impl Iterator for RowReader {
    type Item = Result<RowItem>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.records.next()? {
            Ok(reply) if reply.id.trim().is_empty() => RowItem::Malformed {
                line: 0,
                message: "empty id".into(),
            },
            Ok(reply) => RowItem::Reply(reply),
            Err(e) if e.is_io_error() => {
                return Some(Err(ContextPairsError::Input(format!(
                    "{}: {e}",
                    self.path.display()
                ))));
            }
            Err(e) => RowItem::Malformed {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            },
        };
        Some(Ok(item))
    }
}

/// Rough row count for progress display: lines that start like a reply id.
///
/// Multi-line bodies make an exact count impossible without parsing, so this
/// counts lines beginning with seven lowercase alphanumerics.
pub fn estimate_rows(path: &Path) -> Result<usize> {
    static ID_LINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[a-z0-9]{7}").expect("valid regex"));

    let file = File::open(path).map_err(|e| ContextPairsError::io(path, e))?;
    let mut count = 0;
    for line in BufReader::new(file).split(b'\n') {
        let line = line.map_err(|e| ContextPairsError::io(path, e))?;
        if ID_LINE_RE.is_match(&String::from_utf8_lossy(&line)) {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scratch_dir;

    const HEADER: &str = "id,body,date,link,parent,subreddit\n";

    fn write_csv(label: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = scratch_dir(label);
        let path = dir.join("comments.csv");
        std::fs::write(&path, content).expect("write csv");
        (dir, path)
    }

    #[test]
    fn reads_replies_in_file_order() {
        let (dir, path) = write_csv(
            "rows-order",
            &format!(
                "{HEADER}abc1234,\"Sure thing!\nThanks\",2023-04-01,t3_root555,t1_xyz987,rust\n\
                 def5678,Second,2023-04-02,t3_root555,,rust\n"
            ),
        );

        let items: Vec<RowItem> = RowReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items.len(), 2);
        match &items[0] {
            RowItem::Reply(reply) => {
                assert_eq!(reply.id, "abc1234");
                assert_eq!(reply.body, "Sure thing!\nThanks");
                assert_eq!(reply.parent_reference, "t1_xyz987");
                assert_eq!(reply.discussion_link, "t3_root555");
                assert_eq!(reply.community, "rust");
            }
            other => panic!("expected reply, got {other:?}"),
        }
        assert!(matches!(&items[1], RowItem::Reply(r) if !r.has_parent()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let (dir, path) = write_csv(
            "rows-extra",
            "score,id,body,date,link,parent,subreddit,permalink\n\
             5,abc1234,hi,2023-04-01,t3_r,t1_p,rust,/r/rust/x\n",
        );

        let items: Vec<RowItem> = RowReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert!(matches!(&items[0], RowItem::Reply(r) if r.id == "abc1234"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn spaced_header_names_are_trimmed() {
        let (dir, path) = write_csv(
            "rows-spaced-header",
            "id, body, date, link, parent, subreddit\n\
             abc1234,hi,2023-04-01,t3_r,t1_p,rust\n",
        );

        let items: Vec<RowItem> = RowReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items.len(), 1);
        match &items[0] {
            RowItem::Reply(reply) => {
                assert_eq!(reply.body, "hi");
                assert_eq!(reply.parent_reference, "t1_p");
                assert_eq!(reply.community, "rust");
            }
            other => panic!("expected reply, got {other:?}"),
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn short_row_is_malformed_and_reading_continues() {
        let (dir, path) = write_csv(
            "rows-short",
            &format!("{HEADER}abc1234,only two\ndef5678,ok,2023-04-02,t3_r,t1_p,rust\n"),
        );

        let items: Vec<RowItem> = RowReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], RowItem::Malformed { .. }));
        assert!(matches!(&items[1], RowItem::Reply(r) if r.id == "def5678"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_id_is_malformed() {
        let (dir, path) = write_csv(
            "rows-empty-id",
            &format!("{HEADER},body,2023-04-02,t3_r,t1_p,rust\n"),
        );

        let items: Vec<RowItem> = RowReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert!(matches!(&items[0], RowItem::Malformed { message, .. } if message == "empty id"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_column_is_fatal() {
        let (dir, path) = write_csv("rows-missing-col", "id,body,date,link,subreddit\n");

        let err = RowReader::open(&path).err().expect("missing column must fail");
        assert!(err.to_string().contains("'parent'"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = scratch_dir("rows-missing-file");
        let err = RowReader::open(&dir.join("nope.csv")).err().expect("must fail");
        assert!(matches!(err, ContextPairsError::Io { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn estimate_counts_id_lines() {
        let (dir, path) = write_csv(
            "rows-estimate",
            &format!(
                "{HEADER}abc1234,\"multi\nline body\",2023-04-01,t3_r,t1_p,rust\n\
                 def5678,x,2023-04-02,t3_r,t1_p,rust\n"
            ),
        );

        assert_eq!(estimate_rows(&path).unwrap(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
