//! Core domain types: input replies, archive records, and output records.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// One authored reply, read from a single row of the input export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reply {
    /// Reply identifier (no kind prefix).
    pub id: String,
    /// Reply text as authored.
    pub body: String,
    /// Creation date, passed through verbatim.
    pub date: String,
    /// Reference to the discussion root this reply belongs to (e.g. `t3_abc`).
    #[serde(rename = "link")]
    pub discussion_link: String,
    /// Reference to the direct parent (e.g. `t1_xyz` or `t3_abc`).
    #[serde(rename = "parent")]
    pub parent_reference: String,
    /// Community the reply was posted in.
    #[serde(rename = "subreddit")]
    pub community: String,
}

impl Reply {
    /// Whether this reply has a parent to build context from.
    pub fn has_parent(&self) -> bool {
        !self.parent_reference.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Archive records
// ---------------------------------------------------------------------------

/// A historical comment recovered from the archive.
///
/// Absent and `null` string fields both decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    /// Reference to this comment's parent.
    #[serde(default, rename = "parent_id", deserialize_with = "null_as_empty")]
    pub parent_reference: String,
    /// Reference to the discussion root.
    #[serde(default, rename = "link_id", deserialize_with = "null_as_empty")]
    pub discussion_link: String,
}

/// A discussion root (top-level post).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub selftext: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Submission {
    /// True when the root resolved but carries no text at all.
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.selftext.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// TrainingRecord
// ---------------------------------------------------------------------------

/// One (context, response) pair, written as a single NDJSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub date: String,
    pub message_id: String,
    #[serde(rename = "subreddit")]
    pub community: String,
    /// Always empty in this pipeline.
    pub author: String,
    pub context: String,
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_record_uses_export_field_names() {
        let record = TrainingRecord {
            date: "2023-04-01".into(),
            message_id: "abc1234".into(),
            community: "rust".into(),
            author: String::new(),
            context: "Help me Original Q".into(),
            response: "Sure thing! Thanks".into(),
        };

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["subreddit"], "rust");
        assert_eq!(value["author"], "");
        assert!(value.get("community").is_none());
    }

    #[test]
    fn comment_tolerates_missing_fields() {
        let json = r#"{"id": "xyz987", "body": "Original Q"}"#;
        let comment: Comment = serde_json::from_str(json).expect("deserialize");
        assert_eq!(comment.body, "Original Q");
        assert!(comment.parent_reference.is_empty());
        assert!(comment.discussion_link.is_empty());
    }

    #[test]
    fn null_fields_decode_as_empty() {
        let json = r#"{"id": "x", "body": "Original Q", "parent_id": "t3_r", "link_id": null}"#;
        let comment: Comment = serde_json::from_str(json).expect("deserialize");
        assert_eq!(comment.parent_reference, "t3_r");
        assert!(comment.discussion_link.is_empty());

        let sub: Submission =
            serde_json::from_str(r#"{"title": "Help me", "selftext": null}"#).expect("deserialize");
        assert_eq!(sub.title, "Help me");
        assert!(sub.selftext.is_empty());
    }

    #[test]
    fn blank_submission_detection() {
        assert!(Submission::default().is_blank());
        let sub = Submission {
            title: "Help me".into(),
            selftext: String::new(),
        };
        assert!(!sub.is_blank());
    }

    #[test]
    fn reply_parent_presence() {
        let mut reply = Reply {
            id: "abc1234".into(),
            body: "hi".into(),
            date: "2023-04-01".into(),
            discussion_link: "t3_root555".into(),
            parent_reference: "t1_xyz987".into(),
            community: "rust".into(),
        };
        assert!(reply.has_parent());
        reply.parent_reference = "  ".into();
        assert!(!reply.has_parent());
    }
}
