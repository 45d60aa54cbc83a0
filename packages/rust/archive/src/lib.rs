//! Client side of the historical discussion archive.
//!
//! The walker only depends on the [`ArchiveClient`] trait:
//! - `Ok(Some(_))`: the record exists
//! - `Ok(None)`: the archive has no data for that id (a gap, not an error)
//! - `Err(_)`: transport failure (network, HTTP status, undecodable body)
//!
//! [`HttpArchiveClient`] is the production implementation; every request it
//! sends passes through a [`RequestGate`] first.

mod gate;
mod http;

use std::future::Future;

use contextpairs_shared::{Comment, Result, Submission};

pub use gate::RequestGate;
pub use http::HttpArchiveClient;

/// Read-only access to archived comments and submissions.
pub trait ArchiveClient {
    /// Look up a comment by bare id (no `t1_` prefix).
    fn fetch_comment(&self, id: &str) -> impl Future<Output = Result<Option<Comment>>> + Send;

    /// Look up a submission by bare id (no `t3_` prefix).
    fn fetch_submission(&self, id: &str)
    -> impl Future<Output = Result<Option<Submission>>> + Send;
}

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// Parsed form of a `parent_id` / `link_id` style reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `t1_<id>`: points at another comment.
    Comment(String),
    /// Anything else: points at the discussion root.
    Submission(String),
}

impl Reference {
    /// Parse a raw reference. Returns `None` for blank input.
    ///
    /// Only a `t1_` prefix marks a comment. Any other `tN_` kind prefix is
    /// stripped and the remainder treated as a submission id.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(id) = raw.strip_prefix("t1_") {
            return (!id.is_empty()).then(|| Self::Comment(id.to_string()));
        }
        let id = strip_kind_prefix(raw);
        (!id.is_empty()).then(|| Self::Submission(id.to_string()))
    }

    /// The bare id, without kind prefix.
    pub fn id(&self) -> &str {
        match self {
            Self::Comment(id) | Self::Submission(id) => id,
        }
    }
}

/// Strip a `tN_` kind prefix if present.
fn strip_kind_prefix(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b't' && bytes[1].is_ascii_digit() && bytes[2] == b'_' {
        &raw[3..]
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_comment_reference() {
        assert_eq!(
            Reference::parse("t1_xyz987"),
            Some(Reference::Comment("xyz987".into()))
        );
    }

    #[test]
    fn parse_submission_reference() {
        assert_eq!(
            Reference::parse("t3_root555"),
            Some(Reference::Submission("root555".into()))
        );
    }

    #[test]
    fn bare_id_is_a_submission() {
        assert_eq!(
            Reference::parse("root555"),
            Some(Reference::Submission("root555".into()))
        );
    }

    #[test]
    fn blank_references_are_absent() {
        assert_eq!(Reference::parse(""), None);
        assert_eq!(Reference::parse("   "), None);
        assert_eq!(Reference::parse("t1_"), None);
        assert_eq!(Reference::parse("t3_"), None);
    }

    #[test]
    fn reference_id_accessor() {
        assert_eq!(Reference::parse(" t1_abc ").unwrap().id(), "abc");
        assert_eq!(Reference::parse("t3_def").unwrap().id(), "def");
    }
}
