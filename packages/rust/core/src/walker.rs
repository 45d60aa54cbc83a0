//! Ancestor-chain walk: recover a reply's upstream conversation from the archive.
//!
//! Starting at the reply's parent reference, the walker follows `t1_` comment
//! references upward, collecting bodies nearest-first, until it reaches a
//! submission root or the archive stops answering. It then resolves the root
//! submission. The walk never fails: every archive problem degrades to a shorter
//! chain or an unresolved root, and the reason is kept in [`ThreadContext`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use contextpairs_archive::{ArchiveClient, Reference};
use contextpairs_sanitize::flatten_newlines;
use contextpairs_shared::{Result, Submission, WalkerConfig};
use tracing::{debug, instrument, warn};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why the ancestor walk stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEnd {
    /// The next reference pointed at a submission root.
    Root,
    /// The archive had no record for this comment id.
    NotFound { id: String },
    /// The archive could not be reached for this comment id.
    TransportFailure { id: String, message: String },
    /// There was no parent reference to follow.
    Detached,
    /// `max_depth` ancestors were collected.
    DepthLimit,
}

impl fmt::Display for ChainEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::NotFound { id } => write!(f, "not_found({id})"),
            Self::TransportFailure { id, .. } => write!(f, "transport_failure({id})"),
            Self::Detached => write!(f, "detached"),
            Self::DepthLimit => write!(f, "depth_limit"),
        }
    }
}

/// Result of resolving the discussion root.
///
/// A root that resolved with no text is still `Resolved`; it is never
/// conflated with a failed or missing lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootOutcome {
    Resolved {
        submission: Submission,
        /// Found through the reply's own link after the primary lookup missed.
        via_fallback: bool,
    },
    NotFound,
    Failed { message: String },
    /// No usable discussion link to look up.
    NoLink,
}

impl RootOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

impl fmt::Display for RootOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved {
                via_fallback: false,
                ..
            } => write!(f, "resolved"),
            Self::Resolved {
                via_fallback: true, ..
            } => write!(f, "resolved_fallback"),
            Self::NotFound => write!(f, "not_found"),
            Self::Failed { .. } => write!(f, "failed"),
            Self::NoLink => write!(f, "no_link"),
        }
    }
}

/// Everything recovered for one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadContext {
    /// Ancestor bodies, nearest parent first. Newlines already flattened.
    pub chain: Vec<String>,
    pub chain_end: ChainEnd,
    pub root: RootOutcome,
}

impl ThreadContext {
    /// Body of the direct parent, if it was recovered.
    pub fn nearest(&self) -> Option<&str> {
        self.chain.first().map(String::as_str)
    }

    /// Whether any archive lookup for this reply hit a transport failure.
    pub fn had_transport_failure(&self) -> bool {
        matches!(self.chain_end, ChainEnd::TransportFailure { .. })
            || matches!(self.root, RootOutcome::Failed { .. })
    }

    /// Unsanitized context: `selftext title nearest`, empty parts omitted.
    pub fn context_text(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if let RootOutcome::Resolved { submission, .. } = &self.root {
            parts.push(flatten_newlines(&submission.selftext));
            parts.push(flatten_newlines(&submission.title));
        }
        if let Some(nearest) = self.nearest() {
            parts.push(nearest.to_string());
        }
        parts.retain(|p| !p.trim().is_empty());
        parts.join(" ")
    }
}

// ---------------------------------------------------------------------------
// ThreadWalker
// ---------------------------------------------------------------------------

/// Walks ancestor chains against an [`ArchiveClient`].
pub struct ThreadWalker<A> {
    archive: A,
    config: WalkerConfig,
}

impl<A: ArchiveClient> ThreadWalker<A> {
    pub fn new(archive: A, config: WalkerConfig) -> Self {
        Self { archive, config }
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    /// Reconstruct the thread above a reply.
    #[instrument(skip_all, fields(parent = %parent_reference))]
    pub async fn walk(&self, parent_reference: &str, discussion_link: &str) -> ThreadContext {
        let mut chain: Vec<String> = Vec::new();
        let mut last_link: Option<String> = None;
        let mut next = Reference::parse(parent_reference);

        let chain_end = loop {
            let id = match next {
                Some(Reference::Comment(id)) => id,
                Some(Reference::Submission(_)) => break ChainEnd::Root,
                None => break ChainEnd::Detached,
            };
            if chain.len() >= self.config.max_depth {
                break ChainEnd::DepthLimit;
            }

            match self
                .with_retries(|| self.archive.fetch_comment(&id))
                .await
            {
                Ok(Some(comment)) => {
                    debug!(%id, depth = chain.len() + 1, "ancestor recovered");
                    chain.push(flatten_newlines(&comment.body));
                    if !comment.discussion_link.trim().is_empty() {
                        last_link = Some(comment.discussion_link);
                    }
                    next = Reference::parse(&comment.parent_reference);
                }
                Ok(None) => {
                    debug!(%id, "ancestor missing from archive");
                    break ChainEnd::NotFound { id };
                }
                Err(e) => {
                    warn!(%id, error = %e, "ancestor lookup failed");
                    break ChainEnd::TransportFailure {
                        id,
                        message: e.to_string(),
                    };
                }
            }
        };

        let primary_link = last_link.as_deref().unwrap_or(discussion_link);
        let mut root = self.resolve_root(primary_link).await;

        if !root.is_resolved() && discussion_link.trim() != primary_link.trim() {
            debug!(link = discussion_link, "retrying root through reply link");
            match self.resolve_root(discussion_link).await {
                RootOutcome::Resolved { submission, .. } => {
                    root = RootOutcome::Resolved {
                        submission,
                        via_fallback: true,
                    };
                }
                other if root == RootOutcome::NoLink => root = other,
                _ => {}
            }
        }

        ThreadContext {
            chain,
            chain_end,
            root,
        }
    }

    async fn resolve_root(&self, link: &str) -> RootOutcome {
        let Some(reference) = Reference::parse(link) else {
            return RootOutcome::NoLink;
        };
        let id = reference.id();

        match self
            .with_retries(|| self.archive.fetch_submission(id))
            .await
        {
            Ok(Some(submission)) => {
                if submission.is_blank() {
                    debug!(%id, "root resolved with no title or selftext");
                }
                RootOutcome::Resolved {
                    submission,
                    via_fallback: false,
                }
            }
            Ok(None) => RootOutcome::NotFound,
            Err(e) => {
                warn!(%id, error = %e, "root lookup failed");
                RootOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Run `op`, retrying transport failures with doubling delays.
    async fn with_retries<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Err(e) if e.is_transport() && attempt < self.config.retries => {
                    let delay = self
                        .config
                        .retry_backoff_ms
                        .saturating_mul(1u64 << attempt.min(16));
                    debug!(attempt = attempt + 1, delay_ms = delay, error = %e, "retrying archive lookup");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
