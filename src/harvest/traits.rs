//! Derived-field computation and the harvest event channel.
//!
//! - [`Derivation`] selects what a fetched source file yields
//! - [`derive_fields`] turns a payload into [`DerivedFields`]
//! - [`HarvestObserver`] receives [`HarvestEvent`]s from the loop; the
//!   default [`TracingObserver`] forwards them to `tracing`

use std::path::PathBuf;
use tracing::{info, warn};

use crate::model::{DerivedFields, HarvestItem, Payload};

// ============================================================================
// Derivations
// ============================================================================

/// What to compute from a fetched source file.
///
/// Repository-metadata payloads always yield the popularity counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Derivation {
    /// Number of lines in the file
    #[default]
    LineCount,

    /// Whether the file contains the keyword (case-sensitive substring)
    Keyword(String),
}

/// Number of lines in `content`.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`. An empty string has zero
/// lines; a trailing line break does not start a new one.
pub fn line_count(content: &str) -> usize {
    content
        .replace("\r\n", "\n")
        .split_terminator(|c| c == '\n' || c == '\r')
        .count()
}

pub fn contains_keyword(content: &str, keyword: &str) -> bool {
    content.contains(keyword)
}

pub fn derive_fields(payload: &Payload, derivation: &Derivation) -> DerivedFields {
    match (payload, derivation) {
        (Payload::Repository(stats), _) => DerivedFields::Popularity(stats.clone()),
        (Payload::Source(text), Derivation::LineCount) => DerivedFields::Lines(line_count(text)),
        (Payload::Source(text), Derivation::Keyword(keyword)) => {
            DerivedFields::Keyword(contains_keyword(text, keyword))
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Why an item produced a sentinel row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    NotFound { status: u16, body: String },
    Transport { detail: String },
}

/// Observable side effects of a harvest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    Started { total: usize },
    ItemFailed {
        index: usize,
        item: HarvestItem,
        reason: FailureReason,
    },
    ArtifactWritten { index: usize, path: PathBuf },
    Progress { processed: usize, total: usize },
    Finished { total: usize, failed: usize },
}

pub trait HarvestObserver: Send + Sync {
    fn on_event(&self, event: &HarvestEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl HarvestObserver for TracingObserver {
    fn on_event(&self, event: &HarvestEvent) {
        match event {
            HarvestEvent::Started { total } => info!(total, "Starting harvest"),
            HarvestEvent::ItemFailed {
                index,
                item,
                reason: FailureReason::NotFound { status, body },
            } => warn!(
                index,
                repo = %item.owner_repo,
                path = item.path.as_deref().unwrap_or(""),
                status,
                body = %body,
                "Fetch failed"
            ),
            HarvestEvent::ItemFailed {
                index,
                item,
                reason: FailureReason::Transport { detail },
            } => warn!(
                index,
                repo = %item.owner_repo,
                path = item.path.as_deref().unwrap_or(""),
                error = %detail,
                "Request failed"
            ),
            HarvestEvent::ArtifactWritten { index, path } => {
                tracing::debug!(index, path = %path.display(), "Source saved")
            }
            HarvestEvent::Progress { processed, total } => {
                info!(processed, total, "{}/{}", processed, total)
            }
            HarvestEvent::Finished { total, failed } => {
                info!(total, failed, "Harvest completed")
            }
        }
    }
}
