//! Deterministic, content-addressed thread snapshots
//!
//! A snapshot is a compaction of a thread's entries at a point in
//! logical time. Each entry is normalized to a canonical field subset
//! and folded through a stable stringify + SHA-256 digest: rebuilding
//! from an equal entry set reproduces the same digest regardless of the
//! original append order.

use covenant_types::{AuthorType, LogicalTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::state::ThreadEntry;

/// Aggregates carried alongside the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub entry_count: usize,
    pub redacted_count: usize,
    pub last_updated: String,
}

/// A content-addressed compaction of a thread's entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub thread_id: String,
    pub snapshot_version: u64,
    pub latest_entry_id: String,
    pub digest: String,
    pub summary_fields: SnapshotSummary,
    pub created_at: String,
}

/// Canonical subset of an entry that participates in the digest.
/// Optional fields collapse to defaults, list fields are sorted, and
/// serde_json's key-sorted map makes the stringify stable.
#[derive(Serialize)]
struct CanonicalEntry<'a> {
    entry_id: &'a str,
    thread_id: &'a str,
    author_type: AuthorType,
    intent_id: &'a str,
    created_at: &'a str,
    content_text: &'a str,
    content_redacted: &'a str,
    pii_flags: Vec<&'a str>,
    refs: Vec<&'a str>,
}

impl<'a> CanonicalEntry<'a> {
    fn from(entry: &'a ThreadEntry) -> Self {
        let mut pii_flags: Vec<&str> = entry.pii_flags.iter().map(String::as_str).collect();
        pii_flags.sort_unstable();
        let mut refs: Vec<&str> = entry.refs.iter().map(String::as_str).collect();
        refs.sort_unstable();
        Self {
            entry_id: &entry.entry_id,
            thread_id: &entry.thread_id,
            author_type: entry.author_type,
            intent_id: entry.intent_id.as_deref().unwrap_or(""),
            created_at: &entry.created_at,
            content_text: &entry.content_text,
            content_redacted: entry.content_redacted.as_deref().unwrap_or(""),
            pii_flags,
            refs,
        }
    }

    fn stable_stringify(&self) -> String {
        // Converting through Value sorts object keys (serde_json's map
        // is a BTreeMap), which makes the rendering canonical.
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

/// Build a snapshot over a thread's entries. Pure: equal entry sets
/// produce equal snapshots, including the digest.
pub fn build_thread_snapshot(
    thread_id: &str,
    entries: &[ThreadEntry],
    created_at_override: Option<String>,
) -> ThreadSnapshot {
    let mut sorted: Vec<&ThreadEntry> = entries
        .iter()
        .filter(|e| e.thread_id == thread_id)
        .collect();
    sorted.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

    let mut hasher = Sha256::new();
    for entry in &sorted {
        hasher.update(CanonicalEntry::from(entry).stable_stringify().as_bytes());
        hasher.update(b"\n");
    }
    let digest = hex::encode(hasher.finalize());

    let last_updated = sorted
        .last()
        .map(|e| e.created_at.clone())
        .unwrap_or_else(|| LogicalTime::ZERO.to_string());
    let latest_entry_id = sorted
        .last()
        .map(|e| e.entry_id.clone())
        .unwrap_or_default();
    let redacted_count = sorted
        .iter()
        .filter(|e| e.content_redacted.is_some())
        .count();

    ThreadSnapshot {
        thread_id: thread_id.to_string(),
        snapshot_version: sorted.len() as u64,
        latest_entry_id,
        digest,
        summary_fields: SnapshotSummary {
            entry_count: sorted.len(),
            redacted_count,
            last_updated: last_updated.clone(),
        },
        created_at: created_at_override.unwrap_or(last_updated),
    }
}
