//! Thread store state and its pure transformations

use covenant_types::{AuthorType, LogicalTime, ThreadScope};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::snapshot::ThreadSnapshot;

/// Errors from thread store transformations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadStoreError {
    #[error("owner_id required")]
    OwnerRequired,

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),
}

/// A conversation/decision thread. Created once; `updated_at` bumped on
/// every append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    pub owner_id: String,
    pub scope: ThreadScope,
    pub created_at: String,
    pub updated_at: String,
}

/// One append-only utterance or tombstone within a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub entry_id: String,
    pub thread_id: String,
    pub author_type: AuthorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
    pub created_at: String,
    pub content_text: String,
    /// Redaction reason when this entry is a tombstone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_redacted: Option<String>,
    #[serde(default)]
    pub pii_flags: Vec<String>,
    /// Entry ids this entry refers to (e.g. the entry it redacts)
    #[serde(default)]
    pub refs: Vec<String>,
}

impl ThreadEntry {
    /// Total-order key used by every read path: parsed logical time,
    /// then entry id lexicographically.
    pub fn order_key(&self) -> (u64, &str) {
        (LogicalTime::order_key(&self.created_at), self.entry_id.as_str())
    }
}

/// Input for [`ThreadStoreState::create_thread`].
#[derive(Debug, Clone, Default)]
pub struct CreateThread {
    pub thread_id: Option<String>,
    pub owner_id: String,
    pub scope: ThreadScope,
    pub created_at: Option<String>,
}

/// Input for [`ThreadStoreState::append_entry`].
#[derive(Debug, Clone)]
pub struct AppendEntry {
    pub entry_id: Option<String>,
    pub thread_id: String,
    pub author_type: AuthorType,
    pub intent_id: Option<String>,
    pub created_at: Option<String>,
    pub content_text: String,
    pub content_redacted: Option<String>,
    pub pii_flags: Vec<String>,
    pub refs: Vec<String>,
}

impl AppendEntry {
    pub fn new(thread_id: impl Into<String>, author_type: AuthorType, text: impl Into<String>) -> Self {
        Self {
            entry_id: None,
            thread_id: thread_id.into(),
            author_type,
            intent_id: None,
            created_at: None,
            content_text: text.into(),
            content_redacted: None,
            pii_flags: Vec::new(),
            refs: Vec::new(),
        }
    }
}

/// Input for [`ThreadStoreState::append_redaction`].
#[derive(Debug, Clone)]
pub struct AppendRedaction {
    pub thread_id: String,
    pub redacted_entry_id: String,
    pub reason: String,
    /// Author of the tombstone; defaults to `system`
    pub author_type: Option<AuthorType>,
}

/// The whole store, passed explicitly through every operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadStoreState {
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub entries: Vec<ThreadEntry>,
    #[serde(default)]
    pub snapshots: Vec<ThreadSnapshot>,
    #[serde(default)]
    pub logical_clock: u64,
}

impl ThreadStoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the logical clock one tick.
    pub fn advance_clock(mut self) -> (Self, LogicalTime) {
        self.logical_clock += 1;
        let now = LogicalTime::new(self.logical_clock);
        (self, now)
    }

    /// Clock discipline shared by all writes: a supplied timestamp is
    /// kept verbatim and fast-forwards the clock when it encodes a
    /// higher logical time; otherwise the clock advances and stamps.
    fn stamp(mut self, supplied: Option<String>) -> (Self, String) {
        match supplied {
            Some(raw) => {
                if let Some(t) = LogicalTime::parse(&raw) {
                    if t.tick() > self.logical_clock {
                        self.logical_clock = t.tick();
                    }
                }
                (self, raw)
            }
            None => {
                let (state, now) = self.advance_clock();
                (state, now.to_string())
            }
        }
    }

    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.thread_id == thread_id)
    }

    pub fn entry(&self, entry_id: &str) -> Option<&ThreadEntry> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    /// A thread's entries in the canonical total order.
    pub fn entries_for(&self, thread_id: &str) -> Vec<&ThreadEntry> {
        let mut entries: Vec<&ThreadEntry> = self
            .entries
            .iter()
            .filter(|e| e.thread_id == thread_id)
            .collect();
        entries.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        entries
    }

    /// Create a thread. Requires a non-empty owner.
    pub fn create_thread(self, input: CreateThread) -> Result<(Self, Thread), ThreadStoreError> {
        if input.owner_id.trim().is_empty() {
            return Err(ThreadStoreError::OwnerRequired);
        }

        let (mut state, created_at) = self.stamp(input.created_at);
        let thread_id = input
            .thread_id
            .unwrap_or_else(|| format!("thread-{created_at}"));
        let thread = Thread {
            thread_id,
            owner_id: input.owner_id,
            scope: input.scope,
            created_at: created_at.clone(),
            updated_at: created_at,
        };
        debug!(thread_id = %thread.thread_id, scope = %thread.scope, "thread created");
        state.threads.push(thread.clone());
        Ok((state, thread))
    }

    /// Append an entry to an existing thread and bump its `updated_at`.
    pub fn append_entry(self, input: AppendEntry) -> Result<(Self, ThreadEntry), ThreadStoreError> {
        if self.thread(&input.thread_id).is_none() {
            return Err(ThreadStoreError::ThreadNotFound(input.thread_id));
        }

        let (mut state, created_at) = self.stamp(input.created_at);
        let entry = ThreadEntry {
            entry_id: input
                .entry_id
                .unwrap_or_else(|| format!("entry-{created_at}")),
            thread_id: input.thread_id,
            author_type: input.author_type,
            intent_id: input.intent_id,
            created_at: created_at.clone(),
            content_text: input.content_text,
            content_redacted: input.content_redacted,
            pii_flags: input.pii_flags,
            refs: input.refs,
        };

        if let Some(thread) = state
            .threads
            .iter_mut()
            .find(|t| t.thread_id == entry.thread_id)
        {
            thread.updated_at = created_at;
        }
        debug!(entry_id = %entry.entry_id, thread_id = %entry.thread_id, "entry appended");
        state.entries.push(entry.clone());
        Ok((state, entry))
    }

    /// Append a redaction tombstone referring to a prior entry. The
    /// original entry is never deleted or mutated.
    pub fn append_redaction(
        self,
        input: AppendRedaction,
    ) -> Result<(Self, ThreadEntry), ThreadStoreError> {
        if self.entry(&input.redacted_entry_id).is_none() {
            return Err(ThreadStoreError::EntryNotFound(input.redacted_entry_id));
        }
        self.append_entry(AppendEntry {
            entry_id: None,
            thread_id: input.thread_id,
            author_type: input.author_type.unwrap_or(AuthorType::System),
            intent_id: None,
            created_at: None,
            content_text: String::new(),
            content_redacted: Some(input.reason),
            pii_flags: vec!["redacted".to_string()],
            refs: vec![input.redacted_entry_id],
        })
    }

    /// Retain at most one snapshot per thread, replacing any prior one.
    pub fn save_snapshot(mut self, snapshot: ThreadSnapshot) -> Self {
        self.snapshots.retain(|s| s.thread_id != snapshot.thread_id);
        self.snapshots.push(snapshot);
        self
    }

    /// Latest snapshot for a thread; ties resolved by `(time, digest)`.
    pub fn latest_snapshot(&self, thread_id: &str) -> Option<&ThreadSnapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.thread_id == thread_id)
            .max_by(|a, b| {
                (LogicalTime::order_key(&a.created_at), &a.digest)
                    .cmp(&(LogicalTime::order_key(&b.created_at), &b.digest))
            })
    }
}
