//! Covenant Threads - append-only thread memory store
//!
//! Lifelong conversation/decision threads with deterministic ordering,
//! scoped visibility and tamper-evident snapshots. Every operation is a
//! pure transformation over an explicitly passed [`ThreadStoreState`]:
//! mutations consume the state and return the successor, reads borrow.
//! The caller persists the state as an opaque JSON blob.
//!
//! # Key Principles
//!
//! - **Append-only.** A redaction is itself a new entry (tombstone); no
//!   prior entry is ever mutated or deleted.
//! - **Logical time.** Entries are ordered by a per-store Lamport-style
//!   counter rendered `t<N>`; the clock fast-forwards on explicit higher
//!   timestamps and never rewinds.
//! - **Scope before data.** Access control is evaluated before any entry
//!   data is returned, never after.
//!
//! # Concurrency hazard
//!
//! Because state is taken and returned by value, two writers holding
//! stale copies of the same store will silently lose each other's
//! appends (last writer wins). Serialize writers per store instance;
//! the store does not carry a version token to reject stale writes.

pub mod access;
pub mod snapshot;
pub mod state;

pub use access::{
    can_access_thread, ContextQuery, PageQuery, ThreadAccessError, ThreadContext, ThreadEntriesPage,
};
pub use snapshot::{build_thread_snapshot, SnapshotSummary, ThreadSnapshot};
pub use state::{
    AppendEntry, AppendRedaction, CreateThread, Thread, ThreadEntry, ThreadStoreError,
    ThreadStoreState,
};
