//! Scoped reads: access control, context retrieval, cursor pagination
//!
//! The scope predicate gates both context retrieval and paginated reads
//! and is evaluated before any entry data is returned.

use covenant_types::{Requester, ThreadScope};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::ThreadSnapshot;
use crate::state::{Thread, ThreadEntry, ThreadStoreState};

/// Read failures, each with a stable machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadAccessError {
    #[error("thread_not_found")]
    ThreadNotFound,

    #[error("scope_violation")]
    ScopeViolation,

    #[error("cursor_not_found")]
    CursorNotFound,
}

impl ThreadAccessError {
    pub fn code(&self) -> &'static str {
        match self {
            ThreadAccessError::ThreadNotFound => "thread_not_found",
            ThreadAccessError::ScopeViolation => "scope_violation",
            ThreadAccessError::CursorNotFound => "cursor_not_found",
        }
    }
}

/// Scope predicate: PUBLIC is open, PRIVATE is owner-only, POD_PRIVATE
/// admits the owner and requesters whose pods include the owner.
pub fn can_access_thread(thread: &Thread, requester: &Requester) -> bool {
    match thread.scope {
        ThreadScope::Public => true,
        ThreadScope::Private => requester.actor_id == thread.owner_id,
        ThreadScope::PodPrivate => {
            requester.actor_id == thread.owner_id
                || requester.pod_ids.iter().any(|pod| pod == &thread.owner_id)
        }
    }
}

/// Query for [`ThreadStoreState::retrieve_thread_context`].
#[derive(Debug, Clone)]
pub struct ContextQuery {
    pub thread_id: String,
    pub requester: Requester,
    /// Most-recent entry count; `<= 0` returns all
    pub limit: i64,
    pub include_snapshot: bool,
}

/// An accessible thread's recent entries, chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadContext {
    pub thread: Thread,
    pub entries: Vec<ThreadEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ThreadSnapshot>,
}

/// Query for [`ThreadStoreState::get_thread_entries_page`].
#[derive(Debug, Clone)]
pub struct PageQuery {
    pub thread_id: String,
    pub requester: Requester,
    /// Page size; `0` returns everything remaining
    pub limit: usize,
    /// Resume strictly after (older than) this entry id
    pub cursor: Option<String>,
}

/// One backward page. Entries are newest-first; feeding `next_cursor`
/// back as the next query's `cursor` walks the thread without gaps or
/// duplicates, oldest page last, `next_cursor = None` on the final page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadEntriesPage {
    pub entries: Vec<ThreadEntry>,
    pub next_cursor: Option<String>,
}

impl ThreadStoreState {
    fn accessible_thread(
        &self,
        thread_id: &str,
        requester: &Requester,
    ) -> Result<&Thread, ThreadAccessError> {
        let thread = self
            .thread(thread_id)
            .ok_or(ThreadAccessError::ThreadNotFound)?;
        if !can_access_thread(thread, requester) {
            return Err(ThreadAccessError::ScopeViolation);
        }
        Ok(thread)
    }

    /// The most recent `limit` entries of an accessible thread,
    /// optionally with the latest snapshot.
    pub fn retrieve_thread_context(
        &self,
        query: &ContextQuery,
    ) -> Result<ThreadContext, ThreadAccessError> {
        let thread = self.accessible_thread(&query.thread_id, &query.requester)?;

        let ordered = self.entries_for(&query.thread_id);
        let take_from = if query.limit > 0 {
            ordered.len().saturating_sub(query.limit as usize)
        } else {
            0
        };
        let entries: Vec<ThreadEntry> = ordered[take_from..].iter().map(|e| (*e).clone()).collect();

        let snapshot = query
            .include_snapshot
            .then(|| self.latest_snapshot(&query.thread_id).cloned())
            .flatten();

        Ok(ThreadContext {
            thread: thread.clone(),
            entries,
            snapshot,
        })
    }

    /// Cursor-based backward pagination over an accessible thread.
    pub fn get_thread_entries_page(
        &self,
        query: &PageQuery,
    ) -> Result<ThreadEntriesPage, ThreadAccessError> {
        self.accessible_thread(&query.thread_id, &query.requester)?;

        let ordered = self.entries_for(&query.thread_id);

        // The window ends just before the cursor entry; without a cursor
        // it ends at the newest entry.
        let end = match query.cursor.as_deref() {
            Some(cursor) => ordered
                .iter()
                .position(|e| e.entry_id == cursor)
                .ok_or(ThreadAccessError::CursorNotFound)?,
            None => ordered.len(),
        };

        let span = if query.limit == 0 { end } else { query.limit.min(end) };
        let start = end - span;

        let entries: Vec<ThreadEntry> = ordered[start..end].iter().rev().map(|e| (*e).clone()).collect();
        let next_cursor = (start > 0).then(|| ordered[start].entry_id.clone());

        Ok(ThreadEntriesPage { entries, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::build_thread_snapshot;
    use crate::state::{AppendEntry, CreateThread};
    use covenant_types::AuthorType;

    fn store_with_entries(scope: ThreadScope, count: usize) -> (ThreadStoreState, String) {
        let (mut state, thread) = ThreadStoreState::new()
            .create_thread(CreateThread {
                owner_id: "owner-1".to_string(),
                scope,
                ..Default::default()
            })
            .unwrap();
        let tid = thread.thread_id.clone();
        for i in 0..count {
            let (next, _) = state
                .append_entry(AppendEntry::new(&tid, AuthorType::User, format!("msg-{i}")))
                .unwrap();
            state = next;
        }
        (state, tid)
    }

    fn owner() -> Requester {
        Requester::new("owner-1")
    }

    #[test]
    fn public_open_private_owner_only() {
        let (state, tid) = store_with_entries(ThreadScope::Private, 1);
        let thread = state.thread(&tid).unwrap();
        assert!(can_access_thread(thread, &owner()));
        assert!(!can_access_thread(thread, &Requester::new("stranger")));

        let (state, tid) = store_with_entries(ThreadScope::Public, 1);
        assert!(can_access_thread(state.thread(&tid).unwrap(), &Requester::new("stranger")));
    }

    #[test]
    fn pod_private_admits_pod_members() {
        let (state, tid) = store_with_entries(ThreadScope::PodPrivate, 1);
        let thread = state.thread(&tid).unwrap();
        assert!(can_access_thread(thread, &owner()));
        let podmate = Requester::new("colleague").with_pods(["owner-1"]);
        assert!(can_access_thread(thread, &podmate));
        let outsider = Requester::new("colleague").with_pods(["someone-else"]);
        assert!(!can_access_thread(thread, &outsider));
    }

    #[test]
    fn context_respects_scope_before_data() {
        let (state, tid) = store_with_entries(ThreadScope::Private, 3);
        let err = state
            .retrieve_thread_context(&ContextQuery {
                thread_id: tid.clone(),
                requester: Requester::new("stranger"),
                limit: 10,
                include_snapshot: false,
            })
            .unwrap_err();
        assert_eq!(err, ThreadAccessError::ScopeViolation);
        assert_eq!(err.code(), "scope_violation");
    }

    #[test]
    fn context_unknown_thread() {
        let state = ThreadStoreState::new();
        let err = state
            .retrieve_thread_context(&ContextQuery {
                thread_id: "nope".to_string(),
                requester: owner(),
                limit: 0,
                include_snapshot: false,
            })
            .unwrap_err();
        assert_eq!(err, ThreadAccessError::ThreadNotFound);
    }

    #[test]
    fn context_returns_recent_tail() {
        let (state, tid) = store_with_entries(ThreadScope::Private, 5);
        let context = state
            .retrieve_thread_context(&ContextQuery {
                thread_id: tid.clone(),
                requester: owner(),
                limit: 2,
                include_snapshot: false,
            })
            .unwrap();
        let texts: Vec<&str> = context.entries.iter().map(|e| e.content_text.as_str()).collect();
        assert_eq!(texts, vec!["msg-3", "msg-4"]);

        let all = state
            .retrieve_thread_context(&ContextQuery {
                thread_id: tid,
                requester: owner(),
                limit: 0,
                include_snapshot: false,
            })
            .unwrap();
        assert_eq!(all.entries.len(), 5);
    }

    #[test]
    fn context_includes_latest_snapshot() {
        let (state, tid) = store_with_entries(ThreadScope::Private, 2);
        let snapshot = build_thread_snapshot(&tid, &state.entries, None);
        let state = state.save_snapshot(snapshot.clone());
        let context = state
            .retrieve_thread_context(&ContextQuery {
                thread_id: tid,
                requester: owner(),
                limit: 0,
                include_snapshot: true,
            })
            .unwrap();
        assert_eq!(context.snapshot, Some(snapshot));
    }

    #[test]
    fn pagination_walks_backward_without_gaps() {
        let (state, tid) = store_with_entries(ThreadScope::Private, 7);

        let mut seen = Vec::new();
        let mut cursor = None;
        let mut pages = 0;
        loop {
            let page = state
                .get_thread_entries_page(&PageQuery {
                    thread_id: tid.clone(),
                    requester: owner(),
                    limit: 3,
                    cursor: cursor.clone(),
                })
                .unwrap();
            pages += 1;
            seen.extend(page.entries.iter().map(|e| e.content_text.clone()));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        // Newest-first across the whole traversal, every entry once.
        let expected: Vec<String> = (0..7).rev().map(|i| format!("msg-{i}")).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn pagination_final_page_has_no_cursor() {
        let (state, tid) = store_with_entries(ThreadScope::Private, 2);
        let page = state
            .get_thread_entries_page(&PageQuery {
                thread_id: tid,
                requester: owner(),
                limit: 5,
                cursor: None,
            })
            .unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn pagination_unknown_cursor() {
        let (state, tid) = store_with_entries(ThreadScope::Private, 2);
        let err = state
            .get_thread_entries_page(&PageQuery {
                thread_id: tid,
                requester: owner(),
                limit: 5,
                cursor: Some("entry-missing".to_string()),
            })
            .unwrap_err();
        assert_eq!(err, ThreadAccessError::CursorNotFound);
    }

    #[test]
    fn pagination_scope_checked_first() {
        let (state, tid) = store_with_entries(ThreadScope::Private, 2);
        let err = state
            .get_thread_entries_page(&PageQuery {
                thread_id: tid,
                requester: Requester::new("stranger"),
                limit: 5,
                cursor: None,
            })
            .unwrap_err();
        assert_eq!(err, ThreadAccessError::ScopeViolation);
    }
}
