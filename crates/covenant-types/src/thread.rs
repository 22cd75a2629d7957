//! Thread scope, author and requester types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visibility scope of a conversation/decision thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadScope {
    /// Only the owner may read
    #[default]
    Private,
    /// Owner plus requesters whose pod membership includes the owner
    PodPrivate,
    /// Anyone may read
    Public,
}

impl fmt::Display for ThreadScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreadScope::Private => "PRIVATE",
            ThreadScope::PodPrivate => "POD_PRIVATE",
            ThreadScope::Public => "PUBLIC",
        };
        f.write_str(s)
    }
}

/// Who authored a thread entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorType {
    User,
    Agent,
    System,
}

impl fmt::Display for AuthorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthorType::User => "user",
            AuthorType::Agent => "agent",
            AuthorType::System => "system",
        };
        f.write_str(s)
    }
}

/// Identity presented on thread reads. Evaluated against the thread's
/// scope before any entry data is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// The reader's own identity
    pub actor_id: String,
    /// Pods the reader belongs to (member owner ids)
    #[serde(default)]
    pub pod_ids: Vec<String>,
}

impl Requester {
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            pod_ids: Vec::new(),
        }
    }

    pub fn with_pods(mut self, pods: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.pod_ids = pods.into_iter().map(Into::into).collect();
        self
    }
}
