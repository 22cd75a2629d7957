//! Covenant Types - Canonical domain types for the governance kernel
//!
//! This crate contains the foundational types shared across the covenant
//! workspace, with zero dependencies on other covenant crates:
//!
//! - Identity types (RunId, AuditRecordId)
//! - Logical clock time for causal ordering of thread entries
//! - Risk levels with a fixed 4-level ordering
//! - Thread scopes and author types
//! - Gate proof records
//!
//! # Architectural Invariants
//!
//! 1. Every kernel gate appends exactly one `Proof`, in evaluation order
//! 2. Thread-store time is logical, never wall-clock
//! 3. Risk levels are totally ordered: low < medium < high < critical

pub mod clock;
pub mod identity;
pub mod proof;
pub mod risk;
pub mod thread;

pub use clock::*;
pub use identity::*;
pub use proof::*;
pub use risk::*;
pub use thread::*;
