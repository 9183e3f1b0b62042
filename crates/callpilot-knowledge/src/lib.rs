//! Knowledge retrieval and compliance rule selection.
//!
//! Two deterministic matchers over fixed, load-once corpora:
//!
//! - [`KnowledgeBase`] ranks articles by how many of their tags occur in the
//!   query text.
//! - [`ComplianceEngine`] selects the rules that apply to a call category and
//!   the words spoken so far.
//!
//! Neither matcher treats "nothing found" as an error: an empty result is a
//! valid terminal state for downstream logic.
//!
//! The default corpora (car and life insurance) live in [`corpus`].

pub mod compliance;
pub mod corpus;
pub mod matcher;

pub use compliance::{category_matches, ComplianceEngine};
pub use matcher::{score_document, KnowledgeBase, DEFAULT_TOP_K};
