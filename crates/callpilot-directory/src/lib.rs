//! Caller identification for the CallPilot platform.
//!
//! Implements the deterministic half of identity resolution:
//!
//! - [`entity`]: pattern rules that pull identity hints (policy id, name,
//!   phone) out of an utterance, plus the fast-path identifier detector used
//!   on partial fragments.
//! - [`directory`]: the member directory that resolves hints to a
//!   member/policy record.
//!
//! A miss at either step is `None`, never an error.

pub mod directory;
pub mod entity;
pub mod seed;

pub use directory::MemberDirectory;
pub use entity::{detect_identifier, extract_entities};
