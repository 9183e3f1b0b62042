//! Shared types for the CallPilot agent-assist platform.
//!
//! This crate provides the foundational types used across all CallPilot
//! crates: transcript utterances, identity hints, intent classifications,
//! member/policy records, knowledge documents, compliance rules, and the
//! post-call scorecard.
//!
//! No crate in the workspace depends on anything *except* `callpilot-types`
//! for cross-cutting type definitions. Behaviour (matching, lookup,
//! orchestration) lives in the crates that own it.

use serde::{Deserialize, Serialize};

mod evaluation;
mod knowledge;
mod member;

pub use evaluation::{CallEvaluation, CategoryScores, UtteranceTally};
pub use knowledge::{ComplianceRule, KnowledgeDocument, Severity, ALWAYS_TRIGGER};
pub use member::{Beneficiary, ClaimRecord, MemberRecord, Vehicle};

/// Speaker label used for the contact-center agent.
pub const AGENT_SPEAKER: &str = "Agent";

/// Speaker label used for the caller.
pub const CUSTOMER_SPEAKER: &str = "Customer";

/// A finalized line of the call transcript.
///
/// Utterances are immutable once created. Only finalized fragments become
/// utterances; partial fragments are echoed to the agent UI but never
/// accumulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Speaker label as reported upstream (usually `Agent` or `Customer`).
    pub speaker: String,
    /// Recognized text.
    pub text: String,
    /// Seconds since the start of the call. Non-decreasing within a session.
    pub offset_secs: f64,
    /// Wall-clock rendering of the offset (`HH:MM:SS`).
    pub timestamp: String,
}

impl Utterance {
    /// Renders the utterance as a single `[timestamp] Speaker: text` line.
    pub fn to_line(&self) -> String {
        format!("[{}] {}: {}", self.timestamp, self.speaker, self.text)
    }
}

/// Identity hints extracted from an utterance.
///
/// Every field is best-effort; `None` means "not found", never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entities {
    /// Policy identifier, e.g. `CAR-100001`.
    pub id: Option<String>,
    /// Caller name as spoken.
    pub name: Option<String>,
    /// Phone number as spoken (any formatting).
    pub phone: Option<String>,
}

impl Entities {
    /// Returns `true` when no identity hint was found.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.phone.is_none()
    }
}

/// Output of the intent classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Fine-grained caller intent, e.g. `car_accident`.
    pub intent: String,
    /// Line of business, e.g. `car_insurance`.
    pub claim_type: Option<String>,
}

impl IntentResult {
    /// The category used to gate compliance rules: the intent, falling back
    /// to the claim type when the intent is blank.
    pub fn compliance_category(&self) -> &str {
        if !self.intent.trim().is_empty() {
            return &self.intent;
        }
        self.claim_type.as_deref().unwrap_or("general")
    }
}
