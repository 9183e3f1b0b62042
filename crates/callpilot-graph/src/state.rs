//! Typed processing state shared by the graph nodes.

use callpilot_types::{ComplianceRule, Entities, IntentResult, KnowledgeDocument, MemberRecord};
use serde::Serialize;
use std::fmt;

/// Names of the processing-state fields.
///
/// Node descriptors declare their inputs and outputs in terms of these keys,
/// which lets the builder check the merge contract before anything runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    /// Seed input. Never written by a node.
    Transcript,
    Intent,
    ClaimType,
    Entities,
    MemberData,
    KnowledgeDocs,
    ComplianceAlerts,
    Suggestion,
}

impl StateKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Intent => "intent",
            Self::ClaimType => "claim_type",
            Self::Entities => "entities",
            Self::MemberData => "member_data",
            Self::KnowledgeDocs => "knowledge_docs",
            Self::ComplianceAlerts => "compliance_alerts",
            Self::Suggestion => "suggestion",
        }
    }

    /// Keys the caller seeds; nodes may read them but never produce them.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Transcript)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One written field.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Intent(String),
    ClaimType(Option<String>),
    Entities(Entities),
    /// `None` records a completed lookup that found nobody.
    MemberData(Option<MemberRecord>),
    KnowledgeDocs(Vec<KnowledgeDocument>),
    ComplianceAlerts(Vec<ComplianceRule>),
    Suggestion(String),
}

impl StateValue {
    pub fn key(&self) -> StateKey {
        match self {
            Self::Intent(_) => StateKey::Intent,
            Self::ClaimType(_) => StateKey::ClaimType,
            Self::Entities(_) => StateKey::Entities,
            Self::MemberData(_) => StateKey::MemberData,
            Self::KnowledgeDocs(_) => StateKey::KnowledgeDocs,
            Self::ComplianceAlerts(_) => StateKey::ComplianceAlerts,
            Self::Suggestion(_) => StateKey::Suggestion,
        }
    }
}

/// The fields one node run changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    values: Vec<StateValue>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a written field, builder style.
    pub fn with(mut self, value: StateValue) -> Self {
        self.values.push(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[StateValue] {
        &self.values
    }
}

impl From<StateValue> for StatePatch {
    fn from(value: StateValue) -> Self {
        Self::new().with(value)
    }
}

impl IntoIterator for StatePatch {
    type Item = StateValue;
    type IntoIter = std::vec::IntoIter<StateValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Shared state of one graph invocation.
///
/// `None` on any derived field means "not produced" (or, for
/// `member_data`, "nobody found"). Lists that were produced but matched
/// nothing are `Some(vec![])`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingState {
    pub transcript: String,
    pub intent: Option<String>,
    pub claim_type: Option<String>,
    pub entities: Option<Entities>,
    pub member_data: Option<MemberRecord>,
    pub knowledge_docs: Option<Vec<KnowledgeDocument>>,
    pub compliance_alerts: Option<Vec<ComplianceRule>>,
    pub suggestion: Option<String>,
}

impl ProcessingState {
    /// Seeds a state with the utterance text only.
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            ..Self::default()
        }
    }

    /// The classifier output, when it has run.
    pub fn intent_result(&self) -> Option<IntentResult> {
        self.intent.as_ref().map(|intent| IntentResult {
            intent: intent.clone(),
            claim_type: self.claim_type.clone(),
        })
    }

    pub(crate) fn apply(&mut self, value: StateValue) {
        match value {
            StateValue::Intent(v) => self.intent = Some(v),
            StateValue::ClaimType(v) => self.claim_type = v,
            StateValue::Entities(v) => self.entities = Some(v),
            StateValue::MemberData(v) => self.member_data = v,
            StateValue::KnowledgeDocs(v) => self.knowledge_docs = Some(v),
            StateValue::ComplianceAlerts(v) => self.compliance_alerts = Some(v),
            StateValue::Suggestion(v) => self.suggestion = Some(v),
        }
    }
}
