//! Capability contracts consumed by the call-assist graph and session.
//!
//! Each external concern (classification, extraction, lookup, retrieval,
//! synthesis, evaluation) is an async trait. The graph and the session
//! coordinator only see these traits, so a deterministic rule-based backend
//! and a generative one are interchangeable.
//!
//! A lookup that finds nothing is a valid outcome (`Ok(None)`, empty list).
//! Failures are [`CapabilityError`]s.

pub mod deadline;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod rules;
pub mod synth;

use async_trait::async_trait;
use callpilot_directory::MemberDirectory;
use callpilot_knowledge::{ComplianceEngine, KnowledgeBase};
use callpilot_types::{
    CallEvaluation, ComplianceRule, Entities, IntentResult, KnowledgeDocument, MemberRecord,
    Utterance,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

pub use deadline::with_deadline;
pub use error::CapabilityError;
pub use evaluator::HeuristicEvaluator;
pub use llm::{LlmClient, LlmSettings};
pub use rules::{KeywordClassifier, PatternEntityExtractor};
pub use synth::TemplateSynthesizer;

/// `classify(transcript) -> {intent, claim_type}`
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, transcript: &str) -> Result<IntentResult, CapabilityError>;
}

/// `extractEntities(transcript) -> {id?, name?, phone?}`
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract_entities(&self, transcript: &str) -> Result<Entities, CapabilityError>;
}

/// `lookupMember(id?, name?, phone?) -> Record | null`
#[async_trait]
pub trait MemberLookup: Send + Sync {
    async fn lookup_member(&self, hints: &Entities)
        -> Result<Option<MemberRecord>, CapabilityError>;
}

/// `searchKnowledge(query, topK) -> ordered Document list`
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    async fn search_knowledge(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>, CapabilityError>;
}

/// `matchCompliance(category, transcript) -> ordered Rule list`
#[async_trait]
pub trait ComplianceMatcher: Send + Sync {
    async fn match_compliance(
        &self,
        category: &str,
        transcript: &str,
    ) -> Result<Vec<ComplianceRule>, CapabilityError>;
}

/// `synthesizeSuggestion(contextBundle) -> text`, optionally streamed.
#[async_trait]
pub trait SuggestionSynthesizer: Send + Sync {
    async fn synthesize_suggestion(
        &self,
        context: &SuggestionContext,
    ) -> Result<String, CapabilityError>;

    /// Sends the suggestion to `chunks` piece by piece and returns the full
    /// text. Backends that cannot stream send it as one chunk.
    async fn stream_suggestion(
        &self,
        context: &SuggestionContext,
        chunks: mpsc::Sender<String>,
    ) -> Result<String, CapabilityError> {
        let text = self.synthesize_suggestion(context).await?;
        if chunks.send(text.clone()).await.is_err() {
            tracing::debug!("suggestion chunk receiver dropped");
        }
        Ok(text)
    }
}

/// `evaluateCall(transcriptLines, durationSeconds, intent, member) -> scorecard`
#[async_trait]
pub trait CallEvaluator: Send + Sync {
    async fn evaluate_call(&self, input: &EvaluationInput)
        -> Result<CallEvaluation, CapabilityError>;
}

/// Everything the synthesizer may draw on for one utterance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuggestionContext {
    pub transcript: String,
    pub intent: Option<IntentResult>,
    pub member: Option<MemberRecord>,
    pub knowledge: Vec<KnowledgeDocument>,
    pub compliance: Vec<ComplianceRule>,
}

/// The frozen call handed to the evaluator at end of call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationInput {
    pub transcript: Vec<Utterance>,
    pub duration_secs: u64,
    pub intent: Option<IntentResult>,
    pub member: Option<MemberRecord>,
}

impl EvaluationInput {
    /// Transcript rendered one `[ts] Speaker: text` line per utterance.
    pub fn transcript_lines(&self) -> String {
        self.transcript
            .iter()
            .map(Utterance::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The full set of capabilities one deployment runs with.
#[derive(Clone)]
pub struct Capabilities {
    pub classifier: Arc<dyn IntentClassifier>,
    pub entities: Arc<dyn EntityExtractor>,
    pub members: Arc<dyn MemberLookup>,
    pub knowledge: Arc<dyn KnowledgeSearch>,
    pub compliance: Arc<dyn ComplianceMatcher>,
    pub synthesizer: Arc<dyn SuggestionSynthesizer>,
    pub evaluator: Arc<dyn CallEvaluator>,
}

impl Capabilities {
    /// Deterministic backends over the seeded corpora.
    pub fn rule_based() -> Self {
        Self {
            classifier: Arc::new(KeywordClassifier),
            entities: Arc::new(PatternEntityExtractor),
            members: Arc::new(MemberDirectory::with_seed_records()),
            knowledge: Arc::new(KnowledgeBase::with_default_corpus()),
            compliance: Arc::new(ComplianceEngine::with_default_rules()),
            synthesizer: Arc::new(TemplateSynthesizer),
            evaluator: Arc::new(HeuristicEvaluator),
        }
    }

    /// Generative classification, synthesis and evaluation; lookups,
    /// retrieval and entity patterns stay deterministic.
    pub fn with_llm(client: Arc<LlmClient>) -> Self {
        Self {
            classifier: Arc::new(llm::LlmClassifier::new(Arc::clone(&client))),
            synthesizer: Arc::new(llm::LlmSynthesizer::new(Arc::clone(&client))),
            evaluator: Arc::new(llm::LlmEvaluator::new(client)),
            ..Self::rule_based()
        }
    }

    /// Picks the backend from settings. A disabled or unusable LLM
    /// configuration falls back to the rule-based set.
    pub fn from_settings(settings: &LlmSettings) -> Self {
        if !settings.enabled {
            return Self::rule_based();
        }
        match LlmClient::from_settings(settings) {
            Ok(client) => {
                tracing::info!(model = %settings.model, "generative capabilities enabled");
                Self::with_llm(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "generative backend unavailable, using rule-based capabilities");
                Self::rule_based()
            }
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
