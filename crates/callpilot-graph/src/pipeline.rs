//! The call-assist graph.
//!
//! ```text
//! level 0:  intent        entity
//!            |    \          |
//! level 1:  knowledge  compliance  member
//!              \          |        /
//! level 2:           suggestion
//! ```
//!
//! [`context_graph`] is the same graph without level 2, for callers that
//! stream the suggestion themselves once the context is known.

use crate::{
    Graph, GraphBuilder, GraphError, GraphNode, NodeDescriptor, ProcessingState, StateKey,
    StatePatch, StateValue,
};
use async_trait::async_trait;
use callpilot_capability::{
    Capabilities, CapabilityError, ComplianceMatcher, EntityExtractor, IntentClassifier,
    KnowledgeSearch, MemberLookup, SuggestionContext, SuggestionSynthesizer,
};
use std::sync::Arc;
use std::time::Duration;

pub const INTENT_NODE: &str = "intent";
pub const ENTITY_NODE: &str = "entity";
pub const MEMBER_NODE: &str = "member";
pub const KNOWLEDGE_NODE: &str = "knowledge";
pub const COMPLIANCE_NODE: &str = "compliance";
pub const SUGGESTION_NODE: &str = "suggestion";

/// Tunables for [`assist_graph`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub node_timeout: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: callpilot_knowledge::DEFAULT_TOP_K,
            node_timeout: Some(Duration::from_secs(15)),
        }
    }
}

struct IntentNode(Arc<dyn IntentClassifier>);

#[async_trait]
impl GraphNode for IntentNode {
    async fn run(&self, state: &ProcessingState) -> Result<StatePatch, CapabilityError> {
        let result = self.0.classify(&state.transcript).await?;
        Ok(StatePatch::new()
            .with(StateValue::Intent(result.intent))
            .with(StateValue::ClaimType(result.claim_type)))
    }
}

struct EntityNode(Arc<dyn EntityExtractor>);

#[async_trait]
impl GraphNode for EntityNode {
    async fn run(&self, state: &ProcessingState) -> Result<StatePatch, CapabilityError> {
        let entities = self.0.extract_entities(&state.transcript).await?;
        Ok(StateValue::Entities(entities).into())
    }
}

struct MemberNode(Arc<dyn MemberLookup>);

#[async_trait]
impl GraphNode for MemberNode {
    async fn run(&self, state: &ProcessingState) -> Result<StatePatch, CapabilityError> {
        let member = match state.entities.as_ref().filter(|e| !e.is_empty()) {
            Some(hints) => self.0.lookup_member(hints).await?,
            None => None,
        };
        Ok(StateValue::MemberData(member).into())
    }
}

struct KnowledgeNode {
    search: Arc<dyn KnowledgeSearch>,
    top_k: usize,
}

#[async_trait]
impl GraphNode for KnowledgeNode {
    async fn run(&self, state: &ProcessingState) -> Result<StatePatch, CapabilityError> {
        let query = match state.claim_type.as_deref() {
            Some(claim_type) => format!("{} {}", state.transcript, claim_type),
            None => state.transcript.clone(),
        };
        let docs = self.search.search_knowledge(&query, self.top_k).await?;
        Ok(StateValue::KnowledgeDocs(docs).into())
    }
}

struct ComplianceNode(Arc<dyn ComplianceMatcher>);

#[async_trait]
impl GraphNode for ComplianceNode {
    async fn run(&self, state: &ProcessingState) -> Result<StatePatch, CapabilityError> {
        let category = state
            .intent_result()
            .map(|i| i.compliance_category().to_string())
            .unwrap_or_else(|| "general".to_string());
        let rules = self.0.match_compliance(&category, &state.transcript).await?;
        Ok(StateValue::ComplianceAlerts(rules).into())
    }
}

struct SuggestionNode(Arc<dyn SuggestionSynthesizer>);

#[async_trait]
impl GraphNode for SuggestionNode {
    async fn run(&self, state: &ProcessingState) -> Result<StatePatch, CapabilityError> {
        let text = self.0.synthesize_suggestion(&suggestion_context(state)).await?;
        Ok(StateValue::Suggestion(text).into())
    }
}

/// The synthesizer's view of a state that has been through the context
/// nodes.
pub fn suggestion_context(state: &ProcessingState) -> SuggestionContext {
    SuggestionContext {
        transcript: state.transcript.clone(),
        intent: state.intent_result(),
        member: state.member_data.clone(),
        knowledge: state.knowledge_docs.clone().unwrap_or_default(),
        compliance: state.compliance_alerts.clone().unwrap_or_default(),
    }
}

/// Builds the six-node assist graph over `caps`.
pub fn assist_graph(caps: &Capabilities, settings: &PipelineSettings) -> Result<Graph, GraphError> {
    use StateKey::*;

    context_nodes(caps, settings)
        .node(
            NodeDescriptor::new(
                SUGGESTION_NODE,
                Arc::new(SuggestionNode(caps.synthesizer.clone())),
            )
            .reads(&[
                Transcript,
                Intent,
                ClaimType,
                MemberData,
                KnowledgeDocs,
                ComplianceAlerts,
            ])
            .writes(&[Suggestion])
            .after(&[MEMBER_NODE, KNOWLEDGE_NODE, COMPLIANCE_NODE]),
        )
        .build()
}

/// Builds the assist graph minus the suggestion node.
pub fn context_graph(caps: &Capabilities, settings: &PipelineSettings) -> Result<Graph, GraphError> {
    context_nodes(caps, settings).build()
}

fn context_nodes(caps: &Capabilities, settings: &PipelineSettings) -> GraphBuilder {
    use StateKey::*;

    GraphBuilder::new()
        .node_timeout(settings.node_timeout)
        .node(
            NodeDescriptor::new(INTENT_NODE, Arc::new(IntentNode(caps.classifier.clone())))
                .reads(&[Transcript])
                .writes(&[Intent, ClaimType]),
        )
        .node(
            NodeDescriptor::new(ENTITY_NODE, Arc::new(EntityNode(caps.entities.clone())))
                .reads(&[Transcript])
                .writes(&[Entities]),
        )
        .node(
            NodeDescriptor::new(MEMBER_NODE, Arc::new(MemberNode(caps.members.clone())))
                .reads(&[Entities])
                .writes(&[MemberData])
                .after(&[ENTITY_NODE]),
        )
        .node(
            NodeDescriptor::new(
                KNOWLEDGE_NODE,
                Arc::new(KnowledgeNode {
                    search: caps.knowledge.clone(),
                    top_k: settings.top_k,
                }),
            )
            .reads(&[Transcript, ClaimType])
            .writes(&[KnowledgeDocs])
            .after(&[INTENT_NODE]),
        )
        .node(
            NodeDescriptor::new(
                COMPLIANCE_NODE,
                Arc::new(ComplianceNode(caps.compliance.clone())),
            )
            .reads(&[Transcript, Intent, ClaimType])
            .writes(&[ComplianceAlerts])
            .after(&[INTENT_NODE]),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assist_graph_has_three_levels() {
        let graph = assist_graph(&Capabilities::rule_based(), &PipelineSettings::default())
            .expect("assist graph should build");
        assert_eq!(
            graph.levels(),
            vec![
                vec![INTENT_NODE, ENTITY_NODE],
                vec![MEMBER_NODE, KNOWLEDGE_NODE, COMPLIANCE_NODE],
                vec![SUGGESTION_NODE],
            ]
        );
    }

    #[test]
    fn default_settings_use_knowledge_top_k() {
        assert_eq!(
            PipelineSettings::default().top_k,
            callpilot_knowledge::DEFAULT_TOP_K
        );
    }

    #[test]
    fn context_graph_stops_before_suggestion() {
        let graph = context_graph(&Capabilities::rule_based(), &PipelineSettings::default())
            .expect("context graph should build");
        assert_eq!(graph.len(), 5);
        assert_eq!(
            graph.levels().last(),
            Some(&vec![MEMBER_NODE, KNOWLEDGE_NODE, COMPLIANCE_NODE])
        );
    }
}
