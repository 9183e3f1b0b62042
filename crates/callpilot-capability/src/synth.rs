//! Template-based suggestion synthesis.

use crate::{CapabilityError, SuggestionContext, SuggestionSynthesizer};
use async_trait::async_trait;
use callpilot_types::ComplianceRule;

/// How many compliance reminders a suggestion carries at most.
const MAX_REMINDERS: usize = 2;

/// Composes an agent prompt from the identity status, an intent-specific
/// opener, the best knowledge article and the most severe compliance rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSynthesizer;

fn opener(intent: &str) -> Option<&'static str> {
    match intent {
        "car_accident" => Some("I'm sorry to hear about the accident. Is everyone safe?"),
        "car_theft" => Some("I'm sorry your vehicle was stolen; let's get the claim started."),
        "life_claim" => Some("Please accept my condolences for your loss."),
        "complaint" => Some("I apologise for the trouble and will make sure this is recorded."),
        "car_roadside_assistance" => Some("Let me arrange assistance for you right away."),
        _ => None,
    }
}

fn first_name(full: &str) -> &str {
    full.split_whitespace().next().unwrap_or(full)
}

fn reminders(rules: &[ComplianceRule]) -> Vec<&ComplianceRule> {
    let mut ranked: Vec<&ComplianceRule> = rules.iter().collect();
    // Stable: equal severities keep corpus order.
    ranked.sort_by(|a, b| b.severity.cmp(&a.severity));
    ranked.truncate(MAX_REMINDERS);
    ranked
}

/// Builds the suggestion text. Never empty.
pub fn compose(context: &SuggestionContext) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(intent) = context.intent.as_ref().and_then(|i| opener(&i.intent)) {
        parts.push(intent.to_string());
    }

    match &context.member {
        Some(member) => parts.push(format!(
            "Thank you, {}. Policy {} ({}) is {}.",
            first_name(&member.name),
            member.policy_id,
            member.coverage_type,
            member.status
        )),
        None => parts.push(
            "Could you please confirm your policy number or registered phone number?".to_string(),
        ),
    }

    if let Some(doc) = context.knowledge.first() {
        let summary = doc.content.lines().next().unwrap_or_default().trim();
        if summary.is_empty() {
            parts.push(format!("See \"{}\".", doc.title));
        } else {
            parts.push(format!("{}: {}", doc.title, summary));
        }
    }

    for rule in reminders(&context.compliance) {
        parts.push(format!("[{}] {}", rule.severity, rule.message));
    }

    parts.join(" ")
}

#[async_trait]
impl SuggestionSynthesizer for TemplateSynthesizer {
    async fn synthesize_suggestion(
        &self,
        context: &SuggestionContext,
    ) -> Result<String, CapabilityError> {
        Ok(compose(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callpilot_directory::MemberDirectory;
    use callpilot_knowledge::{ComplianceEngine, KnowledgeBase};
    use callpilot_types::IntentResult;

    #[tokio::test]
    async fn streams_the_whole_suggestion_as_one_chunk() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let context = SuggestionContext::default();
        let text = TemplateSynthesizer
            .stream_suggestion(&context, tx)
            .await
            .expect("template synthesis cannot fail");

        assert_eq!(rx.recv().await.as_deref(), Some(text.as_str()));
        assert_eq!(rx.recv().await, None);
        assert_eq!(text, compose(&context));
    }

    #[test]
    fn asks_for_identity_when_member_unknown() {
        let text = compose(&SuggestionContext::default());
        assert!(text.contains("confirm your policy number"));
    }

    #[test]
    fn full_context_mentions_member_article_and_reminders() {
        let member = MemberDirectory::with_seed_records()
            .get("CAR-100002")
            .cloned();
        let knowledge = KnowledgeBase::with_default_corpus().search("car accident", 3);
        let compliance =
            ComplianceEngine::with_default_rules().match_rules("car_accident", "accident");
        let context = SuggestionContext {
            transcript: "I was in an accident".to_string(),
            intent: Some(IntentResult {
                intent: "car_accident".to_string(),
                claim_type: Some("car_insurance".to_string()),
            }),
            member,
            knowledge,
            compliance,
        };

        let text = compose(&context);
        assert!(text.starts_with("I'm sorry to hear about the accident"));
        assert!(text.contains("Thank you, Priya. Policy CAR-100002"));
        assert!(text.contains("Car Accident Claim Process"));
        assert!(text.contains('['));
    }

    #[test]
    fn reminders_rank_by_severity_and_cap() {
        let rules = ComplianceEngine::with_default_rules().match_rules("car_accident", "accident");
        let top = reminders(&rules);
        assert!(top.len() <= MAX_REMINDERS);
        if top.len() == 2 {
            assert!(top[0].severity >= top[1].severity);
        }
    }
}
