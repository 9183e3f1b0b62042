//! Deterministic capability backends.

use crate::{
    CapabilityError, ComplianceMatcher, EntityExtractor, IntentClassifier, KnowledgeSearch,
    MemberLookup,
};
use async_trait::async_trait;
use callpilot_directory::{extract_entities, MemberDirectory};
use callpilot_knowledge::{ComplianceEngine, KnowledgeBase};
use callpilot_types::{ComplianceRule, Entities, IntentResult, KnowledgeDocument, MemberRecord};

const CAR_CONTEXT: &[&str] = &[
    "car", "vehicle", "bike", "scooter", "garage", "bumper", "windshield", "driving",
];
const LIFE_CONTEXT: &[&str] = &[
    "life", "death", "passed away", "died", "deceased", "nominee", "beneficiary", "term plan",
];

const COMPLAINT: &[&str] = &["complaint", "grievance", "unhappy", "ombudsman", "escalate"];
const CANCELLATION: &[&str] = &["cancel", "refund", "free look", "free-look"];
const BEREAVEMENT: &[&str] = &["death", "passed away", "died", "deceased"];
const NOMINEE: &[&str] = &["nominee", "beneficiary"];
const THEFT: &[&str] = &["stolen", "theft"];
const ACCIDENT: &[&str] = &["accident", "collision", "crash", "hit by", "dent"];
const ROADSIDE: &[&str] = &["breakdown", "tow", "flat tyre", "flat tire", "battery"];
const RENEWAL: &[&str] = &["renew", "expiry", "expire", "no claim bonus"];
const PREMIUM: &[&str] = &["premium", "payment", "grace period", "lapse", "due date"];

fn any_of(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Keyword-family intent classification.
///
/// Intents embed their line of business (`car_accident`, `life_claim`) so
/// the compliance category gate picks up the matching rule family.
pub fn classify_text(transcript: &str) -> IntentResult {
    let text = transcript.to_lowercase();
    let car = any_of(&text, CAR_CONTEXT);
    let life = any_of(&text, LIFE_CONTEXT);
    let line_of_business = if life && !car {
        "life_insurance"
    } else if car {
        "car_insurance"
    } else {
        "general"
    };

    let (intent, claim_type) = if any_of(&text, COMPLAINT) {
        ("complaint", line_of_business)
    } else if any_of(&text, CANCELLATION) {
        ("policy_cancellation", line_of_business)
    } else if any_of(&text, BEREAVEMENT) {
        ("life_claim", "life_insurance")
    } else if any_of(&text, NOMINEE) {
        ("life_nominee_update", "life_insurance")
    } else if any_of(&text, THEFT) {
        ("car_theft", "car_insurance")
    } else if any_of(&text, ACCIDENT) {
        ("car_accident", "car_insurance")
    } else if any_of(&text, ROADSIDE) {
        ("car_roadside_assistance", "car_insurance")
    } else if any_of(&text, RENEWAL) {
        ("policy_renewal", line_of_business)
    } else if any_of(&text, PREMIUM) {
        ("premium_payment", line_of_business)
    } else {
        ("general_inquiry", line_of_business)
    };

    IntentResult {
        intent: intent.to_string(),
        claim_type: Some(claim_type.to_string()),
    }
}

/// [`IntentClassifier`] backed by [`classify_text`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, transcript: &str) -> Result<IntentResult, CapabilityError> {
        Ok(classify_text(transcript))
    }
}

/// [`EntityExtractor`] backed by the directory's pattern rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternEntityExtractor;

#[async_trait]
impl EntityExtractor for PatternEntityExtractor {
    async fn extract_entities(&self, transcript: &str) -> Result<Entities, CapabilityError> {
        Ok(extract_entities(transcript))
    }
}

#[async_trait]
impl MemberLookup for MemberDirectory {
    async fn lookup_member(
        &self,
        hints: &Entities,
    ) -> Result<Option<MemberRecord>, CapabilityError> {
        Ok(self.lookup_entities(hints).cloned())
    }
}

#[async_trait]
impl KnowledgeSearch for KnowledgeBase {
    async fn search_knowledge(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<KnowledgeDocument>, CapabilityError> {
        Ok(self.search(query, top_k))
    }
}

#[async_trait]
impl ComplianceMatcher for ComplianceEngine {
    async fn match_compliance(
        &self,
        category: &str,
        transcript: &str,
    ) -> Result<Vec<ComplianceRule>, CapabilityError> {
        Ok(self.match_rules(category, transcript))
    }
}
