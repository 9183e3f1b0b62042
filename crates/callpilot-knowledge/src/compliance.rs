//! Category-gated compliance rule selection.

use callpilot_types::ComplianceRule;

/// Category label whose rules apply to every call.
const GENERAL_CATEGORY: &str = "general";

/// Returns `true` when a rule filed under `rule_category` is eligible for a
/// call classified as `category`.
///
/// Eligibility is `general`, or containment in either direction, so that a
/// coarse rule category such as `car` applies to a fine-grained call category
/// such as `car_accident` and vice versa. Both sides are compared lowercased.
/// A blank call category only admits `general` rules.
pub fn category_matches(rule_category: &str, category: &str) -> bool {
    let rule_category = rule_category.trim().to_lowercase();
    if rule_category == GENERAL_CATEGORY {
        return true;
    }
    let category = category.trim().to_lowercase();
    if category.is_empty() || rule_category.is_empty() {
        return false;
    }
    category.contains(&rule_category) || rule_category.contains(&category)
}

/// An immutable, ordered set of compliance rules.
#[derive(Debug, Clone, Default)]
pub struct ComplianceEngine {
    rules: Vec<ComplianceRule>,
}

impl ComplianceEngine {
    pub fn new(rules: Vec<ComplianceRule>) -> Self {
        Self { rules }
    }

    /// Returns the engine seeded with the default insurance rule set.
    pub fn with_default_rules() -> Self {
        Self::new(crate::corpus::compliance_rules())
    }

    pub fn rules(&self) -> &[ComplianceRule] {
        &self.rules
    }

    /// Returns the rules that fire for `category` and `text`, in corpus order.
    ///
    /// Each rule is evaluated once: first the category gate, then its
    /// triggers. An `always` trigger fires unconditionally; any other trigger
    /// fires when it occurs in the lowercased text or the lowercased
    /// category. No severity sort is applied.
    pub fn match_rules(&self, category: &str, text: &str) -> Vec<ComplianceRule> {
        let text_lower = text.to_lowercase();
        let category_lower = category.trim().to_lowercase();

        let fired: Vec<ComplianceRule> = self
            .rules
            .iter()
            .filter(|rule| category_matches(&rule.category, &category_lower))
            .filter(|rule| {
                rule.is_unconditional()
                    || rule.triggers.iter().any(|trigger| {
                        !trigger.is_empty()
                            && (text_lower.contains(trigger.as_str())
                                || category_lower.contains(trigger.as_str()))
                    })
            })
            .cloned()
            .collect();

        tracing::debug!(
            category = %category_lower,
            fired = fired.len(),
            "compliance rules evaluated"
        );

        fired
    }
}
