//! Knowledge-base and compliance-rule definitions.

use serde::{Deserialize, Serialize};

/// Trigger sentinel that makes an eligible compliance rule fire unconditionally.
pub const ALWAYS_TRIGGER: &str = "always";

/// A knowledge article the agent can consult.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    #[serde(rename = "docId")]
    pub id: String,
    pub title: String,
    pub category: String,
    /// Lowercase tags matched literally against the query.
    pub tags: Vec<String>,
    pub content: String,
}

/// Compliance rule severity.
///
/// Variants are declared from least to most severe so that `Ord` ranks
/// `Critical` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Returns the lowercase label for this severity.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compliance rule the agent must follow when it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRule {
    #[serde(rename = "ruleId")]
    pub id: String,
    /// Category gate: `general` or a line-of-business / intent fragment.
    pub category: String,
    pub title: String,
    /// Lowercase trigger substrings, or [`ALWAYS_TRIGGER`].
    pub triggers: Vec<String>,
    pub severity: Severity,
    /// Instruction shown to the agent.
    pub message: String,
}

impl ComplianceRule {
    /// Returns `true` when the rule carries the `always` sentinel.
    pub fn is_unconditional(&self) -> bool {
        self.triggers.iter().any(|t| t == ALWAYS_TRIGGER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_highest() {
        let mut all = vec![Severity::High, Severity::Low, Severity::Critical, Severity::Medium];
        all.sort();
        assert_eq!(
            all,
            vec![Severity::Low, Severity::Medium, Severity::High, Severity::Critical]
        );
    }

    #[test]
    fn rule_wire_format_uses_rule_id() {
        let rule = ComplianceRule {
            id: "COMP-001".to_string(),
            category: "general".to_string(),
            title: "Identity".to_string(),
            triggers: vec![ALWAYS_TRIGGER.to_string()],
            severity: Severity::High,
            message: "Verify identity".to_string(),
        };
        assert!(rule.is_unconditional());
        let json = serde_json::to_value(&rule).expect("serialization should not fail");
        assert_eq!(json["ruleId"], "COMP-001");
        assert_eq!(json["severity"], "high");
    }
}
