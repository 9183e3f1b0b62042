//! Default knowledge articles and compliance rules for car and life lines.
//!
//! Tags and triggers are lowercase; they are matched as literal substrings.

use callpilot_types::{ComplianceRule, KnowledgeDocument, Severity, ALWAYS_TRIGGER};

fn document(id: &str, title: &str, category: &str, tags: &[&str], content: &str) -> KnowledgeDocument {
    KnowledgeDocument {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        content: content.trim().to_string(),
    }
}

fn rule(
    id: &str,
    category: &str,
    title: &str,
    triggers: &[&str],
    severity: Severity,
    message: &str,
) -> ComplianceRule {
    ComplianceRule {
        id: id.to_string(),
        category: category.to_string(),
        title: title.to_string(),
        triggers: triggers.iter().map(|t| t.to_string()).collect(),
        severity,
        message: message.to_string(),
    }
}

/// The default knowledge corpus, in ranking tie-break order.
pub fn knowledge_documents() -> Vec<KnowledgeDocument> {
    vec![
        document(
            "KB-001",
            "Car Accident Claim Process",
            "car",
            &["accident", "collision", "crash", "car", "claim"],
            "
Intimate the claim within 48 hours of the accident.
Collect: policy number, date/time/location, photos of damage, driving licence, RC copy.
Third-party involvement or injuries require a police report.
Surveyor inspection is scheduled within 24 hours for cashless garages.",
        ),
        document(
            "KB-002",
            "Cashless Garage Network",
            "car",
            &["garage", "cashless", "repair", "workshop"],
            "
Repairs at network garages are settled directly with the insurer.
The insured pays only the deductible and non-covered parts.
Share the nearest three network garages by PIN code.",
        ),
        document(
            "KB-003",
            "Zero Depreciation Add-on",
            "car",
            &["zero dep", "depreciation", "add-on", "bumper"],
            "
Zero depreciation covers the full cost of replaced plastic, rubber and fibre parts.
Limited to two claims per policy year.
Not applicable to tyres unless damaged in the same accident.",
        ),
        document(
            "KB-004",
            "Vehicle Theft Claims",
            "car",
            &["theft", "stolen", "car"],
            "
A police FIR is mandatory and must be filed within 24 hours.
Submit both original keys, RC, FIR copy and the non-traceable certificate.
Settlement follows the insured declared value (IDV).",
        ),
        document(
            "KB-005",
            "Roadside Assistance",
            "car",
            &["roadside", "towing", "breakdown", "flat tyre", "battery"],
            "
Available 24x7 for policies with the roadside assistance add-on.
Covers towing up to 50 km, battery jump-start, flat tyre and fuel delivery.",
        ),
        document(
            "KB-006",
            "Life Insurance Death Claim",
            "life",
            &["death", "passed away", "deceased", "nominee", "life"],
            "
The nominee intimates the claim with the death certificate and policy document.
Claims within the contestability period undergo investigation.
Settlement target is 30 days from receipt of complete documents.",
        ),
        document(
            "KB-007",
            "Nominee and Beneficiary Changes",
            "life",
            &["nominee", "beneficiary", "update"],
            "
Nominee changes require a signed nomination form and ID proof of the policyholder.
Changes cannot be made over the phone.",
        ),
        document(
            "KB-008",
            "Premium Payment and Grace Period",
            "billing",
            &["premium", "payment", "grace", "lapse", "due"],
            "
A 30-day grace period applies to annual premiums (15 days for monthly).
Lapsed policies can be revived within two years subject to underwriting.",
        ),
        document(
            "KB-009",
            "Policy Renewal and No Claim Bonus",
            "car",
            &["renew", "renewal", "expiry", "no claim bonus", "ncb"],
            "
No claim bonus ranges from 20% to 50% and lapses if renewal is delayed beyond 90 days.
Renewal before expiry avoids a fresh vehicle inspection.",
        ),
        document(
            "KB-010",
            "Complaint Escalation",
            "service",
            &["complaint", "grievance", "escalate", "ombudsman", "unhappy"],
            "
Register the complaint and share the reference number.
Resolution within 14 days; unresolved complaints may be taken to the ombudsman.",
        ),
        document(
            "KB-011",
            "Cancellation and Free-Look Period",
            "service",
            &["cancel", "refund", "free look", "free-look"],
            "
Life policies have a 30-day free-look period with a refund net of stamp duty and risk premium.
Car policies are refunded on a short-period scale.",
        ),
        document(
            "KB-012",
            "Third-Party Liability",
            "car",
            &["third party", "injured", "injury", "liability", "police"],
            "
Third-party bodily injury is covered without limit under the statutory cover.
Do not admit liability on behalf of the insured.
A police report is required for any injury claim.",
        ),
    ]
}

/// The default compliance rule set, in evaluation order.
pub fn compliance_rules() -> Vec<ComplianceRule> {
    vec![
        rule(
            "COMP-001",
            "general",
            "Identity Verification",
            &[ALWAYS_TRIGGER],
            Severity::High,
            "Verify the caller's identity (policy number plus registered phone or date of birth) before disclosing policy details.",
        ),
        rule(
            "COMP-002",
            "general",
            "Cancellation Disclosure",
            &["cancel", "refund"],
            Severity::Medium,
            "Explain the free-look period and refund deductions before processing a cancellation.",
        ),
        rule(
            "COMP-003",
            "general",
            "Complaint Registration",
            &["complaint", "grievance", "ombudsman"],
            Severity::High,
            "Register the complaint, share the reference number and the 14-day resolution timeline.",
        ),
        rule(
            "COMP-004",
            "car",
            "Injury Check",
            &["accident", "collision", "crash"],
            Severity::Critical,
            "Ask whether anyone was injured; if so, advise contacting emergency services before continuing the claim.",
        ),
        rule(
            "COMP-005",
            "car",
            "Claim Intimation Window",
            &["accident", "collision", "theft", "stolen", "damage"],
            Severity::High,
            "Inform the caller that claims must be intimated within 48 hours of the incident.",
        ),
        rule(
            "COMP-006",
            "car",
            "Theft FIR Requirement",
            &["theft", "stolen"],
            Severity::High,
            "A police FIR is mandatory for theft claims; advise filing it within 24 hours.",
        ),
        rule(
            "COMP-007",
            "car",
            "No Admission of Liability",
            &["injur", "hospital", "third party"],
            Severity::Critical,
            "Do not admit liability on the insured's behalf for third-party injuries.",
        ),
        rule(
            "COMP-008",
            "life",
            "Bereavement Handling",
            &["death", "passed away", "deceased", "died"],
            Severity::Critical,
            "Offer condolences first and explain the claim process gently; do not rush document requests.",
        ),
        rule(
            "COMP-009",
            "life",
            "Nominee Change Restriction",
            &["nominee", "beneficiary"],
            Severity::High,
            "Nominee changes require a signed nomination form; never change nominees over the phone.",
        ),
        rule(
            "COMP-010",
            "life",
            "Contestability Disclosure",
            &["claim", "contestab"],
            Severity::Medium,
            "Disclose that claims within the contestability period are subject to investigation.",
        ),
        rule(
            "COMP-011",
            "premium",
            "Revival Promises",
            &["premium", "payment", "lapse", "grace"],
            Severity::Medium,
            "Do not promise policy revival; revival is subject to underwriting.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identifiers_are_unique() {
        let docs: HashSet<String> = knowledge_documents().into_iter().map(|d| d.id).collect();
        assert_eq!(docs.len(), knowledge_documents().len());
        let rules: HashSet<String> = compliance_rules().into_iter().map(|r| r.id).collect();
        assert_eq!(rules.len(), compliance_rules().len());
    }

    #[test]
    fn tags_and_triggers_are_lowercase() {
        for doc in knowledge_documents() {
            for tag in &doc.tags {
                assert_eq!(tag, &tag.to_lowercase(), "tag {tag} in {}", doc.id);
            }
        }
        for rule in compliance_rules() {
            for trigger in &rule.triggers {
                assert_eq!(trigger, &trigger.to_lowercase(), "trigger {trigger} in {}", rule.id);
            }
        }
    }
}
