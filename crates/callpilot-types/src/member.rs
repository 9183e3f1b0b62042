//! Member/policy record definitions.
//!
//! Records are owned by the member directory and immutable per lookup. The
//! wire format is camelCase to match the agent console.

use serde::{Deserialize, Serialize};

/// A customer/policy record as returned by the member directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    /// Policy identifier (`CAR-xxxxxx` or `LIFE-xxxxxx`).
    pub policy_id: String,
    /// Full name of the policy holder.
    pub name: String,
    /// Contact phone number, as stored (formatting preserved).
    pub phone: String,
    pub email: String,
    /// Coverage product, e.g. "Comprehensive" or "Term Life".
    pub coverage_type: String,
    /// Policy status, e.g. "Active" or "Lapsed".
    pub status: String,
    /// Sum insured, in rupees.
    pub coverage_amount: u64,
    /// Annual premium, in rupees.
    pub premium: u64,
    /// Premium amount currently overdue, in rupees.
    pub outstanding_balance: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductible: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub add_ons: Vec<String>,
    #[serde(default)]
    pub claim_history: Vec<ClaimRecord>,
    #[serde(default)]
    pub beneficiaries: Vec<Beneficiary>,
    /// Life policies only: whether the contestability window has passed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contestability_expired: Option<bool>,
}

impl MemberRecord {
    /// Returns the phone number with every non-digit removed.
    pub fn phone_digits(&self) -> String {
        self.phone.chars().filter(char::is_ascii_digit).collect()
    }
}

/// Insured vehicle details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub year: u16,
    pub make: String,
    pub model: String,
    pub license_plate: String,
}

/// A past claim against the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub claim_id: String,
    /// ISO-8601 date.
    pub date: String,
    pub amount: u64,
    pub reason: String,
    pub status: String,
}

/// A life-policy nominee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiary {
    pub name: String,
    pub relationship: String,
    /// Share of the payout, e.g. "50%".
    pub share: String,
}
