//! Seed members for local runs and tests.

use callpilot_types::{Beneficiary, ClaimRecord, MemberRecord, Vehicle};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The default directory contents, in scan order.
pub fn member_records() -> Vec<MemberRecord> {
    vec![
        MemberRecord {
            policy_id: "CAR-100001".to_string(),
            name: "Rajesh Kumar".to_string(),
            phone: "+91-98765-43210".to_string(),
            email: "rajesh.kumar@email.com".to_string(),
            coverage_type: "Comprehensive".to_string(),
            status: "Active".to_string(),
            coverage_amount: 850_000,
            premium: 18_500,
            outstanding_balance: 0,
            deductible: Some(2_500),
            vehicle: Some(Vehicle {
                year: 2021,
                make: "Hyundai".to_string(),
                model: "Creta".to_string(),
                license_plate: "MH-02-AB-1234".to_string(),
            }),
            add_ons: strings(&["Zero Depreciation", "Roadside Assistance"]),
            claim_history: vec![ClaimRecord {
                claim_id: "CLM-5001".to_string(),
                date: "2023-08-14".to_string(),
                amount: 42_000,
                reason: "Rear bumper collision".to_string(),
                status: "Settled".to_string(),
            }],
            beneficiaries: vec![],
            contestability_expired: None,
        },
        MemberRecord {
            policy_id: "CAR-100002".to_string(),
            name: "Priya Sharma".to_string(),
            phone: "+91-87654-32109".to_string(),
            email: "priya.sharma@email.com".to_string(),
            coverage_type: "Comprehensive".to_string(),
            status: "Active".to_string(),
            coverage_amount: 1_200_000,
            premium: 24_000,
            outstanding_balance: 0,
            deductible: Some(5_000),
            vehicle: Some(Vehicle {
                year: 2023,
                make: "Tata".to_string(),
                model: "Nexon EV".to_string(),
                license_plate: "KA-05-MN-7788".to_string(),
            }),
            add_ons: strings(&["Zero Depreciation", "Engine Protect", "Consumables Cover"]),
            claim_history: vec![],
            beneficiaries: vec![],
            contestability_expired: None,
        },
        MemberRecord {
            policy_id: "CAR-100003".to_string(),
            name: "Arjun Mehta".to_string(),
            phone: "+91-99887-76655".to_string(),
            email: "arjun.mehta@email.com".to_string(),
            coverage_type: "Third Party".to_string(),
            status: "Lapsed".to_string(),
            coverage_amount: 0,
            premium: 6_200,
            outstanding_balance: 6_200,
            deductible: None,
            vehicle: Some(Vehicle {
                year: 2015,
                make: "Maruti Suzuki".to_string(),
                model: "Swift".to_string(),
                license_plate: "DL-08-CX-4521".to_string(),
            }),
            add_ons: vec![],
            claim_history: vec![
                ClaimRecord {
                    claim_id: "CLM-4410".to_string(),
                    date: "2022-01-09".to_string(),
                    amount: 15_000,
                    reason: "Third-party vehicle damage".to_string(),
                    status: "Settled".to_string(),
                },
                ClaimRecord {
                    claim_id: "CLM-4879".to_string(),
                    date: "2023-11-27".to_string(),
                    amount: 60_000,
                    reason: "Third-party injury".to_string(),
                    status: "Under Review".to_string(),
                },
            ],
            beneficiaries: vec![],
            contestability_expired: None,
        },
        MemberRecord {
            policy_id: "LIFE-200001".to_string(),
            name: "Anita Desai".to_string(),
            phone: "+91-91234-56780".to_string(),
            email: "anita.desai@email.com".to_string(),
            coverage_type: "Term Life".to_string(),
            status: "Active".to_string(),
            coverage_amount: 10_000_000,
            premium: 14_800,
            outstanding_balance: 0,
            deductible: None,
            vehicle: None,
            add_ons: strings(&["Accidental Death Benefit"]),
            claim_history: vec![],
            beneficiaries: vec![
                Beneficiary {
                    name: "Rohan Desai".to_string(),
                    relationship: "Spouse".to_string(),
                    share: "60%".to_string(),
                },
                Beneficiary {
                    name: "Meera Desai".to_string(),
                    relationship: "Daughter".to_string(),
                    share: "40%".to_string(),
                },
            ],
            contestability_expired: Some(true),
        },
        MemberRecord {
            policy_id: "LIFE-200002".to_string(),
            name: "Vikram Singh".to_string(),
            phone: "+91-90000-11122".to_string(),
            email: "vikram.singh@email.com".to_string(),
            coverage_type: "Whole Life".to_string(),
            status: "Grace Period".to_string(),
            coverage_amount: 5_000_000,
            premium: 52_000,
            outstanding_balance: 52_000,
            deductible: None,
            vehicle: None,
            add_ons: strings(&["Waiver of Premium"]),
            claim_history: vec![],
            beneficiaries: vec![Beneficiary {
                name: "Kavita Singh".to_string(),
                relationship: "Mother".to_string(),
                share: "100%".to_string(),
            }],
            contestability_expired: Some(false),
        },
    ]
}
