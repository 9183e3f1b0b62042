//! Member directory lookup contract against the seed records.

use callpilot_directory::{extract_entities, MemberDirectory};

#[test]
fn lookup_by_id_returns_rajesh() {
    let dir = MemberDirectory::with_seed_records();
    let record = dir.lookup(Some("CAR-100001"), None, None).expect("record expected");
    assert_eq!(record.name, "Rajesh Kumar");
}

#[test]
fn lookup_by_partial_name_returns_priya() {
    let dir = MemberDirectory::with_seed_records();
    let record = dir.lookup(None, Some("priya"), None).expect("record expected");
    assert_eq!(record.policy_id, "CAR-100002");
}

#[test]
fn lookup_by_bare_phone_returns_priya() {
    let dir = MemberDirectory::with_seed_records();
    let record = dir.lookup(None, None, Some("8765432109")).expect("record expected");
    assert_eq!(record.policy_id, "CAR-100002");
}

#[test]
fn formatted_phone_query_is_digit_normalized() {
    let dir = MemberDirectory::with_seed_records();
    let record = dir
        .lookup(None, None, Some("(876) 543-2109"))
        .expect("record expected");
    assert_eq!(record.policy_id, "CAR-100002");
}

#[test]
fn extracted_hints_resolve_end_to_end() {
    let dir = MemberDirectory::with_seed_records();
    let hints = extract_entities("Hello, this is Anita Desai, my husband wants to update the nominee");
    let record = dir.lookup_entities(&hints).expect("record expected");
    assert_eq!(record.policy_id, "LIFE-200001");

    let none = extract_entities("I just have a general question");
    assert!(dir.lookup_entities(&none).is_none());
}
