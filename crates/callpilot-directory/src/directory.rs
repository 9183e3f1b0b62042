//! In-memory member directory.

use callpilot_types::{Entities, MemberRecord};
use std::collections::HashMap;

/// Read-only member/policy directory with an id index.
///
/// Lookup order:
/// 1. an exact, case-normalized policy id match wins outright;
/// 2. otherwise records are scanned in directory order and the first whose
///    name contains the name query (case-insensitive), or whose digits-only
///    phone contains the digits-only phone query, is returned.
#[derive(Debug, Clone, Default)]
pub struct MemberDirectory {
    records: Vec<MemberRecord>,
    by_id: HashMap<String, usize>,
}

impl MemberDirectory {
    /// Builds a directory over `records`. When two records share an id, the
    /// first one wins.
    pub fn new(records: Vec<MemberRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            by_id
                .entry(record.policy_id.trim().to_uppercase())
                .or_insert(idx);
        }
        Self { records, by_id }
    }

    /// Returns the directory seeded with the default car/life members.
    pub fn with_seed_records() -> Self {
        Self::new(crate::seed::member_records())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact policy-id lookup.
    pub fn get(&self, policy_id: &str) -> Option<&MemberRecord> {
        self.by_id
            .get(&policy_id.trim().to_uppercase())
            .map(|idx| &self.records[*idx])
    }

    /// Resolves identity hints to a record. `None` is a miss, not an error.
    pub fn lookup(
        &self,
        id: Option<&str>,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Option<&MemberRecord> {
        if let Some(record) = id.and_then(|id| self.get(id)) {
            tracing::debug!(policy_id = %record.policy_id, "member resolved by id");
            return Some(record);
        }

        let name_query = name
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty());
        let phone_query = phone
            .map(|p| p.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|p| !p.is_empty());

        if name_query.is_none() && phone_query.is_none() {
            return None;
        }

        let found = self.records.iter().find(|record| {
            let name_hit = name_query
                .as_deref()
                .is_some_and(|q| record.name.to_lowercase().contains(q));
            let phone_hit = phone_query
                .as_deref()
                .is_some_and(|q| record.phone_digits().contains(q));
            name_hit || phone_hit
        });

        match found {
            Some(record) => {
                tracing::debug!(policy_id = %record.policy_id, "member resolved by scan");
            }
            None => {
                tracing::debug!("member lookup miss");
            }
        }
        found
    }

    /// Convenience wrapper over [`lookup`](Self::lookup) for extracted hints.
    pub fn lookup_entities(&self, hints: &Entities) -> Option<&MemberRecord> {
        self.lookup(
            hints.id.as_deref(),
            hints.name.as_deref(),
            hints.phone.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lookup_is_case_insensitive() {
        let dir = MemberDirectory::with_seed_records();
        let record = dir.lookup(Some("car-100001"), None, None).expect("record expected");
        assert_eq!(record.name, "Rajesh Kumar");
    }

    #[test]
    fn id_match_short_circuits_name() {
        let dir = MemberDirectory::with_seed_records();
        let record = dir
            .lookup(Some("CAR-100001"), Some("priya"), None)
            .expect("record expected");
        assert_eq!(record.policy_id, "CAR-100001");
    }

    #[test]
    fn unknown_id_falls_through_to_scan() {
        let dir = MemberDirectory::with_seed_records();
        let record = dir
            .lookup(Some("CAR-999999"), Some("Priya"), None)
            .expect("record expected");
        assert_eq!(record.policy_id, "CAR-100002");
    }

    #[test]
    fn blank_queries_never_match() {
        let dir = MemberDirectory::with_seed_records();
        assert!(dir.lookup(None, Some("  "), Some("--")).is_none());
        assert!(dir.lookup(None, None, None).is_none());
    }

    #[test]
    fn unknown_hints_are_a_miss() {
        let dir = MemberDirectory::with_seed_records();
        assert!(dir.lookup(Some("LIFE-000000"), Some("Zzyzx"), Some("1111111111")).is_none());
    }

    #[test]
    fn first_duplicate_id_wins() {
        let mut records = crate::seed::member_records();
        let mut dup = records[1].clone();
        dup.policy_id = records[0].policy_id.clone();
        dup.name = "Shadow".to_string();
        records.push(dup);
        let dir = MemberDirectory::new(records);
        assert_eq!(
            dir.get("CAR-100001").map(|r| r.name.as_str()),
            Some("Rajesh Kumar")
        );
    }
}
