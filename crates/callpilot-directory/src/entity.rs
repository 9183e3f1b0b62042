//! Pattern-based identity hint extraction.

use callpilot_types::Entities;
use once_cell::sync::Lazy;
use regex::Regex;

/// `CAR-100001`, `life 200002`, `car100003`.
static POLICY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(car|life)[-\s]?(\d{6})\b").expect("valid policy id pattern"));

/// Digit runs with optional `+`, spaces and dashes.
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d\s-]{8,}\d").expect("valid phone pattern"));

/// Introductions followed by one or two capitalized words.
static NAME_CAPITALIZED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:my name is|this is|i am|i'm)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)")
        .expect("valid name pattern")
});

/// Explicit `my name is` with a lowercase transcription; first word only.
static NAME_EXPLICIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:my name is|my name's)\s+([a-z][a-z'-]+)").expect("valid name pattern")
});

const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 13;

/// First policy id in `text`, in canonical form: uppercase prefix, dash,
/// six digits.
fn find_policy_id(text: &str) -> Option<String> {
    POLICY_ID
        .captures(text)
        .map(|caps| format!("{}-{}", caps[1].to_ascii_uppercase(), &caps[2]))
}

fn find_phone(text: &str) -> Option<String> {
    // Policy ids carry digits too; blank them so they never join a phone run.
    let without_ids = POLICY_ID.replace_all(text, " ");
    PHONE.find_iter(&without_ids).find_map(|m| {
        let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
        (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS)
            .contains(&digits)
            .then(|| m.as_str().trim().to_string())
    })
}

fn find_name(text: &str) -> Option<String> {
    if let Some(caps) = NAME_CAPITALIZED.captures(text) {
        return Some(caps[1].to_string());
    }
    NAME_EXPLICIT.captures(text).map(|caps| caps[1].to_string())
}

/// Extracts every identity hint the pattern rules can find.
pub fn extract_entities(text: &str) -> Entities {
    Entities {
        id: find_policy_id(text),
        name: find_name(text),
        phone: find_phone(text),
    }
}

/// Fast-path detector: only machine-checkable identifier formats (policy id,
/// phone number), never names. Returns `None` when neither is present.
pub fn detect_identifier(text: &str) -> Option<Entities> {
    let id = find_policy_id(text);
    let phone = if id.is_some() { None } else { find_phone(text) };
    if id.is_none() && phone.is_none() {
        return None;
    }
    Some(Entities {
        id,
        name: None,
        phone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_policy_id_in_canonical_form() {
        let e = extract_entities("my policy number is car 100002 please");
        assert_eq!(e.id.as_deref(), Some("CAR-100002"));
        assert_eq!(
            extract_entities("It's LIFE-200001.").id.as_deref(),
            Some("LIFE-200001")
        );
    }

    #[test]
    fn policy_id_digits_do_not_form_phone() {
        let e = extract_entities("policy CAR-100002 1234");
        assert_eq!(e.id.as_deref(), Some("CAR-100002"));
        assert!(e.phone.is_none());
    }

    #[test]
    fn extracts_formatted_phone() {
        let e = extract_entities("you can reach me on +91 87654-32109 anytime");
        assert_eq!(e.phone.as_deref(), Some("+91 87654-32109"));
    }

    #[test]
    fn rejects_short_digit_runs() {
        assert!(extract_entities("the bill was 45000 rupees").phone.is_none());
    }

    #[test]
    fn extracts_capitalized_name() {
        let e = extract_entities("Hi, this is Priya Sharma calling about my car");
        assert_eq!(e.name.as_deref(), Some("Priya Sharma"));
    }

    #[test]
    fn extracts_lowercase_explicit_name() {
        let e = extract_entities("hello my name is rajesh and I had an accident");
        assert_eq!(e.name.as_deref(), Some("rajesh"));
    }

    #[test]
    fn ordinary_sentences_have_no_name() {
        assert!(extract_entities("i am calling about an accident").name.is_none());
    }

    #[test]
    fn detector_prefers_policy_id_and_ignores_names() {
        let hint = detect_identifier("this is Priya Sharma, policy CAR-100002")
            .expect("identifier expected");
        assert_eq!(hint.id.as_deref(), Some("CAR-100002"));
        assert!(hint.name.is_none());
        assert!(hint.phone.is_none());

        assert!(detect_identifier("this is Priya Sharma").is_none());
    }

    #[test]
    fn detector_falls_back_to_phone() {
        let hint = detect_identifier("my number is 8765432109").expect("identifier expected");
        assert!(hint.id.is_none());
        assert_eq!(hint.phone.as_deref(), Some("8765432109"));
    }

    #[test]
    fn policy_ids_come_out_canonical() {
        assert_eq!(find_policy_id("it's car 100001").as_deref(), Some("CAR-100001"));
        assert_eq!(find_policy_id("Life-200002 please").as_deref(), Some("LIFE-200002"));
        assert_eq!(find_policy_id("nonsense"), None);
    }
}
