//! Streaming envelope: inbound classification and outbound events.

use callpilot_graph::ProcessingState;
use callpilot_types::{
    CallEvaluation, ComplianceRule, IntentResult, KnowledgeDocument, MemberRecord,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speaker label applied when a fragment does not carry one.
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Speech SDK offsets count 100-nanosecond ticks.
pub const TICKS_PER_SECOND: f64 = 10_000_000.0;

/// Largest accepted offset once converted to seconds (24 hours).
pub const MAX_OFFSET_SECS: f64 = 86_400.0;

/// Unit of the inbound `offset` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetUnit {
    /// 100-ns ticks, as produced by speech recognizers.
    #[default]
    Ticks,
    Seconds,
}

impl OffsetUnit {
    pub fn to_secs(self, raw: f64) -> f64 {
        match self {
            Self::Ticks => raw / TICKS_PER_SECOND,
            Self::Seconds => raw,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    is_finalized: Option<bool>,
    speaker: Option<String>,
    offset: Option<f64>,
}

/// A transcript fragment as received from upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFragment {
    pub text: String,
    pub is_finalized: bool,
    pub speaker: String,
    /// Seconds from call start, when upstream supplied an offset.
    pub offset: Option<f64>,
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Transcript(TranscriptFragment),
    EndCall,
}

/// Why an inbound message was dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("malformed envelope: {0}")]
    Malformed(String),
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("transcript fragment has no text")]
    MissingText,
    #[error("transcript text exceeds {max} bytes")]
    TextTooLong { max: usize },
    #[error("offset must be between 0 and 86400 seconds")]
    InvalidOffset,
}

/// Classifies one inbound frame.
///
/// `type` defaults to `transcript`, `is_finalized` to `true` and `speaker`
/// to [`UNKNOWN_SPEAKER`]. `offset` is read in `unit` and converted to
/// seconds.
pub fn parse_inbound(
    raw: &str,
    max_text_len: usize,
    unit: OffsetUnit,
) -> Result<Inbound, ValidationError> {
    let envelope: RawEnvelope =
        serde_json::from_str(raw).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    match envelope.kind.as_deref().unwrap_or("transcript") {
        "end_call" => Ok(Inbound::EndCall),
        "transcript" => {
            let text = envelope
                .text
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .ok_or(ValidationError::MissingText)?;
            if text.len() > max_text_len {
                return Err(ValidationError::TextTooLong { max: max_text_len });
            }
            let offset = envelope
                .offset
                .map(|raw| {
                    let secs = unit.to_secs(raw);
                    if secs.is_finite() && (0.0..=MAX_OFFSET_SECS).contains(&secs) {
                        Ok(secs)
                    } else {
                        Err(ValidationError::InvalidOffset)
                    }
                })
                .transpose()?;
            let speaker = envelope
                .speaker
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string());

            Ok(Inbound::Transcript(TranscriptFragment {
                text,
                is_finalized: envelope.is_finalized.unwrap_or(true),
                speaker,
                offset,
            }))
        }
        other => Err(ValidationError::UnknownType(other.to_string())),
    }
}

/// Echo of a transcript fragment with its derived timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEcho {
    pub text: String,
    pub is_finalized: bool,
    pub speaker: String,
    pub offset: f64,
    pub timestamp: String,
}

/// Every event a session can emit, serialized as `{"type", "data"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    Transcript(TranscriptEcho),
    MemberProfile(MemberRecord),
    Processing { status: String, seq: u64 },
    Intent(IntentResult),
    Knowledge(Vec<KnowledgeDocument>),
    Compliance(Vec<ComplianceRule>),
    /// Resets the suggestion panel before a streamed suggestion.
    ClearSuggestion,
    /// One streamed piece of the suggestion, appended client-side.
    SuggestionChunk { text: String },
    /// The complete suggestion.
    Suggestion { text: String },
    PostCallEvaluation(CallEvaluation),
    Error { message: String },
}

impl OutboundEvent {
    /// The `type` tag this event serializes with.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transcript(_) => "transcript",
            Self::MemberProfile(_) => "member_profile",
            Self::Processing { .. } => "processing",
            Self::Intent(_) => "intent",
            Self::Knowledge(_) => "knowledge",
            Self::Compliance(_) => "compliance",
            Self::ClearSuggestion => "clear_suggestion",
            Self::SuggestionChunk { .. } => "suggestion_chunk",
            Self::Suggestion { .. } => "suggestion",
            Self::PostCallEvaluation(_) => "post_call_evaluation",
            Self::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Context events for one finished invocation, in emission order: intent,
/// member, knowledge, compliance, then suggestion when the state carries
/// one. Absent fields are skipped; produced-but-empty lists are kept.
pub fn slow_path_events(state: &ProcessingState) -> Vec<OutboundEvent> {
    let mut events = Vec::with_capacity(5);
    if let Some(intent) = state.intent_result() {
        events.push(OutboundEvent::Intent(intent));
    }
    if let Some(member) = &state.member_data {
        events.push(OutboundEvent::MemberProfile(member.clone()));
    }
    if let Some(docs) = &state.knowledge_docs {
        events.push(OutboundEvent::Knowledge(docs.clone()));
    }
    if let Some(rules) = &state.compliance_alerts {
        events.push(OutboundEvent::Compliance(rules.clone()));
    }
    if let Some(text) = &state.suggestion {
        events.push(OutboundEvent::Suggestion { text: text.clone() });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 64;

    fn parse(raw: &str) -> Result<Inbound, ValidationError> {
        parse_inbound(raw, MAX, OffsetUnit::Seconds)
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let parsed = parse(r#"{"text":"  hello  "}"#).expect("valid fragment");
        assert_eq!(
            parsed,
            Inbound::Transcript(TranscriptFragment {
                text: "hello".to_string(),
                is_finalized: true,
                speaker: UNKNOWN_SPEAKER.to_string(),
                offset: None,
            })
        );
    }

    #[test]
    fn end_call_needs_no_fields() {
        assert_eq!(
            parse(r#"{"type":"end_call"}"#),
            Ok(Inbound::EndCall)
        );
    }

    #[test]
    fn invalid_messages_are_classified() {
        assert!(matches!(
            parse("not json"),
            Err(ValidationError::Malformed(_))
        ));
        assert_eq!(
            parse(r#"{"type":"transcript","text":"   "}"#),
            Err(ValidationError::MissingText)
        );
        assert_eq!(
            parse(r#"{"type":"mute"}"#),
            Err(ValidationError::UnknownType("mute".to_string()))
        );
        assert_eq!(
            parse(&format!(r#"{{"text":"{}"}}"#, "a".repeat(MAX + 1))),
            Err(ValidationError::TextTooLong { max: MAX })
        );
        assert_eq!(
            parse(r#"{"text":"hi","offset":-1.0}"#),
            Err(ValidationError::InvalidOffset)
        );
    }

    #[test]
    fn ticks_are_converted_to_seconds() {
        let parsed = parse_inbound(r#"{"text":"hi","offset":25000000}"#, MAX, OffsetUnit::Ticks);
        match parsed {
            Ok(Inbound::Transcript(fragment)) => assert_eq!(fragment.offset, Some(2.5)),
            other => panic!("unexpected parse {other:?}"),
        }
    }

    #[test]
    fn offsets_beyond_a_day_are_rejected() {
        assert_eq!(
            parse(r#"{"text":"hi","offset":1.0e13}"#),
            Err(ValidationError::InvalidOffset)
        );
        assert_eq!(
            parse_inbound(r#"{"text":"hi","offset":1.0e300}"#, MAX, OffsetUnit::Ticks),
            Err(ValidationError::InvalidOffset)
        );
        assert!(parse(&format!(r#"{{"text":"hi","offset":{MAX_OFFSET_SECS}}}"#)).is_ok());
    }

    #[test]
    fn events_serialize_as_type_and_data() {
        let json = serde_json::to_value(OutboundEvent::Processing {
            status: "processing".to_string(),
            seq: 3,
        })
        .expect("serialize");
        assert_eq!(json["type"], "processing");
        assert_eq!(json["data"]["seq"], 3);

        let json = serde_json::to_value(OutboundEvent::error("boom")).expect("serialize");
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"]["message"], "boom");

        let json = serde_json::to_value(OutboundEvent::ClearSuggestion).expect("serialize");
        assert_eq!(json, serde_json::json!({"type": "clear_suggestion"}));

        let json = serde_json::to_value(OutboundEvent::SuggestionChunk {
            text: "Sorry to".to_string(),
        })
        .expect("serialize");
        assert_eq!(json["type"], "suggestion_chunk");
        assert_eq!(json["data"]["text"], "Sorry to");
    }

    #[test]
    fn slow_path_events_follow_fixed_order_and_skip_absent_fields() {
        let state = ProcessingState {
            transcript: "x".to_string(),
            intent: Some("general_inquiry".to_string()),
            claim_type: Some("general".to_string()),
            knowledge_docs: Some(Vec::new()),
            compliance_alerts: Some(Vec::new()),
            suggestion: Some("ask for the policy number".to_string()),
            ..ProcessingState::default()
        };
        let kinds: Vec<_> = slow_path_events(&state).iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["intent", "knowledge", "compliance", "suggestion"]);
    }
}
