//! Heuristic post-call scorecard.

use crate::{CallEvaluator, CapabilityError, EvaluationInput};
use async_trait::async_trait;
use callpilot_types::{CallEvaluation, CategoryScores, UtteranceTally, AGENT_SPEAKER};

const EMPATHY: &[&str] = &["sorry", "understand", "apologi", "condolence", "thank"];
const VERIFICATION: &[&str] = &["verify", "confirm", "date of birth", "registered"];
const PROCESS: &[&str] = &[
    "claim", "document", "process", "garage", "surveyor", "nominee", "policy", "days",
];
const CLOSING: &[&str] = &[
    "anything else", "reference number", "next step", "within", "will call", "email you",
];

fn mentions(lines: &[String], words: &[&str]) -> bool {
    lines.iter().any(|l| words.iter().any(|w| l.contains(w)))
}

/// Scores the agent's side of the call from keyword evidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEvaluator;

/// Builds the scorecard for `input`. Deterministic.
pub fn score_call(input: &EvaluationInput) -> CallEvaluation {
    let tally = UtteranceTally::from_utterances(&input.transcript);
    let agent: Vec<String> = input
        .transcript
        .iter()
        .filter(|u| u.speaker == AGENT_SPEAKER)
        .map(|u| u.text.to_lowercase())
        .collect();

    let intent = input
        .intent
        .as_ref()
        .map(|i| i.intent.as_str())
        .unwrap_or("an unclassified request");
    let caller = input
        .member
        .as_ref()
        .map(|m| format!("{} ({})", m.name, m.policy_id))
        .unwrap_or_else(|| "an unidentified caller".to_string());
    let call_summary = format!(
        "{} utterance call with {} about {}, lasting {}m {}s.",
        tally.total_utterances,
        caller,
        intent,
        input.duration_secs / 60,
        input.duration_secs % 60
    );

    if agent.is_empty() {
        return CallEvaluation {
            overall_score: 0,
            call_summary,
            scores: CategoryScores::default(),
            strengths: Vec::new(),
            improvements: vec!["No agent speech was captured".to_string()],
            compliance_violations: Vec::new(),
            coaching_notes: "Check that the agent channel is being transcribed.".to_string(),
            call_duration_seconds: input.duration_secs,
            tally,
        };
    }

    let questions = agent.iter().filter(|l| l.contains('?')).count();
    let verified = mentions(&agent, VERIFICATION);
    let closing = agent
        .last()
        .is_some_and(|l| CLOSING.iter().any(|w| l.contains(w)));

    let scores = CategoryScores {
        empathy_and_tone: if mentions(&agent, EMPATHY) { 8 } else { 5 },
        information_gathering: (4 + 2 * questions).min(10) as u8,
        compliance_adherence: if verified { 9 } else { 4 },
        process_knowledge: if mentions(&agent, PROCESS) { 8 } else { 5 },
        resolution_and_next_steps: if closing { 8 } else { 4 },
    };

    let labelled = [
        ("Empathy and tone", scores.empathy_and_tone),
        ("Information gathering", scores.information_gathering),
        ("Compliance adherence", scores.compliance_adherence),
        ("Process knowledge", scores.process_knowledge),
        ("Resolution and next steps", scores.resolution_and_next_steps),
    ];
    let strengths = labelled
        .iter()
        .filter(|(_, s)| *s >= 8)
        .map(|(l, _)| l.to_string())
        .collect();
    let improvements = labelled
        .iter()
        .filter(|(_, s)| *s < 6)
        .map(|(l, _)| l.to_string())
        .collect();

    let mut compliance_violations = Vec::new();
    if !verified {
        compliance_violations.push("Caller identity was not verified".to_string());
    }

    let coaching_notes = match labelled.iter().min_by_key(|(_, s)| *s) {
        Some((label, score)) if *score < 8 => {
            format!("Focus next on {}.", label.to_lowercase())
        }
        _ => "Solid call; keep the same structure.".to_string(),
    };

    CallEvaluation {
        overall_score: scores.overall(),
        call_summary,
        scores,
        strengths,
        improvements,
        compliance_violations,
        coaching_notes,
        call_duration_seconds: input.duration_secs,
        tally,
    }
}

#[async_trait]
impl CallEvaluator for HeuristicEvaluator {
    async fn evaluate_call(
        &self,
        input: &EvaluationInput,
    ) -> Result<CallEvaluation, CapabilityError> {
        Ok(score_call(input))
    }
}
