//! Post-call evaluation scorecard.

use crate::{Utterance, AGENT_SPEAKER, CUSTOMER_SPEAKER};
use serde::{Deserialize, Serialize};

/// Per-category agent scores, each on a 0–10 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub empathy_and_tone: u8,
    pub information_gathering: u8,
    pub compliance_adherence: u8,
    pub process_knowledge: u8,
    pub resolution_and_next_steps: u8,
}

impl CategoryScores {
    /// Clamps every category to the 0–10 range.
    pub fn clamped(self) -> Self {
        Self {
            empathy_and_tone: self.empathy_and_tone.min(10),
            information_gathering: self.information_gathering.min(10),
            compliance_adherence: self.compliance_adherence.min(10),
            process_knowledge: self.process_knowledge.min(10),
            resolution_and_next_steps: self.resolution_and_next_steps.min(10),
        }
    }

    /// Sum of the five categories scaled to 0–100.
    pub fn overall(&self) -> u8 {
        let c = self.clamped();
        let sum = u32::from(c.empathy_and_tone)
            + u32::from(c.information_gathering)
            + u32::from(c.compliance_adherence)
            + u32::from(c.process_knowledge)
            + u32::from(c.resolution_and_next_steps);
        // 5 categories * 10 points = 50, doubled to reach 100.
        (sum * 2).min(100) as u8
    }
}

/// Utterance counts derived from a frozen transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtteranceTally {
    pub total_utterances: usize,
    pub agent_utterances: usize,
    pub customer_utterances: usize,
}

impl UtteranceTally {
    /// Counts utterances by exact speaker label.
    ///
    /// Speakers other than `Agent` and `Customer` count toward the total only.
    pub fn from_utterances(utterances: &[Utterance]) -> Self {
        let mut tally = Self {
            total_utterances: utterances.len(),
            ..Self::default()
        };
        for u in utterances {
            if u.speaker == AGENT_SPEAKER {
                tally.agent_utterances += 1;
            } else if u.speaker == CUSTOMER_SPEAKER {
                tally.customer_utterances += 1;
            }
        }
        tally
    }
}

/// Structured scorecard produced once at the end of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEvaluation {
    /// 0–100.
    pub overall_score: u8,
    pub call_summary: String,
    pub scores: CategoryScores,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub compliance_violations: Vec<String>,
    #[serde(default)]
    pub coaching_notes: String,
    pub call_duration_seconds: u64,
    #[serde(flatten)]
    pub tally: UtteranceTally,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(speaker: &str) -> Utterance {
        Utterance {
            speaker: speaker.to_string(),
            text: "x".to_string(),
            offset_secs: 0.0,
            timestamp: "00:00:00".to_string(),
        }
    }

    #[test]
    fn tally_sums_when_speakers_are_known() {
        let lines = vec![line("Agent"), line("Customer"), line("Agent"), line("Customer")];
        let tally = UtteranceTally::from_utterances(&lines);
        assert_eq!(tally.total_utterances, 4);
        assert_eq!(
            tally.agent_utterances + tally.customer_utterances,
            tally.total_utterances
        );
    }

    #[test]
    fn tally_ignores_unknown_speakers_in_role_counts() {
        let lines = vec![line("Agent"), line("agent"), line("Unknown")];
        let tally = UtteranceTally::from_utterances(&lines);
        assert_eq!(tally.total_utterances, 3);
        assert_eq!(tally.agent_utterances, 1);
        assert_eq!(tally.customer_utterances, 0);
    }

    #[test]
    fn overall_scales_to_hundred() {
        let perfect = CategoryScores {
            empathy_and_tone: 10,
            information_gathering: 10,
            compliance_adherence: 10,
            process_knowledge: 10,
            resolution_and_next_steps: 10,
        };
        assert_eq!(perfect.overall(), 100);

        let overflow = CategoryScores {
            empathy_and_tone: 200,
            ..CategoryScores::default()
        };
        assert_eq!(overflow.overall(), 20);
    }

    #[test]
    fn tally_is_flattened_into_scorecard() {
        let eval = CallEvaluation {
            overall_score: 50,
            call_summary: "s".to_string(),
            scores: CategoryScores::default(),
            strengths: vec![],
            improvements: vec![],
            compliance_violations: vec![],
            coaching_notes: String::new(),
            call_duration_seconds: 61,
            tally: UtteranceTally {
                total_utterances: 2,
                agent_utterances: 1,
                customer_utterances: 1,
            },
        };
        let json = serde_json::to_value(&eval).expect("serialization should not fail");
        assert_eq!(json["total_utterances"], 2);
        assert_eq!(json["call_duration_seconds"], 61);
        assert!(json.get("tally").is_none());
    }
}
