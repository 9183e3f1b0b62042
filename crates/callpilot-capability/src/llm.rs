//! OpenAI-compatible generative backend.
//!
//! Used for classification, suggestion synthesis and post-call evaluation
//! when `llm.enabled` is set. Answers requested as JSON are parsed with
//! `serde_json`; anything that does not fit the expected shape is a
//! [`CapabilityError::InvalidResponse`]. Calls are never retried.

use crate::{
    CallEvaluator, CapabilityError, EvaluationInput, IntentClassifier, SuggestionContext,
    SuggestionSynthesizer,
};
use async_trait::async_trait;
use callpilot_types::{CallEvaluation, CategoryScores, IntentResult, UtteranceTally};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const USER_AGENT: &str = concat!("callpilot/", env!("CARGO_PKG_VERSION"));

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_ms() -> u64 {
    20_000
}

/// `[llm]` configuration section.
///
/// The API key itself never lives in the file: `api_key_env` names the
/// environment variable that holds it.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// One line of a server-sent event stream.
#[derive(Debug, PartialEq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine, CapabilityError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| CapabilityError::InvalidResponse(e.to_string()))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .map_or(SseLine::Skip, SseLine::Delta))
}

/// Splits a byte stream into complete lines. Bytes after the last newline
/// wait for the next push, so multi-byte characters split across network
/// chunks decode intact.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(
                String::from_utf8_lossy(&line)
                    .trim_end_matches(['\r', '\n'])
                    .to_string(),
            );
        }
        lines
    }

    fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Chat-completions client.
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl LlmClient {
    /// Builds a client, reading the API key from `settings.api_key_env`.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, CapabilityError> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CapabilityError::Unavailable(format!("{} is not set", settings.api_key_env))
            })?;
        Self::new(settings, api_key)
    }

    /// Builds a client with an explicit API key.
    pub fn new(settings: &LlmSettings, api_key: String) -> Result<Self, CapabilityError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            model: settings.model.clone(),
            temperature: settings.temperature,
            api_key,
        })
    }

    fn request<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        json: bool,
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            response_format: json.then_some(ResponseFormat {
                kind: "json_object",
            }),
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response, CapabilityError> {
        tracing::debug!(
            model = %self.model,
            json = request.response_format.is_some(),
            stream = request.stream,
            "sending chat completion"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Backend(format!(
                "{}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(response)
    }

    /// Sends one system + user exchange and returns the reply text.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        json: bool,
    ) -> Result<String, CapabilityError> {
        let response = self.send(&self.request(system, user, json, false)).await?;
        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CapabilityError::InvalidResponse("empty completion".to_string()))
    }

    /// Streams a plain-text reply, forwarding each content delta to
    /// `chunks`, and returns the concatenated text.
    ///
    /// A dropped receiver does not cancel the request; the reply is still
    /// read to the end.
    pub async fn complete_stream(
        &self,
        system: &str,
        user: &str,
        chunks: &mpsc::Sender<String>,
    ) -> Result<String, CapabilityError> {
        let response = self.send(&self.request(system, user, false, true)).await?;
        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut text = String::new();
        let mut receiver_open = true;

        'read: while let Some(bytes) = body.next().await {
            for line in lines.push(&bytes?) {
                match parse_sse_line(&line)? {
                    SseLine::Delta(delta) => {
                        text.push_str(&delta);
                        if receiver_open && chunks.send(delta).await.is_err() {
                            receiver_open = false;
                        }
                    }
                    SseLine::Done => break 'read,
                    SseLine::Skip => {}
                }
            }
        }
        let tail = lines.finish().map(|line| parse_sse_line(&line)).transpose()?;
        if let Some(SseLine::Delta(delta)) = tail {
            text.push_str(&delta);
            if receiver_open && chunks.send(delta).await.is_err() {
                tracing::debug!("stream receiver dropped before the last chunk");
            }
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(CapabilityError::InvalidResponse(
                "empty streamed completion".to_string(),
            ));
        }
        Ok(text)
    }

    /// Like [`complete`](Self::complete) but parses the reply as `T`.
    pub async fn complete_json<T>(&self, system: &str, user: &str) -> Result<T, CapabilityError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let raw = self.complete(system, user, true).await?;
        parse_json_reply(&raw)
    }
}

/// Parses a JSON answer, tolerating a fenced code block around it.
pub(crate) fn parse_json_reply<T>(raw: &str) -> Result<T, CapabilityError>
where
    T: for<'de> Deserialize<'de>,
{
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body).map_err(|e| CapabilityError::InvalidResponse(e.to_string()))
}

const CLASSIFY_PROMPT: &str = "You classify contact-center calls for a car and life insurer. \
Reply with JSON {\"intent\": string, \"claim_type\": string}. intent is snake_case and starts \
with the line of business when one applies (car_accident, car_theft, life_claim, \
life_nominee_update, premium_payment, policy_renewal, policy_cancellation, complaint, \
general_inquiry). claim_type is one of car_insurance, life_insurance, general.";

const SUGGEST_PROMPT: &str = "You assist a contact-center agent in real time. Given the \
context JSON, write one or two sentences the agent can say next. Respect every compliance \
rule listed. Plain text only.";

const EVALUATE_PROMPT: &str = "You are a quality analyst scoring a contact-center call. \
Reply with JSON {\"call_summary\": string, \"scores\": {\"empathy_and_tone\": 0-10, \
\"information_gathering\": 0-10, \"compliance_adherence\": 0-10, \"process_knowledge\": 0-10, \
\"resolution_and_next_steps\": 0-10}, \"strengths\": [string], \"improvements\": [string], \
\"compliance_violations\": [string], \"coaching_notes\": string}.";

/// LLM-backed [`IntentClassifier`].
#[derive(Debug, Clone)]
pub struct LlmClassifier {
    client: Arc<LlmClient>,
}

impl LlmClassifier {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, transcript: &str) -> Result<IntentResult, CapabilityError> {
        let result: IntentResult = self.client.complete_json(CLASSIFY_PROMPT, transcript).await?;
        if result.intent.trim().is_empty() {
            return Err(CapabilityError::InvalidResponse("blank intent".to_string()));
        }
        Ok(result)
    }
}

/// LLM-backed [`SuggestionSynthesizer`].
#[derive(Debug, Clone)]
pub struct LlmSynthesizer {
    client: Arc<LlmClient>,
}

impl LlmSynthesizer {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SuggestionSynthesizer for LlmSynthesizer {
    async fn synthesize_suggestion(
        &self,
        context: &SuggestionContext,
    ) -> Result<String, CapabilityError> {
        let payload = serde_json::to_string(context)?;
        self.client.complete(SUGGEST_PROMPT, &payload, false).await
    }

    async fn stream_suggestion(
        &self,
        context: &SuggestionContext,
        chunks: mpsc::Sender<String>,
    ) -> Result<String, CapabilityError> {
        let payload = serde_json::to_string(context)?;
        self.client
            .complete_stream(SUGGEST_PROMPT, &payload, &chunks)
            .await
    }
}

#[derive(Deserialize)]
struct Scorecard {
    #[serde(default)]
    call_summary: String,
    scores: CategoryScores,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    compliance_violations: Vec<String>,
    #[serde(default)]
    coaching_notes: String,
}

impl Scorecard {
    /// Duration and utterance counts come from the frozen call, not the model.
    fn into_evaluation(self, input: &EvaluationInput) -> CallEvaluation {
        let scores = self.scores.clamped();
        CallEvaluation {
            overall_score: scores.overall(),
            call_summary: self.call_summary,
            scores,
            strengths: self.strengths,
            improvements: self.improvements,
            compliance_violations: self.compliance_violations,
            coaching_notes: self.coaching_notes,
            call_duration_seconds: input.duration_secs,
            tally: UtteranceTally::from_utterances(&input.transcript),
        }
    }
}

/// LLM-backed [`CallEvaluator`].
#[derive(Debug, Clone)]
pub struct LlmEvaluator {
    client: Arc<LlmClient>,
}

impl LlmEvaluator {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallEvaluator for LlmEvaluator {
    async fn evaluate_call(
        &self,
        input: &EvaluationInput,
    ) -> Result<CallEvaluation, CapabilityError> {
        let intent = input
            .intent
            .as_ref()
            .map(|i| i.intent.as_str())
            .unwrap_or("unknown");
        let member = input
            .member
            .as_ref()
            .map(|m| format!("{} ({}, {})", m.name, m.policy_id, m.coverage_type))
            .unwrap_or_else(|| "unidentified".to_string());
        let prompt = format!(
            "Duration: {}s\nIntent: {}\nMember: {}\nTranscript:\n{}",
            input.duration_secs,
            intent,
            member,
            input.transcript_lines()
        );
        let card: Scorecard = self.client.complete_json(EVALUATE_PROMPT, &prompt).await?;
        Ok(card.into_evaluation(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callpilot_types::{Utterance, AGENT_SPEAKER};

    #[test]
    fn settings_default_to_disabled() {
        let settings = LlmSettings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.model, "gpt-4.1-mini");
        assert_eq!(settings.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = LlmClient::new(&LlmSettings::default(), "sk-secret".to_string())
            .expect("client should build");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("/v1/chat/completions"));
    }

    #[test]
    fn missing_key_env_is_unavailable() {
        let settings = LlmSettings {
            api_key_env: "CALLPILOT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmSettings::default()
        };
        assert!(matches!(
            LlmClient::from_settings(&settings),
            Err(CapabilityError::Unavailable(_))
        ));
    }

    #[test]
    fn parses_fenced_json() {
        let parsed: IntentResult = parse_json_reply(
            "```json\n{\"intent\":\"car_accident\",\"claim_type\":\"car_insurance\"}\n```",
        )
        .expect("fenced json should parse");
        assert_eq!(parsed.intent, "car_accident");
    }

    #[test]
    fn malformed_json_is_invalid_response() {
        let parsed: Result<IntentResult, _> = parse_json_reply("the intent is car accident");
        assert!(matches!(parsed, Err(CapabilityError::InvalidResponse(_))));
    }

    #[test]
    fn sse_lines_yield_deltas_until_done() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#).unwrap(),
            SseLine::Delta("Hel".to_string())
        );
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            SseLine::Skip
        );
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line("").unwrap(), SseLine::Skip);
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseLine::Done);
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(CapabilityError::InvalidResponse(_))
        ));
    }

    #[test]
    fn line_buffer_joins_lines_split_across_chunks() {
        let mut buffer = LineBuffer::default();
        let text = "data: caf\u{e9}\r\ndata: [DONE]\n";
        let bytes = text.as_bytes();
        // Split inside the two-byte `é`.
        let split = text.find('\u{e9}').unwrap() + 1;

        assert!(buffer.push(&bytes[..split]).is_empty());
        assert_eq!(
            buffer.push(&bytes[split..]),
            vec!["data: caf\u{e9}".to_string(), "data: [DONE]".to_string()]
        );
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn streaming_request_sets_stream_flag_only_when_asked() {
        let client = LlmClient::new(&LlmSettings::default(), "sk-test".to_string())
            .expect("client should build");
        let plain = serde_json::to_value(client.request("sys", "user", true, false)).unwrap();
        assert!(plain.get("stream").is_none());
        assert_eq!(plain["response_format"]["type"], "json_object");

        let streamed = serde_json::to_value(client.request("sys", "user", false, true)).unwrap();
        assert_eq!(streamed["stream"], true);
        assert!(streamed.get("response_format").is_none());
    }

    #[test]
    fn scorecard_counts_come_from_transcript() {
        let raw = r#"{"call_summary":"ok","scores":{"empathy_and_tone":12,
            "information_gathering":7,"compliance_adherence":9,"process_knowledge":8,
            "resolution_and_next_steps":6}}"#;
        let card: Scorecard = parse_json_reply(raw).expect("scorecard should parse");
        let input = EvaluationInput {
            transcript: vec![Utterance {
                speaker: AGENT_SPEAKER.to_string(),
                text: "hi".to_string(),
                offset_secs: 0.0,
                timestamp: "00:00:00".to_string(),
            }],
            duration_secs: 42,
            ..EvaluationInput::default()
        };
        let eval = card.into_evaluation(&input);
        assert_eq!(eval.scores.empathy_and_tone, 10);
        assert_eq!(eval.overall_score, 80);
        assert_eq!(eval.tally.agent_utterances, 1);
        assert_eq!(eval.call_duration_seconds, 42);
    }
}
