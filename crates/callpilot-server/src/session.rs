//! Streaming session coordinator.
//!
//! One coordinator task owns one call. It reads classified inbound frames,
//! runs the fast path inline, and hands every finalized utterance to its own
//! slow-path task: one invocation of the context graph followed by a
//! streamed suggestion. Each slow path writes its events into a private
//! queue and the coordinator forwards only the oldest queue, so an
//! utterance's events go out back to back and in utterance order while
//! later utterances keep computing.
//!
//! All async work is held in abort-on-drop task handles. When the inbound
//! side closes (the socket went away) the coordinator returns and every
//! in-flight slow path is aborted before it can emit anything else.

use crate::events::{
    parse_inbound, slow_path_events, Inbound, OffsetUnit, OutboundEvent, TranscriptEcho,
    TranscriptFragment,
};
use callpilot_capability::{
    with_deadline, Capabilities, CapabilityError, EvaluationInput, SuggestionSynthesizer,
};
use callpilot_directory::detect_identifier;
use callpilot_graph::{suggestion_context, Graph, ProcessingState};
use callpilot_types::{CallEvaluation, IntentResult, MemberRecord, Utterance};
use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::OptionFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use uuid::Uuid;

/// Capacity of the queue between a streaming synthesizer and its slow path.
const SUGGESTION_CHUNK_BUFFER: usize = 32;

/// Per-connection tunables.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub outbound_buffer: usize,
    pub max_text_len: usize,
    pub offset_unit: OffsetUnit,
    pub suggestion_timeout: Option<Duration>,
    pub evaluation_timeout: Option<Duration>,
    pub lookup_timeout: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            max_text_len: 4_096,
            offset_unit: OffsetUnit::Ticks,
            suggestion_timeout: Some(Duration::from_secs(15)),
            evaluation_timeout: Some(Duration::from_secs(60)),
            lookup_timeout: Some(Duration::from_secs(2)),
        }
    }
}

/// Lifecycle of one call.
///
/// The fast path runs inline while handling a fragment, so it has no phase
/// of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Open,
    AwaitingUtterance,
    SlowPathRunning,
    Ending,
    Closed,
}

/// A spawned task that is aborted when its handle is dropped.
struct Owned<T>(JoinHandle<T>);

impl<T> Future for Owned<T> {
    type Output = Result<T, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().0).poll(cx)
    }
}

impl<T> Drop for Owned<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One finalized utterance in flight.
struct SlowPath {
    seq: u64,
    events: mpsc::Receiver<OutboundEvent>,
    _task: Owned<()>,
}

/// State of one live call. Mutated only by its coordinator.
#[derive(Debug)]
pub struct CallSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    started: Instant,
    transcript: Vec<Utterance>,
    last_offset: f64,
    intent: Option<IntentResult>,
    member: Option<MemberRecord>,
    /// Utterance count at the time `member` was last resolved. A slow path
    /// for an utterance at or before this point is older than the profile.
    member_seq: u64,
    phase: SessionPhase,
    seq: u64,
}

impl CallSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            transcript: Vec::new(),
            last_offset: 0.0,
            intent: None,
            member: None,
            member_seq: 0,
            phase: SessionPhase::Open,
            seq: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn transcript(&self) -> &[Utterance] {
        &self.transcript
    }

    pub fn member(&self) -> Option<&MemberRecord> {
        self.member.as_ref()
    }

    /// Offsets never run backwards past the last finalized utterance.
    fn resolve_offset(&self, offset: Option<f64>) -> f64 {
        let raw = offset.unwrap_or_else(|| self.started.elapsed().as_secs_f64());
        raw.max(self.last_offset)
    }

    /// `HH:MM:SS` UTC of session start plus `offset` seconds. Offsets past
    /// the representable range pin to the session start.
    fn timestamp_at(&self, offset: f64) -> String {
        let millis = (offset * 1000.0).round() as i64;
        TimeDelta::try_milliseconds(millis)
            .and_then(|delta| self.started_at.checked_add_signed(delta))
            .unwrap_or(self.started_at)
            .format("%H:%M:%S")
            .to_string()
    }

    fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one call from first fragment to post-call evaluation.
pub struct SessionCoordinator {
    session: CallSession,
    graph: Arc<Graph>,
    caps: Capabilities,
    settings: SessionSettings,
    outbound: mpsc::Sender<OutboundEvent>,
    pending: VecDeque<SlowPath>,
    evaluation: Option<Owned<Result<CallEvaluation, CapabilityError>>>,
}

/// Next event from the oldest slow path. The inner `None` means that path
/// has finished.
async fn next_slow_event(
    pending: &mut VecDeque<SlowPath>,
) -> Option<(u64, Option<OutboundEvent>)> {
    let head = pending.front_mut()?;
    Some((head.seq, head.events.recv().await))
}

impl SessionCoordinator {
    /// `graph` is normally the context graph; the suggestion is streamed
    /// after it. A graph that already produces a suggestion is used as is.
    pub fn new(
        graph: Arc<Graph>,
        caps: Capabilities,
        settings: SessionSettings,
        outbound: mpsc::Sender<OutboundEvent>,
    ) -> Self {
        Self {
            session: CallSession::new(),
            graph,
            caps,
            settings,
            outbound,
            pending: VecDeque::new(),
            evaluation: None,
        }
    }

    pub fn session(&self) -> &CallSession {
        &self.session
    }

    /// Runs until `inbound` closes. Returns the final session state.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<String>) -> CallSession {
        tracing::info!(session_id = %self.session.id, "call session opened");

        loop {
            if self.session.phase == SessionPhase::Ending
                && self.pending.is_empty()
                && self.evaluation.is_none()
            {
                self.start_evaluation();
            }

            tokio::select! {
                Some((seq, event)) = next_slow_event(&mut self.pending), if !self.pending.is_empty() => {
                    match event {
                        Some(event) => self.forward_slow_event(seq, event).await,
                        None => self.finish_slow_path(),
                    }
                }
                Some(result) = OptionFuture::from(self.evaluation.as_mut()), if self.evaluation.is_some() => {
                    self.evaluation = None;
                    self.finish_evaluation(result).await;
                }
                message = inbound.recv() => match message {
                    Some(raw) => self.handle_message(&raw).await,
                    None => {
                        tracing::info!(
                            session_id = %self.session.id,
                            abandoned = self.pending.len() + usize::from(self.evaluation.is_some()),
                            "connection closed, abandoning in-flight work"
                        );
                        break;
                    }
                },
            }
        }

        // Dropping the handles aborts whatever is still running.
        self.pending.clear();
        self.evaluation = None;
        self.session
    }

    async fn handle_message(&mut self, raw: &str) {
        if matches!(self.session.phase, SessionPhase::Ending | SessionPhase::Closed) {
            tracing::debug!(session_id = %self.session.id, "ignoring message after end of call");
            return;
        }

        match parse_inbound(raw, self.settings.max_text_len, self.settings.offset_unit) {
            Ok(Inbound::Transcript(fragment)) => self.on_fragment(fragment).await,
            Ok(Inbound::EndCall) => {
                tracing::info!(
                    session_id = %self.session.id,
                    pending = self.pending.len(),
                    "end of call requested"
                );
                self.session.phase = SessionPhase::Ending;
            }
            Err(e) => {
                tracing::debug!(session_id = %self.session.id, error = %e, "dropping invalid inbound message");
            }
        }
    }

    async fn on_fragment(&mut self, fragment: TranscriptFragment) {
        if self.session.phase == SessionPhase::Open {
            self.session.phase = SessionPhase::AwaitingUtterance;
        }

        let offset = self.session.resolve_offset(fragment.offset);
        let timestamp = self.session.timestamp_at(offset);

        self.emit(OutboundEvent::Transcript(TranscriptEcho {
            text: fragment.text.clone(),
            is_finalized: fragment.is_finalized,
            speaker: fragment.speaker.clone(),
            offset,
            timestamp: timestamp.clone(),
        }))
        .await;

        self.fast_path(&fragment.text).await;

        if !fragment.is_finalized {
            return;
        }

        self.session.last_offset = offset;
        self.session.transcript.push(Utterance {
            speaker: fragment.speaker,
            text: fragment.text.clone(),
            offset_secs: offset,
            timestamp,
        });
        self.session.seq += 1;
        let seq = self.session.seq;

        self.emit(OutboundEvent::Processing {
            status: "processing".to_string(),
            seq,
        })
        .await;

        let (events_tx, events_rx) = mpsc::channel(self.settings.outbound_buffer.max(1));
        let task = tokio::spawn(run_slow_path(
            seq,
            fragment.text,
            Arc::clone(&self.graph),
            Arc::clone(&self.caps.synthesizer),
            self.settings.suggestion_timeout,
            events_tx,
        ));
        self.pending.push_back(SlowPath {
            seq,
            events: events_rx,
            _task: Owned(task),
        });
        self.session.phase = SessionPhase::SlowPathRunning;
        tracing::debug!(session_id = %self.session.id, seq, "slow path dispatched");
    }

    /// Identifier patterns only; emits a profile when it changes.
    async fn fast_path(&mut self, text: &str) {
        let Some(hints) = detect_identifier(text) else {
            return;
        };

        let lookup = with_deadline(
            "lookup_member",
            self.settings.lookup_timeout,
            self.caps.members.lookup_member(&hints),
        )
        .await;

        match lookup {
            Ok(Some(record)) => {
                // Resolved after every slow path dispatched so far.
                self.session.member_seq = self.session.seq;
                if self.session.member.as_ref() == Some(&record) {
                    return;
                }
                tracing::info!(
                    session_id = %self.session.id,
                    policy_id = %record.policy_id,
                    "fast path resolved member"
                );
                self.session.member = Some(record.clone());
                self.emit(OutboundEvent::MemberProfile(record)).await;
            }
            Ok(None) => {
                tracing::debug!(session_id = %self.session.id, "fast path identifier had no match");
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session.id, error = %e, "fast path lookup failed");
                self.emit(OutboundEvent::error(format!("member lookup failed: {e}")))
                    .await;
            }
        }
    }

    /// Records what the event says about the call, then forwards it. A
    /// profile older than the current one is dropped.
    async fn forward_slow_event(&mut self, seq: u64, event: OutboundEvent) {
        match &event {
            OutboundEvent::Intent(intent) => {
                self.session.intent = Some(intent.clone());
            }
            OutboundEvent::MemberProfile(record) => {
                if seq <= self.session.member_seq {
                    tracing::debug!(
                        session_id = %self.session.id,
                        seq,
                        policy_id = %record.policy_id,
                        "dropping member profile superseded by a newer resolution"
                    );
                    return;
                }
                self.session.member = Some(record.clone());
                self.session.member_seq = seq;
            }
            _ => {}
        }
        self.emit(event).await;
    }

    fn finish_slow_path(&mut self) {
        if let Some(done) = self.pending.pop_front() {
            tracing::debug!(session_id = %self.session.id, seq = done.seq, "slow path complete");
        }
        if self.session.phase == SessionPhase::SlowPathRunning && self.pending.is_empty() {
            self.session.phase = SessionPhase::AwaitingUtterance;
        }
    }

    fn start_evaluation(&mut self) {
        let input = EvaluationInput {
            transcript: self.session.transcript.clone(),
            duration_secs: self.session.elapsed_secs(),
            intent: self.session.intent.clone(),
            member: self.session.member.clone(),
        };
        tracing::info!(
            session_id = %self.session.id,
            utterances = input.transcript.len(),
            duration_secs = input.duration_secs,
            "running post-call evaluation"
        );

        let evaluator = Arc::clone(&self.caps.evaluator);
        let limit = self.settings.evaluation_timeout;
        self.evaluation = Some(Owned(tokio::spawn(async move {
            with_deadline("evaluate_call", limit, evaluator.evaluate_call(&input)).await
        })));
    }

    async fn finish_evaluation(
        &mut self,
        result: Result<Result<CallEvaluation, CapabilityError>, JoinError>,
    ) {
        match result {
            Ok(Ok(card)) => {
                self.emit(OutboundEvent::PostCallEvaluation(card)).await;
            }
            Ok(Err(e)) => {
                tracing::warn!(session_id = %self.session.id, error = %e, "post-call evaluation failed");
                self.emit(OutboundEvent::error(format!("evaluation failed: {e}")))
                    .await;
            }
            Err(e) => {
                tracing::error!(session_id = %self.session.id, error = %e, "evaluation task failed");
                self.emit(OutboundEvent::error("evaluation failed")).await;
            }
        }
        self.session.phase = SessionPhase::Closed;
        tracing::info!(session_id = %self.session.id, "call session closed");
    }

    async fn emit(&self, event: OutboundEvent) {
        let kind = event.kind();
        if self.outbound.send(event).await.is_err() {
            tracing::debug!(session_id = %self.session.id, kind, "outbound queue closed, event dropped");
        }
    }
}

/// One utterance's slow path: context graph, context events, then the
/// suggestion as `clear_suggestion`, chunks and the final text.
async fn run_slow_path(
    seq: u64,
    text: String,
    graph: Arc<Graph>,
    synthesizer: Arc<dyn SuggestionSynthesizer>,
    suggestion_timeout: Option<Duration>,
    events: mpsc::Sender<OutboundEvent>,
) {
    let state = match graph.invoke(ProcessingState::new(text)).await {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(seq, node = e.node().unwrap_or("-"), error = %e, "slow path failed");
            let _ = events
                .send(OutboundEvent::error(format!("processing failed: {e}")))
                .await;
            return;
        }
    };

    for event in slow_path_events(&state) {
        if events.send(event).await.is_err() {
            return;
        }
    }
    if state.suggestion.is_some() {
        return;
    }

    if events.send(OutboundEvent::ClearSuggestion).await.is_err() {
        return;
    }
    let context = suggestion_context(&state);
    let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(SUGGESTION_CHUNK_BUFFER);
    let chunk_events = events.clone();
    let forward = async move {
        while let Some(text) = chunk_rx.recv().await {
            if chunk_events
                .send(OutboundEvent::SuggestionChunk { text })
                .await
                .is_err()
            {
                break;
            }
        }
    };
    let synthesis = with_deadline(
        "synthesize_suggestion",
        suggestion_timeout,
        synthesizer.stream_suggestion(&context, chunk_tx),
    );
    let (result, ()) = tokio::join!(synthesis, forward);

    let last = match result {
        Ok(text) => OutboundEvent::Suggestion { text },
        Err(e) => {
            tracing::warn!(seq, error = %e, transient = e.is_transient(), "suggestion failed");
            OutboundEvent::error(format!("suggestion failed: {e}"))
        }
    };
    let _ = events.send(last).await;
}
