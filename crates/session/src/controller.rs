use std::sync::Arc;

use livecap_interface::{RecognizerEvent, Token, partition_by_stream};
use livecap_transcript::{
    LatencyMetrics, LatencyTracker, MessageMachine, Sentence, SentenceBuffer, StreamingMessage,
    TokenReconciler,
};

use crate::config::SessionConfig;
use crate::error::{ErrorKind, SessionError, classify_error};
use crate::events::{EventSink, Lane, SessionDataEvent, SessionLifecycleEvent};
use crate::retry::RetryManager;
use crate::state::SessionStateManager;

/// The narrow capability surface of the external recognizer SDK. The
/// controller never sees the transport; an adapter implements this and
/// forwards the SDK's callbacks as [`RecognizerEvent`]s.
pub trait RecognizerClient: Send {
    fn start(&mut self, config: &SessionConfig) -> Result<(), SessionError>;
    fn stop(&mut self) -> Result<(), SessionError>;
    fn cancel(&mut self) -> Result<(), SessionError>;
}

/// Current wall-clock in unix milliseconds. Hosts that want deterministic
/// replays pass explicit values instead.
pub fn unix_now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .min(u64::MAX as u128) as u64
}

struct StreamLane {
    reconciler: TokenReconciler,
    sentences: SentenceBuffer,
    lines: Vec<Sentence>,
}

impl StreamLane {
    fn new(sentences: SentenceBuffer) -> Self {
        Self {
            reconciler: TokenReconciler::new(),
            sentences,
            lines: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.reconciler.reset();
        self.sentences.reset();
        self.lines.clear();
    }
}

/// Single-threaded session driver.
///
/// Owns every mutable piece of the pipeline (per-lane reconcilers and
/// sentence buffers, the message machine, retry and recency state) and
/// reacts to recognizer events in arrival order. Timer-based behavior is
/// surfaced through `poll_timers`, which the host calls on its own tick.
///
/// Everything is synchronous except the reconnect backoff timer, which runs
/// on an ambient tokio runtime; drive error events from a runtime thread,
/// or reconnects will not be armed (see [`RetryManager`]).
pub struct SessionController<R: RecognizerClient, S: EventSink> {
    config: SessionConfig,
    recognizer: R,
    sink: Arc<S>,
    session_id: Option<String>,
    active: bool,
    translation: StreamLane,
    source: StreamLane,
    messages: MessageMachine,
    retry: RetryManager,
    state: SessionStateManager,
    latency: LatencyTracker,
}

impl<R: RecognizerClient, S: EventSink + 'static> SessionController<R, S> {
    pub fn new(config: SessionConfig, recognizer: R, sink: Arc<S>) -> Self {
        let translation =
            StreamLane::new(SentenceBuffer::new(config.translation_sentences.clone()));
        let source = StreamLane::new(SentenceBuffer::new(config.source_sentences.clone()));
        let messages = MessageMachine::new(config.messages.clone());
        let retry = RetryManager::new(config.retry.clone());

        Self {
            config,
            recognizer,
            sink,
            session_id: None,
            active: false,
            translation,
            source,
            messages,
            retry,
            state: SessionStateManager::new(),
            latency: LatencyTracker::new(),
        }
    }

    // ── Control operations ──────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.active {
            tracing::warn!("session_already_running");
            return Err(SessionError::AlreadyRunning);
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        self.recognizer.start(&self.config)?;

        self.session_id = Some(session_id.clone());
        self.active = true;
        tracing::info!(%session_id, "session_started");
        self.sink
            .emit_lifecycle(SessionLifecycleEvent::Started { session_id });
        Ok(())
    }

    /// Graceful stop: flush everything still buffered, then close.
    pub fn stop(&mut self, now_ms: u64) -> Result<(), SessionError> {
        if !self.active {
            return Err(SessionError::NotRunning);
        }

        self.flush_all(now_ms);
        self.recognizer.stop()?;
        self.finish("session_stopped");
        Ok(())
    }

    /// Abrupt stop: no flush, pending live text is dropped. Committed lines
    /// stay.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if !self.active {
            return Err(SessionError::NotRunning);
        }

        self.recognizer.cancel()?;
        self.translation.reconciler.reset();
        self.translation.sentences.reset();
        self.source.reconciler.reset();
        self.source.sentences.reset();
        self.finish("session_cancelled");
        Ok(())
    }

    /// Reset every component to its freshly-constructed state, transcript
    /// included.
    pub fn clear(&mut self) {
        self.translation.reset();
        self.source.reset();
        self.messages.reset();
        self.retry.reset();
        self.state.reset();
        self.latency.reset();
        tracing::info!("session_cleared");
    }

    /// Re-open the recognizer after a [`SessionLifecycleEvent::RetryReady`].
    pub fn reconnect(&mut self, now_ms: u64) -> Result<(), SessionError> {
        tracing::info!(attempt = self.retry.attempts(), "session_reconnecting");
        if let Err(error) = self.recognizer.start(&self.config) {
            self.handle_error(None, error.to_string(), now_ms);
            return Err(error);
        }
        Ok(())
    }

    // ── Recognizer callbacks ────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: RecognizerEvent, now_ms: u64) {
        match event {
            RecognizerEvent::Started => {
                // Any successful (re)connect clears the backoff budget.
                self.retry.reset();
                tracing::info!("recognizer_started");
            }
            RecognizerEvent::Partial {
                tokens,
                processing_ms,
            } => {
                if let Some(sample) = processing_ms {
                    self.latency.record_ms(sample);
                }
                self.apply_tokens(&tokens, now_ms);
            }
            RecognizerEvent::Finished => {
                self.flush_all(now_ms);
                tracing::info!("recognizer_finished");
            }
            RecognizerEvent::Error {
                status, message, ..
            } => {
                self.handle_error(status, message, now_ms);
            }
        }
    }

    /// Drive the hold/throttle deadlines. Hosts call this on their tick (or
    /// whenever `next_deadline` elapses).
    pub fn poll_timers(&mut self, now_ms: u64) {
        if let Some(sentence) = self.translation.sentences.poll(now_ms) {
            self.commit_line(Lane::Translation, sentence, now_ms);
        }
        if let Some(sentence) = self.source.sentences.poll(now_ms) {
            self.commit_line(Lane::Source, sentence, now_ms);
        }
        if let Some(update) = self.messages.poll(now_ms) {
            self.sink
                .emit_data(SessionDataEvent::MessageUpdated { message: update });
        }
    }

    /// Earliest instant at which `poll_timers` has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        [
            self.translation.sentences.next_deadline(),
            self.source.sentences.next_deadline(),
            self.messages.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// VAD-triggered early finalization: flush both sentence buffers and, if
    /// nothing mutable is pending, end the current message turn.
    pub fn force_finalize(&mut self, now_ms: u64) {
        if let Some(sentence) = self.translation.sentences.flush(true, now_ms) {
            self.commit_line(Lane::Translation, sentence, now_ms);
        }
        if let Some(sentence) = self.source.sentences.flush(true, now_ms) {
            self.commit_line(Lane::Source, sentence, now_ms);
        }

        let mutable_pending = self
            .messages
            .current_message()
            .is_some_and(|m| !m.mutable_text.is_empty());
        if !mutable_pending
            && let Some(update) = self.messages.commit_current(now_ms)
        {
            self.sink
                .emit_data(SessionDataEvent::MessageUpdated { message: update });
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn translation_lines(&self) -> &[Sentence] {
        &self.translation.lines
    }

    pub fn source_lines(&self) -> &[Sentence] {
        &self.source.lines
    }

    pub fn live_translation(&self) -> String {
        self.translation.reconciler.live_text()
    }

    pub fn live_source(&self) -> String {
        self.source.reconciler.live_text()
    }

    pub fn messages(&self) -> &[StreamingMessage] {
        self.messages.all_messages()
    }

    pub fn metrics(&self) -> LatencyMetrics {
        self.latency.metrics()
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry.attempts()
    }

    pub fn session_state(&self) -> &SessionStateManager {
        &self.state
    }

    #[cfg(test)]
    fn recognizer_mut(&mut self) -> &mut R {
        &mut self.recognizer
    }

    // ── Internal ────────────────────────────────────────────────────────────

    fn apply_tokens(&mut self, tokens: &[Token], now_ms: u64) {
        if tokens.is_empty() {
            return;
        }

        let (translation_tokens, source_tokens) = partition_by_stream(tokens);

        if !translation_tokens.is_empty() {
            let outcome = self.translation.reconciler.apply(&translation_tokens);
            if !outcome.committed_text.is_empty() {
                let committed: Vec<Token> = translation_tokens
                    .iter()
                    .filter(|t| t.is_final)
                    .cloned()
                    .collect();
                for sentence in self.translation.sentences.add_tokens(&committed, now_ms) {
                    self.commit_line(Lane::Translation, sentence, now_ms);
                }
            }
            self.sink.emit_data(SessionDataEvent::LiveText {
                lane: Lane::Translation,
                text: outcome.live_text,
            });
        }

        if !source_tokens.is_empty() {
            let outcome = self.source.reconciler.apply(&source_tokens);
            if !outcome.committed_text.is_empty() {
                for sentence in self.source.sentences.add_chunk(&outcome.committed_text, now_ms)
                {
                    self.commit_line(Lane::Source, sentence, now_ms);
                }
            }
            self.sink.emit_data(SessionDataEvent::LiveText {
                lane: Lane::Source,
                text: outcome.live_text,
            });
        }

        if let Some(update) = self.messages.process_tokens(tokens, now_ms) {
            self.sink
                .emit_data(SessionDataEvent::MessageUpdated { message: update });
        }
    }

    fn commit_line(&mut self, lane: Lane, sentence: Sentence, now_ms: u64) {
        let lines = match lane {
            Lane::Translation => &mut self.translation.lines,
            Lane::Source => &mut self.source.lines,
        };
        lines.push(sentence.clone());

        let total = self.translation.lines.len() + self.source.lines.len();
        self.state.mark(total, now_ms);

        self.sink
            .emit_data(SessionDataEvent::SentenceCommitted { lane, sentence });
    }

    fn flush_all(&mut self, now_ms: u64) {
        if let Some(sentence) = self.translation.sentences.flush(true, now_ms) {
            self.commit_line(Lane::Translation, sentence, now_ms);
        }
        if let Some(sentence) = self.source.sentences.flush(true, now_ms) {
            self.commit_line(Lane::Source, sentence, now_ms);
        }
        if let Some(update) = self.messages.commit_current(now_ms) {
            self.sink
                .emit_data(SessionDataEvent::MessageUpdated { message: update });
        }
    }

    fn handle_error(&mut self, status: Option<u16>, message: String, _now_ms: u64) {
        let kind = classify_error(status, &message);
        tracing::warn!(%kind, %message, "recognizer_error");

        let session_id = self.session_id.clone().unwrap_or_default();

        if kind.is_retryable() && self.retry.can_retry() {
            let attempt = self.retry.attempts() + 1;
            self.sink
                .emit_lifecycle(SessionLifecycleEvent::Reconnecting {
                    session_id: session_id.clone(),
                    attempt,
                    max_attempts: self.retry.policy().max_retries,
                });

            let sink = Arc::clone(&self.sink);
            self.retry.schedule_retry(move || {
                sink.emit_lifecycle(SessionLifecycleEvent::RetryReady { session_id });
            });
        } else {
            self.fail(kind, message);
        }
    }

    fn fail(&mut self, kind: ErrorKind, message: String) {
        tracing::error!(%kind, %message, "session_failed");
        self.active = false;
        self.retry.cancel();
        self.sink.emit_lifecycle(SessionLifecycleEvent::Failed {
            session_id: self.session_id.clone().unwrap_or_default(),
            kind,
            message,
        });
    }

    fn finish(&mut self, log_event: &'static str) {
        self.retry.cancel();
        self.active = false;
        let session_id = self.session_id.take().unwrap_or_default();
        tracing::info!(%session_id, "{}", log_event);
        self.sink
            .emit_lifecycle(SessionLifecycleEvent::Stopped { session_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use livecap_interface::RecognizerEvent;

    #[derive(Default)]
    struct MockRecognizer {
        starts: u32,
        stops: u32,
        cancels: u32,
        fail_next_start: bool,
    }

    impl RecognizerClient for MockRecognizer {
        fn start(&mut self, _config: &SessionConfig) -> Result<(), SessionError> {
            self.starts += 1;
            if self.fail_next_start {
                self.fail_next_start = false;
                return Err(SessionError::recognizer(
                    ErrorKind::Network,
                    "connection refused",
                ));
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), SessionError> {
            self.stops += 1;
            Ok(())
        }

        fn cancel(&mut self) -> Result<(), SessionError> {
            self.cancels += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        lifecycle: Mutex<Vec<SessionLifecycleEvent>>,
        data: Mutex<Vec<SessionDataEvent>>,
    }

    impl EventSink for RecordingSink {
        fn emit_lifecycle(&self, event: SessionLifecycleEvent) {
            self.lifecycle.lock().unwrap().push(event);
        }

        fn emit_data(&self, event: SessionDataEvent) {
            self.data.lock().unwrap().push(event);
        }
    }

    impl RecordingSink {
        fn reconnect_attempts(&self) -> Vec<u32> {
            self.lifecycle
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    SessionLifecycleEvent::Reconnecting { attempt, .. } => Some(*attempt),
                    _ => None,
                })
                .collect()
        }

        fn retry_ready_count(&self) -> usize {
            self.lifecycle
                .lock()
                .unwrap()
                .iter()
                .filter(|e| matches!(e, SessionLifecycleEvent::RetryReady { .. }))
                .count()
        }

        fn failed_kind(&self) -> Option<ErrorKind> {
            self.lifecycle.lock().unwrap().iter().find_map(|e| match e {
                SessionLifecycleEvent::Failed { kind, .. } => Some(*kind),
                _ => None,
            })
        }
    }

    fn controller() -> (
        SessionController<MockRecognizer, RecordingSink>,
        Arc<RecordingSink>,
    ) {
        let sink = Arc::new(RecordingSink::default());
        let controller = SessionController::new(
            SessionConfig::default(),
            MockRecognizer::default(),
            Arc::clone(&sink),
        );
        (controller, sink)
    }

    fn partial(tokens: Vec<Token>) -> RecognizerEvent {
        RecognizerEvent::Partial {
            tokens,
            processing_ms: None,
        }
    }

    fn error(status: Option<u16>, message: &str) -> RecognizerEvent {
        RecognizerEvent::Error {
            status,
            message: message.into(),
            code: None,
        }
    }

    #[test]
    fn start_twice_is_rejected() {
        let (mut ctl, _sink) = controller();

        ctl.start().unwrap();
        assert!(ctl.is_active());
        assert!(ctl.session_id().is_some());

        assert!(matches!(ctl.start(), Err(SessionError::AlreadyRunning)));
    }

    #[test]
    fn translation_tokens_become_committed_lines() {
        let (mut ctl, sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(partial(vec![Token::final_translation(" Hallo")]), 1_000);
        ctl.handle_event(partial(vec![Token::final_translation(" Welt")]), 1_100);
        assert!(ctl.translation_lines().is_empty());

        ctl.handle_event(partial(vec![Token::final_translation(".")]), 1_200);

        assert_eq!(ctl.translation_lines().len(), 1);
        assert_eq!(ctl.translation_lines()[0].text, "Hallo Welt.");
        assert_eq!(ctl.live_translation(), "");

        let committed = sink
            .data
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SessionDataEvent::SentenceCommitted {
                        lane: Lane::Translation,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(committed, 1);
    }

    #[test]
    fn lanes_are_independent() {
        let (mut ctl, _sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(
            partial(vec![
                Token::final_original(" Guten Tag."),
                Token::final_translation(" Good"),
                Token::partial_translation(" day"),
            ]),
            1_000,
        );

        assert_eq!(ctl.source_lines().len(), 1);
        assert_eq!(ctl.source_lines()[0].text, "Guten Tag.");
        assert!(ctl.translation_lines().is_empty());
        assert_eq!(ctl.live_translation(), " day");
    }

    #[test]
    fn hold_timer_commits_through_poll() {
        let (mut ctl, _sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(partial(vec![Token::final_original(" unfinished")]), 1_000);
        assert_eq!(ctl.next_deadline(), Some(1_600));

        ctl.poll_timers(1_500);
        assert!(ctl.source_lines().is_empty());

        ctl.poll_timers(1_600);
        assert_eq!(ctl.source_lines().len(), 1);
        assert_eq!(ctl.source_lines()[0].text, "unfinished");
    }

    #[test]
    fn stop_flushes_pending_content() {
        let (mut ctl, sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(partial(vec![Token::final_original(" halber Satz")]), 1_000);
        ctl.stop(1_100).unwrap();

        assert!(!ctl.is_active());
        assert_eq!(ctl.recognizer_mut().stops, 1);
        assert_eq!(ctl.source_lines().len(), 1);
        assert_eq!(ctl.source_lines()[0].text, "halber Satz");
        assert!(
            sink.lifecycle
                .lock()
                .unwrap()
                .iter()
                .any(|e| matches!(e, SessionLifecycleEvent::Stopped { .. }))
        );
    }

    #[test]
    fn cancel_drops_pending_but_keeps_committed() {
        let (mut ctl, _sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(partial(vec![Token::final_original(" Fertig.")]), 1_000);
        ctl.handle_event(partial(vec![Token::final_original(" halber")]), 1_100);
        ctl.cancel().unwrap();

        assert!(!ctl.is_active());
        assert_eq!(ctl.recognizer_mut().cancels, 1);
        assert_eq!(ctl.source_lines().len(), 1);
        assert_eq!(ctl.next_deadline(), None);
    }

    #[test]
    fn stop_without_start_is_an_error() {
        let (mut ctl, _sink) = controller();
        assert!(matches!(ctl.stop(0), Err(SessionError::NotRunning)));
        assert!(matches!(ctl.cancel(), Err(SessionError::NotRunning)));
    }

    #[test]
    fn non_retryable_error_fails_the_session() {
        let (mut ctl, sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(error(Some(401), "invalid api key"), 1_000);

        assert!(!ctl.is_active());
        assert_eq!(sink.failed_kind(), Some(ErrorKind::Api));
        assert!(sink.reconnect_attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn session_termination_reconnects_without_losing_lines() {
        let (mut ctl, sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(partial(vec![Token::final_original(" Fertig.")]), 1_000);
        assert_eq!(ctl.source_lines().len(), 1);

        for expected in 1..=3u32 {
            ctl.handle_event(error(None, "Cannot continue request"), 2_000);
            assert_eq!(ctl.retry_attempts(), expected);
            assert!(ctl.is_active());
        }
        assert_eq!(sink.reconnect_attempts(), vec![1, 2, 3]);

        // Each reschedule replaces the previous timer; the third attempt's
        // backoff is 4s.
        tokio::time::advance(std::time::Duration::from_secs(4)).await;
        tokio::task::yield_now().await;
        assert_eq!(sink.retry_ready_count(), 1);

        ctl.reconnect(3_000).unwrap();
        ctl.handle_event(RecognizerEvent::Started, 3_000);

        assert_eq!(ctl.retry_attempts(), 0);
        assert_eq!(ctl.source_lines().len(), 1);
        assert_eq!(ctl.recognizer_mut().starts, 2);
        assert!(ctl.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retry_budget_fails_the_session() {
        let (mut ctl, sink) = controller();
        ctl.start().unwrap();

        for _ in 0..6 {
            ctl.handle_event(error(Some(503), "service unavailable"), 1_000);
        }

        assert!(!ctl.is_active());
        assert_eq!(sink.failed_kind(), Some(ErrorKind::Network));
        assert_eq!(sink.reconnect_attempts().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reconnect_counts_as_another_error() {
        let (mut ctl, sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(error(None, "session expired"), 1_000);
        assert_eq!(ctl.retry_attempts(), 1);

        ctl.recognizer_mut().fail_next_start = true;
        assert!(ctl.reconnect(2_000).is_err());

        assert_eq!(ctl.retry_attempts(), 2);
        assert_eq!(sink.reconnect_attempts(), vec![1, 2]);
    }

    #[test]
    fn force_finalize_flushes_both_lanes() {
        let (mut ctl, _sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(
            partial(vec![
                Token::final_original(" Quelle"),
                Token::final_translation(" source"),
            ]),
            1_000,
        );

        ctl.force_finalize(1_050);

        assert_eq!(ctl.source_lines().len(), 1);
        assert_eq!(ctl.translation_lines().len(), 1);
        assert_eq!(ctl.next_deadline(), None);
    }

    #[test]
    fn latency_samples_are_aggregated() {
        let (mut ctl, _sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(
            RecognizerEvent::Partial {
                tokens: vec![Token::final_original(" a.")],
                processing_ms: Some(120),
            },
            1_000,
        );
        ctl.handle_event(
            RecognizerEvent::Partial {
                tokens: vec![Token::final_original(" b.")],
                processing_ms: Some(80),
            },
            1_100,
        );

        let metrics = ctl.metrics();
        assert_eq!(metrics.count, 2);
        assert_eq!(metrics.min_ms, 80);
        assert_eq!(metrics.max_ms, 120);
        assert_eq!(metrics.last_ms, 80);
    }

    #[test]
    fn finished_event_flushes_like_a_graceful_stop() {
        let (mut ctl, _sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(partial(vec![Token::final_original(" offen")]), 1_000);
        ctl.handle_event(RecognizerEvent::Finished, 1_100);

        assert_eq!(ctl.source_lines().len(), 1);
    }

    #[test]
    fn clear_resets_the_transcript() {
        let (mut ctl, _sink) = controller();
        ctl.start().unwrap();

        ctl.handle_event(partial(vec![Token::final_original(" Fertig.")]), 1_000);
        assert_eq!(ctl.source_lines().len(), 1);

        ctl.clear();

        assert!(ctl.source_lines().is_empty());
        assert!(ctl.messages().is_empty());
        assert_eq!(ctl.metrics().count, 0);
        assert_eq!(ctl.session_state().committed_lines(), 0);
    }
}
