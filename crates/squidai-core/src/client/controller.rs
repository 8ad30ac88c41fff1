//! Client chat controller.
//!
//! Drives one conversation from a terminal or other front end: guards
//! against duplicate submissions, keeps the rendered transcript, sends the
//! relay request, renders the reply while it streams, and hands persistence
//! and analytics writes to a best-effort queue so they never hold up or
//! break the exchange.
//!
//! At most one relay request is in flight per controller. The guard is an
//! atomic flag set before any asynchronous work, so a second submit that
//! races the first is rejected without dispatching anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use squidai_types::chat::{AttachedInput, ConversationTurn, HistoryEntry, RelayRequest, Session, TurnRole};
use squidai_types::llm::DEFAULT_IMAGE_PROMPT;
use squidai_types::telemetry::{ChatMessageRecord, SearchRecord};

use crate::chat::best_effort::BestEffortQueue;
use crate::client::transport::{ChatPersistence, RelayTransport, TransportError};
use crate::client::typing::{RenderStrategy, TypingBuffer};
use crate::client::utf8::Utf8Decoder;
use crate::relay::cooldown::CooldownGate;

/// Send lockout after each exchange.
pub const DEFAULT_CLIENT_COOLDOWN: Duration = Duration::from_secs(2);

/// Number of prior turns sent with each request.
pub const DEFAULT_HISTORY_WINDOW: usize = 4;

const TROUBLESHOOTING: &str = "\n\n**Troubleshooting:**\n\
- Check that GEMINI_API_KEY is set on the server\n\
- Check your internet connection\n\
- Try again in a few seconds";

/// Who is chatting, attached to analytics records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub strategy: RenderStrategy,
    pub cooldown: Duration,
    pub history_window: usize,
    pub identity: ClientIdentity,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            strategy: RenderStrategy::Chunk,
            cooldown: DEFAULT_CLIENT_COOLDOWN,
            history_window: DEFAULT_HISTORY_WINDOW,
            identity: ClientIdentity::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Sending,
    Streaming,
    Error,
}

/// A transcript entry. Error entries are shown but never persisted or
/// sent back as history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTurn {
    pub turn: ConversationTurn,
    pub is_error: bool,
}

/// Why a submit did nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("nothing to send")]
    EmptyInput,

    #[error("a request is already in flight")]
    InFlight,

    #[error("wait {:.1}s before sending again", secs(.remaining))]
    CoolingDown { remaining: Duration },
}

fn secs(duration: &Duration) -> f64 {
    duration.as_secs_f64()
}

/// How an accepted submit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Completed(ConversationTurn),
    Failed {
        error: TransportError,
        rendered: ConversationTurn,
    },
}

/// Rendering callbacks. All methods default to doing nothing.
pub trait ChatView: Send + Sync {
    fn on_phase(&self, _phase: ChatPhase) {}

    fn on_turn(&self, _turn: &RenderedTurn) {}

    /// The visible prefix of the reply being streamed.
    fn on_typing(&self, _visible: &str) {}
}

/// A view that renders nothing.
pub struct NoopView;

impl ChatView for NoopView {}

struct ConversationState {
    session: Option<Session>,
    turns: Vec<RenderedTurn>,
    phase: ChatPhase,
}

impl ConversationState {
    fn history(&self, window: usize) -> Vec<HistoryEntry> {
        let kept: Vec<&RenderedTurn> = self.turns.iter().filter(|t| !t.is_error).collect();
        let skip = kept.len().saturating_sub(window);
        kept[skip..]
            .iter()
            .map(|t| t.turn.to_history_entry())
            .collect()
    }
}

/// Releases the in-flight flag and starts the send lockout on every exit path.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    cooldown: &'a CooldownGate,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.cooldown.arm();
        self.flag.store(false, Ordering::Release);
    }
}

pub struct ChatController<T: RelayTransport, P: ChatPersistence + 'static> {
    transport: T,
    persistence: Arc<P>,
    writes: BestEffortQueue,
    options: ControllerOptions,
    in_flight: AtomicBool,
    cooldown: CooldownGate,
    state: Mutex<ConversationState>,
}

impl<T: RelayTransport, P: ChatPersistence + 'static> ChatController<T, P> {
    /// Create a controller. Must be called inside a Tokio runtime.
    pub fn new(transport: T, persistence: Arc<P>, options: ControllerOptions) -> Self {
        let cooldown = CooldownGate::new(options.cooldown);
        Self {
            transport,
            persistence,
            writes: BestEffortQueue::spawn(),
            options,
            in_flight: AtomicBool::new(false),
            cooldown,
            state: Mutex::new(ConversationState {
                session: None,
                turns: Vec::new(),
                phase: ChatPhase::Idle,
            }),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn phase(&self) -> ChatPhase {
        self.lock_state().phase
    }

    pub fn turns(&self) -> Vec<RenderedTurn> {
        self.lock_state().turns.clone()
    }

    pub fn active_session(&self) -> Option<Session> {
        self.lock_state().session.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.cooldown.remaining()
    }

    /// Forget the active session; the next submit creates a new one.
    pub fn start_new_session(&self) {
        let mut state = self.lock_state();
        state.session = None;
        state.turns.clear();
        state.phase = ChatPhase::Idle;
    }

    /// Continue an existing session, replacing the transcript with its turns.
    pub fn resume_session(&self, session: Session) {
        let mut state = self.lock_state();
        state.turns = session
            .messages
            .iter()
            .cloned()
            .map(|turn| RenderedTurn {
                turn,
                is_error: false,
            })
            .collect();
        state.session = Some(session);
        state.phase = ChatPhase::Idle;
    }

    /// Wait for every queued persistence write to finish.
    pub async fn flush(&self) {
        self.writes.flush().await;
    }

    /// Send one message and render the reply.
    ///
    /// Rejections happen before any I/O. Once accepted, the exchange always
    /// ends in `Completed` or `Failed`; transport failures are rendered as an
    /// error turn rather than returned as `Err`.
    pub async fn submit(
        &self,
        text: &str,
        attachments: Vec<AttachedInput>,
        view: &dyn ChatView,
    ) -> Result<ExchangeOutcome, SubmitRejected> {
        let text = text.trim();
        if text.is_empty() && attachments.is_empty() {
            return Err(SubmitRejected::EmptyInput);
        }
        if let Some(remaining) = self.cooldown.remaining() {
            return Err(SubmitRejected::CoolingDown { remaining });
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Submit ignored, request already in flight");
            return Err(SubmitRejected::InFlight);
        }
        let _in_flight = InFlight {
            flag: &self.in_flight,
            cooldown: &self.cooldown,
        };

        let message = if text.is_empty() { DEFAULT_IMAGE_PROMPT } else { text }.to_string();
        let user_turn = ConversationTurn::user(&message);

        let (session_id, history) = {
            let mut state = self.lock_state();
            let history = state.history(self.options.history_window);
            let session = match state.session.take() {
                Some(session) => session,
                None => {
                    let session = Session::from_first_message(&message);
                    info!(session_id = %session.id, "Starting new session");
                    let persistence = Arc::clone(&self.persistence);
                    let created = session.clone();
                    self.writes.enqueue("create_session", async move {
                        persistence.create_session(&created).await
                    });
                    session
                }
            };
            let session_id = session.id.clone();
            let session = state.session.insert(session);
            session.push_turn(user_turn.clone());
            state.turns.push(RenderedTurn {
                turn: user_turn.clone(),
                is_error: false,
            });
            (session_id, history)
        };
        view.on_turn(&RenderedTurn {
            turn: user_turn.clone(),
            is_error: false,
        });
        self.record_search(&message, &session_id);
        self.set_phase(ChatPhase::Sending, view);

        let request = RelayRequest {
            history,
            message,
            images: attachments,
        };

        match self.stream_reply(request, view).await {
            Ok(reply) => {
                let reply_turn = ConversationTurn::model(reply);
                let rendered = RenderedTurn {
                    turn: reply_turn.clone(),
                    is_error: false,
                };
                {
                    let mut state = self.lock_state();
                    if let Some(session) = state.session.as_mut().filter(|s| s.id == session_id) {
                        session.push_turn(reply_turn.clone());
                    }
                    state.turns.push(rendered.clone());
                }
                view.on_turn(&rendered);
                self.persist_exchange(&session_id, user_turn, reply_turn.clone());
                self.set_phase(ChatPhase::Idle, view);
                Ok(ExchangeOutcome::Completed(reply_turn))
            }
            Err(error) => {
                warn!(error = %error, "Relay request failed");
                let rendered_turn = ConversationTurn::model(describe_failure(&error));
                let rendered = RenderedTurn {
                    turn: rendered_turn.clone(),
                    is_error: true,
                };
                self.lock_state().turns.push(rendered.clone());
                view.on_turn(&rendered);
                self.set_phase(ChatPhase::Error, view);
                Ok(ExchangeOutcome::Failed {
                    error,
                    rendered: rendered_turn,
                })
            }
        }
    }

    /// Read the reply stream to the end, rendering as it arrives.
    async fn stream_reply(
        &self,
        request: RelayRequest,
        view: &dyn ChatView,
    ) -> Result<String, TransportError> {
        let mut stream = self.transport.send(request).await?;
        self.set_phase(ChatPhase::Streaming, view);

        let (tick, per_tick) = match self.options.strategy {
            RenderStrategy::Chunk => (None, 0),
            RenderStrategy::Typewriter {
                interval,
                chars_per_tick,
            } => (Some(interval.max(Duration::from_millis(1))), chars_per_tick.max(1)),
        };
        let mut ticker = tokio::time::interval(tick.unwrap_or(Duration::from_secs(60)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut decoder = Utf8Decoder::new();
        let mut buffer = TypingBuffer::new();
        loop {
            tokio::select! {
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        buffer.push(&decoder.decode(&bytes));
                        if tick.is_none() {
                            view.on_typing(buffer.catch_up());
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                },
                _ = ticker.tick(), if tick.is_some() && !buffer.is_drained() => {
                    view.on_typing(buffer.advance(per_tick));
                }
            }
        }
        if decoder.has_pending() {
            warn!("Reply ended inside a multi-byte character");
        }
        buffer.push(&decoder.finish());

        // The stream can end before the typewriter has caught up.
        if tick.is_some() {
            while !buffer.is_drained() {
                ticker.tick().await;
                view.on_typing(buffer.advance(per_tick));
            }
        }
        view.on_typing(buffer.catch_up());

        if buffer.text().trim().is_empty() {
            return Err(TransportError::EmptyBody);
        }
        Ok(buffer.into_text())
    }

    /// Queue both turns (user first) and their analytics records.
    fn persist_exchange(&self, session_id: &str, user_turn: ConversationTurn, reply_turn: ConversationTurn) {
        for turn in [user_turn, reply_turn] {
            let persistence = Arc::clone(&self.persistence);
            let id = session_id.to_string();
            let appended = turn.clone();
            self.writes.enqueue("append_turn", async move {
                persistence.append_turn(&id, &appended).await
            });

            let persistence = Arc::clone(&self.persistence);
            let record = ChatMessageRecord {
                session_id: session_id.to_string(),
                user_id: self.options.identity.user_id.clone(),
                user_email: self.options.identity.email.clone(),
                role: turn.role,
                content: turn.text,
            };
            self.writes.enqueue("record_message", async move {
                persistence.record_message(&record).await
            });
        }
    }

    fn record_search(&self, query: &str, session_id: &str) {
        let persistence = Arc::clone(&self.persistence);
        let record = SearchRecord {
            query: query.to_string(),
            user_id: self.options.identity.user_id.clone(),
            user_email: self.options.identity.email.clone(),
            session_id: Some(session_id.to_string()),
        };
        self.writes.enqueue("record_search", async move {
            persistence.record_search(&record).await
        });
    }

    fn set_phase(&self, phase: ChatPhase, view: &dyn ChatView) {
        self.lock_state().phase = phase;
        view.on_phase(phase);
    }

    fn lock_state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Assistant-role text shown in place of a reply that failed.
pub fn describe_failure(error: &TransportError) -> String {
    match error {
        TransportError::Rejected {
            status: 429,
            message,
            retry_after_ms,
            ..
        } => {
            let wait = match retry_after_ms {
                Some(ms) => format!("Try again in {}s.", ms.div_ceil(1000)),
                None => "Wait a few seconds before sending another message.".to_string(),
            };
            format!("**Rate limit reached.** {message}\n\n{wait}")
        }
        TransportError::Rejected {
            status,
            message,
            hint,
            ..
        } => {
            let mut text = format!("**Error ({status}):** {message}");
            if let Some(hint) = hint {
                text.push_str(&format!("\n\n**Hint:** {hint}"));
            }
            text.push_str(TROUBLESHOOTING);
            text
        }
        TransportError::EmptyBody => {
            "**Error:** The server returned an empty response. Please try again.".to_string()
        }
        TransportError::Network(detail) | TransportError::Stream(detail) => {
            format!("**Connection problem:** {detail}{TROUBLESHOOTING}")
        }
    }
}

/// Role label used when rendering a turn.
pub fn role_label(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "You",
        TurnRole::Model => "SquidAI",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use bytes::Bytes;
    use squidai_types::error::RepositoryError;
    use tokio::sync::Notify;

    use crate::client::transport::ByteStream;

    type Reply = Result<Vec<Vec<u8>>, TransportError>;

    #[derive(Default)]
    struct ScriptedTransport {
        calls: AtomicUsize,
        requests: Mutex<Vec<RelayRequest>>,
        replies: Mutex<VecDeque<Reply>>,
        hold: Option<Arc<Notify>>,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }
    }

    impl RelayTransport for ScriptedTransport {
        async fn send(&self, request: RelayRequest) -> Result<ByteStream, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![b"ok".to_vec()]));
            let chunks = reply?;
            Ok(Box::pin(futures_util::stream::iter(
                chunks.into_iter().map(|c| Ok(Bytes::from(c))),
            )))
        }
    }

    #[derive(Default)]
    struct RecordingPersistence {
        log: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingPersistence {
        fn entry(&self, line: String) -> Result<(), RepositoryError> {
            self.log.lock().unwrap().push(line);
            if self.fail {
                Err(RepositoryError::Connection("store unreachable".to_string()))
            } else {
                Ok(())
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl ChatPersistence for RecordingPersistence {
        async fn create_session(&self, session: &Session) -> Result<(), RepositoryError> {
            self.entry(format!("create:{}", session.title))
        }

        async fn append_turn(
            &self,
            _session_id: &str,
            turn: &ConversationTurn,
        ) -> Result<(), RepositoryError> {
            self.entry(format!("append:{}:{}", turn.role, turn.text))
        }

        async fn record_search(&self, record: &SearchRecord) -> Result<(), RepositoryError> {
            self.entry(format!("search:{}", record.query))
        }

        async fn record_message(&self, record: &ChatMessageRecord) -> Result<(), RepositoryError> {
            self.entry(format!("message:{}", record.role))
        }
    }

    #[derive(Default)]
    struct RecordingView {
        typing: Mutex<Vec<String>>,
        phases: Mutex<Vec<ChatPhase>>,
    }

    impl ChatView for RecordingView {
        fn on_phase(&self, phase: ChatPhase) {
            self.phases.lock().unwrap().push(phase);
        }

        fn on_typing(&self, visible: &str) {
            self.typing.lock().unwrap().push(visible.to_string());
        }
    }

    fn no_cooldown() -> ControllerOptions {
        ControllerOptions {
            cooldown: Duration::ZERO,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_exchange_streams_and_persists_in_order() {
        let reply = "Héllo, world".as_bytes();
        // Split inside the two-byte 'é'.
        let transport = ScriptedTransport::replying(vec![Ok(vec![
            reply[..2].to_vec(),
            reply[2..].to_vec(),
        ])]);
        let persistence = Arc::new(RecordingPersistence::default());
        let controller = ChatController::new(transport, persistence.clone(), no_cooldown());
        let view = RecordingView::default();

        let outcome = controller.submit("hi there", vec![], &view).await.unwrap();
        match outcome {
            ExchangeOutcome::Completed(turn) => assert_eq!(turn.text, "Héllo, world"),
            other => panic!("expected Completed, got {other:?}"),
        }

        controller.flush().await;
        assert_eq!(
            persistence.log(),
            vec![
                "create:hi there",
                "search:hi there",
                "append:user:hi there",
                "message:user",
                "append:model:Héllo, world",
                "message:model",
            ]
        );

        let turns = controller.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].turn.role, TurnRole::User);
        assert_eq!(turns[1].turn.role, TurnRole::Model);

        let session = controller.active_session().unwrap();
        assert_eq!(session.title, "hi there");
        assert_eq!(session.messages.len(), 2);

        assert_eq!(
            *view.phases.lock().unwrap(),
            vec![ChatPhase::Sending, ChatPhase::Streaming, ChatPhase::Idle]
        );
        assert_eq!(view.typing.lock().unwrap().last().unwrap(), "Héllo, world");
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn test_reply_cut_inside_a_character_keeps_the_text() {
        // "ok" followed by the first two bytes of a three-byte character.
        let transport = ScriptedTransport::replying(vec![Ok(vec![vec![b'o', b'k', 0xE6, 0x97]])]);
        let persistence = Arc::new(RecordingPersistence::default());
        let controller = ChatController::new(transport, persistence, no_cooldown());

        let outcome = controller.submit("hi", vec![], &NoopView).await.unwrap();
        match outcome {
            ExchangeOutcome::Completed(turn) => assert_eq!(turn.text, "ok\u{FFFD}"),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_noop() {
        let hold = Arc::new(Notify::new());
        let transport = ScriptedTransport {
            hold: Some(hold.clone()),
            ..Default::default()
        };
        let persistence = Arc::new(RecordingPersistence::default());
        let controller = Arc::new(ChatController::new(transport, persistence, no_cooldown()));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.submit("first", vec![], &NoopView).await })
        };
        while !controller.is_in_flight() {
            tokio::task::yield_now().await;
        }

        let second = controller.submit("second", vec![], &NoopView).await;
        assert_eq!(second.unwrap_err(), SubmitRejected::InFlight);

        hold.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(controller.transport().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cooldown_after_completion() {
        let transport = ScriptedTransport::default();
        let persistence = Arc::new(RecordingPersistence::default());
        let controller = ChatController::new(transport, persistence, ControllerOptions::default());

        controller.submit("one", vec![], &NoopView).await.unwrap();
        match controller.submit("two", vec![], &NoopView).await {
            Err(SubmitRejected::CoolingDown { remaining }) => {
                assert!(remaining <= DEFAULT_CLIENT_COOLDOWN);
            }
            other => panic!("expected CoolingDown, got {other:?}"),
        }
        assert_eq!(controller.transport().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_input_rejected_without_request() {
        let controller = ChatController::new(
            ScriptedTransport::default(),
            Arc::new(RecordingPersistence::default()),
            no_cooldown(),
        );
        let result = controller.submit("   ", vec![], &NoopView).await;
        assert_eq!(result.unwrap_err(), SubmitRejected::EmptyInput);
        assert_eq!(controller.transport().calls.load(Ordering::SeqCst), 0);
        assert!(controller.active_session().is_none());
    }

    #[tokio::test]
    async fn test_rejected_reply_renders_error_and_is_not_persisted() {
        let transport = ScriptedTransport::replying(vec![Err(TransportError::Rejected {
            status: 503,
            message: "Upstream unavailable".to_string(),
            hint: None,
            retry_after_ms: None,
        })]);
        let persistence = Arc::new(RecordingPersistence::default());
        let controller = ChatController::new(transport, persistence.clone(), no_cooldown());

        let outcome = controller.submit("hello", vec![], &NoopView).await.unwrap();
        let rendered = match outcome {
            ExchangeOutcome::Failed { rendered, .. } => rendered,
            other => panic!("expected Failed, got {other:?}"),
        };
        assert!(rendered.text.contains("Upstream unavailable"));
        assert!(rendered.text.contains("Troubleshooting"));
        assert_eq!(controller.phase(), ChatPhase::Error);
        assert!(!controller.is_in_flight());

        let turns = controller.turns();
        assert_eq!(turns.len(), 2);
        assert!(turns[1].is_error);

        controller.flush().await;
        assert_eq!(persistence.log(), vec!["create:hello", "search:hello"]);

        // The error turn is not sent back as history.
        controller.submit("again", vec![], &NoopView).await.unwrap();
        let requests = controller.transport().requests.lock().unwrap().clone();
        assert_eq!(requests[1].history.len(), 1);
        assert_eq!(requests[1].history[0].parts, "hello");
    }

    #[tokio::test]
    async fn test_empty_body_is_a_failure() {
        let transport = ScriptedTransport::replying(vec![Ok(vec![])]);
        let controller = ChatController::new(
            transport,
            Arc::new(RecordingPersistence::default()),
            no_cooldown(),
        );

        let outcome = controller.submit("hi", vec![], &NoopView).await.unwrap();
        assert!(matches!(
            outcome,
            ExchangeOutcome::Failed {
                error: TransportError::EmptyBody,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_persistence_failures_do_not_affect_exchange() {
        let persistence = Arc::new(RecordingPersistence {
            fail: true,
            ..Default::default()
        });
        let controller = ChatController::new(
            ScriptedTransport::default(),
            persistence.clone(),
            no_cooldown(),
        );

        let outcome = controller.submit("hi", vec![], &NoopView).await.unwrap();
        assert!(matches!(outcome, ExchangeOutcome::Completed(_)));
        controller.flush().await;
        // Every write was still attempted, in order.
        assert_eq!(persistence.log().len(), 6);
        assert_eq!(controller.turns().len(), 2);
    }

    #[tokio::test]
    async fn test_typewriter_renders_full_text() {
        let transport = ScriptedTransport::replying(vec![Ok(vec![b"abcdef".to_vec()])]);
        let options = ControllerOptions {
            strategy: RenderStrategy::Typewriter {
                interval: Duration::from_millis(1),
                chars_per_tick: 1,
            },
            ..no_cooldown()
        };
        let controller =
            ChatController::new(transport, Arc::new(RecordingPersistence::default()), options);
        let view = RecordingView::default();

        controller.submit("go", vec![], &view).await.unwrap();

        let typing = view.typing.lock().unwrap().clone();
        assert_eq!(typing.last().unwrap(), "abcdef");
        for pair in typing.windows(2) {
            assert!(pair[1].starts_with(&pair[0]), "render went backwards");
        }
    }

    #[tokio::test]
    async fn test_history_limited_to_window() {
        let controller = ChatController::new(
            ScriptedTransport::default(),
            Arc::new(RecordingPersistence::default()),
            no_cooldown(),
        );
        for message in ["a", "b", "c"] {
            controller.submit(message, vec![], &NoopView).await.unwrap();
        }
        controller.submit("d", vec![], &NoopView).await.unwrap();

        let requests = controller.transport().requests.lock().unwrap().clone();
        let history: Vec<String> = requests[3].history.iter().map(|h| h.parts.clone()).collect();
        assert_eq!(history, vec!["b", "ok", "c", "ok"]);
        assert_eq!(requests[0].history.len(), 0);
    }

    #[tokio::test]
    async fn test_images_only_uses_default_prompt() {
        let controller = ChatController::new(
            ScriptedTransport::default(),
            Arc::new(RecordingPersistence::default()),
            no_cooldown(),
        );
        let image = AttachedInput {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        };
        controller.submit("", vec![image], &NoopView).await.unwrap();

        let requests = controller.transport().requests.lock().unwrap().clone();
        assert_eq!(requests[0].message, DEFAULT_IMAGE_PROMPT);
        assert_eq!(requests[0].images.len(), 1);
    }

    #[tokio::test]
    async fn test_new_session_after_reset() {
        let persistence = Arc::new(RecordingPersistence::default());
        let controller =
            ChatController::new(ScriptedTransport::default(), persistence.clone(), no_cooldown());

        controller.submit("first topic", vec![], &NoopView).await.unwrap();
        let first = controller.active_session().unwrap();
        controller.start_new_session();
        assert!(controller.turns().is_empty());

        controller.submit("second topic", vec![], &NoopView).await.unwrap();
        let second = controller.active_session().unwrap();
        assert_ne!(first.id, second.id);

        controller.flush().await;
        let creates = persistence
            .log()
            .into_iter()
            .filter(|l| l.starts_with("create:"))
            .count();
        assert_eq!(creates, 2);
    }

    #[test]
    fn test_describe_rate_limit() {
        let text = describe_failure(&TransportError::Rejected {
            status: 429,
            message: "Cooldown: wait 3.0s".to_string(),
            hint: None,
            retry_after_ms: None,
        });
        assert!(text.contains("Rate limit"));
        assert!(text.contains("3.0s"));
        assert!(text.contains("Wait a few seconds"));
    }

    #[test]
    fn test_describe_rate_limit_with_suggested_wait() {
        let text = describe_failure(&TransportError::Rejected {
            status: 429,
            message: "Resource has been exhausted".to_string(),
            hint: None,
            retry_after_ms: Some(41_000),
        });
        assert!(text.contains("Resource has been exhausted"));
        assert!(text.contains("Try again in 41s."));
    }
}
