//! Conductor - The Orchestration Core
//!
//! The Conductor drives one chat session. It orchestrates:
//! - the chat session state machine
//! - analysis API calls (market pulse, chat)
//! - speech input
//! - communication with the UI surface
//!
//! # Design Philosophy
//!
//! The Conductor is UI-agnostic. It doesn't know whether it's talking to a
//! TUI or a test harness. The surface calls the named operations below,
//! reads snapshots through the accessors, and receives `ConductorMessage`s
//! on a channel.
//!
//! Network calls run on spawned tasks and report back over `oneshot`
//! channels. Results are applied by [`Conductor::poll`], which the surface
//! calls every frame, so the Conductor itself has a single owner and needs
//! no locking.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use crate::api::{AnalysisApi, ApiError};
use crate::config::StockElfConfig;
use crate::messages::{
    ChatReply, ChatRequest, ConductorMessage, ConductorState, MarketPulseItem, NotifyLevel,
};
use crate::session::{ChatSession, QuickAskKind, SubmitRejection, DEFAULT_GREETING, DEFAULT_TICKER};
use crate::speech::{SpeechController, SpeechError, SpeechOutcome};

/// Notice shown when the microphone permission is refused
pub const MIC_DENIED_NOTICE: &str = "Microphone access denied. Please enable microphone permissions.";

type ChatResult = Result<ChatReply, ApiError>;
type PulseResult = Result<Vec<MarketPulseItem>, ApiError>;

/// Conductor configuration
#[derive(Clone, Debug)]
pub struct ConductorConfig {
    /// Ticker pre-filled at startup
    pub ticker: String,
    /// First bot message
    pub greeting: String,
    /// Fetch market pulse on start
    pub fetch_market_pulse: bool,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            ticker: DEFAULT_TICKER.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            fetch_market_pulse: true,
        }
    }
}

impl From<&StockElfConfig> for ConductorConfig {
    fn from(config: &StockElfConfig) -> Self {
        Self {
            ticker: config.ticker.clone(),
            greeting: config.greeting.clone(),
            fetch_market_pulse: true,
        }
    }
}

/// The Conductor - headless orchestration core
pub struct Conductor<A: AnalysisApi> {
    /// Analysis API
    api: Arc<A>,
    /// Current session
    session: ChatSession,
    /// Voice input
    speech: SpeechController,
    /// Latest market snapshot
    market_pulse: Vec<MarketPulseItem>,
    /// Whether to fetch market pulse on start
    fetch_market_pulse: bool,
    /// Result of the in-flight chat request
    reply_rx: Option<oneshot::Receiver<ChatResult>>,
    /// When the in-flight chat request was sent
    request_start: Option<Instant>,
    /// Result of the in-flight market pulse fetch
    pulse_rx: Option<oneshot::Receiver<PulseResult>>,
    /// Channel to send messages to UI surface
    tx: mpsc::Sender<ConductorMessage>,
}

impl<A: AnalysisApi + 'static> Conductor<A> {
    /// Create a new Conductor with the given API and speech controller
    pub fn new(
        api: A,
        config: ConductorConfig,
        speech: SpeechController,
        tx: mpsc::Sender<ConductorMessage>,
    ) -> Self {
        Self {
            api: Arc::new(api),
            session: ChatSession::new(&config.ticker, &config.greeting),
            speech,
            market_pulse: Vec::new(),
            fetch_market_pulse: config.fetch_market_pulse,
            reply_rx: None,
            request_start: None,
            pulse_rx: None,
            tx,
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Read-only session snapshot
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Get current state
    pub fn state(&self) -> ConductorState {
        self.session.state()
    }

    /// Latest market snapshot (possibly empty)
    pub fn market_pulse(&self) -> &[MarketPulseItem] {
        &self.market_pulse
    }

    /// Whether voice input is live
    pub fn is_recording(&self) -> bool {
        self.speech.is_recording()
    }

    /// Whether a speech capability is installed
    pub fn speech_supported(&self) -> bool {
        self.speech.is_supported()
    }

    /// Whether a chat request is in flight
    pub fn has_pending_reply(&self) -> bool {
        self.reply_rx.is_some()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the Conductor: announce the initial state and load market pulse
    pub async fn start(&mut self) {
        tracing::info!(
            api = self.api.name(),
            ticker = self.session.ticker(),
            speech = self.speech.is_supported(),
            "Conductor starting"
        );

        self.send(ConductorMessage::StateChanged {
            state: self.session.state(),
        })
        .await;
        self.send(ConductorMessage::StatusChanged {
            text: self.session.status_text().to_string(),
        })
        .await;

        if self.fetch_market_pulse {
            self.refresh_market_pulse();
        }
    }

    /// Spawn a market pulse fetch unless one is already running
    pub fn refresh_market_pulse(&mut self) {
        if self.pulse_rx.is_some() {
            return;
        }
        let api = Arc::clone(&self.api);
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(api.fetch_market_pulse().await);
        });
        self.pulse_rx = Some(rx);
    }

    /// Shut down: abort any active recognition
    pub async fn shutdown(&mut self) {
        if self.speech.stop() {
            self.session.end_recording();
            self.send(ConductorMessage::Recording { active: false }).await;
        }
        tracing::info!(
            messages = self.session.messages().len(),
            "Conductor shut down"
        );
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Submit a question
    ///
    /// # Errors
    ///
    /// Returns the rejection when the session refuses the submission. Ticker
    /// and empty-question rejections are also sent to the surface as notices.
    pub async fn submit(&mut self, message: &str) -> Result<(), SubmitRejection> {
        let result = self.session.submit(message);
        self.dispatch(result).await
    }

    /// Submit the current draft
    ///
    /// # Errors
    ///
    /// See [`Conductor::submit`].
    pub async fn submit_draft(&mut self) -> Result<(), SubmitRejection> {
        let result = self.session.submit_draft();
        self.dispatch(result).await
    }

    /// Submit a canned question
    ///
    /// # Errors
    ///
    /// See [`Conductor::submit`].
    pub async fn quick_ask(&mut self, kind: QuickAskKind) -> Result<(), SubmitRejection> {
        let result = self.session.quick_ask(kind);
        self.dispatch(result).await
    }

    /// Replace the ticker
    pub fn set_ticker(&mut self, text: &str) {
        self.session.set_ticker(text);
    }

    /// Type a ticker character
    pub fn push_ticker(&mut self, c: char) {
        self.session.push_ticker(c);
    }

    /// Delete the last ticker character
    pub fn pop_ticker(&mut self) {
        self.session.pop_ticker();
    }

    /// Replace the draft; refused while recording
    pub fn set_draft(&mut self, text: &str) -> bool {
        self.session.set_draft(text)
    }

    /// Type a draft character; refused while recording
    pub fn push_draft(&mut self, c: char) -> bool {
        self.session.push_draft(c)
    }

    /// Delete the last draft character; refused while recording
    pub fn pop_draft(&mut self) -> bool {
        self.session.pop_draft()
    }

    /// Start or stop voice input
    ///
    /// Starting is refused while a chat request is in flight.
    pub async fn toggle_recording(&mut self) {
        if self.speech.is_recording() {
            self.speech.stop();
            self.session.end_recording();
            self.send(ConductorMessage::Recording { active: false }).await;
            return;
        }

        if self.session.is_loading() {
            tracing::debug!("Voice input ignored while awaiting a reply");
            return;
        }

        match self.speech.start() {
            Ok(true) => {
                self.session.begin_recording();
                self.send(ConductorMessage::Recording { active: true }).await;
            }
            Ok(false) => {}
            Err(e @ SpeechError::UnsupportedCapability) => {
                self.notify(NotifyLevel::Warning, &e.to_string()).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Speech recognition failed to start");
                self.notify(NotifyLevel::Warning, &e.to_string()).await;
            }
        }
    }

    // ========================================================================
    // Background results
    // ========================================================================

    /// Apply finished background work
    ///
    /// Call this every frame. Returns true if anything changed.
    pub async fn poll(&mut self) -> bool {
        let mut changed = false;

        if let Some(rx) = self.reply_rx.as_mut() {
            match rx.try_recv() {
                Ok(result) => {
                    self.reply_rx = None;
                    self.apply_reply(result).await;
                    changed = true;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.reply_rx = None;
                    self.apply_lost_reply().await;
                    changed = true;
                }
            }
        }

        if let Some(rx) = self.pulse_rx.as_mut() {
            match rx.try_recv() {
                Ok(result) => {
                    self.pulse_rx = None;
                    self.apply_market_pulse(result).await;
                    changed = true;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.pulse_rx = None;
                    tracing::warn!("Market pulse task ended without a result");
                }
            }
        }

        if let Some(outcome) = self.speech.poll() {
            self.apply_speech(outcome).await;
            changed = true;
        }

        changed
    }

    /// Wait for the in-flight chat request and apply it
    ///
    /// Returns false when nothing was in flight.
    pub async fn wait_for_reply(&mut self) -> bool {
        let Some(rx) = self.reply_rx.take() else {
            return false;
        };
        match rx.await {
            Ok(result) => self.apply_reply(result).await,
            Err(_) => self.apply_lost_reply().await,
        }
        true
    }

    /// Wait for the in-flight market pulse fetch and apply it
    ///
    /// Returns false when nothing was in flight.
    pub async fn wait_for_market_pulse(&mut self) -> bool {
        let Some(rx) = self.pulse_rx.take() else {
            return false;
        };
        match rx.await {
            Ok(result) => self.apply_market_pulse(result).await,
            Err(_) => tracing::warn!("Market pulse task ended without a result"),
        }
        true
    }

    /// Wait for the active recognition pass and apply it
    ///
    /// Returns false when voice input is not live.
    pub async fn wait_for_speech(&mut self) -> bool {
        match self.speech.next_outcome().await {
            Some(outcome) => {
                self.apply_speech(outcome).await;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn dispatch(
        &mut self,
        result: Result<ChatRequest, SubmitRejection>,
    ) -> Result<(), SubmitRejection> {
        match result {
            Ok(request) => {
                tracing::info!(
                    ticker = %request.ticker,
                    chars = request.message.len(),
                    "Chat request submitted"
                );
                self.announce_last_message().await;
                self.send(ConductorMessage::StateChanged {
                    state: ConductorState::AwaitingResponse,
                })
                .await;
                self.spawn_chat(request);
                Ok(())
            }
            Err(rejection) => {
                tracing::debug!(reason = %rejection, "Submission rejected");
                if let Some(notice) = rejection.notice() {
                    self.notify(NotifyLevel::Info, &notice).await;
                }
                Err(rejection)
            }
        }
    }

    fn spawn_chat(&mut self, request: ChatRequest) {
        let api = Arc::clone(&self.api);
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(api.send_chat(&request).await);
        });
        self.reply_rx = Some(rx);
        self.request_start = Some(Instant::now());
    }

    async fn apply_reply(&mut self, result: ChatResult) {
        let elapsed_ms = self
            .request_start
            .take()
            .map_or(0, |start| start.elapsed().as_millis() as u64);

        match result {
            Ok(reply) => {
                tracing::info!(
                    elapsed_ms,
                    chart = reply.chart_data.is_some(),
                    "Chat reply received"
                );
                let status_before = self.session.status_text().to_string();
                self.session.complete(reply);
                if self.session.status_text() != status_before {
                    self.send(ConductorMessage::StatusChanged {
                        text: self.session.status_text().to_string(),
                    })
                    .await;
                }
            }
            Err(e) => {
                tracing::warn!(elapsed_ms, error = %e, "Chat request failed");
                self.session.fail();
            }
        }

        self.announce_last_message().await;
        self.send(ConductorMessage::StateChanged {
            state: ConductorState::Ready,
        })
        .await;
    }

    async fn apply_lost_reply(&mut self) {
        tracing::warn!("Chat request task ended without a reply");
        self.request_start = None;
        self.session.fail();
        self.announce_last_message().await;
        self.send(ConductorMessage::StateChanged {
            state: ConductorState::Ready,
        })
        .await;
    }

    async fn apply_market_pulse(&mut self, result: PulseResult) {
        match result {
            Ok(items) => {
                tracing::debug!(count = items.len(), "Market pulse loaded");
                self.market_pulse = items;
                self.send(ConductorMessage::MarketPulse {
                    count: self.market_pulse.len(),
                })
                .await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load market pulse");
            }
        }
    }

    async fn apply_speech(&mut self, outcome: SpeechOutcome) {
        self.session.end_recording();
        match outcome {
            SpeechOutcome::Transcript(text) => {
                tracing::debug!(chars = text.len(), "Speech transcript received");
                self.session.apply_transcript(&text);
            }
            SpeechOutcome::PermissionDenied => {
                self.notify(NotifyLevel::Error, MIC_DENIED_NOTICE).await;
            }
            SpeechOutcome::Ended => {}
        }
        self.send(ConductorMessage::Recording { active: false }).await;
    }

    async fn announce_last_message(&self) {
        if let Some(msg) = self.session.last_message() {
            self.send(ConductorMessage::MessageAppended {
                id: msg.id().clone(),
                role: msg.role(),
            })
            .await;
        }
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(ConductorMessage::Notify {
            level,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI surface
    async fn send(&self, msg: ConductorMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::PricePoint;

    // Mock API for testing
    struct MockApi;

    #[async_trait::async_trait]
    impl AnalysisApi for MockApi {
        fn name(&self) -> &str {
            "Mock"
        }

        async fn fetch_market_pulse(&self) -> Result<Vec<MarketPulseItem>, ApiError> {
            Ok(vec![MarketPulseItem {
                name: "Nasdaq".to_string(),
                price: "16,000".to_string(),
                change: -0.3,
                change_str: "-0.30%".to_string(),
            }])
        }

        async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
            Ok(ChatReply {
                response_text: format!("About {}", request.ticker),
                display_ticker: Some(format!("Example ({})", request.ticker)),
                chart_data: Some(vec![PricePoint::new("D1", 1.0)]),
            })
        }
    }

    fn conductor(tx: mpsc::Sender<ConductorMessage>) -> Conductor<MockApi> {
        Conductor::new(
            MockApi,
            ConductorConfig::default(),
            SpeechController::unsupported(),
            tx,
        )
    }

    #[tokio::test]
    async fn test_conductor_creation() {
        let (tx, _rx) = mpsc::channel(100);
        let conductor = conductor(tx);

        assert_eq!(conductor.state(), ConductorState::Ready);
        assert_eq!(conductor.session().messages().len(), 1);
        assert!(conductor.market_pulse().is_empty());
        assert!(!conductor.speech_supported());
    }

    #[tokio::test]
    async fn test_conductor_start_loads_market_pulse() {
        let (tx, mut rx) = mpsc::channel(100);
        let mut conductor = conductor(tx);

        conductor.start().await;
        assert!(conductor.wait_for_market_pulse().await);
        assert_eq!(conductor.market_pulse().len(), 1);

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, ConductorMessage::StateChanged { .. }));
    }

    #[tokio::test]
    async fn test_submit_and_reply() {
        let (tx, _rx) = mpsc::channel(100);
        let mut conductor = conductor(tx);

        conductor.submit("outlook?").await.unwrap();
        assert_eq!(conductor.state(), ConductorState::AwaitingResponse);
        assert!(conductor.has_pending_reply());

        assert!(conductor.wait_for_reply().await);
        assert_eq!(conductor.state(), ConductorState::Ready);
        assert_eq!(conductor.session().status_text(), "Analyzing: Example (AAPL)");
        assert_eq!(
            conductor.session().last_message().unwrap().content(),
            "About AAPL"
        );
    }

    #[tokio::test]
    async fn test_blank_question_notice_is_info() {
        let (tx, mut rx) = mpsc::channel(100);
        let mut conductor = conductor(tx);

        assert!(conductor.submit("   ").await.is_err());

        let msg = rx.recv().await.unwrap();
        assert_eq!(
            msg,
            ConductorMessage::Notify {
                level: NotifyLevel::Info,
                message: "Please enter a specific question.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported_voice_notice() {
        let (tx, mut rx) = mpsc::channel(100);
        let mut conductor = conductor(tx);

        conductor.toggle_recording().await;
        assert!(!conductor.is_recording());

        let msg = rx.recv().await.unwrap();
        assert!(matches!(
            msg,
            ConductorMessage::Notify {
                level: NotifyLevel::Warning,
                ..
            }
        ));
    }
}
