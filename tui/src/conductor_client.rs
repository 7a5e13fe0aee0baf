//! Conductor Client
//!
//! Thin wrapper around the Conductor for TUI integration.
//! This client embeds the Conductor directly (no network between the two)
//! and provides a convenient interface for key handlers and the render loop.
//!
//! # Architecture
//!
//! The TUI is a "thin client" - it doesn't contain any business logic.
//! All session rules live in the Conductor. The TUI's job is:
//! 1. Convert key presses into Conductor operations
//! 2. Receive ConductorMessages
//! 3. Render the session snapshot and display state

use tokio::sync::mpsc;

use stock_elf_core::{
    AnalysisApi, ChatSession, Conductor, ConductorConfig, ConductorMessage, ConductorState,
    HttpGateway, MarketPulseItem, QuickAskKind, SpeechController, StockElfConfig,
};

/// Capacity of the Conductor -> TUI channel
const CHANNEL_CAPACITY: usize = 100;

/// Client for communicating with the embedded Conductor
pub struct ConductorClient<A: AnalysisApi> {
    /// The embedded Conductor instance
    conductor: Conductor<A>,
    /// Receiver for messages from Conductor
    rx: mpsc::Receiver<ConductorMessage>,
}

impl ConductorClient<HttpGateway> {
    /// Create a client talking to the HTTP analysis service
    pub fn from_config(config: &StockElfConfig) -> anyhow::Result<Self> {
        let api = HttpGateway::from_config(&config.api)?;
        let speech = SpeechController::new(
            config.speech.recognizer(),
            config.speech.recognition_options(),
        );
        Ok(Self::new(api, ConductorConfig::from(config), speech))
    }
}

impl<A: AnalysisApi + 'static> ConductorClient<A> {
    /// Create a new ConductorClient with embedded Conductor
    pub fn new(api: A, config: ConductorConfig, speech: SpeechController) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let conductor = Conductor::new(api, config, speech, tx);
        Self { conductor, rx }
    }

    /// Start the Conductor (initial state, market pulse fetch)
    pub async fn start(&mut self) {
        self.conductor.start().await;
    }

    /// Stop voice input and drop pending work
    pub async fn shutdown(&mut self) {
        self.conductor.shutdown().await;
    }

    /// Submit the current draft; false when rejected
    pub async fn submit_draft(&mut self) -> bool {
        self.conductor.submit_draft().await.is_ok()
    }

    /// Submit a canned prompt; false when rejected
    pub async fn quick_ask(&mut self, kind: QuickAskKind) -> bool {
        self.conductor.quick_ask(kind).await.is_ok()
    }

    /// Start or stop voice input
    pub async fn toggle_recording(&mut self) {
        self.conductor.toggle_recording().await;
    }

    /// Append a character to the ticker
    pub fn push_ticker(&mut self, c: char) {
        self.conductor.push_ticker(c);
    }

    /// Remove the last ticker character
    pub fn pop_ticker(&mut self) {
        self.conductor.pop_ticker();
    }

    /// Append a character to the draft
    pub fn push_draft(&mut self, c: char) -> bool {
        self.conductor.push_draft(c)
    }

    /// Remove the last draft character
    pub fn pop_draft(&mut self) -> bool {
        self.conductor.pop_draft()
    }

    /// Poll in-flight requests and voice input (must be called regularly)
    pub async fn poll(&mut self) -> bool {
        self.conductor.poll().await
    }

    /// Wait for the in-flight chat reply
    pub async fn wait_for_reply(&mut self) -> bool {
        self.conductor.wait_for_reply().await
    }

    /// Wait for the market pulse fetch
    pub async fn wait_for_market_pulse(&mut self) -> bool {
        self.conductor.wait_for_market_pulse().await
    }

    /// Wait for the voice recognition pass to finish
    pub async fn wait_for_speech(&mut self) -> bool {
        self.conductor.wait_for_speech().await
    }

    /// Try to receive a message from the Conductor (non-blocking)
    pub fn try_recv(&mut self) -> Option<ConductorMessage> {
        self.rx.try_recv().ok()
    }

    /// Receive all pending messages from the Conductor (non-blocking)
    pub fn recv_all(&mut self) -> Vec<ConductorMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Session snapshot
    pub fn session(&self) -> &ChatSession {
        self.conductor.session()
    }

    /// Market pulse rows
    pub fn market_pulse(&self) -> &[MarketPulseItem] {
        self.conductor.market_pulse()
    }

    /// Get the current Conductor state
    pub fn state(&self) -> ConductorState {
        self.conductor.state()
    }

    /// Whether the microphone is live
    pub fn is_recording(&self) -> bool {
        self.conductor.is_recording()
    }

    /// Whether voice input is available at all
    pub fn speech_supported(&self) -> bool {
        self.conductor.speech_supported()
    }
}
