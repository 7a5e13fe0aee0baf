//! Chat Session State Machine
//!
//! Holds everything the surface shows for one conversation: the ticker, the
//! append-only message log, the input draft, the loading state, the status
//! text, and whether voice input is live.
//!
//! # Design Philosophy
//!
//! The session is an explicit object mutated only by named transitions
//! (`submit`, `complete`, `fail`, `quick_ask`, draft edits). It performs no
//! I/O. The Conductor drives it and talks to the network; the surface only
//! reads it.
//!
//! ```text
//! Ready --submit (accepted)--> AwaitingResponse --complete / fail--> Ready
//! ```

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::messages::{ChatReply, ChatRequest, ConductorState, MessageId, MessageRole, PricePoint};

/// Bot message appended when a chat request fails
pub const CONNECTION_FAILED_TEXT: &str = "❌ Connection failed. Please check your network.";

/// First bot message of every session
pub const DEFAULT_GREETING: &str = "Hello! I am your AI Financial Assistant.\nPlease confirm the stock ticker at the top left (default is AAPL), then enter your question below.";

/// Status text before any reply has named the stock
pub const INITIAL_STATUS: &str = "Please enter target stock here";

/// Ticker used when none is configured
pub const DEFAULT_TICKER: &str = "AAPL";

/// A message in the chat log
///
/// Fields are private; a message cannot change after it is appended.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    id: MessageId,
    role: MessageRole,
    content: String,
    chart_data: Option<Vec<PricePoint>>,
    created_at: DateTime<Local>,
}

impl Message {
    fn new(role: MessageRole, content: String, chart_data: Option<Vec<PricePoint>>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            chart_data,
            created_at: Local::now(),
        }
    }

    /// Unique message ID
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Who sent the message
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Message text (markdown subset for bot messages)
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Price series attached to a bot reply
    pub fn chart_data(&self) -> Option<&[PricePoint]> {
        self.chart_data.as_deref()
    }

    /// When the message was appended
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

/// Why a submission was not sent
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    /// A chat request is already in flight
    #[error("a chat request is already in flight")]
    Busy,

    /// Voice input is live
    #[error("voice input is recording")]
    Recording,

    /// The ticker field is blank
    #[error("Please enter a stock ticker at the top first (e.g., AAPL)")]
    MissingTicker,

    /// The question is blank after trimming
    #[error("Please enter a specific question.")]
    EmptyMessage,
}

impl SubmitRejection {
    /// Text to show the user; `None` for silent rejections
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Busy | Self::Recording => None,
            Self::MissingTicker | Self::EmptyMessage => Some(self.to_string()),
        }
    }
}

/// Canned questions offered as shortcuts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuickAskKind {
    /// Deep analysis report with chart
    Analysis,
    /// Risk assessment
    Risk,
    /// Buy/sell advice with chart
    Advice,
    /// Company overview and news
    General,
}

impl QuickAskKind {
    /// All shortcuts in display order
    pub const ALL: [Self; 4] = [Self::Analysis, Self::Risk, Self::Advice, Self::General];

    /// The question submitted for this shortcut
    #[must_use]
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Analysis => "Please generate a detailed deep analysis report for me, including fundamentals and technicals with price chart.",
            Self::Risk => "What are the main risks of investing in this stock right now? Is it safe?",
            Self::Advice => "Is the current price suitable for buying or selling? Please provide analysis basis with chart.",
            Self::General => "What does this company mainly do? Any recent big news?",
        }
    }

    /// Button label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Analysis => "Deep Analysis Report",
            Self::Risk => "Risk Assessment",
            Self::Advice => "Investment Advice",
            Self::General => "Company Overview",
        }
    }
}

/// One chat session
#[derive(Clone, Debug)]
pub struct ChatSession {
    ticker: String,
    messages: Vec<Message>,
    input_draft: String,
    state: ConductorState,
    status_text: String,
    recording: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(DEFAULT_TICKER, DEFAULT_GREETING)
    }
}

impl ChatSession {
    /// Create a session seeded with a greeting bot message
    pub fn new(ticker: &str, greeting: &str) -> Self {
        let mut session = Self {
            ticker: ticker.to_uppercase(),
            messages: Vec::new(),
            input_draft: String::new(),
            state: ConductorState::Ready,
            status_text: INITIAL_STATUS.to_string(),
            recording: false,
        };
        if !greeting.is_empty() {
            session.append(MessageRole::Bot, greeting.to_string(), None);
        }
        session
    }

    // ========================================================================
    // Read access
    // ========================================================================

    /// Current ticker text
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// The message log, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Get message by ID
    pub fn get_message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Current input draft
    pub fn input_draft(&self) -> &str {
        &self.input_draft
    }

    /// Ready or awaiting a reply
    pub fn state(&self) -> ConductorState {
        self.state
    }

    /// Whether a chat request is in flight
    pub fn is_loading(&self) -> bool {
        self.state == ConductorState::AwaitingResponse
    }

    /// Status text shown next to the ticker
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Whether voice input is live
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Replace the ticker; input is upper-cased as typed
    pub fn set_ticker(&mut self, text: &str) {
        self.ticker = text.to_uppercase();
    }

    /// Append a character to the ticker
    pub fn push_ticker(&mut self, c: char) {
        self.ticker.extend(c.to_uppercase());
    }

    /// Remove the last ticker character
    pub fn pop_ticker(&mut self) {
        self.ticker.pop();
    }

    /// Replace the draft; refused while recording
    pub fn set_draft(&mut self, text: &str) -> bool {
        if self.recording {
            return false;
        }
        self.input_draft = text.to_string();
        true
    }

    /// Append a character to the draft; refused while recording
    pub fn push_draft(&mut self, c: char) -> bool {
        if self.recording {
            return false;
        }
        self.input_draft.push(c);
        true
    }

    /// Remove the last draft character; refused while recording
    pub fn pop_draft(&mut self) -> bool {
        if self.recording {
            return false;
        }
        self.input_draft.pop().is_some()
    }

    /// Put a recognized utterance into the draft
    ///
    /// This is the only way text enters the draft while recording. The user
    /// still reviews and sends it.
    pub fn apply_transcript(&mut self, transcript: &str) {
        self.input_draft = transcript.to_string();
    }

    /// Mark voice input as live; refused while a request is in flight
    pub fn begin_recording(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        self.recording = true;
        true
    }

    /// Mark voice input as stopped
    pub fn end_recording(&mut self) {
        self.recording = false;
    }

    /// Validate and accept a question
    ///
    /// On acceptance the trimmed question is appended as a user message, the
    /// draft is cleared, and the session awaits the reply. The returned
    /// request is the only one issued for this submission.
    ///
    /// # Errors
    ///
    /// Returns the first failing check. Nothing is mutated on rejection.
    pub fn submit(&mut self, message: &str) -> Result<ChatRequest, SubmitRejection> {
        if self.is_loading() {
            return Err(SubmitRejection::Busy);
        }
        if self.recording {
            return Err(SubmitRejection::Recording);
        }
        let ticker = self.ticker.trim();
        if ticker.is_empty() {
            return Err(SubmitRejection::MissingTicker);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(SubmitRejection::EmptyMessage);
        }

        let request = ChatRequest {
            ticker: ticker.to_string(),
            message: message.to_string(),
        };

        self.append(MessageRole::User, request.message.clone(), None);
        self.input_draft.clear();
        self.state = ConductorState::AwaitingResponse;
        Ok(request)
    }

    /// Submit the current draft
    ///
    /// # Errors
    ///
    /// See [`ChatSession::submit`].
    pub fn submit_draft(&mut self) -> Result<ChatRequest, SubmitRejection> {
        let draft = self.input_draft.clone();
        self.submit(&draft)
    }

    /// Put a canned prompt into the draft and submit it
    ///
    /// # Errors
    ///
    /// See [`ChatSession::submit`]. The draft is left alone when the session
    /// is busy or recording.
    pub fn quick_ask(&mut self, kind: QuickAskKind) -> Result<ChatRequest, SubmitRejection> {
        if self.is_loading() {
            return Err(SubmitRejection::Busy);
        }
        if self.recording {
            return Err(SubmitRejection::Recording);
        }
        self.input_draft = kind.prompt().to_string();
        self.submit(kind.prompt())
    }

    /// Apply a successful reply
    pub fn complete(&mut self, reply: ChatReply) -> MessageId {
        if let Some(display) = reply.display_ticker.as_deref().filter(|d| !d.is_empty()) {
            self.status_text = format!("Analyzing: {display}");
        }
        let id = self.append(MessageRole::Bot, reply.response_text, reply.chart_data);
        self.state = ConductorState::Ready;
        id
    }

    /// Apply a failed request
    pub fn fail(&mut self) -> MessageId {
        let id = self.append(MessageRole::Bot, CONNECTION_FAILED_TEXT.to_string(), None);
        self.state = ConductorState::Ready;
        id
    }

    fn append(
        &mut self,
        role: MessageRole,
        content: String,
        chart_data: Option<Vec<PricePoint>>,
    ) -> MessageId {
        let msg = Message::new(role, content, chart_data);
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_creation() {
        let session = ChatSession::default();
        assert_eq!(session.ticker(), "AAPL");
        assert_eq!(session.state(), ConductorState::Ready);
        assert_eq!(session.status_text(), INITIAL_STATUS);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role(), MessageRole::Bot);
        assert_eq!(session.messages()[0].content(), DEFAULT_GREETING);
    }

    #[test]
    fn test_submit_appends_trimmed_user_message() {
        let mut session = ChatSession::default();
        session.set_draft("  Is it a buy?  ");

        let request = session.submit_draft().unwrap();
        assert_eq!(
            request,
            ChatRequest {
                ticker: "AAPL".into(),
                message: "Is it a buy?".into()
            }
        );

        let last = session.last_message().unwrap();
        assert_eq!(last.role(), MessageRole::User);
        assert_eq!(last.content(), "Is it a buy?");
        assert_eq!(session.input_draft(), "");
        assert!(session.is_loading());
    }

    #[test]
    fn test_submit_rejections_do_not_mutate() {
        let mut session = ChatSession::new("", DEFAULT_GREETING);
        assert_eq!(
            session.submit("question"),
            Err(SubmitRejection::MissingTicker)
        );

        session.set_ticker("msft");
        assert_eq!(session.submit("   "), Err(SubmitRejection::EmptyMessage));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.state(), ConductorState::Ready);
    }

    #[test]
    fn test_submit_while_awaiting_is_silent() {
        let mut session = ChatSession::default();
        session.submit("first").unwrap();

        let rejection = session.submit("second").unwrap_err();
        assert_eq!(rejection, SubmitRejection::Busy);
        assert_eq!(rejection.notice(), None);
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_rejection_notices() {
        assert_eq!(
            SubmitRejection::MissingTicker.notice().as_deref(),
            Some("Please enter a stock ticker at the top first (e.g., AAPL)")
        );
        assert_eq!(
            SubmitRejection::EmptyMessage.notice().as_deref(),
            Some("Please enter a specific question.")
        );
        assert_eq!(SubmitRejection::Recording.notice(), None);
    }

    #[test]
    fn test_complete_sets_status_and_returns_ready() {
        let mut session = ChatSession::default();
        session.submit("chart please").unwrap();

        let id = session.complete(ChatReply {
            response_text: "## Apple".into(),
            display_ticker: Some("Apple Inc. (AAPL)".into()),
            chart_data: Some(vec![PricePoint::new("03/14", 172.5)]),
        });

        assert_eq!(session.state(), ConductorState::Ready);
        assert_eq!(session.status_text(), "Analyzing: Apple Inc. (AAPL)");
        let msg = session.get_message(&id).unwrap();
        assert_eq!(msg.role(), MessageRole::Bot);
        assert_eq!(msg.chart_data().map(<[PricePoint]>::len), Some(1));
    }

    #[test]
    fn test_complete_without_display_keeps_status() {
        let mut session = ChatSession::default();
        session.submit("hi").unwrap();
        session.complete(ChatReply {
            display_ticker: Some(String::new()),
            ..ChatReply::text("hello")
        });
        assert_eq!(session.status_text(), INITIAL_STATUS);
    }

    #[test]
    fn test_fail_appends_fixed_text() {
        let mut session = ChatSession::default();
        session.submit("hi").unwrap();
        session.fail();

        assert_eq!(session.state(), ConductorState::Ready);
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.last_message().unwrap().content(), CONNECTION_FAILED_TEXT);
        assert_eq!(session.messages()[1].content(), "hi");
    }

    #[test]
    fn test_quick_ask_risk() {
        let mut session = ChatSession::default();
        let request = session.quick_ask(QuickAskKind::Risk).unwrap();
        assert_eq!(
            request.message,
            "What are the main risks of investing in this stock right now? Is it safe?"
        );
        assert_eq!(request.ticker, "AAPL");
    }

    #[test]
    fn test_quick_ask_busy_keeps_draft() {
        let mut session = ChatSession::default();
        session.submit("first").unwrap();
        session.set_draft("typing");
        assert_eq!(
            session.quick_ask(QuickAskKind::General),
            Err(SubmitRejection::Busy)
        );
        assert_eq!(session.input_draft(), "typing");
    }

    #[test]
    fn test_recording_blocks_edits_and_submit() {
        let mut session = ChatSession::default();
        assert!(session.begin_recording());

        assert!(!session.push_draft('x'));
        assert!(!session.set_draft("typed"));
        assert_eq!(session.submit("q"), Err(SubmitRejection::Recording));

        session.apply_transcript("what is the pe ratio");
        session.end_recording();
        assert_eq!(session.input_draft(), "what is the pe ratio");
        assert!(session.submit_draft().is_ok());
    }

    #[test]
    fn test_recording_refused_while_loading() {
        let mut session = ChatSession::default();
        session.submit("q").unwrap();
        assert!(!session.begin_recording());
        assert!(!session.is_recording());
    }

    #[test]
    fn test_ticker_is_uppercased() {
        let mut session = ChatSession::default();
        session.set_ticker("tsla");
        assert_eq!(session.ticker(), "TSLA");
        session.pop_ticker();
        session.push_ticker('x');
        assert_eq!(session.ticker(), "TSLX");
    }
}
