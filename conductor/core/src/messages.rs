//! Conductor Messages and Shared Data Types
//!
//! Messages sent from the Conductor to the UI surface, plus the plain data
//! types that cross the boundary between the core, the analysis API, and the
//! surface (price points, market pulse rows, chat request/reply).
//!
//! The surface never mutates session state directly. It reads snapshots from
//! the Conductor and reacts to these messages (scroll to the newest message,
//! show a notice, refresh the sidebar).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Messages from Conductor to UI Surface
#[derive(Clone, Debug, PartialEq)]
pub enum ConductorMessage {
    /// A message was appended to the chat log
    MessageAppended {
        /// ID of the appended message
        id: MessageId,
        /// Who sent it
        role: MessageRole,
    },

    /// The session moved between `Ready` and `AwaitingResponse`
    StateChanged {
        /// The new state
        state: ConductorState,
    },

    /// Status text next to the ticker changed
    StatusChanged {
        /// New status text
        text: String,
    },

    /// The market pulse list was refreshed
    MarketPulse {
        /// Number of rows now available
        count: usize,
    },

    /// Voice recording started or stopped
    Recording {
        /// Whether the microphone is live
        active: bool,
    },

    /// A user-facing notice (validation prompt, capability notice)
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },
}

/// Who authored a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageRole {
    /// The person typing or speaking
    User,
    /// The analysis assistant
    Bot,
}

impl MessageRole {
    /// Short label used by surfaces
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Bot => "Stock-Elf",
        }
    }
}

/// Unique message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    #[must_use]
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat session operational state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConductorState {
    /// Accepting submissions
    #[default]
    Ready,
    /// One chat request is in flight; further submissions are rejected
    AwaitingResponse,
}

impl ConductorState {
    /// Human-readable description for status bars
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::AwaitingResponse => "AI is analyzing data...",
        }
    }
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyLevel {
    /// Input validation prompt
    Info,
    /// Capability or configuration problem
    Warning,
    /// A refused permission the user has to fix outside the app
    Error,
}

/// One point of a price series, as produced by the analysis backend
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PricePoint {
    /// Categorical date label (e.g. `"03/14"`)
    pub date: String,
    /// Closing price
    pub close: f64,
    /// Traded volume, when the backend includes a usable one
    #[serde(default, deserialize_with = "lenient_volume")]
    pub volume: Option<u64>,
}

impl PricePoint {
    /// Create a point without volume
    pub fn new(date: impl Into<String>, close: f64) -> Self {
        Self {
            date: date.into(),
            close,
            volume: None,
        }
    }
}

/// A market snapshot row for the sidebar
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MarketPulseItem {
    /// Display name (e.g. "S&P 500")
    pub name: String,
    /// Display price; the backend sends either a formatted string or a number
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    /// Percentage change, used for colouring
    pub change: f64,
    /// Pre-formatted change (e.g. "+0.42%")
    pub change_str: String,
}

impl MarketPulseItem {
    /// Whether the change is zero or positive
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// Volume is never rendered, so anything other than a non-negative number
/// decodes to `None` instead of failing the whole reply.
fn lenient_volume<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let serde_json::Value::Number(number) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(None);
    };

    Ok(number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0 && *v <= u64::MAX as f64)
            .map(|v| v.round() as u64)
    }))
}

/// A single chat request keyed by ticker and message
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// Ticker or company name as typed
    pub ticker: String,
    /// The question
    pub message: String,
}

/// The analysis answer for one chat request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatReply {
    /// Markdown-ish answer text
    pub response_text: String,
    /// Display-formatted ticker, e.g. "Apple Inc. (AAPL)"
    pub display_ticker: Option<String>,
    /// Optional price series for the chart
    pub chart_data: Option<Vec<PricePoint>>,
}

impl ChatReply {
    /// A text-only reply
    pub fn text(response_text: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            ..Default::default()
        }
    }
}
