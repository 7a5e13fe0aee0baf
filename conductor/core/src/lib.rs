//! Stock-Elf Core - Headless Chat Session for Ticker Q&A
//!
//! This crate holds the whole client-side logic of Stock-Elf, independent of
//! any UI framework. It can drive the terminal UI or run headless in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       UI Surface (TUI)                        │
//! │        reads snapshots, calls operations, drains messages     │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │  ConductorMessage (down)
//! ┌──────────────────────────────┼───────────────────────────────┐
//! │                        STOCK-ELF CORE                         │
//! │  ┌───────────────────────────┴─────────────────────────────┐ │
//! │  │                       Conductor                          │ │
//! │  │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐ │ │
//! │  │  │ ChatSession │  │   Speech     │  │  AnalysisApi    │ │ │
//! │  │  │ (state)     │  │  Controller  │  │  (HTTP gateway) │ │ │
//! │  │  └─────────────┘  └──────────────┘  └─────────────────┘ │ │
//! │  └─────────────────────────────────────────────────────────┘ │
//! │     markdown (line renderer)      chart (price adapter)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: Drives the session, the API, and voice input
//! - [`ChatSession`]: The session state machine
//! - [`ConductorMessage`]: Messages sent from the Conductor to the surface
//! - [`AnalysisApi`]: Analysis service seam; [`HttpGateway`] implements it
//! - [`SpeechRecognizer`]: Speech capability seam; [`CommandRecognizer`] implements it
//!
//! # Quick Start
//!
//! ```ignore
//! use stock_elf_core::{load_config, Conductor, ConductorConfig, HttpGateway, SpeechController};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let (tx, mut rx) = mpsc::channel(100);
//!
//!     let api = HttpGateway::from_config(&config.api)?;
//!     let speech = SpeechController::new(
//!         config.speech.recognizer(),
//!         config.speech.recognition_options(),
//!     );
//!     let mut conductor = Conductor::new(api, ConductorConfig::from(&config), speech, tx);
//!     conductor.start().await;
//!
//!     conductor.submit("What are the main risks?").await.ok();
//!     conductor.wait_for_reply().await;
//!
//!     while let Ok(msg) = rx.try_recv() {
//!         // Render message to UI
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`api`]: Analysis API trait and HTTP gateway
//! - [`chart`]: Price series to chart description
//! - [`conductor`]: Main Conductor struct
//! - [`config`]: TOML/env/CLI configuration
//! - [`markdown`]: Markdown line renderer
//! - [`messages`]: Messages to UI surfaces and shared data types
//! - [`session`]: Chat session state machine
//! - [`speech`]: Speech input controller
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod chart;
pub mod conductor;
pub mod config;
pub mod markdown;
pub mod messages;
pub mod session;
pub mod speech;

// Re-exports for convenience
pub use api::{AnalysisApi, ApiError, HttpGateway};
pub use chart::{ChartSeries, ChartSpec, SeriesKind, CHART_TITLE};
pub use conductor::{Conductor, ConductorConfig, MIC_DENIED_NOTICE};
pub use markdown::{render, render_line, MarkdownLine, TextRun};
pub use messages::{
    ChatReply, ChatRequest, ConductorMessage, ConductorState, MarketPulseItem, MessageId,
    MessageRole, NotifyLevel, PricePoint,
};
pub use session::{
    ChatSession, Message, QuickAskKind, SubmitRejection, CONNECTION_FAILED_TEXT, DEFAULT_GREETING,
    DEFAULT_TICKER, INITIAL_STATUS,
};
pub use speech::{
    CommandRecognizer, RecognitionOptions, SpeechAlternative, SpeechController, SpeechError,
    SpeechErrorKind, SpeechEvent, SpeechOutcome, SpeechRecognizer, SpeechState,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_required_config,
    load_required_config_with_env, ApiConfig, ConfigError, ConfigOverrides, ConfigSource,
    SpeechConfig, StockElfConfig, StockElfToml,
};
