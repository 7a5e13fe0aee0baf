//! Stock-Elf TUI - Terminal interface for ticker Q&A
//!
//! A full-screen chat surface over the headless `stock-elf-core` Conductor:
//! pick a ticker, ask a question (typed, quick-ask, or spoken), and read the
//! markdown answer with an inline price chart.
//!
//! # Architecture
//!
//! - **App**: Event loop, key handling, layout
//! - **ConductorClient**: Embedded Conductor plus its message channel
//! - **Display**: Presentation state and markdown-to-terminal styling
//! - **Widgets**: Scrollable chat log and price chart

pub mod app;
pub mod conductor_client;
pub mod display;
pub mod theme;
pub mod widgets;

pub use app::{App, Focus};
pub use conductor_client::ConductorClient;
