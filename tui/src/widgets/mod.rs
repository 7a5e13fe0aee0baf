//! Widgets
//!
//! - [`ChatLog`]: scrollable conversation with inline charts
//! - [`PriceChart`]: filled area chart of a close-price series

pub mod chat_log;
pub mod price_chart;

pub use chat_log::{ChatLog, ChatLogState};
pub use price_chart::{PriceChart, CHART_HEIGHT};
