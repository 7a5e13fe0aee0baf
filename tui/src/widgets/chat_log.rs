//! ChatLog Widget
//!
//! A borderless, scrollable conversation view. Each message is a header line
//! followed by its markdown body; bot messages with price data get an inline
//! [`PriceChart`] below the text.
//!
//! Scrolling counts lines up from the bottom, so an offset of zero always
//! follows the newest message.

use std::collections::HashMap;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{StatefulWidget, Widget};

use stock_elf_core::{ChartSpec, Message};

use super::price_chart::{PriceChart, CHART_HEIGHT};
use crate::display;

/// Left margin for inline charts
const CHART_INDENT: u16 = 2;

/// State for the chat log
#[derive(Debug, Default)]
pub struct ChatLogState {
    /// Scroll offset (lines up from the bottom)
    pub scroll_offset: usize,
    /// Total content lines at the last render
    pub total_lines: usize,
    /// Visible lines at the last render
    pub viewport: usize,
}

impl ChatLogState {
    /// Scroll towards older messages
    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.total_lines.saturating_sub(self.viewport);
        self.scroll_offset = (self.scroll_offset + lines).min(max);
    }

    /// Scroll towards newer messages
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Follow the newest message
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Jump to the first message
    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = self.total_lines.saturating_sub(self.viewport);
    }

    /// Whether the view is following the newest message
    pub fn is_at_bottom(&self) -> bool {
        self.scroll_offset == 0
    }
}

enum Row {
    Text(Line<'static>),
    Chart { index: usize, row: u16 },
}

/// Scrollable conversation view
pub struct ChatLog<'a> {
    messages: &'a [Message],
}

impl<'a> ChatLog<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self { messages }
    }

    fn layout(&self, width: usize) -> (Vec<Row>, Vec<ChartSpec>) {
        let mut rows = Vec::new();
        let mut charts = Vec::new();

        for message in self.messages {
            rows.push(Row::Text(display::message_header(message)));
            rows.extend(
                display::message_body(message, width)
                    .into_iter()
                    .map(Row::Text),
            );
            if let Some(spec) = message.chart_data().and_then(ChartSpec::from_points) {
                let index = charts.len();
                charts.push(spec);
                rows.extend((0..CHART_HEIGHT).map(|row| Row::Chart { index, row }));
            }
            rows.push(Row::Text(Line::default()));
        }

        (rows, charts)
    }
}

impl StatefulWidget for ChatLog<'_> {
    type State = ChatLogState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.is_empty() {
            return;
        }

        let (rows, charts) = self.layout(area.width as usize);
        let height = area.height as usize;

        state.total_lines = rows.len();
        state.viewport = height;

        // Clamp scroll
        let max_offset = rows.len().saturating_sub(height);
        state.scroll_offset = state.scroll_offset.min(max_offset);

        let start = rows.len().saturating_sub(height + state.scroll_offset);

        // Charts render once into an off-screen buffer, then visible rows are copied
        let chart_area = Rect::new(0, 0, area.width.saturating_sub(CHART_INDENT), CHART_HEIGHT);
        let mut rendered: HashMap<usize, Buffer> = HashMap::new();

        for (i, row) in rows.iter().skip(start).take(height).enumerate() {
            let y = area.y + i as u16;
            match row {
                Row::Text(line) => {
                    buf.set_line(area.x, y, line, area.width);
                }
                Row::Chart { index, row } => {
                    let chart_buf = rendered.entry(*index).or_insert_with(|| {
                        let mut scratch = Buffer::empty(chart_area);
                        PriceChart::new(&charts[*index]).render(chart_area, &mut scratch);
                        scratch
                    });
                    for x in 0..chart_area.width {
                        if let (Some(src), Some(dst)) = (
                            chart_buf.cell((x, *row)),
                            buf.cell_mut((area.x + CHART_INDENT + x, y)),
                        ) {
                            *dst = src.clone();
                        }
                    }
                }
            }
        }
    }
}
