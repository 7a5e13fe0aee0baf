//! PriceChart Widget
//!
//! Draws a [`ChartSpec`] as a filled area chart with a ratatui [`Chart`].
//!
//! Values are drawn relative to the lower y bound so the fill bars start at
//! the bottom of the plot; the axis labels carry the real prices.

use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::Style;
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Chart, Dataset, GraphType, Widget};

use stock_elf_core::ChartSpec;

use crate::theme;

/// Rows an inline chart occupies in the chat log
pub const CHART_HEIGHT: u16 = 12;

/// Area chart of a close-price series
pub struct PriceChart<'a> {
    spec: &'a ChartSpec,
}

impl<'a> PriceChart<'a> {
    pub fn new(spec: &'a ChartSpec) -> Self {
        Self { spec }
    }

    /// Latest close and change over the window, e.g. `172.50 (+2.50)`
    fn caption(&self) -> Option<Line<'static>> {
        let last = self.spec.latest()?;
        let change = self.spec.change()?;
        if !last.is_finite() || !change.is_finite() {
            return None;
        }
        Some(
            Line::from(Span::styled(
                format!("{last:.2} ({change:+.2})"),
                Style::default().fg(theme::change_color(change)),
            ))
            .alignment(Alignment::Right),
        )
    }
}

impl Widget for PriceChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [low, high] = self.spec.y_bounds;

        // Non-finite closes stay in the series but cannot be plotted
        let shifted: Vec<(f64, f64)> = self
            .spec
            .series
            .points
            .iter()
            .filter(|(_, y)| y.is_finite())
            .map(|&(x, y)| (x, y - low))
            .collect();

        let mut block = Block::bordered()
            .border_style(theme::border(false))
            .title(Span::styled(self.spec.title.clone(), theme::muted()));
        if let Some(caption) = self.caption() {
            block = block.title(caption);
        }

        let datasets = vec![
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Bar)
                .style(Style::default().fg(theme::CHART_FILL))
                .data(&shifted),
            Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme::CHART_LINE))
                .data(&shifted),
        ];

        let y_labels = vec![
            format!("{low:.2}"),
            format!("{:.2}", (low + high) / 2.0),
            format!("{high:.2}"),
        ];

        Chart::new(datasets)
            .block(block)
            .x_axis(
                Axis::default()
                    .style(theme::muted())
                    .bounds(self.spec.x_bounds)
                    .labels(self.spec.edge_labels()),
            )
            .y_axis(
                Axis::default()
                    .style(theme::muted())
                    .bounds([0.0, high - low])
                    .labels(y_labels),
            )
            .render(area, buf);
    }
}
