//! Display State Types
//!
//! Types that represent the current display state for the TUI, derived from
//! ConductorMessages, plus the conversion of chat content into styled,
//! wrapped terminal lines.
//!
//! The TUI is a thin client: message content, ticker, and draft are read
//! from the session snapshot. Display state only holds what exists purely
//! for presentation (notices, scroll requests, indicators).

use std::mem;
use std::time::{Duration, Instant};

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use stock_elf_core::{
    markdown, ConductorMessage, ConductorState, MarkdownLine, MarketPulseItem, Message,
    NotifyLevel,
};

use crate::theme;

/// How long a notice stays on screen
pub const NOTICE_TTL: Duration = Duration::from_secs(6);

/// Indent applied to message bodies
const BODY_INDENT: &str = "  ";

/// A notice shown in the footer
#[derive(Clone, Debug)]
pub struct DisplayNotice {
    /// Severity
    pub level: NotifyLevel,
    /// Text shown to the user
    pub message: String,
    /// When it was received
    pub shown_at: Instant,
}

impl DisplayNotice {
    /// Whether the notice should be dropped at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= NOTICE_TTL
    }
}

/// Presentation state for the TUI
#[derive(Debug, Default)]
pub struct DisplayState {
    /// Conductor state (drives the analyzing indicator)
    pub conductor_state: ConductorState,
    /// Microphone live (drives the listening indicator)
    pub recording: bool,
    /// Current notice, if any
    pub notice: Option<DisplayNotice>,
    /// Rows in the market pulse sidebar
    pub pulse_rows: usize,
    /// A new message arrived and the log should jump to it
    scroll_to_latest: bool,
}

impl DisplayState {
    /// Create a new display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a ConductorMessage to update display state
    pub fn apply_message(&mut self, msg: ConductorMessage) {
        match msg {
            ConductorMessage::MessageAppended { .. } => {
                self.scroll_to_latest = true;
            }
            ConductorMessage::StateChanged { state } => {
                self.conductor_state = state;
            }
            ConductorMessage::StatusChanged { .. } => {
                // Status text is read from the session snapshot
            }
            ConductorMessage::MarketPulse { count } => {
                self.pulse_rows = count;
            }
            ConductorMessage::Recording { active } => {
                self.recording = active;
            }
            ConductorMessage::Notify { level, message } => {
                self.notice = Some(DisplayNotice {
                    level,
                    message,
                    shown_at: Instant::now(),
                });
            }
        }
    }

    /// Drop expired notices
    pub fn update(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
        }
    }

    /// Take a pending jump-to-latest request
    pub fn take_scroll_request(&mut self) -> bool {
        mem::take(&mut self.scroll_to_latest)
    }

    /// Whether the analyzing indicator should show
    pub fn is_analyzing(&self) -> bool {
        self.conductor_state == ConductorState::AwaitingResponse
    }
}

// ============================================================================
// Message Lines
// ============================================================================

/// Header line for a message: author label and local time
pub fn message_header(message: &Message) -> Line<'static> {
    let role = message.role();
    Line::from(vec![
        Span::styled(role.label().to_string(), theme::role_label(role)),
        Span::styled(
            format!("  {}", message.created_at().format("%H:%M")),
            theme::muted(),
        ),
    ])
}

/// Message body rendered through the markdown line renderer and wrapped
pub fn message_body(message: &Message, width: usize) -> Vec<Line<'static>> {
    markdown::render(message.content())
        .iter()
        .flat_map(|line| markdown_lines(line, width))
        .collect()
}

/// One markdown line as wrapped terminal lines
pub fn markdown_lines(line: &MarkdownLine, width: usize) -> Vec<Line<'static>> {
    let indent = Span::raw(BODY_INDENT);
    match line {
        MarkdownLine::Heading { level, text } => {
            let style = if *level == 2 {
                Style::default()
                    .fg(theme::ACCENT_BLUE)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
                    .fg(theme::SLATE_50)
                    .add_modifier(Modifier::BOLD)
            };
            wrap_spans(
                &[Span::styled(text.clone(), style)],
                width,
                &indent,
                &indent,
            )
        }
        MarkdownLine::ListItem(text) => wrap_spans(
            &[Span::styled(text.clone(), Style::default().fg(theme::SLATE_300))],
            width,
            &Span::styled(format!("{BODY_INDENT}• "), Style::default().fg(theme::ACCENT_BLUE)),
            &Span::raw(format!("{BODY_INDENT}  ")),
        ),
        MarkdownLine::Paragraph(runs) => {
            let spans: Vec<Span<'static>> = runs
                .iter()
                .map(|run| {
                    let style = if run.emphasized {
                        Style::default()
                            .fg(theme::SLATE_50)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(theme::SLATE_300)
                    };
                    Span::styled(run.text.clone(), style)
                })
                .collect();
            wrap_spans(&spans, width, &indent, &indent)
        }
        MarkdownLine::LineBreak => vec![Line::default()],
    }
}

/// Sidebar rows for one market pulse item: name, then price and change
pub fn pulse_lines(item: &MarketPulseItem, width: usize) -> [Line<'static>; 2] {
    let name = Line::from(Span::styled(
        item.name.clone(),
        Style::default().fg(theme::SLATE_400),
    ));

    let used = item.price.width() + item.change_str.width();
    let gap = width.saturating_sub(used).max(1);
    let figures = Line::from(vec![
        Span::styled(
            item.price.clone(),
            Style::default()
                .fg(theme::SLATE_50)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(gap)),
        Span::styled(
            item.change_str.clone(),
            Style::default().fg(theme::change_color(item.change)),
        ),
    ]);

    [name, figures]
}

// ============================================================================
// Wrapping
// ============================================================================

/// Word-wrap styled spans to `width` columns, keeping each span's style
///
/// The first output line starts with `first_indent`, continuation lines with
/// `rest_indent`. Words longer than a line are split at character
/// boundaries.
pub fn wrap_spans(
    spans: &[Span<'static>],
    width: usize,
    first_indent: &Span<'static>,
    rest_indent: &Span<'static>,
) -> Vec<Line<'static>> {
    let mut wrapper = Wrapper::new(width, first_indent.clone(), rest_indent.clone());
    for span in spans {
        for chunk in span.content.split_inclusive(' ') {
            wrapper.push_word(chunk, span.style);
        }
    }
    wrapper.finish()
}

struct Wrapper {
    width: usize,
    rest_indent: Span<'static>,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    used: usize,
    avail: usize,
}

impl Wrapper {
    fn new(width: usize, first_indent: Span<'static>, rest_indent: Span<'static>) -> Self {
        let avail = width.saturating_sub(first_indent.width()).max(1);
        Self {
            width,
            rest_indent,
            lines: Vec::new(),
            current: vec![first_indent],
            used: 0,
            avail,
        }
    }

    fn break_line(&mut self) {
        let indent = self.rest_indent.clone();
        self.avail = self.width.saturating_sub(indent.width()).max(1);
        let done = mem::replace(&mut self.current, vec![indent]);
        self.lines.push(Line::from(done));
        self.used = 0;
    }

    /// Append text to the current line, merging with a same-styled span
    fn append(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.used += text.width();
        if self.current.len() > 1 {
            if let Some(last) = self.current.last_mut() {
                if last.style == style {
                    last.content.to_mut().push_str(text);
                    return;
                }
            }
        }
        self.current.push(Span::styled(text.to_string(), style));
    }

    /// `chunk` is one word followed by its trailing spaces
    fn push_word(&mut self, chunk: &str, style: Style) {
        let word = chunk.trim_end_matches(' ');
        let word_width = word.width();

        if self.used > 0 && self.used + word_width > self.avail {
            self.break_line();
        }
        // Continuation lines never start with blanks
        if word.is_empty() && self.used == 0 && !self.lines.is_empty() {
            return;
        }

        if word_width > self.avail.saturating_sub(self.used) {
            let mut buf = [0u8; 4];
            for ch in word.chars() {
                let w = ch.width().unwrap_or(0);
                if self.used > 0 && self.used + w > self.avail {
                    self.break_line();
                }
                self.append(ch.encode_utf8(&mut buf), style);
            }
            self.append(&chunk[word.len()..], style);
        } else {
            self.append(chunk, style);
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if self.current.len() > 1 || self.lines.is_empty() {
            self.lines.push(Line::from(self.current));
        }
        self.lines
    }
}

/// Plain text of a line, for tests and measurements
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}
