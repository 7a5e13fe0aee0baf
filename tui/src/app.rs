//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize)
//! - ConductorClient for the chat session, API calls, and voice input
//! - DisplayState for notices and indicators
//!
//! Each frame the App polls the Conductor, applies its messages to the
//! display state, and redraws from the session snapshot.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent,
    MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Layout, Margin, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph};
use ratatui::{Frame, Terminal};

use stock_elf_core::{AnalysisApi, ConductorState, QuickAskKind};

use crate::conductor_client::ConductorClient;
use crate::display::{self, DisplayState};
use crate::theme;
use crate::widgets::{ChatLog, ChatLogState};

/// Input box height (lines, including borders)
const INPUT_HEIGHT: u16 = 5;

/// Sidebar width (columns)
const SIDEBAR_WIDTH: u16 = 30;

/// Below this width the sidebar is hidden
const MIN_WIDTH_FOR_SIDEBAR: u16 = 72;

/// Lines scrolled per mouse wheel step
const WHEEL_STEP: usize = 3;

const TICKER_PLACEHOLDER: &str = "Ticker/Name (e.g. AAPL)";
const INPUT_PLACEHOLDER: &str = "Type your question or press F5 to speak...";
const LISTENING_TEXT: &str = "Listening... Speak your question";
const HELP_TEXT: &str =
    "Enter send · Tab switch field · F1-F4 quick ask · F5 voice · PgUp/PgDn scroll · Esc quit";

/// Which text field receives typed characters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    /// The ticker field in the top bar
    Ticker,
    /// The question box
    #[default]
    Question,
}

impl Focus {
    fn toggle(self) -> Self {
        match self {
            Self::Ticker => Self::Question,
            Self::Question => Self::Ticker,
        }
    }
}

/// Main application state
pub struct App<A: AnalysisApi> {
    /// Is the app still running?
    running: bool,
    /// Embedded Conductor
    conductor: ConductorClient<A>,
    /// Presentation state derived from Conductor messages
    display: DisplayState,
    /// Focused text field
    focus: Focus,
    /// Chat log scroll state
    chat: ChatLogState,
}

impl<A: AnalysisApi + 'static> App<A> {
    /// Create the app around a Conductor client
    pub fn new(conductor: ConductorClient<A>) -> Self {
        Self {
            running: true,
            conductor,
            display: DisplayState::new(),
            focus: Focus::default(),
            chat: ChatLogState::default(),
        }
    }

    /// Is the app still running?
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Focused text field
    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Presentation state
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// Chat log scroll state
    pub fn chat_state(&self) -> &ChatLogState {
        &self.chat
    }

    /// The embedded Conductor client
    pub fn conductor(&self) -> &ConductorClient<A> {
        &self.conductor
    }

    /// Mutable access to the Conductor client (headless drivers and tests)
    pub fn conductor_mut(&mut self) -> &mut ConductorClient<A> {
        &mut self.conductor
    }

    /// Start the Conductor and apply its first messages
    pub async fn start(&mut self) {
        self.conductor.start().await;
        self.process_conductor_messages();
    }

    /// Run the main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        // ~20 FPS is plenty for a chat surface
        let frame_duration = Duration::from_millis(50);

        // Create async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();

        self.start().await;

        // Render initial frame immediately so user sees UI
        terminal.draw(|frame| self.draw(frame))?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Check for terminal events - highest priority
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event).await,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Terminal event error");
                        }
                        None => self.running = false,
                    }
                }

                // Frame tick
                _ = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            self.tick().await;

            terminal.draw(|frame| self.draw(frame))?;

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Poll the Conductor, apply its messages, and expire notices
    pub async fn tick(&mut self) {
        self.conductor.poll().await;
        self.process_conductor_messages();
        self.display.update(Instant::now());
    }

    /// Process all pending messages from the Conductor
    fn process_conductor_messages(&mut self) {
        for msg in self.conductor.recv_all() {
            self.display.apply_message(msg);
        }
        if self.display.take_scroll_request() {
            self.chat.scroll_to_bottom();
        }
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            // Only handle Press events (not Release or Repeat)
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key).await,
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    /// Handle keyboard input
    pub async fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            // Quit
            KeyCode::Esc => self.quit().await,
            KeyCode::Char('c') if ctrl => self.quit().await,

            // Voice input
            KeyCode::F(5) => self.conductor.toggle_recording().await,
            KeyCode::Char('r') if ctrl => self.conductor.toggle_recording().await,

            // Quick ask shortcuts
            KeyCode::F(n @ 1..=4) => {
                let kind = QuickAskKind::ALL[usize::from(n - 1)];
                if self.conductor.quick_ask(kind).await {
                    self.chat.scroll_to_bottom();
                }
            }

            KeyCode::Tab | KeyCode::BackTab => self.focus = self.focus.toggle(),

            KeyCode::Enter => match self.focus {
                Focus::Ticker => self.focus = Focus::Question,
                Focus::Question => {
                    if self.conductor.submit_draft().await {
                        self.chat.scroll_to_bottom();
                    }
                }
            },

            // Typing
            KeyCode::Char(c) if !ctrl => match self.focus {
                Focus::Ticker => self.conductor.push_ticker(c),
                Focus::Question => {
                    self.conductor.push_draft(c);
                }
            },
            KeyCode::Backspace => match self.focus {
                Focus::Ticker => self.conductor.pop_ticker(),
                Focus::Question => {
                    self.conductor.pop_draft();
                }
            },

            // Conversation scrolling
            KeyCode::PageUp => self.chat.scroll_up(self.page_size()),
            KeyCode::PageDown => self.chat.scroll_down(self.page_size()),
            KeyCode::Home if ctrl => self.chat.scroll_to_top(),
            KeyCode::End if ctrl => self.chat.scroll_to_bottom(),

            _ => {}
        }
    }

    /// Handle mouse input
    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.chat.scroll_up(WHEEL_STEP),
            MouseEventKind::ScrollDown => self.chat.scroll_down(WHEEL_STEP),
            _ => {}
        }
    }

    async fn quit(&mut self) {
        self.conductor.shutdown().await;
        self.running = false;
    }

    fn page_size(&self) -> usize {
        (self.chat.viewport / 2).max(1)
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Draw the whole screen
    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::SLATE_900)),
            area,
        );

        let main = if area.width >= MIN_WIDTH_FOR_SIDEBAR {
            let [sidebar, main] =
                Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
                    .areas(area);
            self.render_sidebar(frame, sidebar);
            main
        } else {
            area
        };

        let [ticker_bar, chat, indicator, input, footer] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(main);

        self.render_ticker_bar(frame, ticker_bar);
        self.render_chat(frame, chat);
        self.render_indicator(frame, indicator);
        self.render_input(frame, input);
        self.render_footer(frame, footer);
    }

    fn render_sidebar(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(theme::border(false))
            .style(Style::default().bg(theme::SLATE_800))
            .padding(Padding::horizontal(1));
        let width = block.inner(area).width as usize;

        let mut lines = vec![
            Line::from(Span::styled(
                "⚡ Stock-Elf",
                Style::default()
                    .fg(theme::ACCENT_BLUE)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled("MARKET PULSE", theme::section_header())),
        ];

        let pulse = self.conductor.market_pulse();
        if pulse.is_empty() {
            lines.push(Line::from(Span::styled("No data", theme::muted())));
        }
        for item in pulse {
            lines.extend(display::pulse_lines(item, width));
        }

        lines.push(Line::default());
        lines.push(Line::from(Span::styled("QUICK ASK", theme::section_header())));
        for (i, kind) in QuickAskKind::ALL.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("F{} ", i + 1),
                    Style::default()
                        .fg(theme::ACCENT_BLUE)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(kind.label(), Style::default().fg(theme::SLATE_50)),
            ]));
        }

        lines.push(Line::default());
        lines.push(if self.conductor.speech_supported() {
            Line::from(vec![
                Span::styled(
                    "F5 ",
                    Style::default()
                        .fg(theme::ACCENT_BLUE)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("Voice input", Style::default().fg(theme::SLATE_50)),
            ])
        } else {
            Line::from(Span::styled("Voice input unavailable", theme::muted()))
        });

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_ticker_bar(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Ticker;
        let block = Block::bordered()
            .border_style(theme::border(focused))
            .style(Style::default().bg(theme::SLATE_800));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let session = self.conductor.session();
        let mut spans = vec![Span::styled(
            "STOCK: ",
            Style::default()
                .fg(theme::ACCENT_BLUE)
                .add_modifier(Modifier::BOLD),
        )];
        if session.ticker().is_empty() {
            if focused {
                spans.push(Span::styled("_", Style::default().fg(theme::ACCENT_BLUE)));
            }
            spans.push(Span::styled(TICKER_PLACEHOLDER, theme::muted()));
        } else {
            spans.push(Span::styled(
                session.ticker().to_string(),
                Style::default()
                    .fg(theme::SLATE_50)
                    .add_modifier(Modifier::BOLD),
            ));
            if focused {
                spans.push(Span::styled("_", Style::default().fg(theme::ACCENT_BLUE)));
            }
        }

        let [left, right] =
            Layout::horizontal([Constraint::Min(24), Constraint::Percentage(55)]).areas(inner);
        frame.render_widget(Paragraph::new(Line::from(spans)), left);
        frame.render_widget(
            Paragraph::new(Span::styled(session.status_text().to_string(), theme::muted()))
                .alignment(Alignment::Right),
            right,
        );
    }

    fn render_chat(&mut self, frame: &mut Frame, area: Rect) {
        let area = area.inner(Margin::new(1, 0));
        frame.render_stateful_widget(
            ChatLog::new(self.conductor.session().messages()),
            area,
            &mut self.chat,
        );
    }

    fn render_indicator(&self, frame: &mut Frame, area: Rect) {
        let line = if self.display.recording {
            Line::from(Span::styled(
                format!(" ● {LISTENING_TEXT}"),
                Style::default()
                    .fg(theme::RECORDING_RED)
                    .add_modifier(Modifier::BOLD),
            ))
        } else if self.display.is_analyzing() {
            Line::from(Span::styled(
                format!(" {}", ConductorState::AwaitingResponse.description()),
                Style::default()
                    .fg(theme::ACCENT_BLUE)
                    .add_modifier(Modifier::ITALIC),
            ))
        } else {
            Line::default()
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Question;
        let ticker = self.conductor.session().ticker();

        let voice = if self.conductor.speech_supported() {
            Span::styled(" F5 voice ", Style::default().fg(theme::ACCENT_BLUE))
        } else {
            Span::styled(" voice off ", theme::muted())
        };
        let title = if ticker.is_empty() {
            " Ask ".to_string()
        } else {
            format!(" Ask about {ticker} ")
        };
        let block = Block::bordered()
            .border_style(theme::border(focused))
            .title(Span::styled(title, theme::muted()))
            .title(Line::from(voice).alignment(Alignment::Right));
        let inner = block.inner(area);

        let draft = self.conductor.session().input_draft();
        let paragraph = if draft.is_empty() && !focused {
            Paragraph::new(Span::styled(INPUT_PLACEHOLDER, theme::muted()))
        } else {
            let text = if focused && !self.display.recording {
                format!("{draft}_")
            } else {
                draft.to_string()
            };

            // Keep the tail of long drafts visible
            let width = inner.width.max(1) as usize;
            let wrapped: Vec<Line> = textwrap::wrap(&text, width)
                .into_iter()
                .map(|cow| Line::from(cow.into_owned()))
                .collect();
            let skip = wrapped.len().saturating_sub(inner.height as usize);
            Paragraph::new(wrapped.into_iter().skip(skip).collect::<Vec<_>>())
                .style(Style::default().fg(theme::SLATE_50))
        };

        frame.render_widget(paragraph.block(block), area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.display.notice {
            Some(notice) => Line::from(Span::styled(
                format!(" {}", notice.message),
                theme::notice(notice.level),
            )),
            None => Line::from(Span::styled(format!(" {HELP_TEXT}"), theme::muted())),
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}
