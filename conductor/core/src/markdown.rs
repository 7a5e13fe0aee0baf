//! Markdown Line Renderer
//!
//! Converts answer text into structured display nodes, one node per line.
//! Only a small subset is recognised: `##`/`###` headings, `- ` list items,
//! `**bold**` runs, plain paragraphs, and blank lines. There is no nesting,
//! no links or images, and no escaping.
//!
//! Each line is classified independently by an ordered rule table; the first
//! matching predicate wins.

/// Bold marker
const BOLD: &str = "**";

/// A run of paragraph text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextRun {
    /// The text
    pub text: String,
    /// Whether the run is emphasized (bold)
    pub emphasized: bool,
}

impl TextRun {
    /// Plain run
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: false,
        }
    }

    /// Emphasized run
    pub fn strong(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emphasized: true,
        }
    }
}

/// One rendered line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkdownLine {
    /// `##` or `###` heading
    Heading {
        /// 2 or 3
        level: u8,
        /// Heading text, marker and surrounding whitespace removed
        text: String,
    },
    /// `- ` list item
    ListItem(String),
    /// Paragraph made of plain and emphasized runs
    Paragraph(Vec<TextRun>),
    /// Blank line, kept for vertical spacing
    LineBreak,
}

impl MarkdownLine {
    /// Concatenated text without styling
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Heading { text, .. } | Self::ListItem(text) => text.clone(),
            Self::Paragraph(runs) => runs.iter().map(|r| r.text.as_str()).collect(),
            Self::LineBreak => String::new(),
        }
    }
}

type Predicate = fn(&str) -> bool;
type Constructor = fn(&str) -> MarkdownLine;

/// Rules in priority order. The last rule matches everything.
const RULES: &[(Predicate, Constructor)] = &[
    (is_heading3, heading3),
    (is_heading2, heading2),
    (is_list_item, list_item),
    (has_bold, bold_paragraph),
    (is_non_empty, paragraph),
    (always, line_break),
];

fn is_heading3(line: &str) -> bool {
    line.starts_with("###")
}

fn is_heading2(line: &str) -> bool {
    line.starts_with("##")
}

fn is_list_item(line: &str) -> bool {
    line.starts_with("- ")
}

fn has_bold(line: &str) -> bool {
    line.contains(BOLD)
}

fn is_non_empty(line: &str) -> bool {
    !line.is_empty()
}

fn always(_: &str) -> bool {
    true
}

fn heading3(line: &str) -> MarkdownLine {
    heading(line, "###", 3)
}

fn heading2(line: &str) -> MarkdownLine {
    heading(line, "##", 2)
}

fn heading(line: &str, marker: &str, level: u8) -> MarkdownLine {
    MarkdownLine::Heading {
        level,
        text: line[marker.len()..].trim().to_string(),
    }
}

fn list_item(line: &str) -> MarkdownLine {
    MarkdownLine::ListItem(line["- ".len()..].trim().to_string())
}

fn bold_paragraph(line: &str) -> MarkdownLine {
    // Odd segments sit between an opening and a closing marker
    let runs = line
        .split(BOLD)
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| TextRun {
            text: part.to_string(),
            emphasized: i % 2 == 1,
        })
        .collect();
    MarkdownLine::Paragraph(runs)
}

fn paragraph(line: &str) -> MarkdownLine {
    MarkdownLine::Paragraph(vec![TextRun::plain(line)])
}

fn line_break(_: &str) -> MarkdownLine {
    MarkdownLine::LineBreak
}

/// Render a single line
#[must_use]
pub fn render_line(line: &str) -> MarkdownLine {
    RULES
        .iter()
        .find(|(applies, _)| applies(line))
        .map_or(MarkdownLine::LineBreak, |(_, build)| build(line))
}

/// Render a whole message, one node per `\n`-separated line
#[must_use]
pub fn render(content: &str) -> Vec<MarkdownLine> {
    content.split('\n').map(render_line).collect()
}
