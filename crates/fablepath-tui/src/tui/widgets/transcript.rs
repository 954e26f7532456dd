// Transcript widget: the story so far, one paragraph per segment.
//
// Follows the newest text unless the user has scrolled back.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::ViewState;

const PLACEHOLDER: &str = "Your story will appear here.";

/// Render the transcript panel into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let body = wrapped_body(state);
    let scroll = scroll_position(
        body.line_count(inner_width(area)),
        inner_height(area),
        state.scroll_back,
    );

    let paragraph = body
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(build_title(state.scroll_back > 0)),
        )
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

/// Rows the user can scroll back from the tail when rendered into `area`.
pub fn max_scroll_back(state: &ViewState, area: Rect) -> usize {
    wrapped_body(state)
        .line_count(inner_width(area))
        .saturating_sub(inner_height(area))
}

/// The transcript paragraph without its block. Row counts and rendering both
/// go through this so they wrap identically.
fn wrapped_body(state: &ViewState) -> Paragraph<'static> {
    let content = transcript_text(&state.transcript);
    let (text, style) = if content.is_empty() {
        (PLACEHOLDER.to_string(), Style::default().fg(Color::DarkGray))
    } else {
        (content, Style::default())
    };
    Paragraph::new(text)
        .style(style)
        .wrap(Wrap { trim: false })
}

fn inner_width(area: Rect) -> u16 {
    area.width.saturating_sub(2)
}

fn inner_height(area: Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

fn build_title(scrolled: bool) -> Line<'static> {
    let mut spans = vec![Span::styled(
        " Story ",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if scrolled {
        spans.push(Span::styled(
            "(scrolled back) ",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

/// Paragraphs separated by a blank line.
pub fn transcript_text(paragraphs: &[String]) -> String {
    paragraphs.join("\n\n")
}

/// Top row to scroll to, given `scroll_back` rows up from the bottom.
pub fn scroll_position(total_rows: usize, visible_rows: usize, scroll_back: usize) -> u16 {
    let max_scroll = total_rows.saturating_sub(visible_rows);
    let top = max_scroll - scroll_back.min(max_scroll);
    u16::try_from(top).unwrap_or(u16::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
