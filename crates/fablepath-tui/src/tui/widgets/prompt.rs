// Prompt widget: single-line input for the starting idea.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::ViewState;

/// Render the prompt input, or a dimmed placeholder while it is hidden.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    if !state.prompt_visible {
        let paragraph = Paragraph::new("Story in progress...")
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(" Starting idea "),
            );
        frame.render_widget(paragraph, area);
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    // Keep one column free for the cursor.
    let shown = visible_tail(&state.prompt_text, inner_width.saturating_sub(1));

    let paragraph = Paragraph::new(shown.to_string()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(Span::styled(
                " Starting idea ",
                Style::default().add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(paragraph, area);

    if !state.busy && !state.confirm_quit && area.width > 2 && area.height > 2 {
        let cursor_x = area.x + 1 + shown.chars().count() as u16;
        frame.set_cursor_position((cursor_x, area.y + 1));
    }
}

/// The last `width` characters of `text`.
pub fn visible_tail(text: &str, width: usize) -> &str {
    let len = text.chars().count();
    if len <= width {
        return text;
    }
    let skip = len - width;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
