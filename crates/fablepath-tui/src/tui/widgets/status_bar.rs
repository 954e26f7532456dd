// Status bar widget: busy indicator and the current status message.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [activity indicator] [status message]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (dot, dot_color) = activity_indicator(state.busy);
    let spans = vec![
        Span::styled(format!(" {dot} "), Style::default().fg(dot_color)),
        Span::styled(
            state.status.clone(),
            Style::default()
                .fg(status_color(&state.status))
                .add_modifier(Modifier::BOLD),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Dot character and color for the request state.
pub fn activity_indicator(busy: bool) -> (&'static str, Color) {
    if busy {
        ("●", Color::Yellow)
    } else {
        ("●", Color::Green)
    }
}

/// Errors in red, everything else white.
pub fn status_color(status: &str) -> Color {
    if status.starts_with("Error") {
        Color::Red
    } else {
        Color::White
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
