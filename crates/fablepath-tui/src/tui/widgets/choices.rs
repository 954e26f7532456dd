// Choice widget: the two options offered after each segment.
//
// Both boxes are always drawn so the layout stays put; they are dimmed and
// empty while no choice is on offer.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::layout::split_choices;
use crate::tui::ViewState;

/// Render both choice boxes into the choices zone.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (area_a, area_b) = split_choices(area);
    let (text_a, text_b) = match &state.choices {
        Some((a, b)) => (a.as_str(), b.as_str()),
        None => ("", ""),
    };
    let active = state.choices.is_some();

    render_option(frame, area_a, "A", text_a, active);
    render_option(frame, area_b, "B", text_b, active);
}

fn render_option(frame: &mut Frame, area: Rect, label: &str, text: &str, active: bool) {
    let paragraph = Paragraph::new(text.to_string())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(active))
                .title(Span::styled(format!(" [{label}] "), title_style(active))),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn title_style(active: bool) -> Style {
    if active {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
