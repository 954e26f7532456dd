// Screen layout: zone arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Transcript (fill)                                 |
// |                                                   |
// +-------------------------+------------------------+
// | Option A (50%)           | Option B (50%)         |  4 rows
// +-------------------------+------------------------+
// | Prompt input (3 rows)                             |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: status message and busy indicator.
    pub status_bar: Rect,
    /// The story so far.
    pub transcript: Rect,
    /// Both choice boxes; split by the choices widget.
    pub choices: Rect,
    /// Starting-idea input.
    pub prompt: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(3),    // transcript
            Constraint::Length(4), // choices
            Constraint::Length(3), // prompt
            Constraint::Length(1), // help bar
        ])
        .split(area);

    AppLayout {
        status_bar: vertical[0],
        transcript: vertical[1],
        choices: vertical[2],
        prompt: vertical[3],
        help_bar: vertical[4],
    }
}

/// Split the choices zone into the A and B boxes.
pub fn split_choices(area: Rect) -> (Rect, Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    (halves[0], halves[1])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
