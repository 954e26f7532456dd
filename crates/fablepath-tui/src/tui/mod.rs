// Terminal UI: view state, layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` mirroring what the story client wants shown.
// The app orchestrator pushes `UiUpdate` messages over an mpsc channel; the
// TUI applies them to `ViewState` and re-renders at ~30 fps. Key presses are
// translated into `UserCommand`s sent back to the app.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use fablepath_core::protocol::{UiUpdate, UserCommand};
use futures_util::StreamExt;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use layout::{build_layout, AppLayout};

/// Status line shown before the first story starts.
pub const WELCOME_MESSAGE: &str = "Type a starting idea and press Enter to begin.";

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state rendered by `render_frame`.
///
/// Updated incrementally via `UiUpdate` messages and local key handling.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Status line text.
    pub status: String,
    /// Narrative paragraphs of the current story, oldest first.
    pub transcript: Vec<String>,
    /// Display texts of the two offered choices, when visible.
    pub choices: Option<(String, String)>,
    /// Whether the prompt input is shown and accepting text.
    pub prompt_visible: bool,
    /// Current contents of the prompt input.
    pub prompt_text: String,
    /// A backend request is in flight.
    pub busy: bool,
    /// Transcript lines scrolled back from the newest text. 0 follows the tail.
    pub scroll_back: usize,
    /// Upper bound for `scroll_back` at the last rendered terminal size.
    pub max_scroll_back: usize,
    /// The quit confirmation dialog is open.
    pub confirm_quit: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            status: WELCOME_MESSAGE.to_string(),
            transcript: Vec::new(),
            choices: None,
            prompt_visible: true,
            prompt_text: String::new(),
            busy: false,
            scroll_back: 0,
            max_scroll_back: 0,
            confirm_quit: false,
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Status(text) => {
            state.status = text;
        }
        UiUpdate::ClearTranscript => {
            state.transcript.clear();
            state.scroll_back = 0;
        }
        UiUpdate::AppendParagraph(paragraph) => {
            state.transcript.push(paragraph);
            // Jump back to the newest text.
            state.scroll_back = 0;
        }
        UiUpdate::ShowChoices { option_a, option_b } => {
            state.choices = Some((option_a, option_b));
        }
        UiUpdate::HideChoices => {
            state.choices = None;
        }
        UiUpdate::ShowPrompt => {
            state.prompt_visible = true;
        }
        UiUpdate::HidePrompt => {
            state.prompt_visible = false;
        }
        UiUpdate::Busy(busy) => {
            state.busy = busy;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete screen.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::transcript::render(frame, layout.transcript, state);
    widgets::choices::render(frame, layout.choices, state);
    widgets::prompt::render(frame, layout.prompt, state);
    render_help_bar(frame, &layout, state);

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

/// Recompute how far the transcript can scroll back in `area` and clamp the
/// current offset to it.
pub fn sync_scroll_limit(state: &mut ViewState, area: Rect) {
    let transcript_area = build_layout(area).transcript;
    state.max_scroll_back = widgets::transcript::max_scroll_back(state, transcript_area);
    state.scroll_back = state.scroll_back.min(state.max_scroll_back);
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(state),
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

/// Key hints for the current mode.
pub fn help_text(state: &ViewState) -> &'static str {
    if state.busy {
        " Esc:Cancel request | Up/Down:Scroll | Ctrl+C:Quit"
    } else if state.prompt_visible {
        " Enter:Start story | Esc:Clear | Up/Down:Scroll | Ctrl+C:Quit"
    } else if state.choices.is_some() {
        " a/1:Option A | b/2:Option B | Up/Down:Scroll | q:Quit"
    } else {
        " Up/Down:Scroll | q:Quit"
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// Initializes the terminal, installs a panic hook that restores it, then
/// selects over UI updates, keyboard input, and a render tick until the user
/// quits or the app closes the update channel.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    None => {
                        debug!("UI update channel closed");
                        break Ok(());
                    }
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {
                        // Resize is picked up by the next render tick.
                    }
                    Some(Err(e)) => {
                        warn!("Terminal input error: {}", e);
                        break Err(e.into());
                    }
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                let drawn = terminal.draw(|frame| {
                    sync_scroll_limit(&mut view_state, frame.area());
                    render_frame(frame, &view_state);
                });
                if let Err(e) = drawn {
                    break Err(e.into());
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
