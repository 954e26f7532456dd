// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app
// orchestrator, or into local ViewState mutations (prompt editing, scroll,
// quit confirmation).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use fablepath_core::protocol::{Choice, UserCommand};

use super::ViewState;

/// Lines moved by PageUp/PageDown.
const PAGE_SIZE: usize = 10;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key should be forwarded to the app
/// orchestrator, `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports Release events too.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately.
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    // Keys that work in every mode.
    match key_event.code {
        KeyCode::Esc if view_state.busy => return Some(UserCommand::Cancel),
        KeyCode::Up => {
            scroll_up(view_state, 1);
            return None;
        }
        KeyCode::Down => {
            scroll_down(view_state, 1);
            return None;
        }
        KeyCode::PageUp => {
            scroll_up(view_state, PAGE_SIZE);
            return None;
        }
        KeyCode::PageDown => {
            scroll_down(view_state, PAGE_SIZE);
            return None;
        }
        _ => {}
    }

    if view_state.prompt_visible {
        return handle_prompt_input(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Char('1')
            if view_state.choices.is_some() =>
        {
            Some(UserCommand::Choose(Choice::A))
        }
        KeyCode::Char('b') | KeyCode::Char('B') | KeyCode::Char('2')
            if view_state.choices.is_some() =>
        {
            Some(UserCommand::Choose(Choice::B))
        }
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }
        _ => None,
    }
}

/// Quit confirmation: `y`/`q` confirm, `n`/Esc cancel, everything else is blocked.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

/// Prompt editing while the input is visible.
///
/// Enter submits the text as typed; the client trims and validates it.
fn handle_prompt_input(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter => Some(UserCommand::StartStory(view_state.prompt_text.clone())),
        KeyCode::Esc => {
            view_state.prompt_text.clear();
            None
        }
        KeyCode::Backspace => {
            view_state.prompt_text.pop();
            None
        }
        KeyCode::Char(c)
            if !key_event
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            view_state.prompt_text.push(c);
            None
        }
        _ => None,
    }
}

fn scroll_up(view_state: &mut ViewState, lines: usize) {
    view_state.scroll_back = view_state
        .scroll_back
        .saturating_add(lines)
        .min(view_state.max_scroll_back);
}

fn scroll_down(view_state: &mut ViewState, lines: usize) {
    view_state.scroll_back = view_state.scroll_back.saturating_sub(lines);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
