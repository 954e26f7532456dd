// Message types shared between the backend client, the app orchestrator,
// and the TUI.
//
// Two groups live here: the JSON bodies exchanged with the story backend,
// and the mpsc messages flowing between the app loop and the terminal view.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Story choices
// ---------------------------------------------------------------------------

/// A choice submitted to the backend on `/continue_story`.
///
/// `Finish` is never picked by the user directly; the client substitutes it
/// once the turn limit is reached so the backend writes an ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Choice {
    A,
    B,
    Finish,
}

impl Choice {
    /// The token sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::Finish => "FINISH",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Backend wire types
// ---------------------------------------------------------------------------

/// Body of `POST /start_story`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartStoryRequest {
    pub prompt: String,
}

/// Successful response from `POST /start_story`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartStoryResponse {
    pub session_id: String,
    pub story_segment: String,
    /// The backend always reports `false` for the opening segment, but the
    /// field is part of its shared response model.
    #[serde(default)]
    pub is_final: bool,
}

/// Body of `POST /continue_story`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueStoryRequest {
    pub session_id: String,
    pub choice: Choice,
}

/// Successful response from `POST /continue_story`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueStoryResponse {
    pub story_segment: String,
    #[serde(default)]
    pub is_final: bool,
    /// Echoed back by the backend; unused by the client.
    #[serde(default)]
    pub session_id: Option<String>,
}

// ---------------------------------------------------------------------------
// App <-> TUI messages
// ---------------------------------------------------------------------------

/// Updates pushed from the app orchestrator to the TUI.
///
/// Each variant maps onto one piece of the presentation surface: the status
/// line, the transcript, the two choice controls, and the prompt input.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// Replace the status line text.
    Status(String),
    /// Remove every paragraph from the transcript.
    ClearTranscript,
    /// Append one narrative paragraph to the transcript.
    AppendParagraph(String),
    /// Show both choice controls with the given display texts.
    ShowChoices { option_a: String, option_b: String },
    /// Hide both choice controls.
    HideChoices,
    /// Show the prompt input and start control.
    ShowPrompt,
    /// Hide the prompt input and start control.
    HidePrompt,
    /// Whether a backend request is currently in flight.
    Busy(bool),
}

/// Commands sent from the TUI to the app orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Begin a new story from the given prompt (trimmed by the client).
    StartStory(String),
    /// Continue the story with the picked option (`A` or `B`).
    Choose(Choice),
    /// Abort the in-flight backend request.
    Cancel,
    Quit,
}
