// Story session controller.
//
// `StoryClient` owns one linear story session: it validates the prompt,
// issues backend requests, parses each returned segment, and pushes
// `UiUpdate`s describing what the terminal view should show. Requests run in
// spawned tasks that report back as `ApiEvent`s over an mpsc channel; each
// event carries the generation of the request that produced it so results
// from a cancelled request are dropped.

use std::sync::Arc;

use fablepath_api::{ApiError, StoryBackend};
use fablepath_core::config::StoryConfig;
use fablepath_core::protocol::{Choice, ContinueStoryResponse, StartStoryResponse, UiUpdate};
use fablepath_core::segment::{parse_segment, ParsedSegment};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// ---------------------------------------------------------------------------
// Status messages
// ---------------------------------------------------------------------------

pub const EMPTY_PROMPT_MESSAGE: &str = "Please enter a starting idea!";
pub const GENERATING_MESSAGE: &str = "Generating first part...";
pub const STORY_SO_FAR_MESSAGE: &str = "Your story so far:";
pub const END_MESSAGE: &str = "🎉 THE END! Thank you for playing! 🎉";
pub const CANCELLED_MESSAGE: &str = "Request cancelled.";

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Where the story currently stands.
///
/// `Idle -> AwaitingFirstSegment -> (ChoicePresented <-> AwaitingNextSegment)*
/// -> Finished`. A new `start_story` restarts from any phase except while a
/// request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryPhase {
    Idle,
    AwaitingFirstSegment,
    ChoicePresented,
    AwaitingNextSegment,
    Finished,
}

/// Per-story state issued by the backend on start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySession {
    pub session_id: String,
    /// Choices submitted so far.
    pub turn: u32,
    /// Display texts of the most recently offered choices.
    pub presented: Option<(String, String)>,
}

impl StorySession {
    fn new(session_id: String) -> Self {
        StorySession {
            session_id,
            turn: 0,
            presented: None,
        }
    }
}

/// Completion of a backend request.
#[derive(Debug)]
pub enum ApiEvent {
    Started {
        generation: u64,
        result: Result<StartStoryResponse, ApiError>,
    },
    Continued {
        generation: u64,
        choice: Choice,
        result: Result<ContinueStoryResponse, ApiError>,
    },
}

impl ApiEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ApiEvent::Started { generation, .. } => *generation,
            ApiEvent::Continued { generation, .. } => *generation,
        }
    }
}

// ---------------------------------------------------------------------------
// StoryClient
// ---------------------------------------------------------------------------

pub struct StoryClient {
    backend: Arc<dyn StoryBackend>,
    max_turns: u32,
    session: Option<StorySession>,
    phase: StoryPhase,
    ui_tx: mpsc::Sender<UiUpdate>,
    /// Spawned request tasks report back through a clone of this sender.
    api_tx: mpsc::Sender<ApiEvent>,
    current_request: Option<JoinHandle<()>>,
    /// Incremented for every spawned request and on cancellation.
    generation: u64,
}

impl StoryClient {
    pub fn new(
        backend: Arc<dyn StoryBackend>,
        story: &StoryConfig,
        ui_tx: mpsc::Sender<UiUpdate>,
        api_tx: mpsc::Sender<ApiEvent>,
    ) -> Self {
        StoryClient {
            backend,
            max_turns: story.max_turns,
            session: None,
            phase: StoryPhase::Idle,
            ui_tx,
            api_tx,
            current_request: None,
            generation: 0,
        }
    }

    pub fn phase(&self) -> StoryPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&StorySession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    /// Choices submitted in the current story (0 when no session).
    pub fn turn_count(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.turn)
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Whether a backend request is in flight.
    pub fn is_busy(&self) -> bool {
        self.current_request.is_some()
    }

    /// Begin a new story from `prompt`.
    ///
    /// An empty (after trimming) prompt only reports a validation message.
    /// Otherwise the previous session and transcript are discarded and a
    /// start request is spawned; its outcome arrives as `ApiEvent::Started`.
    pub async fn start_story(&mut self, prompt: &str) {
        if self.is_busy() {
            warn!("start_story ignored: a request is already in flight");
            return;
        }

        let prompt = prompt.trim();
        if prompt.is_empty() {
            self.send(UiUpdate::Status(EMPTY_PROMPT_MESSAGE.to_string()))
                .await;
            return;
        }

        self.session = None;
        self.phase = StoryPhase::AwaitingFirstSegment;
        self.send(UiUpdate::ClearTranscript).await;
        self.send(UiUpdate::Status(GENERATING_MESSAGE.to_string()))
            .await;
        self.send(UiUpdate::HideChoices).await;

        let generation = self.next_generation();
        let backend = Arc::clone(&self.backend);
        let tx = self.api_tx.clone();
        let prompt = prompt.to_string();
        info!(generation, "Starting story ({} chars of prompt)", prompt.len());

        let handle = tokio::spawn(async move {
            let result = backend.start_story(&prompt).await;
            let _ = tx.send(ApiEvent::Started { generation, result }).await;
        });
        self.track_request(handle).await;
    }

    /// Continue the story with the option the user picked.
    ///
    /// No-op without an active session or when no choices are on offer.
    /// Once the turn counter reaches `max_turns`, `FINISH` is sent in place
    /// of the picked option.
    pub async fn continue_story(&mut self, choice: Choice) {
        if self.session.is_none() {
            debug!("continue_story ignored: no active session");
            return;
        }
        if self.is_busy() {
            warn!("continue_story ignored: a request is already in flight");
            return;
        }
        if self.phase != StoryPhase::ChoicePresented {
            debug!(phase = ?self.phase, "continue_story ignored: no choices presented");
            return;
        }

        let max_turns = self.max_turns;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.turn += 1;
        let turn = session.turn;
        let session_id = session.session_id.clone();

        let wire_choice = if turn >= max_turns {
            Choice::Finish
        } else {
            choice
        };

        self.phase = StoryPhase::AwaitingNextSegment;
        self.send(UiUpdate::Status(format!(
            "Processing turn {turn}/{max_turns}..."
        )))
        .await;
        self.send(UiUpdate::HideChoices).await;

        let generation = self.next_generation();
        let backend = Arc::clone(&self.backend);
        let tx = self.api_tx.clone();
        info!(
            generation,
            "Continuing story: turn {}/{}, picked {}, sending {}",
            turn, max_turns, choice, wire_choice
        );

        let handle = tokio::spawn(async move {
            let result = backend.continue_story(&session_id, wire_choice).await;
            let _ = tx
                .send(ApiEvent::Continued {
                    generation,
                    choice: wire_choice,
                    result,
                })
                .await;
        });
        self.track_request(handle).await;
    }

    /// Apply the outcome of a spawned request.
    ///
    /// Events whose generation does not match the latest request (left over
    /// from a cancelled task) are discarded.
    pub async fn handle_api_event(&mut self, event: ApiEvent) {
        if event.generation() != self.generation || self.current_request.is_none() {
            debug!(
                "Discarding stale API event (event gen: {}, current gen: {})",
                event.generation(),
                self.generation
            );
            return;
        }
        self.current_request = None;
        self.send(UiUpdate::Busy(false)).await;

        match event {
            ApiEvent::Started {
                result: Ok(resp), ..
            } => {
                info!(session_id = %resp.session_id, "Story session started");
                self.session = Some(StorySession::new(resp.session_id));
                // Hidden before rendering so an opening segment that already
                // ends the story can bring the prompt back.
                self.send(UiUpdate::HidePrompt).await;
                self.render_segment(&resp.story_segment, resp.is_final)
                    .await;
            }
            ApiEvent::Started { result: Err(e), .. } => {
                error!("Error starting story: {}", e);
                self.phase = StoryPhase::Idle;
                self.send(UiUpdate::Status(format!("Error starting story: {e}")))
                    .await;
            }
            ApiEvent::Continued {
                result: Ok(resp),
                choice,
                ..
            } => {
                debug!(%choice, is_final = resp.is_final, "Received next segment");
                self.render_segment(&resp.story_segment, resp.is_final)
                    .await;
            }
            ApiEvent::Continued {
                result: Err(e),
                choice,
                ..
            } => {
                // Session and phase are left as they are; choices stay hidden.
                error!(%choice, "Error continuing story: {}", e);
                self.send(UiUpdate::Status(format!(
                    "Error continuing story: {e}"
                )))
                .await;
            }
        }
    }

    /// Parse `segment`, append its narrative to the transcript, and either
    /// offer the two choices or end the story.
    ///
    /// The story ends when `is_final` is set or the segment has no options.
    /// Parsing always runs first, so a final segment that still contains
    /// options shows only its narrative.
    pub async fn render_segment(&mut self, segment: &str, is_final: bool) -> ParsedSegment {
        self.send(UiUpdate::Status(STORY_SO_FAR_MESSAGE.to_string()))
            .await;

        let parsed = parse_segment(segment);
        self.send(UiUpdate::AppendParagraph(parsed.narrative().to_string()))
            .await;

        match parsed.choice_texts() {
            Some((option_a, option_b)) if !is_final => {
                if let Some(session) = self.session.as_mut() {
                    session.presented = Some((option_a.clone(), option_b.clone()));
                }
                self.phase = StoryPhase::ChoicePresented;
                self.send(UiUpdate::ShowChoices { option_a, option_b })
                    .await;
            }
            _ => {
                if !is_final {
                    warn!("Segment has no A./B. options; treating the story as finished");
                }
                self.finish().await;
            }
        }

        parsed
    }

    /// Abort the in-flight request, if any.
    ///
    /// A cancelled start returns to `Idle`. A cancelled continue takes back
    /// the turn it consumed and offers the previous choices again.
    pub async fn cancel_request(&mut self) {
        let Some(handle) = self.current_request.take() else {
            debug!("cancel_request ignored: nothing in flight");
            return;
        };
        handle.abort();
        self.generation += 1;
        info!(phase = ?self.phase, "Cancelled in-flight request");

        self.send(UiUpdate::Busy(false)).await;
        self.send(UiUpdate::Status(CANCELLED_MESSAGE.to_string()))
            .await;

        match self.phase {
            StoryPhase::AwaitingFirstSegment => {
                self.phase = StoryPhase::Idle;
            }
            StoryPhase::AwaitingNextSegment => {
                let presented = self.session.as_mut().and_then(|s| {
                    s.turn = s.turn.saturating_sub(1);
                    s.presented.clone()
                });
                if let Some((option_a, option_b)) = presented {
                    self.phase = StoryPhase::ChoicePresented;
                    self.send(UiUpdate::ShowChoices { option_a, option_b })
                        .await;
                }
            }
            _ => {}
        }
    }

    /// Abort any in-flight request without touching the UI. Used on exit.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.current_request.take() {
            handle.abort();
            info!("Aborted in-flight request on shutdown");
        }
    }

    // -- helpers --

    async fn finish(&mut self) {
        self.phase = StoryPhase::Finished;
        self.send(UiUpdate::Status(END_MESSAGE.to_string())).await;
        self.send(UiUpdate::HideChoices).await;
        self.send(UiUpdate::ShowPrompt).await;
        info!(turns = self.turn_count(), "Story finished");
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    async fn track_request(&mut self, handle: JoinHandle<()>) {
        self.current_request = Some(handle);
        self.send(UiUpdate::Busy(true)).await;
    }

    async fn send(&self, update: UiUpdate) {
        if self.ui_tx.send(update).await.is_err() {
            debug!("UI channel closed, dropping update");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test helpers
    // -----------------------------------------------------------------------

    enum Reply<T> {
        Ready(Result<T, ApiError>),
        /// Never resolves; used to exercise cancellation.
        Hang,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start(String),
        Continue { session_id: String, choice: Choice },
    }

    /// Backend that replays queued replies and records every call.
    #[derive(Default)]
    struct ScriptedBackend {
        starts: Mutex<VecDeque<Reply<StartStoryResponse>>>,
        continues: Mutex<VecDeque<Reply<ContinueStoryResponse>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedBackend {
        fn push_start(&self, reply: Reply<StartStoryResponse>) {
            self.starts.lock().unwrap().push_back(reply);
        }

        fn push_continue(&self, reply: Reply<ContinueStoryResponse>) {
            self.continues.lock().unwrap().push_back(reply);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn unscripted() -> ApiError {
        ApiError::Status {
            status: 599,
            detail: Some("no scripted reply".to_string()),
        }
    }

    async fn resolve<T>(reply: Option<Reply<T>>) -> Result<T, ApiError> {
        match reply {
            Some(Reply::Ready(result)) => result,
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(unscripted()),
        }
    }

    #[async_trait]
    impl StoryBackend for ScriptedBackend {
        async fn start_story(&self, prompt: &str) -> Result<StartStoryResponse, ApiError> {
            self.calls.lock().unwrap().push(Call::Start(prompt.to_string()));
            let reply = self.starts.lock().unwrap().pop_front();
            resolve(reply).await
        }

        async fn continue_story(
            &self,
            session_id: &str,
            choice: Choice,
        ) -> Result<ContinueStoryResponse, ApiError> {
            self.calls.lock().unwrap().push(Call::Continue {
                session_id: session_id.to_string(),
                choice,
            });
            let reply = self.continues.lock().unwrap().pop_front();
            resolve(reply).await
        }
    }

    fn started(session_id: &str, segment: &str) -> Reply<StartStoryResponse> {
        Reply::Ready(Ok(StartStoryResponse {
            session_id: session_id.to_string(),
            story_segment: segment.to_string(),
            is_final: false,
        }))
    }

    fn continued(segment: &str, is_final: bool) -> Reply<ContinueStoryResponse> {
        Reply::Ready(Ok(ContinueStoryResponse {
            story_segment: segment.to_string(),
            is_final,
            session_id: None,
        }))
    }

    const WITH_CHOICES: &str = "Narrative text. A. Go left B. Go right";

    struct Harness {
        backend: Arc<ScriptedBackend>,
        client: StoryClient,
        ui_rx: mpsc::Receiver<UiUpdate>,
        api_rx: mpsc::Receiver<ApiEvent>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_max_turns(3)
        }

        fn with_max_turns(max_turns: u32) -> Self {
            let backend = Arc::new(ScriptedBackend::default());
            let (ui_tx, ui_rx) = mpsc::channel(256);
            let (api_tx, api_rx) = mpsc::channel(16);
            let client = StoryClient::new(
                backend.clone(),
                &StoryConfig { max_turns },
                ui_tx,
                api_tx,
            );
            Harness {
                backend,
                client,
                ui_rx,
                api_rx,
            }
        }

        /// Wait for the next request to complete and apply it.
        async fn settle(&mut self) {
            let event = self.api_rx.recv().await.expect("request should report back");
            self.client.handle_api_event(event).await;
        }

        fn drain_ui(&mut self) -> Vec<UiUpdate> {
            let mut updates = Vec::new();
            while let Ok(update) = self.ui_rx.try_recv() {
                updates.push(update);
            }
            updates
        }

        /// Start a story whose first segment offers choices.
        async fn start_with_choices(&mut self) {
            self.backend.push_start(started("sess-1", WITH_CHOICES));
            self.client.start_story("a lost kite").await;
            self.settle().await;
            self.drain_ui();
        }
    }

    fn last_status(updates: &[UiUpdate]) -> Option<&str> {
        updates.iter().rev().find_map(|u| match u {
            UiUpdate::Status(s) => Some(s.as_str()),
            _ => None,
        })
    }

    // -----------------------------------------------------------------------
    // start_story
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn start_story_success_sets_session_and_shows_choices() {
        let mut h = Harness::new();
        h.backend.push_start(started("sess-1", WITH_CHOICES));

        h.client.start_story("  a lost kite  ").await;
        assert_eq!(h.client.phase(), StoryPhase::AwaitingFirstSegment);
        assert!(h.client.is_busy());
        h.settle().await;

        assert_eq!(h.backend.calls(), vec![Call::Start("a lost kite".to_string())]);
        assert_eq!(h.client.session_id(), Some("sess-1"));
        assert_eq!(h.client.turn_count(), 0);
        assert_eq!(h.client.phase(), StoryPhase::ChoicePresented);
        assert!(!h.client.is_busy());

        let updates = h.drain_ui();
        assert_eq!(
            updates,
            vec![
                UiUpdate::ClearTranscript,
                UiUpdate::Status(GENERATING_MESSAGE.to_string()),
                UiUpdate::HideChoices,
                UiUpdate::Busy(true),
                UiUpdate::Busy(false),
                UiUpdate::HidePrompt,
                UiUpdate::Status(STORY_SO_FAR_MESSAGE.to_string()),
                UiUpdate::AppendParagraph("Narrative text.".to_string()),
                UiUpdate::ShowChoices {
                    option_a: "Go left".to_string(),
                    option_b: "Go right".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn empty_prompt_reports_and_sends_nothing() {
        let mut h = Harness::new();
        for prompt in ["", "   ", "\n\t"] {
            h.client.start_story(prompt).await;
            assert_eq!(
                h.drain_ui(),
                vec![UiUpdate::Status(EMPTY_PROMPT_MESSAGE.to_string())]
            );
        }
        assert!(h.backend.calls().is_empty());
        assert!(!h.client.is_busy());
        assert_eq!(h.client.phase(), StoryPhase::Idle);
    }

    #[tokio::test]
    async fn start_failure_reports_error_and_leaves_session_unset() {
        let mut h = Harness::new();
        h.backend.push_start(Reply::Ready(Err(ApiError::Status {
            status: 500,
            detail: None,
        })));

        h.client.start_story("a dragon").await;
        h.settle().await;

        assert!(h.client.session().is_none());
        assert_eq!(h.client.phase(), StoryPhase::Idle);
        let updates = h.drain_ui();
        assert_eq!(
            last_status(&updates),
            Some("Error starting story: HTTP error! status: 500")
        );
        assert!(!updates.contains(&UiUpdate::HidePrompt));
    }

    #[tokio::test]
    async fn restart_discards_previous_session() {
        let mut h = Harness::new();
        h.start_with_choices().await;
        assert_eq!(h.client.session_id(), Some("sess-1"));

        h.backend.push_start(Reply::Ready(Err(ApiError::Timeout)));
        h.client.start_story("another idea").await;
        h.settle().await;

        assert!(h.client.session().is_none());
        assert_eq!(h.client.turn_count(), 0);
    }

    #[tokio::test]
    async fn start_while_busy_is_ignored() {
        let mut h = Harness::new();
        h.backend.push_start(Reply::Hang);
        h.client.start_story("first").await;
        h.drain_ui();

        h.client.start_story("second").await;

        assert!(h.drain_ui().is_empty());
        assert_eq!(h.client.phase(), StoryPhase::AwaitingFirstSegment);
        tokio::task::yield_now().await;
        assert!(!h.backend.calls().contains(&Call::Start("second".to_string())));
    }

    #[tokio::test]
    async fn opening_segment_without_options_finishes_and_restores_prompt() {
        let mut h = Harness::new();
        h.backend.push_start(started("sess-1", "A very short tale."));

        h.client.start_story("tiny").await;
        h.settle().await;

        assert_eq!(h.client.phase(), StoryPhase::Finished);
        let updates = h.drain_ui();
        let hide = updates.iter().position(|u| *u == UiUpdate::HidePrompt);
        let show = updates.iter().position(|u| *u == UiUpdate::ShowPrompt);
        assert!(hide.is_some() && show.is_some());
        assert!(hide < show, "prompt must end up visible: {updates:?}");
    }

    // -----------------------------------------------------------------------
    // continue_story
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn continue_before_start_is_noop() {
        let mut h = Harness::new();
        h.client.continue_story(Choice::A).await;

        assert!(h.backend.calls().is_empty());
        assert!(h.drain_ui().is_empty());
        assert_eq!(h.client.turn_count(), 0);
        assert_eq!(h.client.phase(), StoryPhase::Idle);
        assert!(h.client.session().is_none());
    }

    #[tokio::test]
    async fn continue_sends_picked_choice_and_updates_status() {
        let mut h = Harness::new();
        h.start_with_choices().await;
        h.backend.push_continue(continued(
            "You went left. A. Climb B. Dig",
            false,
        ));

        h.client.continue_story(Choice::A).await;
        let updates = h.drain_ui();
        assert_eq!(
            updates[..2],
            [
                UiUpdate::Status("Processing turn 1/3...".to_string()),
                UiUpdate::HideChoices,
            ]
        );
        h.settle().await;

        assert_eq!(
            h.backend.calls()[1],
            Call::Continue {
                session_id: "sess-1".to_string(),
                choice: Choice::A,
            }
        );
        assert_eq!(h.client.turn_count(), 1);
        assert_eq!(h.client.phase(), StoryPhase::ChoicePresented);
        assert_eq!(
            h.client.session().unwrap().presented,
            Some(("Climb".to_string(), "Dig".to_string()))
        );
    }

    #[tokio::test]
    async fn third_choice_is_overridden_to_finish() {
        for picks in [
            [Choice::A, Choice::A, Choice::A],
            [Choice::B, Choice::A, Choice::B],
            [Choice::B, Choice::B, Choice::B],
        ] {
            let mut h = Harness::new();
            h.start_with_choices().await;
            h.backend.push_continue(continued("One. A. x B. y", false));
            h.backend.push_continue(continued("Two. A. x B. y", false));
            h.backend.push_continue(continued("The happy end.", true));

            for pick in picks {
                h.client.continue_story(pick).await;
                h.settle().await;
            }

            assert_eq!(h.client.turn_count(), 3);
            let sent: Vec<Choice> = h
                .backend
                .calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Continue { choice, .. } => Some(choice),
                    Call::Start(_) => None,
                })
                .collect();
            assert_eq!(sent, vec![picks[0], picks[1], Choice::Finish]);
            assert_eq!(h.client.phase(), StoryPhase::Finished);
        }
    }

    #[tokio::test]
    async fn max_turns_of_one_finishes_on_first_choice() {
        let mut h = Harness::with_max_turns(1);
        h.start_with_choices().await;
        h.backend.push_continue(continued("Done.", true));

        h.client.continue_story(Choice::B).await;
        h.settle().await;

        assert_eq!(
            h.backend.calls()[1],
            Call::Continue {
                session_id: "sess-1".to_string(),
                choice: Choice::Finish,
            }
        );
    }

    #[tokio::test]
    async fn continue_failure_keeps_session_and_hides_choices() {
        let mut h = Harness::new();
        h.start_with_choices().await;
        h.backend.push_continue(Reply::Ready(Err(ApiError::Status {
            status: 404,
            detail: Some("Story session not found".to_string()),
        })));

        h.client.continue_story(Choice::B).await;
        h.settle().await;

        assert_eq!(h.client.session_id(), Some("sess-1"));
        assert_eq!(h.client.turn_count(), 1);
        assert_eq!(h.client.phase(), StoryPhase::AwaitingNextSegment);
        let updates = h.drain_ui();
        assert_eq!(
            last_status(&updates),
            Some("Error continuing story: HTTP error! status: 404 (Story session not found)")
        );
        assert!(!updates
            .iter()
            .any(|u| matches!(u, UiUpdate::ShowChoices { .. })));

        // Stalled: no further choice is accepted.
        h.client.continue_story(Choice::A).await;
        assert_eq!(h.backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn continue_after_finish_is_ignored() {
        let mut h = Harness::new();
        h.start_with_choices().await;
        h.backend.push_continue(continued("The end.", true));
        h.client.continue_story(Choice::A).await;
        h.settle().await;
        assert_eq!(h.client.phase(), StoryPhase::Finished);

        h.client.continue_story(Choice::A).await;
        assert_eq!(h.backend.calls().len(), 2);
        assert_eq!(h.client.turn_count(), 1);
    }

    // -----------------------------------------------------------------------
    // render_segment
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn segment_without_options_finishes_even_when_not_final() {
        let mut h = Harness::new();
        h.start_with_choices().await;

        let parsed = h.client.render_segment("The story ends here.", false).await;

        assert!(!parsed.has_choices());
        assert_eq!(h.client.phase(), StoryPhase::Finished);
        assert_eq!(
            h.drain_ui(),
            vec![
                UiUpdate::Status(STORY_SO_FAR_MESSAGE.to_string()),
                UiUpdate::AppendParagraph("The story ends here.".to_string()),
                UiUpdate::Status(END_MESSAGE.to_string()),
                UiUpdate::HideChoices,
                UiUpdate::ShowPrompt,
            ]
        );
    }

    #[tokio::test]
    async fn final_segment_with_options_strips_them_and_shows_no_choices() {
        let mut h = Harness::new();
        h.start_with_choices().await;

        let parsed = h.client.render_segment(WITH_CHOICES, true).await;

        assert!(parsed.has_choices());
        let updates = h.drain_ui();
        assert!(updates.contains(&UiUpdate::AppendParagraph("Narrative text.".to_string())));
        assert!(!updates
            .iter()
            .any(|u| matches!(u, UiUpdate::ShowChoices { .. })));
        assert_eq!(last_status(&updates), Some(END_MESSAGE));
        assert_eq!(h.client.phase(), StoryPhase::Finished);
    }

    #[tokio::test]
    async fn paragraphs_accumulate_until_restart() {
        let mut h = Harness::new();
        h.start_with_choices().await;
        h.backend.push_continue(continued("Second part. A. x B. y", false));
        h.client.continue_story(Choice::A).await;
        h.settle().await;

        let updates = h.drain_ui();
        assert!(!updates.contains(&UiUpdate::ClearTranscript));
        assert!(updates.contains(&UiUpdate::AppendParagraph("Second part.".to_string())));

        h.backend.push_start(started("sess-2", WITH_CHOICES));
        h.client.start_story("new").await;
        assert_eq!(h.drain_ui()[0], UiUpdate::ClearTranscript);
    }

    // -----------------------------------------------------------------------
    // cancel_request / stale events
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cancel_start_returns_to_idle() {
        let mut h = Harness::new();
        h.backend.push_start(Reply::Hang);
        h.client.start_story("slow").await;
        h.drain_ui();

        h.client.cancel_request().await;

        assert!(!h.client.is_busy());
        assert_eq!(h.client.phase(), StoryPhase::Idle);
        assert_eq!(
            h.drain_ui(),
            vec![
                UiUpdate::Busy(false),
                UiUpdate::Status(CANCELLED_MESSAGE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn cancel_continue_restores_previous_choices_and_turn() {
        let mut h = Harness::new();
        h.start_with_choices().await;
        h.backend.push_continue(Reply::Hang);
        h.client.continue_story(Choice::A).await;
        assert_eq!(h.client.turn_count(), 1);
        h.drain_ui();

        h.client.cancel_request().await;

        assert_eq!(h.client.turn_count(), 0);
        assert_eq!(h.client.phase(), StoryPhase::ChoicePresented);
        assert!(h.drain_ui().contains(&UiUpdate::ShowChoices {
            option_a: "Go left".to_string(),
            option_b: "Go right".to_string(),
        }));
    }

    #[tokio::test]
    async fn cancel_without_request_is_noop() {
        let mut h = Harness::new();
        h.client.cancel_request().await;
        assert!(h.drain_ui().is_empty());
    }

    #[tokio::test]
    async fn stale_event_after_cancel_is_discarded() {
        let mut h = Harness::new();
        h.start_with_choices().await;
        h.backend.push_continue(Reply::Hang);
        h.client.continue_story(Choice::A).await;
        let stale_generation = h.client.generation;
        h.client.cancel_request().await;
        h.drain_ui();

        h.client
            .handle_api_event(ApiEvent::Continued {
                generation: stale_generation,
                choice: Choice::A,
                result: Ok(ContinueStoryResponse {
                    story_segment: "Late arrival.".to_string(),
                    is_final: true,
                    session_id: None,
                }),
            })
            .await;

        assert!(h.drain_ui().is_empty());
        assert_eq!(h.client.phase(), StoryPhase::ChoicePresented);
    }

    #[tokio::test]
    async fn shutdown_aborts_in_flight_request() {
        let mut h = Harness::new();
        h.backend.push_start(Reply::Hang);
        h.client.start_story("slow").await;
        assert!(h.client.is_busy());

        h.client.shutdown();
        assert!(!h.client.is_busy());
    }
}
