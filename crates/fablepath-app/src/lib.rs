// Library root: story session state and the orchestration loop.

pub mod app;
pub mod client;

pub use client::{ApiEvent, StoryClient, StoryPhase, StorySession};
