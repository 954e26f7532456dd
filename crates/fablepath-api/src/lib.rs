// Library root: the story backend client.

pub mod client;

pub use client::{ApiError, HttpStoryBackend, StoryBackend};
