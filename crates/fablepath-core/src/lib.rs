// Library root: shared types for the story client crates (wire protocol,
// UI messages, segment parsing, configuration).

pub mod config;
pub mod protocol;
pub mod segment;
