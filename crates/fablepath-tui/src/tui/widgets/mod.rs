// TUI widget modules, one per screen zone.

pub mod choices;
pub mod prompt;
pub mod quit_confirm;
pub mod status_bar;
pub mod transcript;
