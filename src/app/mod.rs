pub mod cli;
pub mod commands;
pub mod console;
pub mod events;

pub use commands::{parse_command, InputCommand};
pub use console::ConsoleSink;
pub use events::AppEvent;
