//! Stream Processor and dialogue/system-prompt assembly for the agent
//! orchestration core (spec.md §4.4, §4.5).

pub mod dialogue;
pub mod error;
pub mod prompt;
pub mod stream_processor;

pub use dialogue::{flatten_message_text, rebuild_dialogue};
pub use error::{Error, Result};
pub use prompt::{assemble_system_prompt, PromptSections};
pub use stream_processor::{file_part, ProcessOutcome, StreamProcessor};
