//! The AskMyCar chat loop.
//!
//! One chat exchange runs as a bounded cycle:
//!
//! 1. **Ask** the provider for a completion (system prompt + conversation + tools)
//! 2. **If tool use**: announce each tool, run them in order, append results, go to 1
//! 3. **If natural end**: stream the answer and finish
//!
//! The cycle is capped at five rounds. Progress is streamed as
//! [`StreamEvent`]s through an [`EventEmitter`] that is closed exactly once.

pub mod emitter;
pub mod loop_runner;
pub mod prompt;
pub mod stream_event;

pub use emitter::{EVENT_BUFFER, EventEmitter};
pub use loop_runner::{ChatLoop, GENERIC_ERROR, LoopOutcome};
pub use prompt::system_prompt;
pub use stream_event::StreamEvent;
