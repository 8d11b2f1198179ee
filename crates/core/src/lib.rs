//! # AskMyCar Core
//!
//! Domain types, traits, and error definitions for the AskMyCar assistant.
//! This crate has **no framework dependencies**; it defines the model the
//! provider, tool, agent and gateway crates implement against.
//!
//! ## Seams
//!
//! - [`Provider`]: one language-model completion per call
//! - [`ToolExecutor`]: runs a parsed [`ToolInvocation`] and always yields text
//!
//! The chat loop holds both as `Arc<dyn _>`.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod vehicle;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, ToolError};
pub use message::{ContentBlock, Conversation, Message, MessageContent, Role};
pub use provider::{Completion, CompletionRequest, Provider, StopReason, ToolDefinition, Usage};
pub use tool::{ToolCall, ToolExecutor, ToolInvocation, ToolKind, ToolResult};
pub use vehicle::Vehicle;
