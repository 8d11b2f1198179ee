//! Tools: the closed set of capabilities the assistant can call.
//!
//! The model only ever sees two tools, so dispatch is an enum rather than a
//! name-keyed registry: [`ToolKind`] names a tool and owns its schema,
//! [`ToolInvocation`] is a validated call with typed input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::message::ContentBlock;
use crate::provider::ToolDefinition;
use crate::vehicle::Vehicle;

/// Every tool the assistant knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Owner's manual lookup for the user's vehicle.
    FetchManual,
    /// Web search for recalls, TSBs, common issues and current info.
    WebSearch,
}

impl ToolKind {
    /// All tools, in the order they are declared to the model.
    pub const ALL: [ToolKind; 2] = [ToolKind::FetchManual, ToolKind::WebSearch];

    /// The wire name of this tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::FetchManual => "fetch_manual",
            ToolKind::WebSearch => "web_search",
        }
    }

    /// Resolve a wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// A description of what this tool does (sent to the LLM).
    pub fn description(self) -> &'static str {
        match self {
            ToolKind::FetchManual => {
                "Fetch the owner's manual for the user's vehicle to answer specific questions about their car. \
                 Use this for warning lights, maintenance schedules, specifications, features, and any question \
                 where the manual would have the answer."
            }
            ToolKind::WebSearch => {
                "Search the web for current information about this vehicle: recalls, technical service bulletins \
                 (TSBs), common issues, parts, pricing, or anything the manual wouldn't cover."
            }
        }
    }

    /// JSON Schema describing this tool's input.
    pub fn input_schema(self) -> serde_json::Value {
        match self {
            ToolKind::FetchManual => serde_json::json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "What topic or section to look up in the manual (e.g., \"oil change interval\", \"warning lights\", \"tire pressure\")"
                    }
                },
                "required": ["topic"]
            }),
            ToolKind::WebSearch => serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query. Always include the year, make, and model."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Definitions for every tool.
    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL.into_iter().map(Self::definition).collect()
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A tool request exactly as the model sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID (matches the model's `tool_use.id`)
    pub id: String,

    /// Requested tool name; not yet validated
    pub name: String,

    /// Raw input object
    pub input: serde_json::Value,
}

impl ToolCall {
    /// Extract a call from a `tool_use` block.
    pub fn from_block(block: &ContentBlock) -> Option<Self> {
        match block {
            ContentBlock::ToolUse { id, name, input } => Some(Self {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        }
    }

    /// Validate the call against the declared schema.
    pub fn parse(&self) -> Result<ToolInvocation, ToolError> {
        ToolInvocation::try_from(self)
    }
}

/// A validated tool call with typed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    FetchManual { topic: String },
    WebSearch { query: String },
}

impl ToolInvocation {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInvocation::FetchManual { .. } => ToolKind::FetchManual,
            ToolInvocation::WebSearch { .. } => ToolKind::WebSearch,
        }
    }
}

#[derive(Deserialize)]
struct FetchManualInput {
    topic: String,
}

#[derive(Deserialize)]
struct WebSearchInput {
    query: String,
}

impl TryFrom<&ToolCall> for ToolInvocation {
    type Error = ToolError;

    fn try_from(call: &ToolCall) -> Result<Self, Self::Error> {
        let kind = ToolKind::from_name(&call.name).ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        let invalid = |e: serde_json::Error| ToolError::InvalidArguments {
            tool: call.name.clone(),
            reason: e.to_string(),
        };

        match kind {
            ToolKind::FetchManual => {
                let input: FetchManualInput = serde_json::from_value(call.input.clone()).map_err(invalid)?;
                Ok(ToolInvocation::FetchManual { topic: input.topic })
            }
            ToolKind::WebSearch => {
                let input: WebSearchInput = serde_json::from_value(call.input.clone()).map_err(invalid)?;
                Ok(ToolInvocation::WebSearch { query: input.query })
            }
        }
    }
}

/// The text a tool produced for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result answers
    pub tool_use_id: String,

    /// Text handed back to the model
    pub content: String,
}

impl ToolResult {
    pub fn new(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
        }
    }
}

/// Runs validated tool invocations.
///
/// Implementations absorb every failure (missing credentials, timeouts, bad
/// upstream responses) and return fallback text instead, so execution is
/// infallible from the chat loop's point of view.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, vehicle: &Vehicle, invocation: &ToolInvocation) -> String;
}
