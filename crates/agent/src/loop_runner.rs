//! The chat loop: a bounded cycle of completion rounds and tool calls.
//!
//! Each round asks the provider for one completion. A natural end streams
//! the answer and finishes; a tool request runs every requested tool in
//! order, appends the assistant turn plus one user turn of results, and
//! goes round again. Running out of rounds finishes with a truncated `done`.

use std::sync::Arc;

use askmycar_config::{AppConfig, MAX_ROUNDS_LIMIT};
use askmycar_core::{
    Conversation, CompletionRequest, Message, Provider, StopReason, ToolCall, ToolExecutor, ToolKind, ToolResult,
    Vehicle,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::emitter::{EVENT_BUFFER, EventEmitter};
use crate::prompt;
use crate::stream_event::StreamEvent;

/// Shown to the user whenever an exchange fails.
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model finished its answer.
    Completed,
    /// Every round was spent on tool calls.
    Truncated,
    /// The model stopped for another reason (e.g. `max_tokens`).
    Stopped(StopReason),
    /// The provider failed.
    Failed,
    /// The client went away.
    Cancelled,
}

impl std::fmt::Display for LoopOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopOutcome::Completed => f.write_str("completed"),
            LoopOutcome::Truncated => f.write_str("truncated"),
            LoopOutcome::Stopped(reason) => write!(f, "stopped ({reason})"),
            LoopOutcome::Failed => f.write_str("failed"),
            LoopOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Drives one chat exchange against a provider and a tool set.
pub struct ChatLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// Tool backend
    tools: Arc<dyn ToolExecutor>,

    /// The model to use
    model: String,

    /// Max tokens per completion
    max_tokens: u32,

    /// Completion rounds per exchange, at most `MAX_ROUNDS_LIMIT`
    max_rounds: u32,

    temperature: Option<f32>,
}

impl ChatLoop {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self {
            provider,
            tools,
            model: "claude-sonnet-4-6".into(),
            max_tokens: 1024,
            max_rounds: MAX_ROUNDS_LIMIT,
            temperature: None,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, tools: Arc<dyn ToolExecutor>, config: &AppConfig) -> Self {
        let mut chat = Self::new(provider, tools)
            .with_model(&config.model)
            .with_max_tokens(config.max_tokens)
            .with_max_rounds(config.max_rounds);
        chat.temperature = config.temperature;
        chat
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    /// Set the round limit, clamped to `1..=MAX_ROUNDS_LIMIT`.
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds.clamp(1, MAX_ROUNDS_LIMIT);
        self
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run an exchange on a background task and hand back its event stream.
    ///
    /// The stream ends once the run finishes. Cancelling `cancel` stops the
    /// run at its next model or tool call.
    pub fn spawn(
        self: Arc<Self>,
        vehicle: Vehicle,
        conversation: Conversation,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<StreamEvent> {
        let (emitter, rx) = EventEmitter::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            self.run(&vehicle, conversation, emitter, &cancel).await;
        });
        rx
    }

    /// Run an exchange to completion, streaming through `emitter`.
    ///
    /// The emitter is closed on every exit path.
    pub async fn run(
        &self,
        vehicle: &Vehicle,
        mut conversation: Conversation,
        mut emitter: EventEmitter,
        cancel: &CancellationToken,
    ) -> LoopOutcome {
        info!(
            vehicle = %vehicle,
            messages = conversation.len(),
            max_rounds = self.max_rounds,
            "Starting chat"
        );

        let outcome = self.drive(vehicle, &mut conversation, &mut emitter, cancel).await;

        info!(outcome = %outcome, events = emitter.emitted(), turns = conversation.len(), "Chat finished");
        emitter.close();
        outcome
    }

    async fn drive(
        &self,
        vehicle: &Vehicle,
        conversation: &mut Conversation,
        emitter: &mut EventEmitter,
        cancel: &CancellationToken,
    ) -> LoopOutcome {
        let system = prompt::system_prompt(vehicle);
        let tool_definitions = ToolKind::definitions();

        for round in 1..=self.max_rounds {
            debug!(round, "Chat round");

            let request = CompletionRequest {
                model: self.model.clone(),
                system: Some(system.clone()),
                messages: conversation.messages().to_vec(),
                tools: tool_definitions.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return LoopOutcome::Cancelled,
                result = self.provider.complete(request) => result,
            };

            let completion = match result {
                Ok(completion) => completion,
                Err(e) => {
                    error!(round, provider = self.provider.name(), error = %e, "Completion failed");
                    emitter.emit(StreamEvent::error(GENERIC_ERROR)).await;
                    return LoopOutcome::Failed;
                }
            };

            let calls = completion.tool_calls();
            match &completion.stop_reason {
                StopReason::EndTurn => {
                    if let Some(text) = completion.first_text() {
                        emitter.emit(StreamEvent::text(text)).await;
                    }
                    emitter.emit(StreamEvent::done()).await;
                    return LoopOutcome::Completed;
                }
                StopReason::ToolUse if !calls.is_empty() => {
                    let mut results = Vec::with_capacity(calls.len());
                    for call in &calls {
                        emitter.emit(StreamEvent::tool(&call.name)).await;

                        let content = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return LoopOutcome::Cancelled,
                            content = self.execute_tool(vehicle, call) => content,
                        };
                        results.push(ToolResult::new(&call.id, content));
                    }

                    conversation.push(Message::assistant_blocks(completion.content));
                    conversation.push(Message::tool_results(results));
                }
                other => {
                    warn!(round, stop_reason = %other, "Unexpected stop reason");
                    emitter.emit(StreamEvent::done()).await;
                    return LoopOutcome::Stopped(other.clone());
                }
            }
        }

        warn!(rounds = self.max_rounds, "Round limit reached without a final answer");
        emitter.emit(StreamEvent::truncated()).await;
        LoopOutcome::Truncated
    }

    /// Validate and run one call. Calls the model should not have made are
    /// answered with an error message it can read.
    async fn execute_tool(&self, vehicle: &Vehicle, call: &ToolCall) -> String {
        match call.parse() {
            Ok(invocation) => self.tools.execute(vehicle, &invocation).await,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool call");
                format!("Error: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askmycar_core::error::ProviderError;
    use askmycar_core::{Completion, ContentBlock, MessageContent, Role, ToolInvocation};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted completions; the last one repeats forever.
    struct SequentialMockProvider {
        responses: Mutex<VecDeque<Result<Completion, ProviderError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        call_count: AtomicUsize,
    }

    impl SequentialMockProvider {
        fn new(responses: Vec<Result<Completion, ProviderError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Provider for SequentialMockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }
    }

    /// Never answers.
    struct HangingProvider;

    #[async_trait::async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ProviderError> {
            std::future::pending().await
        }
    }

    /// Records every invocation and answers with a fixed string.
    #[derive(Default)]
    struct RecordingTools {
        invocations: Mutex<Vec<ToolInvocation>>,
    }

    #[async_trait::async_trait]
    impl ToolExecutor for RecordingTools {
        async fn execute(&self, _vehicle: &Vehicle, invocation: &ToolInvocation) -> String {
            self.invocations.lock().unwrap().push(invocation.clone());
            match invocation {
                ToolInvocation::FetchManual { topic } => format!("Manual section on {topic}"),
                ToolInvocation::WebSearch { query } => format!("Results for {query}"),
            }
        }
    }

    struct HangingTools;

    #[async_trait::async_trait]
    impl ToolExecutor for HangingTools {
        async fn execute(&self, _vehicle: &Vehicle, _invocation: &ToolInvocation) -> String {
            std::future::pending().await
        }
    }

    fn text_completion(text: &str) -> Result<Completion, ProviderError> {
        Ok(Completion {
            id: "msg_text".into(),
            model: "mock-model".into(),
            stop_reason: StopReason::EndTurn,
            content: vec![ContentBlock::Text { text: text.into() }],
            usage: None,
        })
    }

    fn tool_completion(calls: &[(&str, &str, serde_json::Value)]) -> Result<Completion, ProviderError> {
        Ok(Completion {
            id: "msg_tool".into(),
            model: "mock-model".into(),
            stop_reason: StopReason::ToolUse,
            content: calls
                .iter()
                .map(|(id, name, input)| ContentBlock::ToolUse {
                    id: (*id).into(),
                    name: (*name).into(),
                    input: input.clone(),
                })
                .collect(),
            usage: None,
        })
    }

    fn camry() -> Vehicle {
        Vehicle::new(2019, "Toyota", "Camry")
    }

    fn question(text: &str) -> Conversation {
        Conversation::from(vec![Message::user(text)])
    }

    async fn run_to_end(
        chat: &ChatLoop,
        conversation: Conversation,
    ) -> (LoopOutcome, Vec<StreamEvent>) {
        let (emitter, mut rx) = EventEmitter::channel(64);
        let outcome = chat.run(&camry(), conversation, emitter, &CancellationToken::new()).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (outcome, events)
    }

    #[tokio::test]
    async fn natural_completion_streams_text_then_done() {
        let provider = Arc::new(SequentialMockProvider::new(vec![text_completion("Hello there")]));
        let chat = ChatLoop::new(provider.clone(), Arc::new(RecordingTools::default()));

        let (outcome, events) = run_to_end(&chat, question("Hi")).await;
        assert_eq!(outcome, LoopOutcome::Completed);
        assert_eq!(events, vec![StreamEvent::text("Hello there"), StreamEvent::done()]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn tire_pressure_scenario() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_completion(&[("toolu_1", "fetch_manual", serde_json::json!({"topic": "tire pressure"}))]),
            text_completion("32 psi front and rear."),
        ]));
        let tools = Arc::new(RecordingTools::default());
        let chat = ChatLoop::new(provider.clone(), tools.clone());

        let (outcome, events) = run_to_end(&chat, question("What's my tire pressure?")).await;
        assert_eq!(outcome, LoopOutcome::Completed);
        assert_eq!(
            events,
            vec![
                StreamEvent::tool("fetch_manual"),
                StreamEvent::text("32 psi front and rear."),
                StreamEvent::done(),
            ]
        );
        assert_eq!(
            *tools.invocations.lock().unwrap(),
            vec![ToolInvocation::FetchManual { topic: "tire pressure".into() }]
        );

        // Second round sees the assistant tool turn and one user results turn.
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages.len(), 1);
        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, Role::Assistant);
        assert_eq!(second[1].tool_calls()[0].id, "toolu_1");
        assert_eq!(second[2].role, Role::User);
        assert_eq!(
            second[2].content,
            MessageContent::Blocks(vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_1".into(),
                content: "Manual section on tire pressure".into(),
            }])
        );
        assert!(requests[0].system.as_deref().unwrap().contains("- Model: Camry"));
        assert_eq!(requests[0].tools.len(), 2);
    }

    #[tokio::test]
    async fn several_calls_run_in_order_with_one_results_turn() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_completion(&[
                ("a", "web_search", serde_json::json!({"query": "2019 Toyota Camry recalls"})),
                ("b", "fetch_manual", serde_json::json!({"topic": "recall procedure"})),
                ("c", "web_search", serde_json::json!({"query": "2019 Camry TSB"})),
            ]),
            text_completion("Two recalls apply."),
        ]));
        let tools = Arc::new(RecordingTools::default());
        let chat = ChatLoop::new(provider.clone(), tools.clone());

        let (_, events) = run_to_end(&chat, question("Any recalls?")).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::tool("web_search"),
                StreamEvent::tool("fetch_manual"),
                StreamEvent::tool("web_search"),
                StreamEvent::text("Two recalls apply."),
                StreamEvent::done(),
            ]
        );

        let kinds: Vec<_> = tools.invocations.lock().unwrap().iter().map(ToolInvocation::kind).collect();
        assert_eq!(kinds, [ToolKind::WebSearch, ToolKind::FetchManual, ToolKind::WebSearch]);

        let requests = provider.requests.lock().unwrap();
        let results = &requests[1].messages[2];
        match &results.content {
            MessageContent::Blocks(blocks) => {
                let ids: Vec<_> = blocks
                    .iter()
                    .map(|b| match b {
                        ContentBlock::ToolResult { tool_use_id, .. } => tool_use_id.as_str(),
                        _ => panic!("expected tool results only"),
                    })
                    .collect();
                assert_eq!(ids, ["a", "b", "c"]);
            }
            other => panic!("expected blocks, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn endless_tool_use_is_cut_off() {
        let provider = Arc::new(SequentialMockProvider::new(vec![tool_completion(&[(
            "loop",
            "web_search",
            serde_json::json!({"query": "again"}),
        )])]));
        let chat = ChatLoop::new(provider.clone(), Arc::new(RecordingTools::default()));

        let (outcome, events) = run_to_end(&chat, question("Loop forever")).await;
        assert_eq!(outcome, LoopOutcome::Truncated);
        assert_eq!(provider.calls(), 5);
        assert_eq!(events.len(), 6);
        assert!(events[..5].iter().all(|e| *e == StreamEvent::tool("web_search")));
        assert_eq!(events[5], StreamEvent::truncated());
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Text { .. })));
    }

    #[tokio::test]
    async fn round_limit_is_never_raised() {
        let provider = Arc::new(SequentialMockProvider::new(vec![tool_completion(&[(
            "loop",
            "fetch_manual",
            serde_json::json!({"topic": "x"}),
        )])]));
        let chat = ChatLoop::new(provider.clone(), Arc::new(RecordingTools::default())).with_max_rounds(50);
        assert_eq!(chat.max_rounds(), 5);

        run_to_end(&chat, question("x")).await;
        assert_eq!(provider.calls(), 5);
    }

    #[tokio::test]
    async fn provider_error_sends_generic_error() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(ProviderError::ApiError {
            status_code: 529,
            message: "Overloaded".into(),
        })]));
        let chat = ChatLoop::new(provider, Arc::new(RecordingTools::default()));

        let (outcome, events) = run_to_end(&chat, question("Hi")).await;
        assert_eq!(outcome, LoopOutcome::Failed);
        assert_eq!(events, vec![StreamEvent::error(GENERIC_ERROR)]);
    }

    #[tokio::test]
    async fn error_after_tool_round() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_completion(&[("t", "fetch_manual", serde_json::json!({"topic": "oil"}))]),
            Err(ProviderError::Network("connection reset".into())),
        ]));
        let chat = ChatLoop::new(provider, Arc::new(RecordingTools::default()));

        let (_, events) = run_to_end(&chat, question("Oil?")).await;
        assert_eq!(events, vec![StreamEvent::tool("fetch_manual"), StreamEvent::error(GENERIC_ERROR)]);
    }

    #[tokio::test]
    async fn other_stop_reason_finishes_without_text() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(Completion {
            id: "m".into(),
            model: "mock-model".into(),
            stop_reason: StopReason::MaxTokens,
            content: vec![ContentBlock::Text { text: "cut off mid".into() }],
            usage: None,
        })]));
        let chat = ChatLoop::new(provider, Arc::new(RecordingTools::default()));

        let (outcome, events) = run_to_end(&chat, question("Long answer please")).await;
        assert_eq!(outcome, LoopOutcome::Stopped(StopReason::MaxTokens));
        assert_eq!(events, vec![StreamEvent::done()]);
    }

    #[tokio::test]
    async fn end_turn_without_text_still_finishes() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(Completion {
            id: "m".into(),
            model: "mock-model".into(),
            stop_reason: StopReason::EndTurn,
            content: vec![],
            usage: None,
        })]));
        let chat = ChatLoop::new(provider, Arc::new(RecordingTools::default()));

        let (_, events) = run_to_end(&chat, question("...")).await;
        assert_eq!(events, vec![StreamEvent::done()]);
    }

    #[tokio::test]
    async fn unknown_and_malformed_calls_become_error_results() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            tool_completion(&[
                ("u", "shell", serde_json::json!({"cmd": "ls"})),
                ("m", "fetch_manual", serde_json::json!({})),
            ]),
            text_completion("Sorry about that."),
        ]));
        let tools = Arc::new(RecordingTools::default());
        let chat = ChatLoop::new(provider.clone(), tools.clone());

        let (_, events) = run_to_end(&chat, question("?")).await;
        assert_eq!(events[0], StreamEvent::tool("shell"));
        assert_eq!(events[1], StreamEvent::tool("fetch_manual"));
        assert!(tools.invocations.lock().unwrap().is_empty());

        let requests = provider.requests.lock().unwrap();
        let MessageContent::Blocks(blocks) = &requests[1].messages[2].content else {
            panic!("expected tool results");
        };
        let contents: Vec<_> = blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(contents[0], "Error: Unknown tool: shell");
        assert!(contents[1].starts_with("Error: Invalid arguments for fetch_manual"));
    }

    #[tokio::test]
    async fn stream_closes_after_terminal_event() {
        let provider = Arc::new(SequentialMockProvider::new(vec![text_completion("ok")]));
        let chat = Arc::new(ChatLoop::new(provider, Arc::new(RecordingTools::default())));

        let mut rx = chat.spawn(camry(), question("Hi"), CancellationToken::new());
        assert_eq!(rx.recv().await, Some(StreamEvent::text("ok")));
        assert_eq!(rx.recv().await, Some(StreamEvent::done()));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn cancel_during_completion_ends_stream_silently() {
        let chat = Arc::new(ChatLoop::new(Arc::new(HangingProvider), Arc::new(RecordingTools::default())));
        let cancel = CancellationToken::new();

        let mut rx = chat.spawn(camry(), question("Hi"), cancel.clone());
        cancel.cancel();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn cancel_during_tool_call() {
        let provider = Arc::new(SequentialMockProvider::new(vec![tool_completion(&[(
            "t",
            "web_search",
            serde_json::json!({"query": "slow"}),
        )])]));
        let chat = ChatLoop::new(provider.clone(), Arc::new(HangingTools));
        let cancel = CancellationToken::new();
        let (emitter, mut rx) = EventEmitter::channel(8);

        let vehicle = camry();
        let run = chat.run(&vehicle, question("Hi"), emitter, &cancel);
        let canceller = async {
            assert_eq!(rx.recv().await, Some(StreamEvent::tool("web_search")));
            cancel.cancel();
        };
        let (outcome, ()) = tokio::join!(run, canceller);

        assert_eq!(outcome, LoopOutcome::Cancelled);
        assert_eq!(rx.recv().await, None);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn from_config_applies_settings() {
        let mut config = AppConfig::default();
        config.model = "claude-haiku-4-5".into();
        config.max_rounds = 3;
        config.temperature = Some(0.2);

        let provider = Arc::new(SequentialMockProvider::new(vec![text_completion("x")]));
        let chat = ChatLoop::from_config(provider, Arc::new(RecordingTools::default()), &config);
        assert_eq!(chat.model, "claude-haiku-4-5");
        assert_eq!(chat.max_rounds(), 3);
        assert_eq!(chat.temperature, Some(0.2));
        assert_eq!(chat.provider_name(), "mock");
    }
}
