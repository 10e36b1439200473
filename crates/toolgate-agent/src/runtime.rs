//! Chat runtime: the response re-entry loop.
//!
//! Drives a conversation through bounded model/tool round-trips.  Each step
//! sends the full conversation to the model; a tool-call response appends
//! pending parts, tools not requiring confirmation execute immediately and
//! the loop re-enters, while a confirmation-gated call suspends the run until
//! a human decision arrives through [`crate::confirm::apply_decision`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::confirm::pending_confirmations;
use crate::conversation::{Conversation, Part, ToolCallPart, Turn};
use crate::error::Result;
use crate::events::{ChatEvent, EventSink};
use crate::llm::{LanguageModel, ModelRequest, ModelResponse, to_model_messages};
use crate::tool::ToolRegistry;

/// Default bound on model/tool round-trips per run.
pub const DEFAULT_MAX_STEPS: u32 = 5;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the chat runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Maximum number of model/tool round-trips per run.  Reaching the cap
    /// terminates generation; it is not an error.
    pub max_steps: u32,

    /// Model identifier for generation requests.
    pub model: String,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,

    /// Optional max tokens per response.
    pub max_tokens: Option<u32>,

    /// Optional system prompt prepended to every request.
    pub system_prompt: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            model: "gpt-4o".into(),
            temperature: None,
            max_tokens: Some(4096),
            system_prompt: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// The model produced a final text answer.
    Completed,

    /// A confirmation-gated tool call is pending a human decision.
    AwaitingConfirmation,

    /// The step cap was reached; whatever was produced so far stands.
    StepLimitReached,
}

/// The result of one run of the re-entry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// How the run ended.
    pub status: RunStatus,

    /// Number of model round-trips consumed.
    pub steps_used: u32,
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Drives conversations through the model and the tool registry.
pub struct ChatRuntime {
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    config: RuntimeConfig,
}

impl ChatRuntime {
    /// Create a runtime.
    pub fn new(model: Arc<dyn LanguageModel>, tools: Arc<ToolRegistry>, config: RuntimeConfig) -> Self {
        Self { model, tools, config }
    }

    /// The tool registry this runtime executes against.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the re-entry loop until the model completes, a confirmation is
    /// required, or the step cap is reached.
    ///
    /// A conversation whose latest turn still holds pending confirmations
    /// passes through untouched: the run returns immediately without
    /// consuming a step, because re-entry only proceeds once every pending
    /// part is resolved.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        events: &EventSink,
    ) -> Result<RunOutcome> {
        if let Some(turn) = conversation.latest_turn() {
            if !pending_confirmations(turn, &self.tools).is_empty() {
                tracing::info!(
                    conversation_id = %conversation.id,
                    "run suspended: pending confirmations unresolved"
                );
                return Ok(RunOutcome {
                    status: RunStatus::AwaitingConfirmation,
                    steps_used: 0,
                });
            }
        }

        let schemas = self.tools.schemas();
        let max_steps = self.config.max_steps;

        tracing::info!(
            conversation_id = %conversation.id,
            max_steps,
            tool_count = schemas.len(),
            "starting run"
        );

        for step in 0..max_steps {
            let request = ModelRequest {
                model: self.config.model.clone(),
                messages: to_model_messages(conversation, self.config.system_prompt.as_deref()),
                tools: schemas.clone(),
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            };

            let response = self.model.generate(&request, events).await?;

            match response {
                ModelResponse::Text(text) => {
                    conversation.push_turn(Turn::assistant(vec![Part::text(text)]));
                    tracing::info!(
                        conversation_id = %conversation.id,
                        steps = step + 1,
                        "run completed with text response"
                    );
                    return Ok(RunOutcome {
                        status: RunStatus::Completed,
                        steps_used: step + 1,
                    });
                }

                ModelResponse::ToolCalls(calls) => {
                    tracing::info!(
                        conversation_id = %conversation.id,
                        step,
                        tools = ?calls.iter().map(|c| &c.name).collect::<Vec<_>>(),
                        "model requested tool calls"
                    );

                    let parts = calls
                        .iter()
                        .map(|call| {
                            Part::ToolCall(ToolCallPart::new(
                                &call.id,
                                &call.name,
                                call.arguments.clone(),
                            ))
                        })
                        .collect();
                    conversation.push_turn(Turn::assistant(parts));

                    for call in &calls {
                        events
                            .emit(ChatEvent::ToolInputAvailable {
                                tool_call_id: call.id.clone(),
                                tool_name: call.name.clone(),
                                input: call.arguments.clone(),
                            })
                            .await;
                    }

                    let mut awaiting_confirmation = false;
                    for call in &calls {
                        if self.tools.requires_confirmation(&call.name) {
                            // Left unexecuted for the human-facing layer.
                            awaiting_confirmation = true;
                            continue;
                        }
                        self.execute_auto_call(conversation, events, &call.id, &call.name)
                            .await;
                    }

                    if awaiting_confirmation {
                        return Ok(RunOutcome {
                            status: RunStatus::AwaitingConfirmation,
                            steps_used: step + 1,
                        });
                    }
                }
            }
        }

        tracing::info!(
            conversation_id = %conversation.id,
            max_steps,
            "step cap reached; terminating run"
        );
        Ok(RunOutcome {
            status: RunStatus::StepLimitReached,
            steps_used: max_steps,
        })
    }

    /// Execute a tool call that needs no confirmation and patch its part.
    ///
    /// Failures (including an unknown tool name) become error outputs so a
    /// single bad call cannot wedge the conversation.
    async fn execute_auto_call(
        &self,
        conversation: &mut Conversation,
        events: &EventSink,
        tool_call_id: &str,
        tool_name: &str,
    ) {
        let input = conversation
            .latest_turn()
            .and_then(|turn| turn.tool_call(tool_call_id))
            .map(|call| call.input.clone())
            .unwrap_or_default();

        let output = match self.tools.get(tool_name) {
            Some(tool) => match tool.execute(input).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(tool = tool_name, error = %e, "tool execution failed");
                    json!({ "success": false, "error": e.to_string() })
                }
            },
            None => {
                tracing::warn!(tool = tool_name, "model requested unknown tool");
                json!({ "success": false, "error": format!("unknown tool `{tool_name}`") })
            }
        };

        if let Some(call) = conversation
            .latest_turn_mut()
            .and_then(|turn| turn.tool_call_mut(tool_call_id))
        {
            call.resolve(output.clone());
        }

        events
            .emit(ChatEvent::ToolOutputAvailable {
                tool_call_id: tool_call_id.to_owned(),
                output,
            })
            .await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use super::*;
    use crate::conversation::ToolCallState;
    use crate::error::AgentError;
    use crate::llm::ModelToolCall;
    use crate::tool::Tool;
    use crate::tools::WeatherTool;

    /// Model that replays a script, then repeats its final entry forever.
    struct ScriptedModel {
        script: Mutex<VecDeque<ModelResponse>>,
        fallback: ModelResponse,
        requests: AtomicU32,
    }

    impl ScriptedModel {
        fn new(script: Vec<ModelResponse>, fallback: ModelResponse) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                fallback,
                requests: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(
            &self,
            _request: &ModelRequest,
            _events: &EventSink,
        ) -> Result<ModelResponse> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().await.pop_front();
            Ok(next.unwrap_or_else(|| self.fallback.clone()))
        }
    }

    /// Auto-executing tool that counts invocations.
    struct CountingTool {
        invocations: AtomicU32,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Counts invocations"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _input: Value) -> Result<Value> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(json!("looked up"))
        }
    }

    fn tool_call(id: &str, name: &str) -> ModelToolCall {
        ModelToolCall {
            id: id.into(),
            name: name.into(),
            arguments: json!({"city": "Paris"}),
        }
    }

    fn runtime_with(
        model: Arc<dyn LanguageModel>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> ChatRuntime {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        ChatRuntime::new(model, Arc::new(registry), RuntimeConfig::default())
    }

    #[tokio::test]
    async fn text_response_completes_in_one_step() {
        let model = ScriptedModel::new(
            vec![ModelResponse::Text("Hello!".into())],
            ModelResponse::Text("unused".into()),
        );
        let runtime = runtime_with(model, vec![Arc::new(WeatherTool::new())]);

        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::user_text("hi"));

        let outcome = runtime.run(&mut conversation, &EventSink::disabled()).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.steps_used, 1);
        assert_eq!(conversation.latest_turn().unwrap().text(), "Hello!");
    }

    #[tokio::test]
    async fn confirmation_gated_call_suspends_the_run() {
        let model = ScriptedModel::new(
            vec![ModelResponse::ToolCalls(vec![tool_call(
                "call_1",
                "get_weather_information",
            )])],
            ModelResponse::Text("unused".into()),
        );
        let runtime = runtime_with(model, vec![Arc::new(WeatherTool::new())]);

        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::user_text("weather in Paris?"));

        let outcome = runtime.run(&mut conversation, &EventSink::disabled()).await.unwrap();
        assert_eq!(outcome.status, RunStatus::AwaitingConfirmation);
        assert_eq!(outcome.steps_used, 1);

        let call = conversation.latest_turn().unwrap().tool_call("call_1").unwrap();
        assert_eq!(call.state, ToolCallState::InputAvailable);
        assert!(call.output.is_none());
    }

    #[tokio::test]
    async fn auto_tool_executes_and_loop_reenters() {
        let model = ScriptedModel::new(
            vec![
                ModelResponse::ToolCalls(vec![tool_call("call_1", "lookup")]),
                ModelResponse::Text("Found it.".into()),
            ],
            ModelResponse::Text("unused".into()),
        );
        let tool = Arc::new(CountingTool {
            invocations: AtomicU32::new(0),
        });
        let runtime = runtime_with(model, vec![Arc::clone(&tool) as Arc<dyn Tool>]);

        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::user_text("look it up"));

        let outcome = runtime.run(&mut conversation, &EventSink::disabled()).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.steps_used, 2);
        assert_eq!(tool.invocations.load(Ordering::SeqCst), 1);

        // The tool-call turn was patched in place before re-entry.
        let tool_turn = &conversation.turns[1];
        let call = tool_turn.tool_call("call_1").unwrap();
        assert_eq!(call.state, ToolCallState::OutputAvailable);
        assert_eq!(call.output, Some(json!("looked up")));
    }

    #[tokio::test]
    async fn step_cap_terminates_without_error() {
        // The model asks for another auto-executed call on every step.
        let counter = AtomicU32::new(0);
        struct EndlessModel {
            counter: AtomicU32,
        }

        #[async_trait]
        impl LanguageModel for EndlessModel {
            async fn generate(
                &self,
                _request: &ModelRequest,
                _events: &EventSink,
            ) -> Result<ModelResponse> {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                Ok(ModelResponse::ToolCalls(vec![ModelToolCall {
                    id: format!("call_{n}"),
                    name: "lookup".into(),
                    arguments: json!({}),
                }]))
            }
        }

        let tool = Arc::new(CountingTool {
            invocations: AtomicU32::new(0),
        });
        let runtime = runtime_with(
            Arc::new(EndlessModel { counter }),
            vec![Arc::clone(&tool) as Arc<dyn Tool>],
        );

        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::user_text("loop forever"));

        let outcome = runtime.run(&mut conversation, &EventSink::disabled()).await.unwrap();
        assert_eq!(outcome.status, RunStatus::StepLimitReached);
        assert_eq!(outcome.steps_used, DEFAULT_MAX_STEPS);
        assert_eq!(tool.invocations.load(Ordering::SeqCst), DEFAULT_MAX_STEPS);
    }

    #[tokio::test]
    async fn unresolved_confirmation_blocks_reentry_without_a_step() {
        let model = ScriptedModel::new(vec![], ModelResponse::Text("unused".into()));
        let runtime = runtime_with(Arc::clone(&model) as Arc<dyn LanguageModel>, vec![
            Arc::new(WeatherTool::new()),
        ]);

        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::assistant(vec![Part::ToolCall(ToolCallPart::new(
            "call_1",
            "get_weather_information",
            json!({"city": "Paris"}),
        ))]));
        let snapshot = conversation.clone();

        let outcome = runtime.run(&mut conversation, &EventSink::disabled()).await.unwrap();
        assert_eq!(outcome.status, RunStatus::AwaitingConfirmation);
        assert_eq!(outcome.steps_used, 0);
        assert_eq!(conversation, snapshot);
        assert_eq!(model.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_tool_request_becomes_error_output() {
        let model = ScriptedModel::new(
            vec![
                ModelResponse::ToolCalls(vec![tool_call("call_1", "no_such_tool")]),
                ModelResponse::Text("Sorry about that.".into()),
            ],
            ModelResponse::Text("unused".into()),
        );
        let runtime = runtime_with(model, vec![]);

        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::user_text("try something"));

        let outcome = runtime.run(&mut conversation, &EventSink::disabled()).await.unwrap();
        assert_eq!(outcome.status, RunStatus::Completed);

        let call = conversation.turns[1].tool_call("call_1").unwrap();
        let output = call.output.as_ref().unwrap();
        assert_eq!(output["success"], false);
    }

    #[tokio::test]
    async fn model_errors_propagate() {
        struct BrokenModel;

        #[async_trait]
        impl LanguageModel for BrokenModel {
            async fn generate(
                &self,
                _request: &ModelRequest,
                _events: &EventSink,
            ) -> Result<ModelResponse> {
                Err(AgentError::ModelRequestFailed {
                    reason: "connection refused".into(),
                })
            }
        }

        let runtime = runtime_with(Arc::new(BrokenModel), vec![]);
        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::user_text("hi"));

        let result = runtime.run(&mut conversation, &EventSink::disabled()).await;
        assert!(matches!(result, Err(AgentError::ModelRequestFailed { .. })));
    }

    #[tokio::test]
    async fn events_stream_tool_lifecycle() {
        let model = ScriptedModel::new(
            vec![
                ModelResponse::ToolCalls(vec![tool_call("call_1", "lookup")]),
                ModelResponse::Text("done".into()),
            ],
            ModelResponse::Text("unused".into()),
        );
        let tool = Arc::new(CountingTool {
            invocations: AtomicU32::new(0),
        });
        let runtime = runtime_with(model, vec![tool as Arc<dyn Tool>]);

        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let mut conversation = Conversation::new();
        conversation.push_turn(Turn::user_text("go"));
        runtime.run(&mut conversation, &EventSink::new(tx)).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ChatEvent::ToolInputAvailable { ref tool_call_id, .. } if tool_call_id == "call_1"));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, ChatEvent::ToolOutputAvailable { ref tool_call_id, .. } if tool_call_id == "call_1"));
    }
}
