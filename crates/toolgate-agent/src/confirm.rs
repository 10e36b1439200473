//! Human-in-the-loop tool confirmation.
//!
//! Tools flagged as requiring confirmation are never auto-executed.  The
//! interceptor surfaces their pending calls to the human-facing layer; the
//! resolver applies the human's decision — executing the tool on
//! confirmation, substituting a fixed denial output otherwise — and patches
//! the pending part in place before generation resumes.
//!
//! The hand-off is a two-phase protocol: phase 1 leaves an `input-available`
//! part in the stored conversation and returns; phase 2 is an ordinary
//! follow-up request carrying the decision.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::conversation::{Conversation, Turn};
use crate::error::{AgentError, Result};
use crate::events::{ChatEvent, EventSink};
use crate::tool::ToolRegistry;

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Sentinel the client sends to confirm a pending tool call.
pub const CONFIRM_SENTINEL: &str = "Yes, confirmed.";

/// Sentinel the client sends to deny a pending tool call.
pub const DENY_SENTINEL: &str = "No, denied.";

/// A parsed human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Execute the tool with its recorded input.
    Confirmed,
    /// Substitute the tool's denial output without executing.
    Denied,
}

impl Decision {
    /// Parse a decision from the client-provided output string.
    ///
    /// Anything other than the two exact sentinels means "no decision yet".
    pub fn from_output(output: &str) -> Option<Self> {
        match output {
            CONFIRM_SENTINEL => Some(Self::Confirmed),
            DENY_SENTINEL => Some(Self::Denied),
            _ => None,
        }
    }
}

/// The decision payload submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDecision {
    /// The pending call this decision resolves.
    pub tool_call_id: String,

    /// The tool the call belongs to.
    pub tool: String,

    /// One of the decision sentinels.
    pub output: String,
}

// ---------------------------------------------------------------------------
// Interceptor
// ---------------------------------------------------------------------------

/// A pending call surfaced to the human-facing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub tool_call_id: String,
    pub tool_name: String,
    pub input: Value,
}

/// Scan a turn's parts for tool calls awaiting human confirmation.
///
/// Read-only: only `input-available` calls whose tool is flagged as requiring
/// confirmation are returned; nothing is executed or mutated.
pub fn pending_confirmations(turn: &Turn, registry: &ToolRegistry) -> Vec<PendingConfirmation> {
    turn.parts
        .iter()
        .filter_map(|part| part.as_tool_call())
        .filter(|call| call.is_pending() && registry.requires_confirmation(&call.tool_name))
        .map(|call| PendingConfirmation {
            tool_call_id: call.tool_call_id.clone(),
            tool_name: call.tool_name.clone(),
            input: call.input.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// What applying a decision did to the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// The part was patched to `output-available` with this output.
    Applied(Value),

    /// The part was already resolved; nothing changed and the tool was not
    /// re-invoked.
    AlreadyResolved,

    /// The output string was not a recognized sentinel; the part remains
    /// unresolved and nothing changed.
    NoDecision,
}

/// Apply a human decision to the matching pending tool call of the latest
/// turn.
///
/// On confirmation the tool runs with the part's recorded input; an execution
/// failure becomes a `{"success": false, "error": ...}` output rather than a
/// failed turn.  On denial the tool's fixed denial output is substituted
/// without invoking it.  Either way the part transitions to
/// `output-available` and the output is emitted to the live listener before
/// the conversation resumes.
///
/// # Errors
///
/// [`AgentError::UnknownToolCall`] if the id does not name a tool call in the
/// latest turn (stale client), and [`AgentError::ValidationError`] if the
/// decision's tool name contradicts the recorded part.
pub async fn apply_decision(
    conversation: &mut Conversation,
    decision: &ToolDecision,
    registry: &ToolRegistry,
    events: &EventSink,
) -> Result<DecisionOutcome> {
    let (input, pending) = {
        let call = conversation
            .latest_turn()
            .and_then(|turn| turn.tool_call(&decision.tool_call_id))
            .ok_or_else(|| AgentError::UnknownToolCall {
                tool_call_id: decision.tool_call_id.clone(),
            })?;

        if call.tool_name != decision.tool {
            return Err(AgentError::ValidationError {
                reason: format!(
                    "decision names tool `{}` but call `{}` belongs to `{}`",
                    decision.tool, decision.tool_call_id, call.tool_name
                ),
            });
        }

        (call.input.clone(), call.is_pending())
    };

    // Idempotence: a second decision for an already-resolved call is a no-op.
    if !pending {
        tracing::debug!(
            tool_call_id = %decision.tool_call_id,
            "decision for already-resolved call ignored"
        );
        return Ok(DecisionOutcome::AlreadyResolved);
    }

    let Some(parsed) = Decision::from_output(&decision.output) else {
        tracing::debug!(
            tool_call_id = %decision.tool_call_id,
            output = %decision.output,
            "unrecognized decision sentinel; leaving call unresolved"
        );
        return Ok(DecisionOutcome::NoDecision);
    };

    let output = match parsed {
        Decision::Confirmed => {
            let tool = registry
                .get(&decision.tool)
                .ok_or_else(|| AgentError::UnknownTool {
                    tool_name: decision.tool.clone(),
                })?;

            match tool.execute(input).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        tool = %decision.tool,
                        error = %e,
                        "confirmed tool execution failed"
                    );
                    json!({ "success": false, "error": e.to_string() })
                }
            }
        }
        Decision::Denied => registry
            .get(&decision.tool)
            .map(|tool| tool.denied_output())
            .unwrap_or_else(|| Value::String("Error: User denied access".into())),
    };

    let call = conversation
        .latest_turn_mut()
        .and_then(|turn| turn.tool_call_mut(&decision.tool_call_id))
        .ok_or_else(|| AgentError::UnknownToolCall {
            tool_call_id: decision.tool_call_id.clone(),
        })?;
    call.resolve(output.clone());

    tracing::info!(
        tool_call_id = %decision.tool_call_id,
        tool = %decision.tool,
        decision = ?parsed,
        "tool call resolved"
    );

    events
        .emit(ChatEvent::ToolOutputAvailable {
            tool_call_id: decision.tool_call_id.clone(),
            output: output.clone(),
        })
        .await;

    Ok(DecisionOutcome::Applied(output))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
