use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{NextAction, RunStatus};

/// Message role in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    /// Roles forwarded to the completion provider
    pub fn is_prompt_role(&self) -> bool {
        matches!(self, Self::System | Self::User | Self::Assistant)
    }
}

/// A tool invocation requested by a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_name: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

/// Outcome of a tool invocation recorded on a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_name: String,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One turn of dialogue. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_invocations: Option<Vec<ToolInvocation>>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_invocations: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn with_id(id: impl Into<String>, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::new(role, content)
        }
    }
}

/// Descriptor of the model call a step made
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCall {
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Record of one execution cycle. Steps are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: String,
    pub timestamp: DateTime<Utc>,
    pub input_message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_call: Option<ModelCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
}

impl Step {
    pub fn new(input_message_id: impl Into<String>) -> Self {
        Self {
            step_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            input_message_id: input_message_id.into(),
            model_call: None,
            tool_results: None,
            output_message_id: None,
            next_action: None,
        }
    }

    pub fn with_model_call(mut self, model_call: ModelCall) -> Self {
        self.model_call = Some(model_call);
        self
    }

    pub fn with_output(mut self, message_id: impl Into<String>) -> Self {
        self.output_message_id = Some(message_id.into());
        self
    }

    pub fn with_next_action(mut self, next_action: NextAction) -> Self {
        self.next_action = Some(next_action);
        self
    }
}

/// Opaque checkpoint reserved for resuming multi-step workflows.
/// Nothing in the runtime interprets it yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_step_id: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: serde_json::Map<String, serde_json::Value>,
}

/// The unit of durable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: String,
    pub agent_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<RunCursor>,
    /// Write revision, bumped on every successful mutation
    #[serde(default)]
    pub version: u64,
}

impl Run {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Advance `updated_at` without ever moving it backwards
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

/// Seed data for `RunStore::create_run`
#[derive(Debug, Clone, Default)]
pub struct NewRun {
    pub run_id: String,
    pub agent_id: String,
    pub messages: Vec<Message>,
    pub steps: Vec<Step>,
    pub cursor: Option<RunCursor>,
    pub status: Option<RunStatus>,
}

impl NewRun {
    /// Seed a run with a fresh identifier
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Stamp timestamps and default the status
    pub fn into_run(self) -> Run {
        let now = Utc::now();
        Run {
            run_id: self.run_id,
            agent_id: self.agent_id,
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            messages: self.messages,
            steps: self.steps,
            cursor: self.cursor,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_defaults_to_pending() {
        let run = NewRun::new("agent-1")
            .with_messages(vec![Message::user("hi")])
            .into_run();

        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.created_at, run.updated_at);
        assert_eq!(run.version, 0);
        assert_eq!(run.messages.len(), 1);
        assert!(run.steps.is_empty());
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut run = NewRun::new("agent-1").into_run();
        let future = Utc::now() + chrono::Duration::hours(1);
        run.updated_at = future;

        run.touch();

        assert_eq!(run.updated_at, future);
        assert!(run.created_at <= run.updated_at);
    }

    #[test]
    fn test_run_serializes_camel_case() {
        let mut run = NewRun::new("agent-1")
            .with_run_id("run-1")
            .with_messages(vec![Message::with_id("m1", MessageRole::User, "hi")])
            .into_run();
        run.steps.push(
            Step::new("m1")
                .with_output("m2")
                .with_next_action(NextAction::AwaitWebhook),
        );

        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["runId"], "run-1");
        assert_eq!(value["agentId"], "agent-1");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["steps"][0]["inputMessageId"], "m1");
        assert_eq!(value["steps"][0]["nextAction"], "await-webhook");
        assert!(value.get("cursor").is_none());
    }

    #[test]
    fn test_run_without_version_deserializes() {
        let value = serde_json::json!({
            "runId": "run-1",
            "agentId": "agent-1",
            "status": "running",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:01Z",
            "messages": [{ "id": "m1", "role": "tool", "content": "42" }],
            "steps": []
        });

        let run: Run = serde_json::from_value(value).unwrap();
        assert_eq!(run.version, 0);
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.messages[0].role, MessageRole::Tool);
    }

    #[test]
    fn test_prompt_roles_exclude_tool() {
        assert!(MessageRole::System.is_prompt_role());
        assert!(MessageRole::User.is_prompt_role());
        assert!(MessageRole::Assistant.is_prompt_role());
        assert!(!MessageRole::Tool.is_prompt_role());
    }
}
