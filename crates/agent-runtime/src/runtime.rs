//! Agent runtime - starts runs and advances them one step at a time
//!
//! The runtime holds no run state of its own. Every call reads and writes
//! through the `RunStore`, so a run started in one invocation can be resumed
//! from any other process.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use relay_core::agent::AgentDefinition;
use relay_core::run::{Message, ModelCall, NewRun, NextAction, Run, RunStatus, Step};
use relay_core::store::RunStore;

use crate::error::{Result, RuntimeError};
use crate::provider::{prompt_history, CompletionProvider, CompletionRequest};

/// Drives runs against a store and a completion provider
pub struct AgentRuntime {
    store: Arc<dyn RunStore>,
    provider: Arc<dyn CompletionProvider>,
}

impl AgentRuntime {
    pub fn new(store: Arc<dyn RunStore>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self { store, provider }
    }

    /// Create a run seeded with the system prompt (if any) and the user input,
    /// then mark it running.
    pub async fn start_run(&self, def: &AgentDefinition, user_input: &str) -> Result<Run> {
        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = def.system_prompt() {
            messages.push(Message::system(prompt));
        }
        messages.push(Message::user(user_input));

        let run = self
            .store
            .create_run(
                NewRun::new(&def.id)
                    .with_messages(messages)
                    .with_status(RunStatus::Pending),
            )
            .await?;

        self.store
            .set_status(&run.run_id, RunStatus::Running)
            .await?;
        info!("Started run {} for agent {}", run.run_id, def.id);

        self.store
            .get_run(&run.run_id)
            .await?
            .ok_or(RuntimeError::RunNotFound { run_id: run.run_id })
    }

    /// Execute one step unless the run is already terminal.
    ///
    /// Returns the run as the store sees it afterwards, never the snapshot
    /// passed in. Not atomic: a failure after the reply is appended leaves
    /// the assistant message without a step.
    pub async fn continue_run(&self, def: &AgentDefinition, run: &Run) -> Result<Run> {
        if run.is_terminal() {
            debug!("Run {} is {}, nothing to continue", run.run_id, run.status);
            return Ok(run.clone());
        }

        let step = self.single_step(def, run).await?;
        let step_id = step.step_id.clone();
        let next_action = step.next_action;
        self.store.append_step(&run.run_id, step).await?;

        self.reload_after_step(&run.run_id).await?;

        let status = RunStatus::after_step(next_action);
        self.store.set_status(&run.run_id, status).await?;
        info!(
            "Run {} recorded step {}, status now {}",
            run.run_id, step_id, status
        );

        self.reload_after_step(&run.run_id).await
    }

    /// Load a run by id and continue it
    pub async fn resume(&self, def: &AgentDefinition, run_id: &str) -> Result<Run> {
        let run = self.load(run_id).await?;
        self.continue_run(def, &run).await
    }

    /// Append a user message to an existing run and continue it.
    /// Terminal runs are returned unchanged and receive no message.
    pub async fn post_message(
        &self,
        def: &AgentDefinition,
        run_id: &str,
        user_input: &str,
    ) -> Result<Run> {
        let mut run = self.load(run_id).await?;
        if run.is_terminal() {
            debug!(
                "Run {} is {}, not accepting new messages",
                run.run_id, run.status
            );
            return Ok(run);
        }

        let message = Message::user(user_input);
        self.store
            .append_messages(run_id, vec![message.clone()])
            .await?;
        run.messages.push(message);

        self.continue_run(def, &run).await
    }

    async fn load(&self, run_id: &str) -> Result<Run> {
        self.store
            .get_run(run_id)
            .await?
            .ok_or_else(|| RuntimeError::RunNotFound {
                run_id: run_id.to_string(),
            })
    }

    async fn reload_after_step(&self, run_id: &str) -> Result<Run> {
        self.store
            .get_run(run_id)
            .await?
            .ok_or_else(|| RuntimeError::RunMissingAfterStep {
                run_id: run_id.to_string(),
            })
    }

    /// One provider call: send the prompt-visible history, store the reply,
    /// and describe the cycle as a step. Always finishes for now.
    async fn single_step(&self, def: &AgentDefinition, run: &Run) -> Result<Step> {
        let started_at = Utc::now();

        let request = CompletionRequest {
            model: def.model.clone(),
            messages: prompt_history(&run.messages),
        };
        let completion = self.provider.complete(request).await?;

        let reply = Message::assistant(completion.content);
        self.store
            .append_messages(&run.run_id, vec![reply.clone()])
            .await?;

        let input_message_id = run
            .last_message()
            .map(|m| m.id.clone())
            .unwrap_or_else(|| reply.id.clone());
        let usage = completion.usage.unwrap_or_default();

        let mut step = Step::new(input_message_id)
            .with_model_call(ModelCall {
                provider: self.provider.provider_tag().to_string(),
                model: def.model.clone(),
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                reasoning: None,
            })
            .with_output(reply.id)
            .with_next_action(NextAction::Finish);
        step.timestamp = started_at;
        Ok(step)
    }
}
