//! Tool-augmented specialist loop.
//!
//! The model is offered the tool catalog and may call tools for up to
//! `max_iterations` rounds. Once it answers without tool calls (or the
//! limit is hit) a final call asks for the structured response type with
//! no tools attached.
//!
//! The outcome carries only the messages generated during the run. The
//! prompt that was passed in is not repeated.

use docassist_core::error::Result;
use docassist_core::event::DomainEvent;
use docassist_core::message::{Message, Role};
use docassist_core::structured::StructuredOutput;
use docassist_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::model::ModelHandle;

pub struct ReactRunner {
    model: ModelHandle,
    tools: Arc<ToolRegistry>,
    max_iterations: u32,
}

/// What one specialist run produced.
#[derive(Debug)]
pub struct ReactOutcome<T> {
    /// Assistant tool-call messages, tool results and the final answer
    pub messages: Vec<Message>,
    /// Names of the tools that returned results, in call order
    pub tools_used: Vec<String>,
    /// The structured response
    pub response: T,
    /// Model rounds taken before the structured call
    pub iterations: u32,
}

impl ReactRunner {
    pub fn new(model: ModelHandle, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            max_iterations: 8,
        }
    }

    /// Set the maximum number of tool call iterations.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the loop over `prompt` and finish with a `T`.
    pub async fn run<T: StructuredOutput>(
        &self,
        session_id: &str,
        prompt: Vec<Message>,
    ) -> Result<ReactOutcome<T>> {
        let tool_definitions = self.tools.definitions();
        let mut conversation = prompt;
        let mut generated: Vec<Message> = Vec::new();
        let mut iterations = 0;

        loop {
            if iterations >= self.max_iterations {
                warn!(
                    session_id,
                    iterations, "Max tool iterations reached, forcing structured answer"
                );
                break;
            }
            iterations += 1;
            debug!(session_id, iteration = iterations, "Specialist loop iteration");

            let mut request = self.model.request(conversation.clone());
            request.tools = tool_definitions.clone();
            let response = self.model.complete(session_id, request).await?;

            if response.message.tool_calls.is_empty() {
                conversation.push(response.message.clone());
                generated.push(response.message);
                break;
            }

            let tool_calls = response.message.tool_calls.clone();
            conversation.push(response.message.clone());
            generated.push(response.message);

            for tc in &tool_calls {
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
                };

                let start = std::time::Instant::now();
                let result = self.tools.execute(&call).await;
                let duration_ms = start.elapsed().as_millis() as u64;

                let (success, output) = match result {
                    Ok(tool_result) => (tool_result.success, tool_result.output),
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "Tool execution failed");
                        // Report error to the LLM so it can recover
                        (false, format!("Error: {e}"))
                    }
                };

                self.model.event_bus().publish(DomainEvent::ToolExecuted {
                    tool_name: tc.name.clone(),
                    success,
                    duration_ms,
                    timestamp: chrono::Utc::now(),
                });

                let message = Message::tool_result(&tc.id, &tc.name, output);
                conversation.push(message.clone());
                generated.push(message);
            }
        }

        let response = self
            .model
            .invoke_structured::<T>(session_id, conversation)
            .await?;

        let tools_used = tools_used(&generated);
        info!(
            session_id,
            schema = T::NAME,
            iterations,
            tools = ?tools_used,
            "Specialist finished"
        );

        Ok(ReactOutcome {
            messages: generated,
            tools_used,
            response,
            iterations,
        })
    }
}

/// Tool names taken from the tool-result messages of a trace.
pub fn tools_used(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.name.clone())
        .collect()
}
