//! Scripted provider for tests.
//!
//! Enabled for this crate's own tests and, through the `test-util`
//! feature, for downstream crates that drive the workflow without a real
//! model.

use docassist_core::error::ProviderError;
use docassist_core::message::{Message, MessageToolCall};
use docassist_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_CALL_ID: AtomicUsize = AtomicUsize::new(1);

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` pops the next entry and records the request.
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Script that may include provider failures.
    pub fn with_results(results: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append more responses to the end of the script.
    pub fn push(&self, response: ProviderResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        let call = requests.len();
        drop(requests);

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no more responses (call #{call})"))
    }
}

fn response(message: Message) -> ProviderResponse {
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A plain text reply (no tool calls).
pub fn text_response(text: &str) -> ProviderResponse {
    response(Message::assistant(text))
}

/// A reply whose content is `value` serialized as JSON.
pub fn json_response(value: &impl serde::Serialize) -> ProviderResponse {
    response(Message::assistant(serde_json::to_string(value).unwrap()))
}

/// A reply that asks for the given tool calls.
pub fn tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = tool_calls;
    response(msg)
}

/// Helper to create a tool call. Every call gets a distinct id.
pub fn tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    let n = NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed);
    MessageToolCall {
        id: format!("call_{name}_{n}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}
