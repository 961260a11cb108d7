//! A configured handle on the LLM.
//!
//! Bundles the provider with model name, temperature and token limit so
//! nodes only pass messages. Every call publishes a `ResponseGenerated`
//! event when the provider reports usage.

use docassist_config::AppConfig;
use docassist_core::error::Result;
use docassist_core::event::{DomainEvent, EventBus};
use docassist_core::message::Message;
use docassist_core::provider::{Provider, ProviderRequest, ProviderResponse};
use docassist_core::structured::{StructuredOutput, parse_structured};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct ModelHandle {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    event_bus: Arc<EventBus>,
}

impl ModelHandle {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            event_bus,
        }
    }

    /// Model name, temperature and token limit from configuration.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        config: &AppConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(provider, &config.model, config.temperature, event_bus)
            .with_max_tokens(config.max_tokens)
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// A request carrying this handle's settings and no tools.
    pub fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        let mut request = ProviderRequest::new(&self.model, messages, self.temperature);
        request.max_tokens = self.max_tokens;
        request
    }

    /// Send a request, publishing token usage.
    pub async fn complete(
        &self,
        session_id: &str,
        request: ProviderRequest,
    ) -> Result<ProviderResponse> {
        debug!(
            session_id,
            provider = self.provider.name(),
            messages = request.messages.len(),
            "LLM call"
        );
        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            self.event_bus.publish(DomainEvent::ResponseGenerated {
                session_id: session_id.to_string(),
                model: response.model.clone(),
                tokens_used: usage.total_tokens,
                timestamp: chrono::Utc::now(),
            });
        }
        Ok(response)
    }

    /// Ask for a reply shaped like `T` and deserialize it.
    pub async fn invoke_structured<T: StructuredOutput>(
        &self,
        session_id: &str,
        messages: Vec<Message>,
    ) -> Result<T> {
        let mut request = self.request(messages);
        request.response_format = Some(T::response_format());
        let response = self.complete(session_id, request).await?;
        let parsed = parse_structured::<T>(&response.message.content)?;
        debug!(session_id, schema = T::NAME, "Structured reply parsed");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, json_response, text_response};
    use docassist_core::error::Error;
    use docassist_core::schema::{IntentType, UserIntent};

    fn handle(provider: Arc<ScriptedProvider>) -> ModelHandle {
        ModelHandle::new(provider, "mock-model", 0.1, Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn structured_call_sends_schema_and_parses() {
        let provider = Arc::new(ScriptedProvider::new(vec![json_response(
            &serde_json::json!({
                "intent_type": "calculation",
                "confidence": 0.93,
                "reasoning": "asks for a percentage"
            }),
        )]));
        let intent: UserIntent = handle(provider.clone())
            .invoke_structured("s1", vec![Message::user("Calculate 15% of that")])
            .await
            .unwrap();

        assert_eq!(intent.intent_type, IntentType::Calculation);
        let request = &provider.requests()[0];
        assert_eq!(request.response_format.as_ref().unwrap().name, "UserIntent");
        assert!(request.tools.is_empty());
    }

    #[tokio::test]
    async fn structured_mismatch_is_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("I think it is QA.")]));
        let err = handle(provider)
            .invoke_structured::<UserIntent>("s1", vec![Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StructuredOutput { .. }));
    }

    #[tokio::test]
    async fn usage_is_published() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("ok")]));
        let h = handle(provider);
        let mut rx = h.event_bus().subscribe();
        h.complete("s1", h.request(vec![Message::user("hi")])).await.unwrap();

        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::ResponseGenerated { session_id, tokens_used, .. } => {
                assert_eq!(session_id, "s1");
                assert_eq!(*tokens_used, 15);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn from_config_applies_settings() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let config = AppConfig::default();
        let h = ModelHandle::from_config(provider, &config, Arc::new(EventBus::default()));
        let request = h.request(vec![]);
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.max_tokens, Some(1024));
    }
}
