//! Node bodies.
//!
//! Each node reads the session state and returns a [`StateUpdate`]; none of
//! them touch the state directly. The graph applies the update and
//! checkpoints it.

use docassist_agent::prompts::{MEMORY_SUMMARY_PROMPT, chat_system_prompt, intent_classification_prompt};
use docassist_agent::{ModelHandle, ReactRunner};
use docassist_core::error::Result;
use docassist_core::message::Message;
use docassist_core::schema::{
    AnswerResponse, CalculationResponse, IntentType, StructuredResponse, SummarizationResponse,
    UpdateMemoryResponse, UserIntent,
};
use docassist_core::session::{NodeId, SessionState, StateUpdate};
use docassist_core::structured::StructuredOutput;
use tracing::{info, warn};

/// The specialist that handles an intent. Unknown intents go to QA.
pub fn route(intent: IntentType) -> NodeId {
    match intent {
        IntentType::Qa => NodeId::QaAgent,
        IntentType::Summarization => NodeId::SummarizationAgent,
        IntentType::Calculation => NodeId::CalculationAgent,
        IntentType::Unknown => NodeId::QaAgent,
    }
}

pub struct Nodes {
    model: ModelHandle,
    runner: ReactRunner,
}

impl Nodes {
    pub fn new(model: ModelHandle, runner: ReactRunner) -> Self {
        Self { model, runner }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub async fn classify_intent(&self, state: &SessionState) -> Result<StateUpdate> {
        let session_id = state.session_id.as_str();
        let user_input = state.user_input.as_deref().unwrap_or_default();
        let prompt = intent_classification_prompt(user_input, &state.messages);

        let intent: UserIntent = self
            .model
            .invoke_structured(session_id, vec![Message::user(prompt)])
            .await?;

        if intent.intent_type == IntentType::Unknown {
            warn!(session_id, reasoning = %intent.reasoning, "Unrecognised intent, routing to qa_agent");
        }
        let next = route(intent.intent_type);
        info!(
            session_id,
            intent = %intent.intent_type,
            confidence = intent.confidence,
            next = %next,
            "Intent classified"
        );

        Ok(StateUpdate {
            intent: Some(intent),
            ..StateUpdate::action(NodeId::ClassifyIntent).with_next_step(next)
        })
    }

    pub async fn qa_agent(&self, state: &SessionState) -> Result<StateUpdate> {
        self.specialist::<AnswerResponse>(state, NodeId::QaAgent, IntentType::Qa, StructuredResponse::Answer)
            .await
    }

    pub async fn summarization_agent(&self, state: &SessionState) -> Result<StateUpdate> {
        self.specialist::<SummarizationResponse>(
            state,
            NodeId::SummarizationAgent,
            IntentType::Summarization,
            StructuredResponse::Summary,
        )
        .await
    }

    pub async fn calculation_agent(&self, state: &SessionState) -> Result<StateUpdate> {
        self.specialist::<CalculationResponse>(
            state,
            NodeId::CalculationAgent,
            IntentType::Calculation,
            StructuredResponse::Calculation,
        )
        .await
    }

    /// System prompt, prior history and the new user message, run through
    /// the tool loop. The user message and everything the loop generated
    /// are appended to history.
    async fn specialist<T: StructuredOutput>(
        &self,
        state: &SessionState,
        node: NodeId,
        intent: IntentType,
        wrap: fn(T) -> StructuredResponse,
    ) -> Result<StateUpdate> {
        let session_id = state.session_id.as_str();
        let user_message = Message::user(state.user_input.clone().unwrap_or_default());

        let mut prompt = Vec::with_capacity(state.messages.len() + 2);
        prompt.push(Message::system(chat_system_prompt(intent, &state.conversation_summary)));
        prompt.extend(state.messages.iter().cloned());
        prompt.push(user_message.clone());

        let outcome = self.runner.run::<T>(session_id, prompt).await?;

        let mut messages = Vec::with_capacity(outcome.messages.len() + 1);
        messages.push(user_message);
        messages.extend(outcome.messages);

        Ok(StateUpdate {
            messages,
            current_response: Some(wrap(outcome.response)),
            tools_used: outcome.tools_used,
            ..StateUpdate::action(node).with_next_step(NodeId::UpdateMemory)
        })
    }

    /// Re-summarise the whole history and replace the rolling summary.
    pub async fn update_memory(&self, state: &SessionState) -> Result<StateUpdate> {
        let session_id = state.session_id.as_str();

        let mut prompt = Vec::with_capacity(state.messages.len() + 1);
        prompt.push(Message::system(MEMORY_SUMMARY_PROMPT));
        prompt.extend(state.messages.iter().cloned());

        let memory: UpdateMemoryResponse = self.model.invoke_structured(session_id, prompt).await?;
        info!(session_id, documents = ?memory.document_ids, "Conversation memory updated");

        Ok(StateUpdate {
            conversation_summary: Some(memory.summary),
            active_documents: Some(memory.document_ids),
            ..StateUpdate::action(NodeId::UpdateMemory).with_next_step(NodeId::End)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docassist_agent::testing::{ScriptedProvider, json_response, text_response};
    use docassist_core::event::EventBus;
    use docassist_core::message::Role;
    use docassist_core::session::SessionId;
    use docassist_tools::{DocumentStore, ToolLogger, default_registry};
    use std::sync::Arc;

    fn nodes(provider: Arc<ScriptedProvider>) -> Nodes {
        let model = ModelHandle::new(provider, "mock-model", 0.1, Arc::new(EventBus::default()));
        let tools = default_registry(Arc::new(DocumentStore::sample()), ToolLogger::new(), 5);
        let runner = ReactRunner::new(model.clone(), Arc::new(tools));
        Nodes::new(model, runner)
    }

    fn state_with_input(input: &str) -> SessionState {
        let mut state = SessionState::new(SessionId::from("s1"), Some("u1".into()));
        state.user_input = Some(input.into());
        state
    }

    #[test]
    fn routing_table() {
        assert_eq!(route(IntentType::Qa), NodeId::QaAgent);
        assert_eq!(route(IntentType::Summarization), NodeId::SummarizationAgent);
        assert_eq!(route(IntentType::Calculation), NodeId::CalculationAgent);
        assert_eq!(route(IntentType::Unknown), NodeId::QaAgent);
    }

    #[tokio::test]
    async fn classify_sets_intent_and_next_step() {
        let provider = Arc::new(ScriptedProvider::new(vec![json_response(&serde_json::json!({
            "intent_type": "summarization",
            "confidence": 0.9,
            "reasoning": "asks for a summary"
        }))]));
        let update = nodes(provider.clone())
            .classify_intent(&state_with_input("Summarize contract CON-001"))
            .await
            .unwrap();

        assert_eq!(update.next_step, Some(NodeId::SummarizationAgent));
        assert_eq!(update.actions_taken, vec!["classify_intent"]);
        assert!(update.messages.is_empty());
        let prompt = &provider.requests()[0].messages[0].content;
        assert!(prompt.contains("Summarize contract CON-001"));
    }

    #[tokio::test]
    async fn unknown_intent_fails_open_to_qa() {
        let provider = Arc::new(ScriptedProvider::new(vec![json_response(&serde_json::json!({
            "intent_type": "weather",
            "confidence": 0.3,
            "reasoning": "off topic"
        }))]));
        let update = nodes(provider)
            .classify_intent(&state_with_input("Will it rain?"))
            .await
            .unwrap();
        assert_eq!(update.next_step, Some(NodeId::QaAgent));
        assert_eq!(update.intent.unwrap().intent_type, IntentType::Unknown);
    }

    #[tokio::test]
    async fn specialist_appends_user_message_and_trace() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            text_response("Five documents."),
            json_response(&serde_json::json!({
                "question": "How many documents?",
                "answer": "Five documents.",
                "sources": [],
                "confidence": 0.9
            })),
        ]));
        let mut state = state_with_input("How many documents?");
        state.conversation_summary = "Earlier: asked about INV-001.".into();

        let update = nodes(provider.clone()).qa_agent(&state).await.unwrap();

        assert_eq!(update.messages.len(), 2);
        assert_eq!(update.messages[0].role, Role::User);
        assert_eq!(update.messages[0].content, "How many documents?");
        assert_eq!(update.messages[1].role, Role::Assistant);
        assert_eq!(update.next_step, Some(NodeId::UpdateMemory));
        assert_eq!(update.actions_taken, vec!["qa_agent"]);
        assert!(matches!(update.current_response, Some(StructuredResponse::Answer(_))));

        let system = &provider.requests()[0].messages[0];
        assert_eq!(system.role, Role::System);
        assert!(system.content.contains("Earlier: asked about INV-001."));
    }

    #[tokio::test]
    async fn memory_replaces_summary_and_documents() {
        let provider = Arc::new(ScriptedProvider::new(vec![json_response(&serde_json::json!({
            "summary": "User asked about INV-001 ($22,000).",
            "document_ids": ["INV-001"]
        }))]));
        let mut state = state_with_input("What's in INV-001?");
        state.messages = vec![Message::user("What's in INV-001?"), Message::assistant("$22,000")];

        let update = nodes(provider.clone()).update_memory(&state).await.unwrap();

        assert_eq!(update.conversation_summary.as_deref(), Some("User asked about INV-001 ($22,000)."));
        assert_eq!(update.active_documents, Some(vec!["INV-001".to_string()]));
        assert_eq!(update.next_step, Some(NodeId::End));
        assert_eq!(update.actions_taken, vec!["update_memory"]);

        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.response_format.as_ref().unwrap().name, "UpdateMemoryResponse");
    }
}
