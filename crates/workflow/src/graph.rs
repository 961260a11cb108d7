//! The intent-routing graph.
//!
//! ```text
//! classify_intent ─┬─> qa_agent ────────────┐
//!                  ├─> summarization_agent ─┼─> update_memory ─> end
//!                  └─> calculation_agent ───┘
//! ```
//!
//! One turn walks the graph from `classify_intent` to `end`. After each
//! node the graph checks the requested transition against the edge table,
//! applies the node's update and writes a checkpoint. A node that fails
//! aborts the turn; its update is discarded, while the checkpoints of
//! earlier nodes in the same turn remain.

use docassist_core::checkpoint::CheckpointStore;
use docassist_core::error::{Error, Result, WorkflowError};
use docassist_core::event::{DomainEvent, EventBus};
use docassist_core::session::{NodeId, SessionState, StateUpdate};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::nodes::Nodes;

/// Whether the graph has an edge `from -> to`.
pub fn edge_allowed(from: NodeId, to: NodeId) -> bool {
    match from {
        NodeId::ClassifyIntent => to.is_specialist(),
        NodeId::QaAgent | NodeId::SummarizationAgent | NodeId::CalculationAgent => {
            to == NodeId::UpdateMemory
        }
        NodeId::UpdateMemory => to == NodeId::End,
        NodeId::End => false,
    }
}

/// Result of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// State after the last node
    pub state: SessionState,
    /// Nodes executed this turn, in order
    pub path: Vec<NodeId>,
    /// Tools invoked this turn, in call order
    pub tools_used: Vec<String>,
}

pub struct Workflow {
    nodes: Nodes,
    store: Arc<dyn CheckpointStore>,
    event_bus: Arc<EventBus>,
    max_steps: usize,
}

impl Workflow {
    pub fn new(nodes: Nodes, store: Arc<dyn CheckpointStore>, event_bus: Arc<EventBus>) -> Self {
        Self {
            nodes,
            store,
            event_bus,
            max_steps: 10,
        }
    }

    /// Cap the number of nodes one turn may execute.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Run one user turn over `state`.
    pub async fn run_turn(&self, mut state: SessionState, user_input: &str) -> Result<TurnReport> {
        let session_id = state.session_id.to_string();
        info!(session_id = %session_id, "Turn started");

        state.apply(StateUpdate {
            user_input: Some(user_input.to_string()),
            next_step: Some(NodeId::ClassifyIntent),
            ..StateUpdate::default()
        });

        let mut current = NodeId::ClassifyIntent;
        let mut path = Vec::new();
        let mut tools_used = Vec::new();

        while current != NodeId::End {
            if path.len() >= self.max_steps {
                let err: Error = WorkflowError::StepLimitExceeded(self.max_steps).into();
                self.turn_failed(&session_id, current, &err);
                return Err(err);
            }

            let start = std::time::Instant::now();
            let update = match self.execute(current, &state).await {
                Ok(update) => update,
                Err(e) => {
                    self.turn_failed(&session_id, current, &e);
                    return Err(e);
                }
            };

            let next = update.next_step.unwrap_or(state.next_step);
            if !edge_allowed(current, next) {
                let err: Error = WorkflowError::IllegalTransition {
                    from: current.to_string(),
                    to: next.to_string(),
                }
                .into();
                self.turn_failed(&session_id, current, &err);
                return Err(err);
            }

            tools_used.extend(update.tools_used.iter().cloned());
            state.apply(update);
            if let Err(e) = self.store.put(current.as_str(), &state).await {
                let err: Error = e.into();
                self.turn_failed(&session_id, current, &err);
                return Err(err);
            }

            let duration_ms = start.elapsed().as_millis() as u64;
            debug!(session_id = %session_id, node = %current, next = %next, duration_ms, "Node executed");
            self.event_bus.publish(DomainEvent::NodeExecuted {
                session_id: session_id.clone(),
                node: current.to_string(),
                duration_ms,
                timestamp: chrono::Utc::now(),
            });

            path.push(current);
            current = next;
        }

        let intent = state
            .intent
            .as_ref()
            .map(|i| i.intent_type.to_string())
            .unwrap_or_default();
        info!(session_id = %session_id, intent = %intent, steps = path.len(), "Turn completed");
        self.event_bus.publish(DomainEvent::TurnCompleted {
            session_id,
            intent,
            timestamp: chrono::Utc::now(),
        });

        Ok(TurnReport {
            state,
            path,
            tools_used,
        })
    }

    async fn execute(&self, node: NodeId, state: &SessionState) -> Result<StateUpdate> {
        match node {
            NodeId::ClassifyIntent => self.nodes.classify_intent(state).await,
            NodeId::QaAgent => self.nodes.qa_agent(state).await,
            NodeId::SummarizationAgent => self.nodes.summarization_agent(state).await,
            NodeId::CalculationAgent => self.nodes.calculation_agent(state).await,
            NodeId::UpdateMemory => self.nodes.update_memory(state).await,
            NodeId::End => Ok(StateUpdate::default().with_next_step(NodeId::End)),
        }
    }

    fn turn_failed(&self, session_id: &str, node: NodeId, error: &Error) {
        warn!(session_id, node = %node, error = %error, "Turn failed");
        self.event_bus.publish(DomainEvent::TurnFailed {
            session_id: session_id.to_string(),
            node: node.to_string(),
            error_message: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docassist_agent::testing::{
        ScriptedProvider, json_response, text_response, tool_call, tool_call_response,
    };
    use docassist_agent::{ModelHandle, ReactRunner};
    use docassist_checkpoint::InMemoryCheckpointStore;
    use docassist_core::error::ProviderError;
    use docassist_core::schema::StructuredResponse;
    use docassist_core::session::SessionId;
    use docassist_tools::{DocumentStore, ToolLogger, default_registry};

    fn workflow(provider: Arc<ScriptedProvider>, store: Arc<InMemoryCheckpointStore>) -> Workflow {
        let bus = Arc::new(EventBus::default());
        let model = ModelHandle::new(provider, "mock-model", 0.1, bus.clone());
        let tools = default_registry(Arc::new(DocumentStore::sample()), ToolLogger::new(), 5);
        let runner = ReactRunner::new(model.clone(), Arc::new(tools));
        Workflow::new(Nodes::new(model, runner), store, bus)
    }

    fn intent(kind: &str) -> docassist_core::provider::ProviderResponse {
        json_response(&serde_json::json!({
            "intent_type": kind,
            "confidence": 0.9,
            "reasoning": "test"
        }))
    }

    fn memory(summary: &str, ids: &[&str]) -> docassist_core::provider::ProviderResponse {
        json_response(&serde_json::json!({ "summary": summary, "document_ids": ids }))
    }

    #[test]
    fn edge_table() {
        assert!(edge_allowed(NodeId::ClassifyIntent, NodeId::QaAgent));
        assert!(edge_allowed(NodeId::ClassifyIntent, NodeId::CalculationAgent));
        assert!(!edge_allowed(NodeId::ClassifyIntent, NodeId::UpdateMemory));
        assert!(!edge_allowed(NodeId::ClassifyIntent, NodeId::End));
        assert!(edge_allowed(NodeId::SummarizationAgent, NodeId::UpdateMemory));
        assert!(!edge_allowed(NodeId::QaAgent, NodeId::CalculationAgent));
        assert!(edge_allowed(NodeId::UpdateMemory, NodeId::End));
        assert!(!edge_allowed(NodeId::End, NodeId::ClassifyIntent));
    }

    #[tokio::test]
    async fn turn_runs_one_specialist_then_memory() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            intent("calculation"),
            tool_call_response(vec![tool_call("calculator", serde_json::json!({"expression": "2 + 2"}))]),
            text_response("2 + 2 is 4."),
            json_response(&serde_json::json!({
                "expression": "2 + 2", "result": 4.0, "explanation": "2 + 2 = 4", "document_ids": []
            })),
            memory("User asked for 2 + 2.", &[]),
        ]));
        let store = Arc::new(InMemoryCheckpointStore::new());
        let wf = workflow(provider, store.clone());
        let mut events = wf.event_bus().subscribe();

        let state = SessionState::new(SessionId::from("s1"), None);
        let report = wf.run_turn(state, "What is 2 + 2?").await.unwrap();

        assert_eq!(
            report.path,
            vec![NodeId::ClassifyIntent, NodeId::CalculationAgent, NodeId::UpdateMemory]
        );
        assert_eq!(report.tools_used, vec!["calculator"]);
        assert_eq!(report.state.next_step, NodeId::End);
        assert_eq!(
            report.state.actions_taken,
            vec!["classify_intent", "calculation_agent", "update_memory"]
        );
        assert_eq!(report.state.conversation_summary, "User asked for 2 + 2.");
        assert!(matches!(report.state.current_response, Some(StructuredResponse::Calculation(_))));

        let history = store.history(&SessionId::from("s1")).await.unwrap();
        let nodes: Vec<&str> = history.iter().map(|c| c.node.as_str()).collect();
        assert_eq!(nodes, vec!["classify_intent", "calculation_agent", "update_memory"]);

        let first = events.recv().await.unwrap();
        assert!(matches!(first.as_ref(), DomainEvent::ResponseGenerated { .. }));
    }

    #[tokio::test]
    async fn failing_node_keeps_earlier_checkpoints() {
        let provider = Arc::new(ScriptedProvider::with_results(vec![
            Ok(intent("qa")),
            Err(ProviderError::Timeout("model took too long".into())),
        ]));
        let store = Arc::new(InMemoryCheckpointStore::new());
        let wf = workflow(provider, store.clone());

        let state = SessionState::new(SessionId::from("s2"), None);
        let err = wf.run_turn(state, "What's in INV-001?").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Timeout(_))));

        let latest = store.latest(&SessionId::from("s2")).await.unwrap().unwrap();
        assert_eq!(latest.node, "classify_intent");
        assert_eq!(latest.state.next_step, NodeId::QaAgent);
        assert_eq!(latest.state.actions_taken, vec!["classify_intent"]);
        assert!(latest.state.messages.is_empty());
    }

    #[tokio::test]
    async fn schema_mismatch_aborts_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("probably a question")]));
        let store = Arc::new(InMemoryCheckpointStore::new());
        let wf = workflow(provider, store.clone());
        let mut events = wf.event_bus().subscribe();

        let state = SessionState::new(SessionId::from("s3"), None);
        let err = wf.run_turn(state, "hello").await.unwrap_err();
        assert!(matches!(err, Error::StructuredOutput { .. }));
        assert!(store.latest(&SessionId::from("s3")).await.unwrap().is_none());

        // ResponseGenerated, then TurnFailed
        let _ = events.recv().await.unwrap();
        match events.recv().await.unwrap().as_ref() {
            DomainEvent::TurnFailed { node, .. } => assert_eq!(node, "classify_intent"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn step_limit_stops_the_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            intent("qa"),
            text_response("answer"),
            json_response(&serde_json::json!({
                "question": "q", "answer": "answer", "sources": [], "confidence": 0.5
            })),
        ]));
        let store = Arc::new(InMemoryCheckpointStore::new());
        let wf = workflow(provider, store).with_max_steps(2);

        let state = SessionState::new(SessionId::from("s4"), None);
        let err = wf.run_turn(state, "question").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Workflow(WorkflowError::StepLimitExceeded(2))
        ));
    }

    #[tokio::test]
    async fn second_turn_sees_first_turn_history() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            intent("qa"),
            text_response("INV-001 totals $22,000."),
            json_response(&serde_json::json!({
                "question": "total?", "answer": "$22,000", "sources": ["INV-001"], "confidence": 0.9
            })),
            memory("INV-001 is $22,000.", &["INV-001"]),
            intent("qa"),
            text_response("Yes."),
            json_response(&serde_json::json!({
                "question": "sure?", "answer": "Yes.", "sources": ["INV-001"], "confidence": 0.9
            })),
            memory("Confirmed INV-001.", &["INV-001"]),
        ]));
        let store = Arc::new(InMemoryCheckpointStore::new());
        let wf = workflow(provider.clone(), store);

        let state = SessionState::new(SessionId::from("s5"), None);
        let first = wf.run_turn(state, "What's the total of INV-001?").await.unwrap();
        assert_eq!(first.state.messages.len(), 2);
        assert_eq!(first.state.active_documents, vec!["INV-001"]);

        let second = wf.run_turn(first.state, "Are you sure?").await.unwrap();
        assert_eq!(second.state.messages.len(), 4);
        assert_eq!(second.state.actions_taken.len(), 6);

        // Classifier prompt on turn two includes turn one
        let classify = &provider.requests()[4].messages[0].content;
        assert!(classify.contains("What's the total of INV-001?"));
    }
}
