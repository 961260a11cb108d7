//! The session façade.
//!
//! [`DocumentAssistant`] owns the workflow and tracks which session is
//! active. Each call to [`DocumentAssistant::process_message`] loads the
//! latest checkpoint for that session, runs one turn and reshapes the
//! terminal state into a [`ProcessResult`]. Errors never escape
//! `process_message`; they come back as `success = false`.

use docassist_agent::{ModelHandle, ReactRunner};
use docassist_config::AppConfig;
use docassist_core::checkpoint::CheckpointStore;
use docassist_core::error::{Result, WorkflowError};
use docassist_core::event::EventBus;
use docassist_core::provider::Provider;
use docassist_core::schema::UserIntent;
use docassist_core::session::{SessionId, SessionState};
use docassist_tools::{DocumentStore, ToolLogger, default_registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::graph::{TurnReport, Workflow};
use crate::nodes::Nodes;

/// Checkpoint node name written when a session is created.
pub const START_NODE: &str = "__start__";

/// What the caller gets back for one message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    /// User-facing text of the specialist's response
    pub response: Option<String>,
    pub intent: Option<UserIntent>,
    /// Document ids the response is based on
    pub sources: Vec<String>,
    /// Tools invoked during this turn
    pub tools_used: Vec<String>,
    /// Every node executed in the session so far
    pub actions_taken: Vec<String>,
    /// Rolling conversation summary after this turn
    pub summary: String,
    pub error: Option<String>,
}

impl ProcessResult {
    fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    fn from_report(report: TurnReport) -> Self {
        let state = report.state;
        let (response, sources) = match &state.current_response {
            Some(r) => (Some(r.text()), r.sources().to_vec()),
            None => (None, Vec::new()),
        };
        Self {
            success: true,
            response,
            intent: state.intent,
            sources,
            tools_used: report.tools_used,
            actions_taken: state.actions_taken,
            summary: state.conversation_summary,
            error: None,
        }
    }
}

pub struct DocumentAssistant {
    workflow: Workflow,
    tool_logger: ToolLogger,
    current_session: Option<SessionId>,
}

impl DocumentAssistant {
    /// An assistant over the built-in sample documents.
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn CheckpointStore>,
        config: &AppConfig,
    ) -> Self {
        Self::with_documents(provider, store, config, Arc::new(DocumentStore::sample()))
    }

    pub fn with_documents(
        provider: Arc<dyn Provider>,
        store: Arc<dyn CheckpointStore>,
        config: &AppConfig,
        documents: Arc<DocumentStore>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let tool_logger = ToolLogger::new();
        let tools = default_registry(documents, tool_logger.clone(), config.retriever.default_top_k);

        let model = ModelHandle::from_config(provider, config, event_bus.clone());
        let runner = ReactRunner::new(model.clone(), Arc::new(tools))
            .with_max_iterations(config.agent.max_tool_iterations);
        let workflow = Workflow::new(Nodes::new(model, runner), store, event_bus)
            .with_max_steps(config.agent.max_graph_steps);

        Self {
            workflow,
            tool_logger,
            current_session: None,
        }
    }

    /// Create and checkpoint a new session, making it the active one.
    pub async fn start_session(&mut self, user_id: &str) -> Result<SessionId> {
        let session_id = SessionId::new();
        let state = SessionState::new(session_id.clone(), Some(user_id.to_string()));
        self.workflow.store().put(START_NODE, &state).await?;

        info!(session_id = %session_id, user_id, "Session started");
        self.current_session = Some(session_id.clone());
        Ok(session_id)
    }

    /// Make an existing session the active one.
    pub async fn resume_session(&mut self, session_id: &SessionId) -> Result<SessionState> {
        let state = self.load(session_id).await?;
        info!(
            session_id = %session_id,
            messages = state.messages.len(),
            "Session resumed"
        );
        self.current_session = Some(session_id.clone());
        Ok(state)
    }

    /// Run one user message through the workflow.
    pub async fn process_message(&mut self, text: &str) -> ProcessResult {
        match self.try_process(text).await {
            Ok(report) => ProcessResult::from_report(report),
            Err(e) => {
                warn!(error = %e, "Message processing failed");
                ProcessResult::failure(e)
            }
        }
    }

    async fn try_process(&self, text: &str) -> Result<TurnReport> {
        let session_id = self
            .current_session
            .as_ref()
            .ok_or(WorkflowError::NoActiveSession)?;
        let state = self.load(session_id).await?;
        self.workflow.run_turn(state, text).await
    }

    /// Latest persisted state of the active session.
    pub async fn session_state(&self) -> Result<SessionState> {
        let session_id = self
            .current_session
            .as_ref()
            .ok_or(WorkflowError::NoActiveSession)?;
        self.load(session_id).await
    }

    async fn load(&self, session_id: &SessionId) -> Result<SessionState> {
        self.workflow
            .store()
            .latest(session_id)
            .await?
            .map(|checkpoint| checkpoint.state)
            .ok_or_else(|| WorkflowError::SessionNotFound(session_id.to_string()).into())
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.current_session.as_ref()
    }

    pub fn tool_logger(&self) -> &ToolLogger {
        &self.tool_logger
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        self.workflow.event_bus()
    }
}
