//! Session state and its reducer.
//!
//! Nodes never mutate [`SessionState`] directly. Each node returns a
//! [`StateUpdate`] and [`SessionState::apply`] folds it in with a fixed
//! per-field rule:
//!
//! | field                  | rule    |
//! |------------------------|---------|
//! | `messages`             | append  |
//! | `actions_taken`        | append  |
//! | `tools_used`           | append  |
//! | everything else        | replace when present |

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;
use crate::schema::{StructuredResponse, UserIntent};

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    #[default]
    ClassifyIntent,
    QaAgent,
    SummarizationAgent,
    CalculationAgent,
    UpdateMemory,
    End,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassifyIntent => "classify_intent",
            Self::QaAgent => "qa_agent",
            Self::SummarizationAgent => "summarization_agent",
            Self::CalculationAgent => "calculation_agent",
            Self::UpdateMemory => "update_memory",
            Self::End => "end",
        }
    }

    /// True for the three intent-specific nodes.
    pub fn is_specialist(&self) -> bool {
        matches!(
            self,
            Self::QaAgent | Self::SummarizationAgent | Self::CalculationAgent
        )
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the graph knows about one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: SessionId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Chronological history, append-only
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Raw text of the latest user turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<String>,

    /// Classification of the latest user turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<UserIntent>,

    /// Where the router goes next
    #[serde(default)]
    pub next_step: NodeId,

    /// Rolling summary, replaced wholesale by the memory node
    #[serde(default)]
    pub conversation_summary: String,

    /// Document ids the conversation currently refers to
    #[serde(default)]
    pub active_documents: Vec<String>,

    /// Latest specialist output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_response: Option<StructuredResponse>,

    /// Every tool invoked in this session, in call order
    #[serde(default)]
    pub tools_used: Vec<String>,

    /// Every node executed in this session, in execution order
    #[serde(default)]
    pub actions_taken: Vec<String>,
}

impl SessionState {
    /// A fresh state for a new session.
    pub fn new(session_id: SessionId, user_id: Option<String>) -> Self {
        Self {
            session_id,
            user_id,
            messages: Vec::new(),
            user_input: None,
            intent: None,
            next_step: NodeId::ClassifyIntent,
            conversation_summary: String::new(),
            active_documents: Vec::new(),
            current_response: None,
            tools_used: Vec::new(),
            actions_taken: Vec::new(),
        }
    }

    /// Fold a node's update into this state.
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            messages,
            user_input,
            intent,
            next_step,
            conversation_summary,
            active_documents,
            current_response,
            tools_used,
            actions_taken,
        } = update;

        self.messages.extend(messages);
        self.tools_used.extend(tools_used);
        self.actions_taken.extend(actions_taken);

        if let Some(v) = user_input {
            self.user_input = Some(v);
        }
        if let Some(v) = intent {
            self.intent = Some(v);
        }
        if let Some(v) = next_step {
            self.next_step = v;
        }
        if let Some(v) = conversation_summary {
            self.conversation_summary = v;
        }
        if let Some(v) = active_documents {
            self.active_documents = v;
        }
        if let Some(v) = current_response {
            self.current_response = Some(v);
        }
    }
}

/// A partial update returned by a node.
///
/// Vec fields are appended; `Option` fields replace the current value when
/// `Some` and leave it alone when `None`.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub user_input: Option<String>,
    pub intent: Option<UserIntent>,
    pub next_step: Option<NodeId>,
    pub conversation_summary: Option<String>,
    pub active_documents: Option<Vec<String>>,
    pub current_response: Option<StructuredResponse>,
    pub tools_used: Vec<String>,
    pub actions_taken: Vec<String>,
}

impl StateUpdate {
    /// An update that only records the node that produced it.
    pub fn action(node: NodeId) -> Self {
        Self {
            actions_taken: vec![node.as_str().to_string()],
            ..Self::default()
        }
    }

    pub fn with_next_step(mut self, next: NodeId) -> Self {
        self.next_step = Some(next);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AnswerResponse, IntentType};

    fn intent(kind: IntentType) -> UserIntent {
        UserIntent {
            intent_type: kind,
            confidence: 0.9,
            reasoning: "test".into(),
            entities: vec![],
        }
    }

    #[test]
    fn new_state_starts_at_classifier() {
        let state = SessionState::new(SessionId::from("s1"), Some("u1".into()));
        assert_eq!(state.next_step, NodeId::ClassifyIntent);
        assert!(state.messages.is_empty());
        assert!(state.conversation_summary.is_empty());
    }

    #[test]
    fn list_fields_append() {
        let mut state = SessionState::new(SessionId::new(), None);
        state.apply(StateUpdate {
            messages: vec![Message::user("first")],
            tools_used: vec!["calculator".into()],
            ..StateUpdate::action(NodeId::ClassifyIntent)
        });
        state.apply(StateUpdate {
            messages: vec![Message::assistant("second")],
            tools_used: vec!["document_reader".into()],
            ..StateUpdate::action(NodeId::QaAgent)
        });

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].content, "first");
        assert_eq!(state.tools_used, vec!["calculator", "document_reader"]);
        assert_eq!(state.actions_taken, vec!["classify_intent", "qa_agent"]);
    }

    #[test]
    fn scalar_fields_replace_only_when_present() {
        let mut state = SessionState::new(SessionId::new(), None);
        state.apply(StateUpdate {
            conversation_summary: Some("first summary".into()),
            active_documents: Some(vec!["INV-001".into()]),
            intent: Some(intent(IntentType::Qa)),
            ..StateUpdate::default()
        });
        state.apply(StateUpdate {
            conversation_summary: Some("second summary".into()),
            ..StateUpdate::default()
        });

        assert_eq!(state.conversation_summary, "second summary");
        assert_eq!(state.active_documents, vec!["INV-001"]);
        assert_eq!(state.intent.unwrap().intent_type, IntentType::Qa);
    }

    #[test]
    fn current_response_is_replaced() {
        let mut state = SessionState::new(SessionId::new(), None);
        let answer = |text: &str| {
            StructuredResponse::Answer(AnswerResponse {
                question: "q".into(),
                answer: text.into(),
                sources: vec![],
                confidence: 1.0,
            })
        };
        state.apply(StateUpdate { current_response: Some(answer("one")), ..Default::default() });
        state.apply(StateUpdate { current_response: Some(answer("two")), ..Default::default() });
        assert_eq!(state.current_response.unwrap().text(), "two");
    }

    #[test]
    fn next_step_serializes_snake_case() {
        let json = serde_json::to_string(&NodeId::SummarizationAgent).unwrap();
        assert_eq!(json, "\"summarization_agent\"");
        assert!(NodeId::CalculationAgent.is_specialist());
        assert!(!NodeId::UpdateMemory.is_specialist());
    }

    #[test]
    fn state_roundtrips_through_json() {
        let mut state = SessionState::new(SessionId::from("abc"), Some("user".into()));
        state.apply(StateUpdate {
            messages: vec![Message::user("hello")],
            next_step: Some(NodeId::End),
            ..StateUpdate::default()
        });
        let json = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.session_id, SessionId::from("abc"));
        assert_eq!(back.next_step, NodeId::End);
        assert_eq!(back.messages.len(), 1);
    }
}
