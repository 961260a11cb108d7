//! # Document Assistant Core
//!
//! Domain types, traits, and error definitions for the document assistant.
//! This crate has no framework dependencies beyond serde: it defines the
//! model that every other crate implements against.
//!
//! ## Layout
//!
//! - [`provider`] / [`message`]: the LLM boundary
//! - [`tool`]: the tool trait and registry offered to specialist agents
//! - [`schema`]: structured records the model must produce
//! - [`session`]: per-conversation state and its reducer
//! - [`checkpoint`]: durability trait for session state
//! - [`event`]: domain events for observers

pub mod checkpoint;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod schema;
pub mod session;
pub mod structured;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat};
pub use schema::{
    AnswerResponse, CalculationResponse, IntentType, StructuredResponse, SummarizationResponse,
    UpdateMemoryResponse, UserIntent,
};
pub use session::{NodeId, SessionId, SessionState, StateUpdate};
pub use structured::StructuredOutput;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
