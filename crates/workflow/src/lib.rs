//! Intent-routing workflow for the document assistant.
//!
//! A turn classifies the user's request, hands it to exactly one specialist
//! (question answering, summarization or calculation), then refreshes the
//! rolling conversation memory. State is checkpointed after every node.
//!
//! [`DocumentAssistant`] is the entry point for callers; [`Workflow`] is the
//! graph it drives.

pub mod assistant;
pub mod graph;
pub mod nodes;

pub use assistant::{DocumentAssistant, ProcessResult, START_NODE};
pub use graph::{TurnReport, Workflow, edge_allowed};
pub use nodes::{Nodes, route};
