//! Built-in tools for the document assistant.
//!
//! Specialist agents can do arithmetic with the calculator and look things
//! up in the document collection: search, read one document, or get
//! collection-wide statistics. Every call goes through a shared
//! [`ToolLogger`].

pub mod calculator;
pub mod document_reader;
pub mod document_search;
pub mod document_statistics;
pub mod logger;
pub mod retrieval;

pub use logger::{LoggedTool, ToolInvocation, ToolLogger};
pub use retrieval::{Document, DocumentStats, DocumentStore, DocumentType};

use docassist_core::tool::{Tool, ToolRegistry};
use std::sync::Arc;

/// Create the registry offered to the specialist agents.
///
/// Each tool is wrapped so its calls are recorded in `logger`.
pub fn default_registry(
    store: Arc<DocumentStore>,
    logger: ToolLogger,
    default_top_k: usize,
) -> ToolRegistry {
    let tools: Vec<Box<dyn Tool>> = vec![
        Box::new(calculator::CalculatorTool),
        Box::new(document_search::DocumentSearchTool::new(store.clone(), default_top_k)),
        Box::new(document_reader::DocumentReaderTool::new(store.clone())),
        Box::new(document_statistics::DocumentStatisticsTool::new(store)),
    ];

    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(Box::new(LoggedTool::new(tool, logger.clone())));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use docassist_core::tool::ToolCall;

    #[test]
    fn registry_has_fixed_catalog() {
        let registry = default_registry(Arc::new(DocumentStore::sample()), ToolLogger::new(), 5);
        assert_eq!(
            registry.names(),
            vec!["calculator", "document_reader", "document_search", "document_statistics"]
        );
    }

    #[tokio::test]
    async fn registry_calls_are_logged() {
        let logger = ToolLogger::new();
        let registry = default_registry(Arc::new(DocumentStore::sample()), logger.clone(), 5);
        let call = ToolCall {
            id: "call_1".into(),
            name: "document_statistics".into(),
            arguments: serde_json::json!({}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert_eq!(result.call_id, "call_1");
        assert_eq!(logger.invocations()[0].tool_name, "document_statistics");
    }
}
