//! Document reader tool — returns one document in full.

use async_trait::async_trait;
use docassist_core::error::ToolError;
use docassist_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::retrieval::DocumentStore;

pub struct DocumentReaderTool {
    store: Arc<DocumentStore>,
}

impl DocumentReaderTool {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DocumentReaderTool {
    fn name(&self) -> &str {
        "document_reader"
    }

    fn description(&self) -> &str {
        "Read the full content of a document by its ID (e.g. INV-001, CON-001, RPT-001)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "doc_id": {
                    "type": "string",
                    "description": "The document ID"
                }
            },
            "required": ["doc_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let Some(doc_id) = arguments["doc_id"].as_str() else {
            return Ok(ToolResult::error("missing 'doc_id' argument"));
        };

        let Some(doc) = self.store.get_document_by_id(doc_id) else {
            return Ok(ToolResult::error(format!("Document '{doc_id}' not found")));
        };

        let mut output = format!(
            "Document ID: {}\nTitle: {}\nType: {}\n",
            doc.id, doc.title, doc.doc_type
        );
        if !doc.metadata.is_empty() {
            let facts: Vec<String> = doc
                .metadata
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            output.push_str(&format!("Metadata: {}\n", facts.join(", ")));
        }
        output.push_str(&format!("\n{}", doc.content));

        Ok(ToolResult::ok(
            output,
            Some(serde_json::json!({ "document_ids": [doc.id] })),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> DocumentReaderTool {
        DocumentReaderTool::new(Arc::new(DocumentStore::sample()))
    }

    #[tokio::test]
    async fn reads_known_document() {
        let result = tool()
            .execute(serde_json::json!({"doc_id": "INV-001"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("Document ID: INV-001"));
        assert!(result.output.contains("Total Amount: $22,000"));
        assert!(result.output.contains("amount=22000"));
    }

    #[tokio::test]
    async fn unknown_document_is_not_found_text() {
        let result = tool()
            .execute(serde_json::json!({"doc_id": "INV-404"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("not found"));
    }

    #[tokio::test]
    async fn missing_argument_is_error_text() {
        let result = tool().execute(serde_json::json!({})).await.unwrap();
        assert!(!result.success);
    }
}
