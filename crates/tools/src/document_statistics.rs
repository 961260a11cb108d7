//! Document statistics tool — corpus-wide counts and invoice totals.

use async_trait::async_trait;
use docassist_core::error::ToolError;
use docassist_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::calculator::format_number;
use crate::retrieval::DocumentStore;

pub struct DocumentStatisticsTool {
    store: Arc<DocumentStore>,
}

impl DocumentStatisticsTool {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DocumentStatisticsTool {
    fn name(&self) -> &str {
        "document_statistics"
    }

    fn description(&self) -> &str {
        "Get statistics about the document collection: total count, count per type, \
         and the total and average invoice amount."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let stats = self.store.get_statistics();

        let types: Vec<String> = stats
            .document_types
            .iter()
            .map(|(t, n)| format!("{t}: {n}"))
            .collect();
        let output = format!(
            "Total documents: {}\nBy type: {}\nTotal invoice amount: ${}\nAverage invoice amount: ${}",
            stats.total_documents,
            types.join(", "),
            format_number(stats.total_invoice_amount),
            format_number(stats.average_invoice_amount),
        );

        let data = serde_json::to_value(&stats)
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;
        Ok(ToolResult::ok(output, Some(data)))
    }
}
