//! Tool-call logging.
//!
//! Every tool in the default registry is wrapped in [`LoggedTool`], which
//! records each invocation into a shared [`ToolLogger`]. The log is for
//! inspection only; nothing reads it back to make decisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docassist_core::error::ToolError;
use docassist_core::tool::{Tool, ToolResult};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// One recorded tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub input: serde_json::Value,
    pub output: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Shared, cloneable log of tool invocations.
#[derive(Debug, Clone, Default)]
pub struct ToolLogger {
    entries: Arc<Mutex<Vec<ToolInvocation>>>,
}

impl ToolLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self, tool_name: &str, input: serde_json::Value, output: &str, success: bool) {
        if success {
            debug!(tool = tool_name, "Tool call succeeded");
        } else {
            warn!(tool = tool_name, output, "Tool call failed");
        }
        let entry = ToolInvocation {
            tool_name: tool_name.to_string(),
            input,
            output: output.to_string(),
            success,
            timestamp: Utc::now(),
        };
        // A poisoned log is still a usable log
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
    }

    /// A snapshot of everything logged so far, oldest first.
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Wraps a tool so every call lands in a [`ToolLogger`].
pub struct LoggedTool {
    inner: Box<dyn Tool>,
    logger: ToolLogger,
}

impl LoggedTool {
    pub fn new(inner: Box<dyn Tool>, logger: ToolLogger) -> Self {
        Self { inner, logger }
    }
}

#[async_trait]
impl Tool for LoggedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.inner.parameters_schema()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let result = self.inner.execute(arguments.clone()).await;
        match &result {
            Ok(r) => self.logger.log(self.inner.name(), arguments, &r.output, r.success),
            Err(e) => self.logger.log(self.inner.name(), arguments, &e.to_string(), false),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CalculatorTool;

    #[tokio::test]
    async fn logged_tool_records_success_and_failure() {
        let logger = ToolLogger::new();
        let tool = LoggedTool::new(Box::new(CalculatorTool), logger.clone());

        tool.execute(serde_json::json!({"expression": "2 + 2"})).await.unwrap();
        tool.execute(serde_json::json!({"expression": "two plus two"})).await.unwrap();

        let log = logger.invocations();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].tool_name, "calculator");
        assert!(log[0].success);
        assert_eq!(log[0].output, "2 + 2 = 4");
        assert!(!log[1].success);
        assert!(log[1].output.starts_with("Error:"));
    }

    #[test]
    fn clones_share_entries() {
        let logger = ToolLogger::new();
        let other = logger.clone();
        other.log("document_reader", serde_json::json!({"doc_id": "INV-001"}), "ok", true);
        assert_eq!(logger.len(), 1);
        logger.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn wrapper_keeps_definition() {
        let tool = LoggedTool::new(Box::new(CalculatorTool), ToolLogger::new());
        assert_eq!(tool.to_definition().name, "calculator");
    }
}
