//! Document search tool — keyword, type and amount lookups over the corpus.

use async_trait::async_trait;
use docassist_core::error::ToolError;
use docassist_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::retrieval::{Document, DocumentStore};

/// Characters of content shown per hit.
const SNIPPET_LEN: usize = 160;

pub struct DocumentSearchTool {
    store: Arc<DocumentStore>,
    default_top_k: usize,
}

impl DocumentSearchTool {
    pub fn new(store: Arc<DocumentStore>, default_top_k: usize) -> Self {
        Self {
            store,
            default_top_k,
        }
    }
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &str {
        "document_search"
    }

    fn description(&self) -> &str {
        "Search the document collection. search_type 'keyword' matches text in titles and \
         content, 'type' lists documents of a category (invoice, contract, report), and \
         'amount' filters by the amount field using min_amount and/or max_amount."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Keyword(s) for keyword search, or the category for type search"
                },
                "search_type": {
                    "type": "string",
                    "enum": ["keyword", "type", "amount"],
                    "description": "How to search (default: keyword)"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum keyword results to return"
                },
                "min_amount": {
                    "type": "number",
                    "description": "Lower bound (inclusive) for amount search"
                },
                "max_amount": {
                    "type": "number",
                    "description": "Upper bound (inclusive) for amount search"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let search_type = arguments["search_type"].as_str().unwrap_or("keyword");
        let query = arguments["query"].as_str().unwrap_or("").trim();

        let hits: Vec<&Document> = match search_type {
            "keyword" => {
                if query.is_empty() {
                    return Ok(ToolResult::error("keyword search needs a 'query'"));
                }
                let top_k = arguments["top_k"]
                    .as_u64()
                    .map(|k| k as usize)
                    .filter(|k| *k > 0)
                    .unwrap_or(self.default_top_k);
                self.store.retrieve_by_keyword(query, top_k)
            }
            "type" => {
                if query.is_empty() {
                    return Ok(ToolResult::error(
                        "type search needs a 'query' such as 'invoice', 'contract' or 'report'",
                    ));
                }
                self.store.retrieve_by_type(query)
            }
            "amount" => {
                let min = arguments["min_amount"].as_f64();
                let max = arguments["max_amount"].as_f64();
                if min.is_none() && max.is_none() {
                    return Ok(ToolResult::error(
                        "amount search needs 'min_amount' and/or 'max_amount'",
                    ));
                }
                self.store.retrieve_by_amount_range(min, max)
            }
            other => {
                return Ok(ToolResult::error(format!(
                    "unknown search_type '{other}', expected keyword, type or amount"
                )));
            }
        };

        if hits.is_empty() {
            return Ok(ToolResult::ok(
                "No documents found.",
                Some(serde_json::json!({ "document_ids": [] })),
            ));
        }

        let mut output = format!("Found {} document(s):\n", hits.len());
        for doc in &hits {
            output.push_str(&format_hit(doc));
        }
        let ids: Vec<&str> = hits.iter().map(|d| d.id.as_str()).collect();

        Ok(ToolResult::ok(
            output.trim_end(),
            Some(serde_json::json!({ "document_ids": ids })),
        ))
    }
}

fn format_hit(doc: &Document) -> String {
    let amount = doc
        .amount()
        .map(|a| format!(", amount: ${a:.2}"))
        .unwrap_or_default();
    let snippet: String = doc.content.chars().take(SNIPPET_LEN).collect();
    let ellipsis = if doc.content.chars().count() > SNIPPET_LEN { "..." } else { "" };
    format!(
        "- {} | {} ({}{})\n  {}{}\n",
        doc.id,
        doc.title,
        doc.doc_type,
        amount,
        snippet.replace('\n', " "),
        ellipsis
    )
}
