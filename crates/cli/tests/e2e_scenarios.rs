//! End-to-end tests for the document assistant.
//!
//! These drive the full pipeline (façade, graph, specialists, tools and
//! checkpoints) with a scripted model standing in for the LLM.

use std::sync::Arc;

use docassist_agent::testing::{
    ScriptedProvider, json_response, text_response, tool_call, tool_call_response,
};
use docassist_checkpoint::{InMemoryCheckpointStore, SqliteCheckpointStore};
use docassist_config::AppConfig;
use docassist_core::checkpoint::CheckpointStore;
use docassist_core::message::Role;
use docassist_core::provider::ProviderResponse;
use docassist_core::schema::IntentType;
use docassist_workflow::DocumentAssistant;

// ── Scripted turns ───────────────────────────────────────────────────────

fn classify(kind: &str, reasoning: &str) -> ProviderResponse {
    json_response(&serde_json::json!({
        "intent_type": kind,
        "confidence": 0.95,
        "reasoning": reasoning,
        "entities": []
    }))
}

fn memory(summary: &str, ids: &[&str]) -> ProviderResponse {
    json_response(&serde_json::json!({ "summary": summary, "document_ids": ids }))
}

/// "What's the total amount in invoice INV-001?" answered from the document.
fn invoice_question_turn() -> Vec<ProviderResponse> {
    vec![
        classify("qa", "asks for a figure from a document"),
        tool_call_response(vec![tool_call(
            "document_reader",
            serde_json::json!({"doc_id": "INV-001"}),
        )]),
        text_response("The total amount in invoice INV-001 is $22,000."),
        json_response(&serde_json::json!({
            "question": "What's the total amount in invoice INV-001?",
            "answer": "The total amount in invoice INV-001 is $22,000.",
            "sources": ["INV-001"],
            "confidence": 0.95
        })),
        memory("The user asked for the total of INV-001, which is $22,000.", &["INV-001"]),
    ]
}

/// "Calculate 15% of that amount" resolved against the previous turn.
fn percentage_turn() -> Vec<ProviderResponse> {
    vec![
        classify("calculation", "asks for a percentage"),
        tool_call_response(vec![tool_call(
            "calculator",
            serde_json::json!({"expression": "22000 * 0.15"}),
        )]),
        text_response("15% of $22,000 is $3,300."),
        json_response(&serde_json::json!({
            "expression": "22000 * 0.15",
            "result": 3300.0,
            "explanation": "15% of the INV-001 total ($22,000) is $3,300.",
            "document_ids": ["INV-001"]
        })),
        memory(
            "The user asked about INV-001 ($22,000) and 15% of it ($3,300).",
            &["INV-001"],
        ),
    ]
}

// ═══════════════════════════════════════════════════════════════════════
// Two-turn financial analysis
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_question_then_calculation() {
    let mut script = invoice_question_turn();
    script.extend(percentage_turn());
    let provider = Arc::new(ScriptedProvider::new(script));
    let store = Arc::new(InMemoryCheckpointStore::new());
    let mut assistant = DocumentAssistant::new(provider.clone(), store.clone(), &AppConfig::default());
    let session_id = assistant.start_session("test_user_001").await.unwrap();

    // Turn 1: qa with a source
    let first = assistant
        .process_message("What's the total amount in invoice INV-001?")
        .await;
    assert!(first.success, "{:?}", first.error);
    assert_eq!(first.intent.as_ref().unwrap().intent_type, IntentType::Qa);
    assert!(!first.sources.is_empty());
    assert_eq!(first.tools_used, vec!["document_reader"]);
    assert!(first.response.unwrap().contains("$22,000"));

    // Turn 2: calculation with the calculator
    let second = assistant.process_message("Calculate 15% of that amount").await;
    assert!(second.success, "{:?}", second.error);
    assert_eq!(second.intent.as_ref().unwrap().intent_type, IntentType::Calculation);
    assert!(second.tools_used.contains(&"calculator".to_string()));
    assert_eq!(
        second.actions_taken,
        vec![
            "classify_intent",
            "qa_agent",
            "update_memory",
            "classify_intent",
            "calculation_agent",
            "update_memory"
        ]
    );
    assert!(second.summary.contains("$3,300"));
    assert_eq!(provider.remaining(), 0);

    // Tool calls went through the shared logger
    let logged: Vec<String> = assistant
        .tool_logger()
        .invocations()
        .into_iter()
        .map(|i| i.tool_name)
        .collect();
    assert_eq!(logged, vec!["document_reader", "calculator"]);
    assert!(
        assistant.tool_logger().invocations()[1]
            .output
            .contains("22000 * 0.15 = 3300")
    );

    // The calculation specialist saw turn one in its prompt
    let requests = provider.requests();
    let calc_prompt = &requests[6].messages;
    assert!(calc_prompt[0].content.contains("calculator tool"));
    assert!(calc_prompt[0].content.contains("INV-001, which is $22,000"));
    assert!(calc_prompt.iter().any(|m| m.role == Role::Tool));

    // State is cumulative and checkpointed
    let state = assistant.session_state().await.unwrap();
    assert_eq!(state.tools_used, vec!["document_reader", "calculator"]);
    assert_eq!(state.active_documents, vec!["INV-001"]);
    let history = store.history(&session_id).await.unwrap();
    assert_eq!(history.len(), 7); // __start__ + 2 turns of 3 nodes
    assert_eq!(history[0].node, "__start__");
}

// ═══════════════════════════════════════════════════════════════════════
// Routing properties
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_unrecognised_intent_takes_qa_path() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        classify("greeting", "user says hello"),
        text_response("Hello! Ask me about your invoices, contracts or reports."),
        json_response(&serde_json::json!({
            "question": "hello",
            "answer": "Hello! Ask me about your invoices, contracts or reports.",
            "sources": [],
            "confidence": 0.6
        })),
        memory("The user greeted the assistant.", &[]),
    ]));
    let mut assistant = DocumentAssistant::new(
        provider,
        Arc::new(InMemoryCheckpointStore::new()),
        &AppConfig::default(),
    );
    assistant.start_session("u").await.unwrap();

    let result = assistant.process_message("hello").await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.intent.unwrap().intent_type, IntentType::Unknown);
    assert_eq!(result.actions_taken, vec!["classify_intent", "qa_agent", "update_memory"]);
}

#[tokio::test]
async fn e2e_summarization_reads_the_contract() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        classify("summarization", "asks for a summary"),
        tool_call_response(vec![tool_call(
            "document_reader",
            serde_json::json!({"doc_id": "CON-001"}),
        )]),
        text_response("A service agreement worth $214,500."),
        json_response(&serde_json::json!({
            "summary": "Service agreement between two parties.",
            "key_points": ["Total value $214,500"],
            "document_ids": ["CON-001"]
        })),
        memory("The user asked for a summary of CON-001.", &["CON-001"]),
    ]));
    let mut assistant = DocumentAssistant::new(
        provider,
        Arc::new(InMemoryCheckpointStore::new()),
        &AppConfig::default(),
    );
    assistant.start_session("test_user_002").await.unwrap();

    let result = assistant.process_message("Summarize contract CON-001").await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.intent.unwrap().intent_type, IntentType::Summarization);
    assert_eq!(result.sources, vec!["CON-001"]);
    let response = result.response.unwrap();
    assert!(response.starts_with("Service agreement between two parties."));
    assert!(response.contains("- Total value $214,500"));
}

// ═══════════════════════════════════════════════════════════════════════
// Persistence
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_conversation_resumes_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sessions").join("state.sqlite");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let config = AppConfig::default();

    let session_id = {
        let store = Arc::new(SqliteCheckpointStore::open(&path).await.unwrap());
        let provider = Arc::new(ScriptedProvider::new(invoice_question_turn()));
        let mut assistant = DocumentAssistant::new(provider, store, &config);
        let id = assistant.start_session("test_user_001").await.unwrap();
        assert!(assistant.process_message("What's the total amount in invoice INV-001?").await.success);
        id
    };

    let store = Arc::new(SqliteCheckpointStore::open(&path).await.unwrap());
    let provider = Arc::new(ScriptedProvider::new(percentage_turn()));
    let mut assistant = DocumentAssistant::new(provider, store.clone(), &config);
    assistant.resume_session(&session_id).await.unwrap();

    let result = assistant.process_message("Calculate 15% of that amount").await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.intent.unwrap().intent_type, IntentType::Calculation);
    assert_eq!(result.tools_used, vec!["calculator"]);

    let sessions = store.sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].checkpoints, 7);
    assert_eq!(sessions[0].last_node, "update_memory");
    assert_eq!(sessions[0].user_id.as_deref(), Some("test_user_001"));
}
