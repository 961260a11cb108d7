pub mod chat;
pub mod docs;
pub mod onboard;
pub mod scenarios;
pub mod sessions;

use docassist_config::{AppConfig, CheckpointBackend};
use docassist_core::checkpoint::CheckpointStore;
use docassist_core::event::DomainEvent;
use docassist_workflow::DocumentAssistant;
use std::sync::Arc;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct GlobalOpts {
    pub verbose: bool,
    pub ephemeral: bool,
}

pub fn load_config(opts: GlobalOpts) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if opts.ephemeral {
        config.checkpoint.backend = CheckpointBackend::Memory;
    }
    Ok(config)
}

pub async fn open_store(
    config: &AppConfig,
) -> Result<Arc<dyn CheckpointStore>, Box<dyn std::error::Error>> {
    let store = docassist_checkpoint::build_from_config(&config.checkpoint)
        .await
        .map_err(|e| format!("Failed to open checkpoint store: {e}"))?;
    Ok(store)
}

/// Print setup help and fail when no API key is configured.
pub fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.has_api_key() {
        return Ok(());
    }
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables (or put it in .env):");
    eprintln!("    OPENAI_API_KEY=sk-...");
    eprintln!("    DOCASSIST_API_KEY=sk-...");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}

pub async fn build_assistant(
    config: &AppConfig,
) -> Result<DocumentAssistant, Box<dyn std::error::Error>> {
    require_api_key(config)?;
    let provider = docassist_providers::build_from_config(config)?;
    let store = open_store(config).await?;
    Ok(DocumentAssistant::new(provider, store, config))
}

/// Echo workflow events to stderr while the assistant runs.
pub fn spawn_event_printer(assistant: &DocumentAssistant) {
    let mut rx = assistant.event_bus().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event.as_ref() {
                DomainEvent::NodeExecuted { node, duration_ms, .. } => {
                    eprintln!("  · {node} ({duration_ms} ms)");
                }
                DomainEvent::ToolExecuted {
                    tool_name, success, ..
                } => {
                    let mark = if *success { "ok" } else { "failed" };
                    eprintln!("  · tool {tool_name}: {mark}");
                }
                DomainEvent::TurnFailed { node, error_message, .. } => {
                    eprintln!("  · {node} failed: {error_message}");
                }
                DomainEvent::ResponseGenerated { .. } | DomainEvent::TurnCompleted { .. } => {}
            }
        }
    });
}
