//! `docassist chat` — Interactive or single-message chat mode.

use docassist_core::session::SessionId;
use docassist_workflow::ProcessResult;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::GlobalOpts;

pub async fn run(
    opts: GlobalOpts,
    message: Option<String>,
    session: Option<String>,
    user: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(opts)?;
    let mut assistant = super::build_assistant(&config).await?;
    if opts.verbose {
        super::spawn_event_printer(&assistant);
    }

    let session_id = match session {
        Some(id) => {
            let id = SessionId::from(id.as_str());
            let state = assistant.resume_session(&id).await?;
            eprintln!("  Resumed session {id} ({} messages)", state.messages.len());
            id
        }
        None => assistant.start_session(&user).await?,
    };

    if let Some(msg) = message {
        // Single message mode
        let result = assistant.process_message(&msg).await;
        print_result(&result);
        if !result.success {
            return Err(result.error.unwrap_or_else(|| "turn failed".into()).into());
        }
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║       Document Assistant — Interactive Mode  ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Session:   {session_id}");
    println!("  Tools:     calculator, document_search, document_reader, document_statistics");
    println!();
    println!("  Try: \"What's the total amount in invoice INV-001?\"");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let result = assistant.process_message(line).await;
        print_result(&result);
    }

    println!();
    println!("  Session saved as {session_id}");
    println!("  Resume with: docassist chat --session {session_id}");
    println!();
    Ok(())
}

fn print_result(result: &ProcessResult) {
    println!();
    if !result.success {
        eprintln!(
            "  [Error] {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
        println!();
        return;
    }

    for line in result.response.as_deref().unwrap_or_default().lines() {
        println!("  Assistant > {line}");
    }
    let intent = result
        .intent
        .as_ref()
        .map(|i| i.intent_type.to_string())
        .unwrap_or_else(|| "n/a".into());
    println!();
    println!("  intent: {intent}");
    if !result.sources.is_empty() {
        println!("  sources: {}", result.sources.join(", "));
    }
    if !result.tools_used.is_empty() {
        println!("  tools: {}", result.tools_used.join(", "));
    }
    println!();
}

