//! `docassist sessions` — Inspect and prune stored sessions.

use docassist_core::session::SessionId;

use super::GlobalOpts;

pub async fn list(opts: GlobalOpts) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(opts)?;
    let store = super::open_store(&config).await?;

    let sessions = store.sessions().await?;
    println!("🗂  Sessions ({}, {} backend)", sessions.len(), store.name());
    println!("=============");
    if sessions.is_empty() {
        println!("  No sessions yet. Start one with `docassist chat`.");
    }
    for s in sessions {
        println!(
            "  {}  user={:<14} checkpoints={:<4} last={:<20} {}",
            s.session_id,
            s.user_id.as_deref().unwrap_or("-"),
            s.checkpoints,
            s.last_node,
            s.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub async fn show(opts: GlobalOpts, id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(opts)?;
    let store = super::open_store(&config).await?;

    let checkpoint = store
        .latest(&SessionId::from(id))
        .await?
        .ok_or_else(|| format!("Session not found: {id}"))?;
    let state = checkpoint.state;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("🗂  Session {}", state.session_id);
    println!("=============");
    println!("  User:        {}", state.user_id.as_deref().unwrap_or("-"));
    println!("  Checkpoint:  #{} after {}", checkpoint.seq, checkpoint.node);
    println!("  Messages:    {}", state.messages.len());
    println!("  Documents:   {}", state.active_documents.join(", "));
    println!("  Tools used:  {}", state.tools_used.join(", "));
    println!("  Actions:     {}", state.actions_taken.len());
    if !state.conversation_summary.is_empty() {
        println!();
        println!("  Summary: {}", state.conversation_summary);
    }
    if let Some(response) = &state.current_response {
        println!();
        println!("  Last response: {}", response.text());
    }
    Ok(())
}

pub async fn prune(opts: GlobalOpts, id: &str, keep: usize) -> Result<(), Box<dyn std::error::Error>> {
    if keep == 0 {
        return Err("--keep must be at least 1; the latest checkpoint is the session".into());
    }
    let config = super::load_config(opts)?;
    let store = super::open_store(&config).await?;

    let removed = store.prune(&SessionId::from(id), keep).await?;
    println!("🧹 Removed {removed} checkpoint(s) from {id}, kept the newest {keep}.");
    Ok(())
}
