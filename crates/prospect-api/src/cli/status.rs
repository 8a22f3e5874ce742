//! System status dashboard command.

use anyhow::Result;
use console::style;

use prospect_core::store::TranscriptStore;

use crate::state::AppState;

/// Display system status dashboard.
///
/// Shows transcript counts, the engine configuration in force, and the
/// data directory.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let store = state.engine.store();
    let total_messages = store.count_all().await.unwrap_or(0);
    let total_runs = store.count_runs().await.unwrap_or(0);
    let config = state.engine.config();

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "transcript": {
                "messages": total_messages,
                "runs": total_runs,
            },
            "engine": {
                "debounce_ms": config.debounce_ms,
                "send_spacing_ms": config.send_spacing_ms,
                "topics": config.topics.len(),
                "forbidden_phrases": config.forbidden_phrases.len(),
                "model": config.generation.model,
                "transport": config.transport.mode.to_string(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Prospect v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    // Transcript counts
    println!("  {}", style("── Transcript ──").dim());
    println!("  Messages: {}", style(total_messages).bold());
    println!("  Runs:     {}", style(total_runs).bold());
    println!();

    // Engine configuration
    println!("  {}", style("── Engine ──").dim());
    println!("  Debounce window:   {} ms", config.debounce_ms);
    println!("  Reply spacing:     {} ms", config.send_spacing_ms);
    println!("  Topic pool:        {}", config.topics.len());
    println!("  Forbidden phrases: {}", config.forbidden_phrases.len());
    println!("  Model:             {}", config.generation.model);
    println!("  Transport:         {}", config.transport.mode);
    println!();

    // System
    println!("  {}", style("── System ──").dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!("  Database: {}", style("SQLite (WAL mode)").dim());
    println!();

    Ok(())
}
