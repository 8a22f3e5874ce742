//! Topic pool listing command.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

/// List the products and services the simulated customer can shop for.
///
/// Each new session samples one of these, excluding the chat's most recent
/// picks.
pub fn topics(state: &AppState, json: bool) -> Result<()> {
    let topics = &state.engine.config().topics;

    if json {
        println!("{}", serde_json::to_string_pretty(topics)?);
        return Ok(());
    }

    if topics.is_empty() {
        println!();
        println!(
            "  {} Topic pool is empty. Add entries under {} in config.toml.",
            style("i").blue().bold(),
            style("topics").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Topic").fg(Color::White),
    ]);

    for (index, topic) in topics.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).fg(Color::DarkGrey),
            Cell::new(topic).fg(Color::Cyan),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} topic{}",
        style(topics.len()).bold(),
        if topics.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}
