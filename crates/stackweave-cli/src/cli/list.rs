//! `weave list`: the scanned catalog as a table.

use std::process::ExitCode;

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use stackweave_infra::config::Project;
use stackweave_infra::runner::load_context;

pub fn list(project: &Project, json: bool) -> Result<ExitCode> {
    let ctx = load_context(project)?;

    if json {
        let entries: Vec<_> = ctx
            .catalog
            .iter()
            .map(|f| {
                let meta = &f.metadata;
                serde_json::json!({
                    "id": meta.canonical_id,
                    "name": meta.display_name,
                    "description": meta.description,
                    "location": meta.relative_location,
                    "author": meta.author_tag,
                    "version": meta.version,
                    "standalone": meta.standalone,
                    "aliases": ctx.resolver.aliases_for(&meta.canonical_id).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(ExitCode::SUCCESS);
    }

    if ctx.catalog.is_empty() {
        println!();
        println!(
            "  {} No fragments found under {}",
            style("i").blue().bold(),
            style(ctx.catalog.root().display()).yellow()
        );
        println!();
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Aliases").fg(Color::White),
        Cell::new("Version").fg(Color::White),
        Cell::new("Location").fg(Color::White),
    ]);

    for fragment in ctx.catalog.iter() {
        let meta = &fragment.metadata;
        let aliases: Vec<_> = ctx.resolver.aliases_for(&meta.canonical_id).collect();
        let id_cell = if meta.standalone {
            Cell::new(format!("{} *", meta.canonical_id)).fg(Color::Cyan)
        } else {
            Cell::new(&meta.canonical_id).fg(Color::Cyan)
        };
        table.add_row(vec![
            id_cell,
            Cell::new(&meta.display_name),
            Cell::new(aliases.join(", ")),
            Cell::new(meta.version.as_deref().unwrap_or("-")).fg(Color::DarkGrey),
            Cell::new(&meta.relative_location).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} fragment{} ({} marks standalone)",
        style(ctx.catalog.len()).bold(),
        if ctx.catalog.len() == 1 { "" } else { "s" },
        style("*").cyan()
    );
    println!();

    Ok(ExitCode::SUCCESS)
}
