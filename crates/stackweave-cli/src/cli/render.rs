//! Styled rendering of run reports.

use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use stackweave_types::report::{ConsumerStatus, RunReport, Severity};

/// Print the per-consumer table followed by every non-error diagnostic.
pub fn print_report(report: &RunReport) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Consumer").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Stage").fg(Color::White),
        Cell::new("Detail").fg(Color::White),
    ]);

    for consumer in &report.consumers {
        let status_cell = match consumer.status {
            ConsumerStatus::Accepted => Cell::new("● accepted").fg(Color::Green),
            ConsumerStatus::Rejected => Cell::new("✗ rejected").fg(Color::Red),
        };
        let detail = match (consumer.failure(), &consumer.output) {
            (Some(failure), _) => failure.summary.clone(),
            (None, Some(path)) => path.display().to_string(),
            (None, None) => "-".to_owned(),
        };
        table.add_row(vec![
            Cell::new(&consumer.consumer).fg(Color::Cyan),
            status_cell,
            Cell::new(consumer.stage.to_string()).fg(Color::DarkGrey),
            Cell::new(detail),
        ]);
    }

    println!();
    println!("{table}");

    let notes: Vec<_> = report
        .consumers
        .iter()
        .flat_map(|c| c.diagnostics.iter().map(move |d| (c.consumer.as_str(), d)))
        .collect();
    if !notes.is_empty() {
        println!();
        for (consumer, diagnostic) in notes {
            let marker = match diagnostic.severity {
                Severity::Error => style("✗").red().bold(),
                Severity::Advisory => style("!").yellow().bold(),
                Severity::Info => style("i").blue().bold(),
            };
            println!(
                "  {marker} {}: {}",
                style(consumer).cyan(),
                diagnostic.message
            );
        }
    }

    println!();
    println!(
        "  {} accepted, {} rejected in stack {}",
        style(report.accepted()).green().bold(),
        style(report.rejected()).red().bold(),
        style(&report.stack).bold()
    );
    println!();
}
