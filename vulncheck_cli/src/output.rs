//! Rendering of lookup rows, index records, and fatal errors

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use vulncheck_client_core::{CveDetails, Error, LookupResult};

use crate::terminal;

/// Result items shown per entity in interactive text output
const TEXT_RESULT_LIMIT: usize = 3;

/// Render lookup rows as human-readable text.
///
/// Interactive terminals get one block per entity; piped output gets one
/// tab-separated line per entity.
pub fn render_lookup_text(rows: &[LookupResult]) {
    if rows.is_empty() {
        eprintln!("{}", "No routable indicators to look up.".yellow());
        return;
    }

    if !terminal::is_interactive() {
        for row in rows {
            println!("{}", plain_line(row));
        }
        return;
    }

    for row in rows {
        println!("{}", row.entity.value.bold().cyan());
        match &row.data {
            None => println!("  {}", "no data".dimmed()),
            Some(data) => {
                println!("  {}", data.summary.join(" | ").green());
                let total = data.details.results.len();
                for item in data.details.results.iter().take(TEXT_RESULT_LIMIT) {
                    println!("  - {}", compact(item));
                }
                if total > TEXT_RESULT_LIMIT {
                    println!("  ({} more not shown)", total - TEXT_RESULT_LIMIT);
                }
                if !data.details.vendors.is_empty() {
                    println!("  Vendors: {}", data.details.vendors.join(", "));
                }
                if !data.details.products.is_empty() {
                    println!("  Products: {}", data.details.products.join(", "));
                }
            }
        }
        println!();
    }
}

/// Render index records (KEV, threat actors) as text.
pub fn render_records_text(kind: &str, cve: &str, records: &[Value]) {
    if records.is_empty() {
        println!("No {kind} records for {cve}.");
        return;
    }
    println!(
        "{}",
        format!("{} {kind} record(s) for {cve}", records.len()).bold()
    );
    for record in records {
        println!("- {}", compact(record));
    }
}

/// Render a typed NVD record as labeled text.
pub fn render_details_text(details: &CveDetails) {
    println!(
        "{}",
        details.cve.as_deref().unwrap_or("(unknown CVE)").bold().cyan()
    );
    labeled("Status", details.vuln_status.as_deref());
    labeled("Source", details.source_identifier.as_deref());
    labeled("Published", details.published.as_deref());
    labeled("Modified", details.last_modified.as_deref());
    labeled("Description", details.description.as_deref());
    if !details.vendors.is_empty() {
        labeled("Vendors", Some(&details.vendors.join(", ")));
    }
    if !details.products.is_empty() {
        labeled("Products", Some(&details.products.join(", ")));
    }
}

/// Render any serializable payload as pretty JSON on stdout.
pub fn render_json<T: Serialize>(payload: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

/// Print a fatal API error with its structured payload and exit non-zero.
pub fn fail(err: Error) -> ! {
    eprintln!("{}", format!("Error: {err}").red());
    if let Ok(payload) = serde_json::to_string_pretty(&err.payload()) {
        eprintln!("{payload}");
    }
    std::process::exit(1);
}

fn labeled(label: &str, value: Option<&str>) {
    println!("{}: {}", label.yellow(), value.unwrap_or("-"));
}

fn plain_line(row: &LookupResult) -> String {
    match &row.data {
        None => format!("{}\tno data", row.entity.value),
        Some(data) => format!("{}\t{}", row.entity.value, data.summary.join(" | ")),
    }
}

fn compact(item: &Value) -> String {
    let rendered = item.to_string();
    if rendered.chars().count() > 120 {
        let mut cut: String = rendered.chars().take(120).collect();
        cut.push_str("...");
        cut
    } else {
        rendered
    }
}
