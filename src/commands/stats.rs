//! Usage dashboard output

use crate::error::{PromptbenchError, Result};
use crate::session::SessionStore;
use crate::stats::DashboardStats;
use colored::Colorize;
use prettytable::{format, row, Table};

/// Print the usage dashboard
///
/// # Arguments
///
/// * `store` - Session store to aggregate
/// * `json` - Print machine-readable JSON instead of tables
///
/// # Errors
///
/// Returns `PromptbenchError::Serialization` if JSON output fails
pub fn show_stats(store: &SessionStore, json: bool) -> Result<()> {
    let stats = DashboardStats::from_store(store);

    if json {
        let text = serde_json::to_string_pretty(&stats).map_err(PromptbenchError::Serialization)?;
        println!("{}", text);
        return Ok(());
    }

    print_dashboard(&stats);
    Ok(())
}

fn print_dashboard(stats: &DashboardStats) {
    let mut totals = Table::new();
    totals.set_format(*format::consts::FORMAT_CLEAN);
    totals.add_row(row!["Executions", r->stats.total_executions]);
    totals.add_row(row!["Conversations", r->stats.total_conversations]);
    totals.add_row(row!["Comparisons", r->stats.total_comparisons]);
    totals.add_row(row!["Tokens used", r->stats.total_tokens_used]);
    totals.add_row(row![
        "Avg tokens / execution",
        r->stats.average_tokens_per_execution()
    ]);
    totals.add_row(row![
        "Avg latency",
        r->format!("{:.0} ms", stats.average_latency_ms)
    ]);
    totals.add_row(row!["Most used model", r->stats.most_used_model_label()]);

    println!("\n{}", "Overview".bold());
    totals.printstd();

    if !stats.model_usage.is_empty() {
        let mut usage = Table::new();
        usage.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        usage.add_row(row![b => "Model", "Uses", "Share"]);
        for entry in &stats.model_usage {
            usage.add_row(row![
                entry.model,
                r->entry.count,
                r->format!("{}%", stats.model_usage_percentage(&entry.model))
            ]);
        }
        println!("\n{}", "Model usage".bold());
        usage.printstd();
    }

    let max = stats
        .executions_by_day
        .iter()
        .map(|d| d.count)
        .max()
        .unwrap_or(0)
        .max(1);
    println!("\n{}", "Executions, last 7 days".bold());
    for day in &stats.executions_by_day {
        let width = day.count * 30 / max;
        println!(
            "{}  {:<30} {}",
            day.date.format("%a %b %d"),
            "#".repeat(width).green(),
            day.count
        );
    }
    match stats.busiest_day() {
        Some(day) => println!("Busiest day: {}", day.date.format("%b %-d").to_string().cyan()),
        None => println!("Busiest day: {}", "N/A".dimmed()),
    }
    println!();
}
