//! Report generation.
//!
//! This module renders the aggregate rows as aligned plain-text tables,
//! a Markdown document, or JSON. A requested part with no rows is an
//! explicit [`ReportError::NoData`], never an empty table.

use crate::cli::Part;
use crate::error::ReportError;
use crate::models::{AggregateRow, Report, ReportMetadata, RunSummary};

const PART_A: &str = "Part A (average ingredients per year)";
const PART_B: &str = "Part B (average ingredients per year and route)";

/// Column headers for Part A.
const YEAR_COLUMNS: [&str; 3] = ["year", "drug_names", "avg_number_of_ingredients"];

/// Column headers for Part B.
const ROUTE_COLUMNS: [&str; 3] = ["year", "route", "avg_number_of_ingredients"];

/// Fail with `NoData` if a requested part has no rows.
pub fn ensure_rows(report: &Report, part: Part) -> Result<(), ReportError> {
    if part.includes_a() && report.by_year.is_empty() {
        return Err(ReportError::NoData { part: PART_A });
    }
    if part.includes_b() && report.by_year_and_route.is_empty() {
        return Err(ReportError::NoData { part: PART_B });
    }
    Ok(())
}

fn format_average(value: f64) -> String {
    format!("{:.2}", value)
}

fn year_cells(rows: &[AggregateRow]) -> Vec<[String; 3]> {
    rows.iter()
        .map(|r| {
            [
                r.year.to_string(),
                r.drug_names_joined(),
                format_average(r.avg_number_of_ingredients),
            ]
        })
        .collect()
}

fn route_cells(rows: &[AggregateRow]) -> Vec<[String; 3]> {
    rows.iter()
        .map(|r| {
            [
                r.year.to_string(),
                r.route.clone().unwrap_or_default(),
                format_average(r.avg_number_of_ingredients),
            ]
        })
        .collect()
}

/// Render rows as a whitespace-aligned table.
fn render_plain_table(headers: &[&str; 3], cells: &[[String; 3]]) -> String {
    let mut widths = headers.map(str::len);
    for row in cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut table = String::new();
    let header_line = format!(
        "{:<w0$}  {:<w1$}  {:>w2$}",
        headers[0],
        headers[1],
        headers[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    );
    table.push_str(header_line.trim_end());
    table.push('\n');
    table.push_str(&format!(
        "{}  {}  {}\n",
        "-".repeat(widths[0]),
        "-".repeat(widths[1]),
        "-".repeat(widths[2])
    ));

    for row in cells {
        let line = format!(
            "{:<w0$}  {:<w1$}  {:>w2$}",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        );
        table.push_str(line.trim_end());
        table.push('\n');
    }

    table
}

/// Render rows as a Markdown table.
fn render_markdown_table(headers: &[&str; 3], cells: &[[String; 3]]) -> String {
    let mut table = String::new();
    table.push_str(&format!("| {} | {} | {} |\n", headers[0], headers[1], headers[2]));
    table.push_str("|:---|:---|---:|\n");
    for row in cells {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            row[0],
            row[1].replace('|', "\\|"),
            row[2]
        ));
    }
    table
}

/// Generate the plain-text report.
pub fn generate_text_report(report: &Report, part: Part) -> Result<String, ReportError> {
    ensure_rows(report, part)?;

    let mut output = String::new();

    if part.includes_a() {
        output.push_str(PART_A);
        output.push_str("\n\n");
        output.push_str(&render_plain_table(
            &YEAR_COLUMNS,
            &year_cells(&report.by_year),
        ));
    }

    if part.includes_b() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(PART_B);
        output.push_str("\n\n");
        output.push_str(&render_plain_table(
            &ROUTE_COLUMNS,
            &route_cells(&report.by_year_and_route),
        ));
    }

    Ok(output)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, part: Part) -> Result<String, ReportError> {
    ensure_rows(report, part)?;

    let mut output = String::new();

    output.push_str(&format!(
        "# Ingredient Analytics: {}\n\n",
        report.metadata.manufacturer
    ));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary));

    if part.includes_a() {
        output.push_str("## Average Ingredients per Year\n\n");
        output.push_str(&render_markdown_table(
            &YEAR_COLUMNS,
            &year_cells(&report.by_year),
        ));
        output.push('\n');
    }

    if part.includes_b() {
        output.push_str("## Average Ingredients per Year and Route\n\n");
        output.push_str(&render_markdown_table(
            &ROUTE_COLUMNS,
            &route_cells(&report.by_year_and_route),
        ));
        output.push('\n');
    }

    output.push_str(&generate_skipped_section(&report.summary));
    output.push_str(&generate_footer());

    Ok(output)
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Manufacturer:** {}\n", metadata.manufacturer));
    section.push_str(&format!("- **Source:** {}\n", metadata.api_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Ingredient Counting:** {}\n",
        metadata.counting
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the record counts section.
fn generate_summary_section(summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str("## Records\n\n");
    section.push_str("| Pages | Fetched | Kept | Skipped |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        summary.pages_fetched,
        summary.records_fetched,
        summary.records_kept,
        summary.records_skipped()
    ));

    section
}

/// List the records the normalizer dropped.
fn generate_skipped_section(summary: &RunSummary) -> String {
    if summary.skipped.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Skipped Records\n\n");
    for skipped in &summary.skipped {
        section.push_str(&format!("- `{}`: {}\n", skipped.id, skipped.reason));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by ingredient-analytics v{} from openFDA drug label data*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report, part: Part) -> Result<String, ReportError> {
    ensure_rows(report, part)?;
    Ok(serde_json::to_string_pretty(report)?)
}
