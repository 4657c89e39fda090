//! Operator-facing batch report
//!
//! The SQL is printed, never executed. Literals are single-quoted with
//! embedded quotes doubled.

use std::io::{self, Write};

use super::orchestrator::{BatchReport, PublishedAsset};

const RULE_WIDTH: usize = 60;

/// Quote a value as a SQL string literal
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `UPDATE` statement linking one symbol to its public URL
pub fn update_statement(column: &str, asset: &PublishedAsset) -> String {
    format!(
        "UPDATE phonetics SET {} = {} WHERE symbol = {};",
        column,
        sql_literal(&asset.public_url),
        sql_literal(&asset.symbol)
    )
}

/// One statement per published asset, in table order
pub fn render_sql(report: &BatchReport) -> Vec<String> {
    let column = report.kind.url_column();
    report
        .published
        .iter()
        .map(|asset| update_statement(column, asset))
        .collect()
}

/// Print the summary, the failed symbols, and the SQL block
pub fn write_report<W: Write>(report: &BatchReport, out: &mut W) -> io::Result<()> {
    write_summary(report, out)?;

    let statements = render_sql(report);
    if !statements.is_empty() {
        let rule = "-".repeat(RULE_WIDTH);
        writeln!(out)?;
        writeln!(out, "Database update SQL:")?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "-- generated {}", chrono::Utc::now().to_rfc3339())?;
        for statement in statements {
            writeln!(out, "{}", statement)?;
        }
        writeln!(out, "{}", rule)?;
    }

    Ok(())
}

/// Print the summary and the public URL of every uploaded file
///
/// Used for directory uploads, whose entries are file names rather than
/// `phonetics` symbols, so no SQL is emitted.
pub fn write_upload_listing<W: Write>(report: &BatchReport, out: &mut W) -> io::Result<()> {
    write_summary(report, out)?;

    if !report.published.is_empty() {
        writeln!(out)?;
        writeln!(out, "Published objects:")?;
        for asset in &report.published {
            writeln!(out, "  {}  {}", asset.symbol, asset.public_url)?;
        }
    }

    Ok(())
}

fn write_summary<W: Write>(report: &BatchReport, out: &mut W) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out)?;
    writeln!(out, "{}", rule)?;
    writeln!(
        out,
        "Sync complete ({}): {} entries, {} succeeded, {} failed",
        report.kind,
        report.total(),
        report.success_count(),
        report.failed_count()
    )?;
    writeln!(out, "{}", rule)?;

    if !report.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failed symbols (re-run these with --only):")?;
        for failure in &report.failures {
            writeln!(out, "  {}  [{}] {}", failure.symbol, failure.state, failure.error)?;
        }
    }

    Ok(())
}
