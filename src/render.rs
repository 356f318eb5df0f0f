#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Report output: the styled xlsx workbook, console tables and JSON.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook as XlsxWorkbook};
use serde::Serialize;
use tabled::{
    Table,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use crate::grade::{Outcome, REPORT_HEADERS, Report, Status, StatusCounts, SubmissionSummary};

/// Name of the report sheet.
pub const REPORT_SHEET: &str = "Resultados_Evaluacion";
/// Header fill.
const HEADER_FILL: u32 = 0xD9D9D9;
/// Fill of correct rows.
const CORRECT_FILL: u32 = 0xCCFFCC;
/// Fill of incorrect rows.
const INCORRECT_FILL: u32 = 0xFFCCCC;
/// Fill of banner rows.
const BANNER_FILL: u32 = 0xE0E0E0;
/// Widest a report column may get.
const MAX_COLUMN_WIDTH: f64 = 100.0;

/// Text of each report column for one row, in [`REPORT_HEADERS`] order.
fn row_cells(outcome: &Outcome) -> [String; 5] {
    [
        outcome.id.map(|id| id.to_string()).unwrap_or_default(),
        outcome.topic.clone(),
        outcome.prompt.clone(),
        outcome.status.map(|s| s.to_string()).unwrap_or_default(),
        outcome.observation.clone(),
    ]
}

/// Column widths sized to the longest text, `(len + 2) * 1.2`, capped.
pub fn column_widths(report: &Report) -> [f64; 5] {
    let mut longest = REPORT_HEADERS.map(|h| h.chars().count());
    for outcome in report.rows() {
        for (slot, text) in longest.iter_mut().zip(row_cells(outcome)) {
            *slot = (*slot).max(text.chars().count());
        }
    }
    longest.map(|len| ((len as f64 + 2.0) * 1.2).min(MAX_COLUMN_WIDTH))
}

/// Row format for an outcome; `None` leaves the row unstyled.
fn row_format(outcome: &Outcome) -> Option<Format> {
    match outcome.status {
        None => Some(
            Format::new()
                .set_bold()
                .set_background_color(Color::RGB(BANNER_FILL)),
        ),
        Some(Status::Correct) => Some(Format::new().set_background_color(Color::RGB(CORRECT_FILL))),
        Some(Status::Incorrect) => {
            Some(Format::new().set_background_color(Color::RGB(INCORRECT_FILL)))
        }
        Some(Status::Error) => None,
    }
}

/// Writes the report workbook to `path`.
pub fn write_xlsx(report: &Report, path: &Path) -> Result<()> {
    let mut workbook = XlsxWorkbook::new();
    let sheet = workbook
        .add_worksheet()
        .set_name(REPORT_SHEET)
        .context("Failed to name the report sheet")?;

    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    for (col, title) in REPORT_HEADERS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *title, &header)
            .context("Failed to write the report header")?;
    }

    for (index, outcome) in report.rows().iter().enumerate() {
        let row = index as u32 + 1;
        let format = row_format(outcome);
        for (col, text) in row_cells(outcome).iter().enumerate() {
            let col = col as u16;
            let written = match (&format, col, outcome.id) {
                (Some(f), 0, Some(id)) => sheet.write_number_with_format(row, col, id, f),
                (None, 0, Some(id)) => sheet.write_number(row, col, id),
                (Some(f), _, _) if text.is_empty() => sheet.write_blank(row, col, f),
                (None, _, _) if text.is_empty() => continue,
                (Some(f), _, _) => sheet.write_string_with_format(row, col, text, f),
                (None, _, _) => sheet.write_string(row, col, text),
            };
            written.with_context(|| format!("Failed to write report row {row}"))?;
        }
    }

    for (col, width) in column_widths(report).into_iter().enumerate() {
        sheet
            .set_column_width(col as u16, width)
            .context("Failed to size report columns")?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save report to {}", path.display()))?;
    Ok(())
}

/// JSON shape of a report.
#[derive(Serialize)]
struct JsonReport<'a> {
    /// Totals across the run.
    counts:      StatusCounts,
    /// Per-submission totals.
    submissions: &'a [SubmissionSummary],
    /// Every row, banners included.
    rows:        &'a [Outcome],
}

/// Serializes the report as pretty JSON.
pub fn to_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        counts:      report.counts(),
        submissions: report.submissions(),
        rows:        report.rows(),
    })
    .context("Failed to serialize report")
}

/// Writes the JSON report to `path`.
pub fn write_json(report: &Report, path: &Path) -> Result<()> {
    std::fs::write(path, to_json(report)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Full report as a console table.
pub fn report_table(report: &Report) -> String {
    Table::new(report.rows())
        .with(Panel::header("Evaluation Report"))
        .with(Modify::new(Rows::new(1..)).with(Width::wrap(40).keep_words(true)))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// Per-submission totals as a console table.
pub fn summary_table(report: &Report) -> String {
    let counts = report.counts();
    Table::new(report.submissions())
        .with(Panel::header("Summary"))
        .with(Panel::footer(format!(
            "Correct: {}  Incorrect: {}  Error: {}",
            counts.correct, counts.incorrect, counts.error
        )))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}

/// One colored line with the run totals.
pub fn totals_line(counts: &StatusCounts) -> String {
    format!(
        "{} {} {}",
        format!("{} correct", counts.correct).green().bold(),
        format!("{} incorrect", counts.incorrect).red().bold(),
        format!("{} error", counts.error).yellow().bold(),
    )
}
