//! Spreadsheet to prompt text.
//!
//! Every sheet is rendered as a fixed-width table with empty rows and columns
//! removed, prefixed with `Sheet: <name>`. Sheets with no content are skipped.

use crate::domain::model::SheetText;
use crate::utils::error::Result;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{NaiveDateTime, Timelike};
use std::io::Cursor;

/// Renders a workbook held in memory. Format (`.xlsx`, `.xls`, ...) is detected
/// from the content.
pub fn workbook_to_text(bytes: Vec<u8>, source_name: &str) -> Result<SheetText> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names();
    tracing::debug!("Number of sheets in Excel file: {}", sheet_names.len());

    let mut sections = Vec::new();
    for sheet_name in sheet_names {
        tracing::debug!("Processing sheet: {}", sheet_name);
        let range = workbook.worksheet_range(&sheet_name)?;

        match render_grid(&range_to_grid(&range)) {
            Some(table) => sections.push(format!("Sheet: {}\n{}", sheet_name, table)),
            None => tracing::debug!("Sheet '{}' is empty, skipping", sheet_name),
        }
    }

    let sheet_text = SheetText {
        source_name: source_name.to_string(),
        text: sections.join("\n\n"),
        sheet_count: sections.len(),
    };

    tracing::info!(
        "Extracted text length: {}, Word count: {}",
        sheet_text.text.chars().count(),
        sheet_text.word_count()
    );

    Ok(sheet_text)
}

fn range_to_grid(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(format_datetime)
            .unwrap_or_else(|| dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

/// ISO date, with the time only when it is not midnight.
fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Lays out a grid as right-aligned columns separated by one space.
///
/// Rows and columns made only of empty cells are dropped; `None` if nothing is left.
pub fn render_grid(grid: &[Vec<String>]) -> Option<String> {
    let rows: Vec<&Vec<String>> = grid
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();

    let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let columns: Vec<usize> = (0..width)
        .filter(|&col| {
            rows.iter()
                .any(|row| row.get(col).is_some_and(|cell| !cell.is_empty()))
        })
        .collect();

    if rows.is_empty() || columns.is_empty() {
        return None;
    }

    fn cell(row: &[String], col: usize) -> &str {
        row.get(col).map(String::as_str).unwrap_or("")
    }

    let widths: Vec<usize> = columns
        .iter()
        .map(|&col| {
            rows.iter()
                .map(|row| cell(row, col).chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let lines: Vec<String> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .zip(&widths)
                .map(|(&col, &w)| format!("{:>w$}", cell(row, col), w = w))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    Some(lines.join("\n"))
}
