//! Plain-text tables and confirmation prompts.

use std::fmt::Write;

/// Lays out `headings` and `rows` in padded columns, numbering rows from 1.
#[must_use]
pub fn table(headings: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headings.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let number_width = rows.len().to_string().len().max(1);

    let mut out = String::new();
    write_line(&mut out, &" ".repeat(number_width), headings, &widths);
    for (index, row) in rows.iter().enumerate() {
        let number = format!("{:>number_width$}", index + 1);
        write_line(&mut out, &number, row, &widths);
    }
    if rows.is_empty() {
        out.push_str("(no records)\n");
    }
    out
}

fn write_line(out: &mut String, number: &str, cells: &[String], widths: &[usize]) {
    out.push_str(number);
    for (cell, width) in cells.iter().zip(widths) {
        let _ = write!(out, "  {cell:<width$}");
    }
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
}

/// `Label:` / value pairs shown before a delete is confirmed.
#[must_use]
pub fn record(question: &str, labels: &[&str], values: &[String]) -> String {
    let mut out = format!("{question}\n\n");
    for (label, value) in labels.iter().zip(values) {
        let _ = writeln!(out, "{:<20}\t{value}", format!("{label}:"));
    }
    out
}
