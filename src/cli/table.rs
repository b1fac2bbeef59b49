//! Table formatting utilities for CLI list commands
//!
//! Every register listing builds [`TableRow`]s of typed [`CellValue`]s and
//! hands them to a [`TableFormatter`], which renders the terminal, CSV,
//! Markdown and id-only layouts. JSON and YAML listings serialize the
//! records themselves and never come through here.

use chrono::{DateTime, Local, NaiveDate, Utc};
use console::style;

use crate::cli::helpers::{escape_csv, format_amount, truncate_str};
use crate::cli::OutputFormat;
use crate::core::audit::AuditAction;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Record id (cyan, truncated to 16 chars)
    Id(String),
    /// Human unique code (`IMM_000101`); "-" when not yet assigned
    Code(Option<String>),
    /// Plain text, truncated to the column
    Text(String),
    /// Euro amount
    Amount(f64),
    /// Float value with precision
    Float(f64, usize),
    Number(i64),
    /// Calendar date, "-" when missing
    Date(Option<NaiveDate>),
    /// Timestamp displayed in local time
    DateTime(DateTime<Utc>),
    /// Audit action with color coding
    Action(AuditAction),
    /// Days until a deadline (red when due, yellow within a week)
    DaysLeft(i64),
    /// Yes/no flag, highlighted when set
    Flag(bool),
}

impl CellValue {
    /// Format for TSV output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => {
                format!("{:<width$}", style(truncate_str(id, 16)).cyan(), width = width)
            }
            CellValue::Code(Some(code)) => {
                format!("{:<width$}", style(code).yellow(), width = width)
            }
            CellValue::Code(None) | CellValue::Date(None) => {
                format!("{:<width$}", style("-").dim(), width = width)
            }
            CellValue::Text(s) => {
                let truncated = truncate_str(s, width.saturating_sub(2));
                format!("{:<width$}", truncated, width = width)
            }
            CellValue::Amount(a) => format!("{:>width$}", format_amount(*a), width = width),
            CellValue::Float(f, precision) => {
                format!("{:>width$.prec$}", f, width = width, prec = precision)
            }
            CellValue::Number(n) => format!("{:>width$}", n, width = width),
            CellValue::Date(Some(d)) => format!("{:<width$}", d.format("%Y-%m-%d"), width = width),
            CellValue::DateTime(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                format!("{:<width$}", local.format("%Y-%m-%d %H:%M"), width = width)
            }
            CellValue::Action(action) => {
                let s = action.as_str();
                let styled = match action {
                    AuditAction::Create => style(s).green(),
                    AuditAction::Update => style(s).yellow(),
                    AuditAction::Delete | AuditAction::Purge => style(s).red().bold(),
                    AuditAction::Login => style(s).dim(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::DaysLeft(days) => {
                let s = days.to_string();
                let styled = if *days <= 0 {
                    style(s).red().bold()
                } else if *days <= 7 {
                    style(s).yellow()
                } else {
                    style(s).white()
                };
                format!("{:>width$}", styled, width = width)
            }
            CellValue::Flag(true) => format!("{:<width$}", style("yes").red(), width = width),
            CellValue::Flag(false) => format!("{:<width$}", style("no").dim(), width = width),
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        escape_csv(&self.raw())
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Amount(a) => format_amount(*a),
            CellValue::Code(None) | CellValue::Date(None) => "-".to_string(),
            CellValue::DateTime(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%d %H:%M").to_string()
            }
            CellValue::Flag(true) => "**yes**".to_string(),
            other => other.raw(),
        };
        raw.replace('|', "\\|")
    }

    /// Raw string value (no formatting)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(s) | CellValue::Text(s) => s.clone(),
            CellValue::Code(code) => code.clone().unwrap_or_default(),
            CellValue::Amount(a) => format!("{:.2}", a),
            CellValue::Float(f, precision) => format!("{:.prec$}", f, prec = precision),
            CellValue::Number(n) | CellValue::DaysLeft(n) => n.to_string(),
            CellValue::Date(d) => d.map(|d| d.to_string()).unwrap_or_default(),
            CellValue::DateTime(dt) => dt.to_rfc3339(),
            CellValue::Action(a) => a.as_str().to_string(),
            CellValue::Flag(b) => (if *b { "yes" } else { "no" }).to_string(),
        }
    }

    /// Display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Id(id) => id.chars().count().min(16),
            CellValue::Amount(a) => format_amount(*a).chars().count(),
            CellValue::Code(None) | CellValue::Date(None) => 1,
            CellValue::DateTime(_) => 16,
            other => other.raw().chars().count(),
        }
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Renders rows in the tabular output formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            show_summary: true,
        }
    }

    /// Drop the "N record(s) found" footer
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Write rows in `format`; json/yaml fall back to the terminal table
    pub fn output(&self, rows: &[TableRow], format: OutputFormat) {
        print!("{}", self.render(rows, format));
    }

    pub fn render(&self, rows: &[TableRow], format: OutputFormat) -> String {
        match format {
            OutputFormat::Csv => self.render_csv(rows),
            OutputFormat::Md => self.render_md(rows),
            OutputFormat::Id => rows.iter().map(|r| format!("{}\n", r.id)).collect(),
            _ => self.render_tsv(rows),
        }
    }

    fn widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(CellValue::display_width)
                    .max()
                    .unwrap_or(0);
                col.header.len().max(content + 2).min(col.width)
            })
            .collect()
    }

    fn render_tsv(&self, rows: &[TableRow]) -> String {
        let widths = self.widths(rows);
        let mut out = String::new();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<w$}", style(col.header).bold(), w = w))
            .collect();
        out.push_str(&header.join(" "));
        out.push('\n');
        let total: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(total));
        out.push('\n');

        for row in rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, w)| match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => format!("{:<w$}", "-", w = w),
                })
                .collect();
            out.push_str(cells.join(" ").trim_end());
            out.push('\n');
        }

        if self.show_summary {
            out.push('\n');
            out.push_str(&format!(
                "{} {}(s) found.\n",
                style(rows.len()).cyan(),
                self.entity_name
            ));
        }
        out
    }

    fn render_csv(&self, rows: &[TableRow]) -> String {
        let mut out = String::new();
        let mut header = vec!["id"];
        header.extend(self.columns.iter().map(|c| c.key));
        out.push_str(&header.join(","));
        out.push('\n');

        for row in rows {
            let mut values = vec![escape_csv(&row.id)];
            values.extend(
                self.columns
                    .iter()
                    .map(|col| row.get(col.key).map(CellValue::format_csv).unwrap_or_default()),
            );
            out.push_str(&values.join(","));
            out.push('\n');
        }
        out
    }

    fn render_md(&self, rows: &[TableRow]) -> String {
        let mut out = String::new();
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header).collect();
        out.push_str(&format!("| {} |\n", headers.join(" | ")));
        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        out.push_str(&format!("|{}|\n", separators.join("|")));

        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| {
                    row.get(col.key)
                        .map(CellValue::format_md)
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            out.push_str(&format!("| {} |\n", values.join(" | ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("code", "CODE", 12),
        ColumnDef::new("name", "NAME", 30),
        ColumnDef::new("amount", "AMOUNT", 16),
    ];

    fn rows() -> Vec<TableRow> {
        vec![
            TableRow::new("int-1")
                .cell("code", CellValue::Code(Some("INT_000001".into())))
                .cell("name", CellValue::Text("Rifacimento | giunti".into()))
                .cell("amount", CellValue::Amount(145000.0)),
            TableRow::new("int-2")
                .cell("code", CellValue::Code(None))
                .cell("name", CellValue::Text("Tetto, palestra".into())),
        ]
    }

    #[test]
    fn test_csv_escapes_and_leaves_missing_blank() {
        let out = TableFormatter::new(COLUMNS, "intervention").render(&rows(), OutputFormat::Csv);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "id,code,name,amount");
        assert_eq!(lines[1], "int-1,INT_000001,Rifacimento | giunti,145000.00");
        assert_eq!(lines[2], "int-2,,\"Tetto, palestra\",");
    }

    #[test]
    fn test_md_escapes_pipes_and_dashes_missing() {
        let out = TableFormatter::new(COLUMNS, "intervention").render(&rows(), OutputFormat::Md);
        assert!(out.starts_with("| CODE | NAME | AMOUNT |\n|---|---|---|\n"));
        assert!(out.contains("| INT_000001 | Rifacimento \\| giunti | € 145.000,00 |"));
        assert!(out.contains("| - | Tetto, palestra | - |"));
    }

    #[test]
    fn test_id_output_is_one_per_line() {
        let out = TableFormatter::new(COLUMNS, "intervention").render(&rows(), OutputFormat::Id);
        assert_eq!(out, "int-1\nint-2\n");
    }

    #[test]
    fn test_tsv_summary_can_be_disabled() {
        let out = TableFormatter::new(COLUMNS, "intervention")
            .without_summary()
            .render(&rows(), OutputFormat::Tsv);
        assert!(!out.contains("found"));
        assert!(out.contains("CODE"));
    }

    #[test]
    fn test_cell_raw_values() {
        assert_eq!(CellValue::Flag(true).raw(), "yes");
        assert_eq!(CellValue::Date(None).raw(), "");
        assert_eq!(CellValue::Action(AuditAction::Purge).raw(), "PURGE");
        assert_eq!(CellValue::Float(12.345, 1).raw(), "12.3");
    }
}
