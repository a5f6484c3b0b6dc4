//! Output formatters for linking, estimation and labeling results.

use std::io::Write;

use serde::Serialize;

use crate::bugginess::{
    BuggyReleases, ColdStart, LabelSource, LabelingReport, LinkSummary, ProportionSource,
};
use crate::config::OutputFormat;
use crate::core::Result;
use crate::model::Ticket;

/// Output format enum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Json,
    Markdown,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Format::Text,
            OutputFormat::Json => Format::Json,
            OutputFormat::Markdown => Format::Markdown,
        }
    }
}

/// A table of rendered cells.
#[derive(Debug, Default)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// A printable command result.
///
/// JSON output serializes the value as is; text and Markdown output are
/// built from the title, summary lines and optional table.
pub trait Report: Serialize {
    fn title(&self) -> String;

    fn summary(&self) -> Vec<(&'static str, String)>;

    fn table(&self) -> Option<Table> {
        None
    }
}

impl Format {
    pub fn render<R: Report, W: Write>(&self, report: &R, writer: &mut W) -> Result<()> {
        match self {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, report)?;
                writeln!(writer)?;
            }
            Format::Markdown => render_markdown(report, writer)?,
            Format::Text => render_text(report, writer)?,
        }
        Ok(())
    }
}

fn render_markdown<R: Report, W: Write>(report: &R, writer: &mut W) -> Result<()> {
    writeln!(writer, "# {}\n", report.title())?;
    for (key, value) in report.summary() {
        writeln!(writer, "**{key}**: {value}  ")?;
    }
    writeln!(writer)?;

    let Some(table) = report.table() else {
        return Ok(());
    };
    if table.rows.is_empty() {
        writeln!(writer, "_No items_")?;
        return Ok(());
    }

    writeln!(writer, "| {} |", table.headers.join(" | "))?;
    writeln!(
        writer,
        "|{}",
        table.headers.iter().map(|_| " --- |").collect::<String>()
    )?;
    for row in &table.rows {
        let cells: Vec<_> = row.iter().map(|c| c.replace('|', "\\|")).collect();
        writeln!(writer, "| {} |", cells.join(" | "))?;
    }
    writeln!(writer)?;
    Ok(())
}

fn render_text<R: Report, W: Write>(report: &R, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", report.title())?;
    let width = report
        .summary()
        .iter()
        .map(|(k, _)| k.len())
        .max()
        .unwrap_or(0);
    for (key, value) in report.summary() {
        writeln!(writer, "  {key:<width$}  {value}")?;
    }

    let Some(table) = report.table() else {
        return Ok(());
    };
    if table.rows.is_empty() {
        return Ok(());
    }

    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.len()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    writeln!(writer)?;
    write_text_row(writer, table.headers.iter().copied(), &widths)?;
    for row in &table.rows {
        write_text_row(writer, row.iter().map(String::as_str), &widths)?;
    }
    Ok(())
}

fn write_text_row<'a, W: Write>(
    writer: &mut W,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> Result<()> {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<w$}"))
        .collect();
    writeln!(writer, "  {}", line.join("  ").trim_end())?;
    Ok(())
}

fn format_proportion(p: f64) -> String {
    format!("{p:.3}")
}

fn proportion_source(source: ProportionSource) -> &'static str {
    match source {
        ProportionSource::Local => "local",
        ProportionSource::ColdStart => "cold start",
    }
}

fn label_source(source: LabelSource) -> &'static str {
    match source {
        LabelSource::AffectedVersions => "affected versions",
        LabelSource::Proportion => "proportion",
    }
}

/// Commits and fixed files of one ticket.
#[derive(Debug, Serialize)]
pub struct TicketLinks {
    pub ticket: String,
    pub commits: Vec<String>,
    pub fixed_files: Vec<String>,
}

/// Result of the `link` command.
#[derive(Debug, Serialize)]
pub struct LinkReport {
    pub by_message: LinkSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_heuristic: Option<LinkSummary>,
    pub tickets: Vec<TicketLinks>,
}

impl LinkReport {
    pub fn new<'a>(
        by_message: LinkSummary,
        by_heuristic: Option<LinkSummary>,
        tickets: impl IntoIterator<Item = &'a Ticket>,
    ) -> Self {
        let tickets = tickets
            .into_iter()
            .map(|t| TicketLinks {
                ticket: t.id.clone(),
                commits: t.commit_ids().to_vec(),
                fixed_files: t.fixed_files().iter().cloned().collect(),
            })
            .collect();
        Self {
            by_message,
            by_heuristic,
            tickets,
        }
    }

    pub fn linked_tickets(&self) -> usize {
        self.tickets.iter().filter(|t| !t.commits.is_empty()).count()
    }
}

impl Report for LinkReport {
    fn title(&self) -> String {
        "Ticket linking".to_string()
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![
            ("Tickets", self.tickets.len().to_string()),
            ("Linked tickets", self.linked_tickets().to_string()),
            ("Commits by message", self.by_message.commits.to_string()),
        ];
        if let Some(h) = &self.by_heuristic {
            lines.push(("Commits by heuristic", h.commits.to_string()));
        }
        lines
    }

    fn table(&self) -> Option<Table> {
        Some(Table {
            headers: vec!["Ticket", "Commits", "Fixed files"],
            rows: self
                .tickets
                .iter()
                .map(|t| {
                    vec![
                        t.ticket.clone(),
                        t.commits.len().to_string(),
                        t.fixed_files.len().to_string(),
                    ]
                })
                .collect(),
        })
    }
}

/// Buggy releases of one ticket.
#[derive(Debug, Serialize)]
pub struct TicketEstimate {
    pub ticket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_version: Option<String>,
    #[serde(flatten)]
    pub buggy: BuggyReleases,
}

/// Result of the `estimate` command.
#[derive(Debug, Serialize)]
pub struct EstimateReport {
    pub proportion: f64,
    pub proportion_source: ProportionSource,
    pub valid_tickets: usize,
    pub tickets: Vec<TicketEstimate>,
}

impl Report for EstimateReport {
    fn title(&self) -> String {
        "Buggy release estimation".to_string()
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "Proportion",
                format!(
                    "{} ({})",
                    format_proportion(self.proportion),
                    proportion_source(self.proportion_source)
                ),
            ),
            ("Valid tickets", self.valid_tickets.to_string()),
            ("Tickets", self.tickets.len().to_string()),
        ]
    }

    fn table(&self) -> Option<Table> {
        Some(Table {
            headers: vec!["Ticket", "Fix", "Source", "Injected", "Buggy releases"],
            rows: self
                .tickets
                .iter()
                .map(|t| {
                    vec![
                        t.ticket.clone(),
                        t.fix_version.clone().unwrap_or_else(|| "-".to_string()),
                        label_source(t.buggy.source).to_string(),
                        t.buggy
                            .injected_version
                            .clone()
                            .unwrap_or_else(|| "-".to_string()),
                        t.buggy
                            .releases
                            .iter()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", "),
                    ]
                })
                .collect(),
        })
    }
}

impl Report for LabelingReport {
    fn title(&self) -> String {
        "Method labeling".to_string()
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Labeled methods", self.labeled().to_string()),
            (
                "From affected versions",
                self.labeled_from_affected_versions.to_string(),
            ),
            ("From proportion", self.labeled_from_proportion.to_string()),
            ("Processed tickets", self.processed_tickets.to_string()),
            ("Skipped tickets", self.skipped.len().to_string()),
            (
                "Proportion",
                format!(
                    "{} ({}, {} valid tickets)",
                    format_proportion(self.proportion),
                    proportion_source(self.proportion_source),
                    self.valid_tickets
                ),
            ),
        ]
    }

    fn table(&self) -> Option<Table> {
        if self.events.is_empty() {
            return None;
        }
        Some(Table {
            headers: vec!["Ticket", "Commit", "Method", "Release", "Source"],
            rows: self
                .events
                .iter()
                .map(|e| {
                    vec![
                        e.ticket.clone(),
                        e.commit.chars().take(10).collect(),
                        e.method.clone(),
                        e.release.clone(),
                        label_source(e.source).to_string(),
                    ]
                })
                .collect(),
        })
    }
}

impl Report for ColdStart {
    fn title(&self) -> String {
        "Cold-start proportion".to_string()
    }

    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Proportion", format_proportion(self.proportion)),
            ("Projects", self.projects.len().to_string()),
        ]
    }

    fn table(&self) -> Option<Table> {
        Some(Table {
            headers: vec!["Project", "Tickets", "Mean", "Error"],
            rows: self
                .projects
                .iter()
                .map(|p| {
                    vec![
                        p.project.clone(),
                        p.kept.to_string(),
                        p.mean.map(format_proportion).unwrap_or_else(|| "-".to_string()),
                        p.error.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
        })
    }
}
