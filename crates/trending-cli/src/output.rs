// crates/trending-cli/src/output.rs
//
// Output formatting utilities for the trending CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use tabled::{Table, Tabled};

use trending_core::record::format_timestamp;
use trending_core::TrendingRecord;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

/// One table row per trending record.
#[derive(Debug, Tabled)]
pub struct RecordRow {
    #[tabled(rename = "type")]
    pub item_type: String,
    #[tabled(rename = "id")]
    pub item_id: String,
    pub score: String,
    #[tabled(rename = "last deflated")]
    pub last_deflated_at: String,
    #[tabled(rename = "created")]
    pub created_at: String,
}

impl From<&TrendingRecord> for RecordRow {
    fn from(record: &TrendingRecord) -> Self {
        Self {
            item_type: record.item_type.clone(),
            item_id: record.item_id.clone(),
            score: record.score.to_string(),
            last_deflated_at: format_timestamp(&record.last_deflated_at),
            created_at: format_timestamp(&record.created_at),
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Render records in the requested format.
pub fn render_records(records: &[TrendingRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(&records),
        OutputFormat::Table => {
            let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();
            format_table(&rows)
        }
    }
}
