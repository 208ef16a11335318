// crates/trending-cli/src/commands/scan.rs
//
// `trending scan` — list one item type's records, lowest score first.

use clap::Args;

use trending_store::TrendingStore;

use crate::output::{render_records, OutputFormat};

/// Ranked scan of one item type.
#[derive(Debug, Args)]
pub struct ScanCmd {
    /// Item type to scan. Defaults to `default_item_type` from config.
    #[arg(long)]
    pub item_type: Option<String>,
    /// Stop after this many records.
    #[arg(long)]
    pub limit: Option<usize>,
}

pub async fn run(
    store: &TrendingStore,
    cmd: &ScanCmd,
    default_item_type: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let item_type = cmd.item_type.as_deref().unwrap_or(default_item_type);
    let limit = cmd.limit.unwrap_or(usize::MAX);

    let mut scan = store.ranked_scan(item_type);
    let mut records = Vec::new();
    while records.len() < limit {
        match scan.next().await? {
            Some(record) => records.push(record),
            None => break,
        }
    }

    tracing::debug!(
        "Scanned {} {} records in {} pages",
        records.len(),
        item_type,
        scan.pages_fetched()
    );

    if records.is_empty() && format == OutputFormat::Table {
        println!("No trending records for {}", item_type);
    } else {
        println!("{}", render_records(&records, format));
    }
    Ok(())
}
