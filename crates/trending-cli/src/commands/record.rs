// crates/trending-cli/src/commands/record.rs
//
// `trending {add, get, incr, deflate, delete}` — single-record commands.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;

use trending_core::score::quantize;
use trending_core::{BigDecimal, ReadConsistency};
use trending_store::TrendingStore;

use super::non_negative;
use crate::output::{render_records, OutputFormat};

/// Identity flags shared by every single-record command.
#[derive(Debug, Args)]
pub struct Identity {
    /// Item type, e.g. "post". Defaults to `default_item_type` from config.
    #[arg(long)]
    pub item_type: Option<String>,
    /// Item id within the type.
    #[arg(long)]
    pub id: String,
}

/// Create a trending record.
#[derive(Debug, Args)]
pub struct AddCmd {
    #[command(flatten)]
    pub identity: Identity,
    /// Initial score (>= 0).
    #[arg(long)]
    pub score: BigDecimal,
}

/// Look up a trending record.
#[derive(Debug, Args)]
pub struct GetCmd {
    #[command(flatten)]
    pub identity: Identity,
    /// Use a strongly consistent read.
    #[arg(long)]
    pub strong: bool,
}

/// Add to a record's score within its current deflation generation.
#[derive(Debug, Args)]
pub struct IncrCmd {
    #[command(flatten)]
    pub identity: Identity,
    /// Amount to add (>= 0).
    #[arg(long)]
    pub delta: BigDecimal,
    /// The record's current `lastDeflatedAt` (RFC 3339).
    #[arg(long)]
    pub expected_last_deflated_at: DateTime<Utc>,
}

/// Lower a record's score and start a new deflation generation.
#[derive(Debug, Args)]
pub struct DeflateCmd {
    #[command(flatten)]
    pub identity: Identity,
    /// The record's current score, exactly as stored.
    #[arg(long)]
    pub expected_score: BigDecimal,
    /// New score; must be below the expected score.
    #[arg(long)]
    pub new_score: BigDecimal,
    /// Calendar date (YYYY-MM-DD) of the record's current `lastDeflatedAt`.
    #[arg(long)]
    pub expected_date: NaiveDate,
}

/// Delete a trending record.
#[derive(Debug, Args)]
pub struct DeleteCmd {
    #[command(flatten)]
    pub identity: Identity,
    /// Only delete if the stored score equals this value exactly.
    #[arg(long)]
    pub expected_score: Option<BigDecimal>,
}

/// The stored target is the quantized new score, so that is what must be
/// strictly below the expected score.
fn check_deflate_target(
    expected_score: &BigDecimal,
    new_score: &BigDecimal,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = quantize(new_score);
    if new_score >= expected_score || target >= *expected_score {
        return Err(format!(
            "new score {} (stored as {}) must be less than expected score {}",
            new_score, target, expected_score
        )
        .into());
    }
    Ok(())
}

fn item_type<'a>(identity: &'a Identity, default_item_type: &'a str) -> &'a str {
    identity.item_type.as_deref().unwrap_or(default_item_type)
}

pub async fn add(
    store: &TrendingStore,
    cmd: &AddCmd,
    default_item_type: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    non_negative("score", &cmd.score)?;
    let item_type = item_type(&cmd.identity, default_item_type);
    let record = store.add(item_type, &cmd.identity.id, &cmd.score, Utc::now()).await?;
    println!("{}", render_records(&[record], format));
    Ok(())
}

pub async fn get(
    store: &TrendingStore,
    cmd: &GetCmd,
    default_item_type: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let item_type = item_type(&cmd.identity, default_item_type);
    let consistency = if cmd.strong {
        ReadConsistency::Strong
    } else {
        ReadConsistency::Eventual
    };
    match store.get(item_type, &cmd.identity.id, consistency).await? {
        Some(record) => println!("{}", render_records(&[record], format)),
        None => println!("No trending record for {}/{}", item_type, cmd.identity.id),
    }
    Ok(())
}

pub async fn incr(
    store: &TrendingStore,
    cmd: &IncrCmd,
    default_item_type: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    non_negative("delta", &cmd.delta)?;
    let item_type = item_type(&cmd.identity, default_item_type);
    let record = store
        .increment_score(item_type, &cmd.identity.id, &cmd.delta, cmd.expected_last_deflated_at)
        .await?;
    println!("{}", render_records(&[record], format));
    Ok(())
}

pub async fn deflate(
    store: &TrendingStore,
    cmd: &DeflateCmd,
    default_item_type: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    non_negative("new score", &cmd.new_score)?;
    check_deflate_target(&cmd.expected_score, &cmd.new_score)?;
    let now = Utc::now();
    if now.date_naive() < cmd.expected_date {
        return Err(format!(
            "expected date {} is in the future (today is {})",
            cmd.expected_date,
            now.date_naive()
        )
        .into());
    }
    let item_type = item_type(&cmd.identity, default_item_type);
    let record = store
        .deflate_score(
            item_type,
            &cmd.identity.id,
            &cmd.expected_score,
            &cmd.new_score,
            cmd.expected_date,
            now,
        )
        .await?;
    println!("{}", render_records(&[record], format));
    Ok(())
}

pub async fn delete(
    store: &TrendingStore,
    cmd: &DeleteCmd,
    default_item_type: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let item_type = item_type(&cmd.identity, default_item_type);
    match store
        .delete(item_type, &cmd.identity.id, cmd.expected_score.as_ref())
        .await?
    {
        Some(record) => {
            println!("Deleted:");
            println!("{}", render_records(&[record], format));
        }
        None => println!("Nothing to delete for {}/{}", item_type, cmd.identity.id),
    }
    Ok(())
}
