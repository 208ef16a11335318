// crates/trending-cli/src/commands/mod.rs
//
// Command module declarations for the trending CLI.

pub mod record;
pub mod scan;

use trending_core::BigDecimal;

/// Reject negative scores at the CLI boundary; the engine treats them as
/// programming errors.
pub(crate) fn non_negative(name: &str, value: &BigDecimal) -> Result<(), Box<dyn std::error::Error>> {
    if trending_core::score::is_negative(value) {
        return Err(format!("{} cannot be negative (got {})", name, value).into());
    }
    Ok(())
}
