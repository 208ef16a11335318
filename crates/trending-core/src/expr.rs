// crates/trending-core/src/expr.rs
//
// Attribute values and the condition/update expressions a `KeyValueStore`
// evaluates at apply time.
//
// Items are flat attribute maps, DynamoDB style. Conditions and updates are
// data, not closures, so a remote backend can translate them into its own
// expression language and a local backend can evaluate them in place.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A stored item: attribute name -> value.
pub type Item = BTreeMap<String, AttributeValue>;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String attribute.
    S(String),
    /// Number attribute. Compared numerically, so `5.0 == 5`.
    N(BigDecimal),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            AttributeValue::N(_) => None,
        }
    }

    pub fn as_n(&self) -> Option<&BigDecimal> {
        match self {
            AttributeValue::N(n) => Some(n),
            AttributeValue::S(_) => None,
        }
    }

    /// Index ordering: numbers sort numerically, strings byte-wise, and all
    /// numbers sort before all strings.
    pub fn index_cmp(&self, other: &AttributeValue) -> Ordering {
        match (self, other) {
            (AttributeValue::N(a), AttributeValue::N(b)) => a.cmp(b),
            (AttributeValue::S(a), AttributeValue::S(b)) => a.as_bytes().cmp(b.as_bytes()),
            (AttributeValue::N(_), AttributeValue::S(_)) => Ordering::Less,
            (AttributeValue::S(_), AttributeValue::N(_)) => Ordering::Greater,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::S(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::S(s)
    }
}

impl From<BigDecimal> for AttributeValue {
    fn from(n: BigDecimal) -> Self {
        AttributeValue::N(n)
    }
}

/// Predicate evaluated against the current item at apply time.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The attribute is missing (or the whole item is absent).
    AttributeNotExists(String),
    /// The attribute exists and equals the value.
    Equals(String, AttributeValue),
    /// The attribute is a string starting with the prefix.
    BeginsWith(String, String),
    /// Every inner condition holds.
    And(Vec<Condition>),
}

impl Condition {
    pub fn equals(name: &str, value: impl Into<AttributeValue>) -> Self {
        Condition::Equals(name.to_string(), value.into())
    }

    pub fn begins_with(name: &str, prefix: impl Into<String>) -> Self {
        Condition::BeginsWith(name.to_string(), prefix.into())
    }

    pub fn attribute_not_exists(name: &str) -> Self {
        Condition::AttributeNotExists(name.to_string())
    }

    /// Evaluate against the current item; `None` means the item is absent.
    pub fn evaluate(&self, item: Option<&Item>) -> bool {
        let attr = |name: &str| item.and_then(|i| i.get(name));
        match self {
            Condition::AttributeNotExists(name) => attr(name).is_none(),
            Condition::Equals(name, expected) => attr(name) == Some(expected),
            Condition::BeginsWith(name, prefix) => matches!(
                attr(name),
                Some(AttributeValue::S(s)) if s.starts_with(prefix.as_str())
            ),
            Condition::And(conditions) => conditions.iter().all(|c| c.evaluate(item)),
        }
    }
}

/// One clause of an update expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// `SET name = value`
    Set(String, AttributeValue),
    /// `ADD name delta`; a missing attribute counts as zero.
    Add(String, BigDecimal),
}

impl Update {
    pub fn set(name: &str, value: impl Into<AttributeValue>) -> Self {
        Update::Set(name.to_string(), value.into())
    }

    pub fn add(name: &str, delta: BigDecimal) -> Self {
        Update::Add(name.to_string(), delta)
    }

    /// Apply this clause to `item` in place.
    pub fn apply(&self, item: &mut Item) -> Result<(), StoreError> {
        match self {
            Update::Set(name, value) => {
                item.insert(name.clone(), value.clone());
            }
            Update::Add(name, delta) => {
                let current = match item.get(name) {
                    None => BigDecimal::from(0),
                    Some(AttributeValue::N(n)) => n.clone(),
                    Some(AttributeValue::S(_)) => {
                        return Err(StoreError::Backend(format!(
                            "ADD on non-numeric attribute `{}`",
                            name
                        )))
                    }
                };
                item.insert(name.clone(), AttributeValue::N((current + delta).normalized()));
            }
        }
        Ok(())
    }
}

/// Apply every clause in order.
pub fn apply_updates(item: &mut Item, updates: &[Update]) -> Result<(), StoreError> {
    for update in updates {
        update.apply(item)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample() -> Item {
        let mut item = Item::new();
        item.insert("lastDeflatedAt".into(), "2020-06-01T10:00:00Z".into());
        item.insert("score".into(), dec("4.5").into());
        item
    }

    #[test]
    fn test_equals_is_numeric_for_numbers() {
        let item = sample();
        assert!(Condition::equals("score", dec("4.50")).evaluate(Some(&item)));
        assert!(!Condition::equals("score", dec("4.5000000001")).evaluate(Some(&item)));
    }

    #[test]
    fn test_conditions_fail_on_absent_item() {
        assert!(!Condition::equals("score", dec("4.5")).evaluate(None));
        assert!(!Condition::begins_with("lastDeflatedAt", "2020").evaluate(None));
        assert!(Condition::attribute_not_exists("score").evaluate(None));
    }

    #[test]
    fn test_begins_with_requires_string() {
        let item = sample();
        assert!(Condition::begins_with("lastDeflatedAt", "2020-06-01").evaluate(Some(&item)));
        assert!(!Condition::begins_with("lastDeflatedAt", "2020-06-02").evaluate(Some(&item)));
        assert!(!Condition::begins_with("score", "4").evaluate(Some(&item)));
    }

    #[test]
    fn test_and_requires_all() {
        let item = sample();
        let both = Condition::And(vec![
            Condition::equals("score", dec("4.5")),
            Condition::begins_with("lastDeflatedAt", "2020-06-01"),
        ]);
        assert!(both.evaluate(Some(&item)));
        let one_wrong = Condition::And(vec![
            Condition::equals("score", dec("4.5")),
            Condition::begins_with("lastDeflatedAt", "2019"),
        ]);
        assert!(!one_wrong.evaluate(Some(&item)));
    }

    #[test]
    fn test_add_accumulates_and_defaults_to_zero() {
        let mut item = sample();
        apply_updates(
            &mut item,
            &[Update::add("score", dec("0.5")), Update::add("fresh", dec("2"))],
        )
        .unwrap();
        assert_eq!(item["score"], AttributeValue::N(dec("5")));
        assert_eq!(item["fresh"], AttributeValue::N(dec("2")));
    }

    #[test]
    fn test_add_on_string_fails() {
        let mut item = sample();
        let err = Update::add("lastDeflatedAt", dec("1")).apply(&mut item).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn test_index_cmp_orders_numbers_before_strings() {
        let low = AttributeValue::N(dec("1.5"));
        let high = AttributeValue::N(dec("10"));
        let text = AttributeValue::from("a");
        assert_eq!(low.index_cmp(&high), Ordering::Less);
        assert_eq!(high.index_cmp(&text), Ordering::Less);
        assert_eq!(text.index_cmp(&low), Ordering::Greater);
    }
}
