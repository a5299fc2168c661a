//! Tax-group resolution
//!
//! The tax calculator itself is a pure function (see
//! `shared::check::money::recalculate_totals`): deterministic, rounds to
//! 2 decimals, no side effects. This module owns the add-on rate table
//! it reads from; rates are resolved once at item-add time and frozen
//! onto the item, so later rule changes never rewrite an open check.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One tax group (e.g. prepared food, alcohol)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxGroup {
    pub id: String,
    pub name: String,
    /// Add-on rate in percent
    pub rate: Decimal,
}

/// Add-on tax rates by group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxTable {
    groups: HashMap<String, TaxGroup>,
    /// Rate applied when an item names no group
    #[serde(default)]
    default_rate: Decimal,
}

impl TaxTable {
    pub fn new(groups: Vec<TaxGroup>, default_rate: Decimal) -> Self {
        Self {
            groups: groups.into_iter().map(|g| (g.id.clone(), g)).collect(),
            default_rate,
        }
    }

    /// Resolve a tax group to its rate; unknown or absent groups fall
    /// back to the default rate.
    pub fn resolve(&self, tax_group_id: Option<&str>) -> Decimal {
        match tax_group_id {
            Some(id) => match self.groups.get(id) {
                Some(group) => group.rate,
                None => {
                    tracing::warn!(tax_group_id = id, "Unknown tax group, using default rate");
                    self.default_rate
                }
            },
            None => self.default_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn resolves_known_groups_and_falls_back() {
        let table = TaxTable::new(
            vec![TaxGroup {
                id: "food".to_string(),
                name: "Prepared food".to_string(),
                rate: d("8"),
            }],
            d("0"),
        );

        assert_eq!(table.resolve(Some("food")), d("8"));
        assert_eq!(table.resolve(Some("unknown")), d("0"));
        assert_eq!(table.resolve(None), d("0"));
    }
}
