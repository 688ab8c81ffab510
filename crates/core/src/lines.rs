//! Line-item arithmetic shared by orders, invoices and bills.

use serde::{Deserialize, Serialize};

use crate::money::Amount;

/// A single priced line on an order, invoice or bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: String,
    pub quantity: u32,
    /// Price per unit in minor units.
    pub unit_price: Amount,
    /// Absolute tax for the whole line (not a rate).
    #[serde(default)]
    pub taxes: Amount,
}

impl LineItem {
    pub fn new(product: impl Into<String>, quantity: u32, unit_price: Amount) -> Self {
        Self {
            product: product.into(),
            quantity,
            unit_price,
            taxes: Amount::ZERO,
        }
    }

    pub fn with_taxes(mut self, taxes: Amount) -> Self {
        self.taxes = taxes;
        self
    }

    /// Untaxed line value: `quantity * unit_price`.
    pub fn net(&self) -> Amount {
        self.unit_price * self.quantity
    }

    /// Line amount including taxes.
    pub fn amount(&self) -> Amount {
        self.net() + self.taxes
    }
}

/// Aggregated totals for a set of lines.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    pub subtotal: Amount,
    pub taxes: Amount,
    pub total: Amount,
}

impl LineTotals {
    pub fn of(lines: &[LineItem]) -> Self {
        lines.iter().fold(Self::default(), |mut acc, line| {
            acc.subtotal += line.net();
            acc.taxes += line.taxes;
            acc.total += line.amount();
            acc
        })
    }
}

/// Amount to submit for a document: the line total when lines produce a non-zero
/// total, otherwise the manually entered amount.
pub fn resolve_amount(lines: &[LineItem], entered: Amount) -> Amount {
    let total = LineTotals::of(lines).total;
    if total.is_zero() { entered } else { total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn totals_include_taxes_per_line() {
        let lines = vec![
            LineItem::new("Desk", 2, Amount::from_major(150)).with_taxes(Amount::from_major(27)),
            LineItem::new("Chair", 4, Amount::from_major(40)),
        ];

        let totals = LineTotals::of(&lines);
        assert_eq!(totals.subtotal, Amount::from_major(460));
        assert_eq!(totals.taxes, Amount::from_major(27));
        assert_eq!(totals.total, Amount::from_major(487));
    }

    #[test]
    fn entered_amount_is_used_without_lines() {
        assert_eq!(resolve_amount(&[], Amount::from_major(99)), Amount::from_major(99));
    }

    #[test]
    fn line_total_wins_over_entered_amount() {
        let lines = vec![LineItem::new("Hosting", 1, Amount::from_major(12))];
        assert_eq!(resolve_amount(&lines, Amount::from_major(99)), Amount::from_major(12));
    }

    proptest! {
        /// Property: total is always subtotal plus taxes.
        #[test]
        fn total_is_subtotal_plus_taxes(
            raw in prop::collection::vec((0u32..1_000, 0i64..1_000_000, 0i64..100_000), 0..20)
        ) {
            let lines: Vec<LineItem> = raw
                .into_iter()
                .map(|(qty, price, tax)| {
                    LineItem::new("p", qty, Amount::from_minor(price)).with_taxes(Amount::from_minor(tax))
                })
                .collect();

            let totals = LineTotals::of(&lines);
            prop_assert_eq!(totals.total, totals.subtotal + totals.taxes);
        }
    }
}
