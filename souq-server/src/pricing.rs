//! Cart and order totals
//!
//! All amounts are integer fils. Percentages go through `Decimal` so the tax
//! line rounds exactly (half away from zero) instead of drifting in floats.

use rust_decimal::prelude::*;
use shared::models::CartSummary;

/// VAT rate applied to the subtotal (5 %)
pub const TAX_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
/// Orders above this subtotal ship for free (200 AED)
pub const FREE_SHIPPING_THRESHOLD: i64 = 20_000;
/// Flat shipping fee below the threshold (25 AED)
pub const SHIPPING_FEE: i64 = 2_500;
/// One coin is earned per 10 AED of order total
pub const FILS_PER_COIN: i64 = 1_000;

/// A priced line: (unit price in fils, quantity)
pub type PricedLine = (i64, i64);

pub fn line_total(unit_price: i64, quantity: i64) -> i64 {
    unit_price * quantity
}

pub fn tax_for(subtotal: i64) -> i64 {
    (Decimal::from(subtotal) * TAX_RATE)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

pub fn shipping_for(subtotal: i64) -> i64 {
    if subtotal == 0 || subtotal > FREE_SHIPPING_THRESHOLD {
        0
    } else {
        SHIPPING_FEE
    }
}

pub fn coins_for(total: i64) -> i64 {
    total.max(0) / FILS_PER_COIN
}

/// Totals for a set of priced lines
pub fn summarize(lines: &[PricedLine]) -> CartSummary {
    let subtotal: i64 = lines.iter().map(|(price, qty)| line_total(*price, *qty)).sum();
    let item_count: i64 = lines.iter().map(|(_, qty)| qty).sum();
    let tax = tax_for(subtotal);
    let shipping = shipping_for(subtotal);
    let discount = 0;
    let total = subtotal + tax + shipping - discount;

    CartSummary {
        subtotal,
        shipping,
        tax,
        discount,
        total,
        item_count,
        coins_earnable: coins_for(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_order_pays_shipping() {
        // 2 x 45.50 AED
        let summary = summarize(&[(4_550, 2)]);
        assert_eq!(summary.subtotal, 9_100);
        assert_eq!(summary.tax, 455);
        assert_eq!(summary.shipping, 2_500);
        assert_eq!(summary.total, 12_055);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.coins_earnable, 12);
    }

    #[test]
    fn test_free_shipping_strictly_above_threshold() {
        assert_eq!(shipping_for(20_000), SHIPPING_FEE);
        assert_eq!(shipping_for(20_001), 0);
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 5 % of 0.10 AED = 0.5 fils -> 1
        assert_eq!(tax_for(10), 1);
        // 5 % of 0.09 AED = 0.45 fils -> 0
        assert_eq!(tax_for(9), 0);
        assert_eq!(tax_for(30_000), 1_500);
    }

    #[test]
    fn test_empty_cart_is_free() {
        let summary = summarize(&[]);
        assert_eq!(summary, CartSummary::default());
    }

    #[test]
    fn test_coins_floor() {
        assert_eq!(coins_for(999), 0);
        assert_eq!(coins_for(1_000), 1);
        assert_eq!(coins_for(31_500), 31);
        assert_eq!(coins_for(-5), 0);
    }
}
