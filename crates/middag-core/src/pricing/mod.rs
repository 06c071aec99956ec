//! Price-history analysis: deduce the previous price and drop percentage
//! for a product from its raw price-history series.
//!
//! The input comes straight off the catalog wire and is untrusted: it may
//! be unsorted, and entries may be missing dates or carry non-numeric
//! prices. This function never fails; entries that cannot be used are
//! dropped and "no drop detected" is expressed as `None`.

use serde::Deserialize;
use serde_json::Value;

/// How many of the most recent history entries to consider.
const HISTORY_WINDOW: usize = 10;

/// One raw price-history entry as returned by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct PricePoint {
    #[serde(default)]
    pub date: Option<String>,
    /// Price as the catalog sent it: a number, a numeric string, or junk.
    #[serde(default)]
    pub price: Option<Value>,
}

impl PricePoint {
    pub fn new(date: impl Into<String>, price: impl Into<Value>) -> Self {
        Self {
            date: Some(date.into()),
            price: Some(price.into()),
        }
    }
}

/// A detected price drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDrop {
    pub previous_price: f64,
    /// Rounded to 2 decimals, always in `(0, 100]`.
    pub drop_percentage: f64,
}

/// Coerce a raw price value to a float. Accepts JSON numbers and numeric
/// strings; everything else is `None`.
pub fn coerce_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Scan a product's price history for a drop relative to `current_price`.
///
/// The history is sorted descending by date string (lexicographic order,
/// which matches the catalog's date-stamp format), truncated to the 10
/// most recent entries, and leniently coerced to floats. The first coerced
/// price that differs from `current_price` is taken as the previous price;
/// a drop is reported only when it is strictly positive and greater than
/// the current price.
pub fn detect_price_drop(history: &[PricePoint], current_price: f64) -> Option<PriceDrop> {
    // Catalog junk can coerce to a negative current price; without this
    // guard the percentage would exceed 100.
    if current_price < 0.0 {
        return None;
    }

    let mut ordered: Vec<&PricePoint> = history.iter().collect();
    ordered.sort_by(|a, b| b.date.as_deref().unwrap_or("").cmp(a.date.as_deref().unwrap_or("")));

    let previous_price = ordered
        .iter()
        .take(HISTORY_WINDOW)
        .filter_map(|p| p.price.as_ref().and_then(coerce_price))
        .find(|&price| price != current_price)?;

    // A zero previous price means no usable baseline, not a failure.
    if previous_price <= current_price || previous_price <= 0.0 {
        return None;
    }

    let raw = (previous_price - current_price) / previous_price * 100.0;
    let drop_percentage = (raw * 100.0).round() / 100.0;
    if drop_percentage <= 0.0 {
        return None;
    }

    Some(PriceDrop {
        previous_price,
        drop_percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(date: &str, price: Value) -> PricePoint {
        PricePoint {
            date: Some(date.into()),
            price: Some(price),
        }
    }

    #[test]
    fn detects_drop_from_string_prices() {
        let history = vec![
            point("2024-01-10", json!("99.9")),
            point("2024-01-01", json!("120.0")),
        ];
        let drop = detect_price_drop(&history, 99.9).unwrap();
        assert_eq!(drop.previous_price, 120.0);
        assert_eq!(drop.drop_percentage, 16.75);
    }

    #[test]
    fn negative_current_price_is_never_a_drop() {
        let history = vec![point("2024-01-01", json!(120.0))];
        assert!(detect_price_drop(&history, -1.0).is_none());
    }

    #[test]
    fn unsorted_history_is_sorted_by_date_descending() {
        let history = vec![
            point("2024-01-01", json!(120.0)),
            point("2024-01-10", json!(99.9)),
            point("2024-01-05", json!(110.0)),
        ];
        // Most recent differing price is the 2024-01-05 entry.
        let drop = detect_price_drop(&history, 99.9).unwrap();
        assert_eq!(drop.previous_price, 110.0);
    }

    #[test]
    fn non_numeric_entries_are_dropped_not_fatal() {
        let history = vec![
            point("2024-01-10", json!("not a price")),
            point("2024-01-09", json!({"nested": true})),
            point("2024-01-08", json!(null)),
            point("2024-01-01", json!(50.0)),
        ];
        let drop = detect_price_drop(&history, 40.0).unwrap();
        assert_eq!(drop.previous_price, 50.0);
        assert_eq!(drop.drop_percentage, 20.0);
    }

    #[test]
    fn missing_price_field_is_skipped() {
        let history = vec![
            PricePoint {
                date: Some("2024-01-10".into()),
                price: None,
            },
            point("2024-01-01", json!(80.0)),
        ];
        assert!(detect_price_drop(&history, 60.0).is_some());
    }

    #[test]
    fn no_drop_when_all_prices_equal_current() {
        let history = vec![
            point("2024-01-10", json!(99.9)),
            point("2024-01-01", json!(99.9)),
        ];
        assert!(detect_price_drop(&history, 99.9).is_none());
    }

    #[test]
    fn no_drop_when_previous_is_lower() {
        let history = vec![point("2024-01-01", json!(80.0))];
        assert!(detect_price_drop(&history, 99.9).is_none());
    }

    #[test]
    fn zero_previous_price_is_no_drop_not_a_panic() {
        let history = vec![point("2024-01-01", json!(0.0))];
        assert!(detect_price_drop(&history, -1.0).is_none());
    }

    #[test]
    fn only_ten_most_recent_entries_are_considered() {
        let mut history: Vec<PricePoint> = (10..22)
            .map(|day| point(&format!("2024-01-{day}"), json!(99.9)))
            .collect();
        // The only differing price is older than the 10-entry window.
        history.push(point("2024-01-01", json!(200.0)));
        assert!(detect_price_drop(&history, 99.9).is_none());
    }

    #[test]
    fn empty_history_means_no_drop() {
        assert!(detect_price_drop(&[], 99.9).is_none());
    }

    #[test]
    fn drop_percentage_stays_in_range() {
        let history = vec![point("2024-01-01", json!(100.0))];
        let drop = detect_price_drop(&history, 0.01).unwrap();
        assert!(drop.drop_percentage > 0.0 && drop.drop_percentage <= 100.0);

        // A free product is a full drop.
        let drop = detect_price_drop(&history, 0.0).unwrap();
        assert_eq!(drop.drop_percentage, 100.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let history = vec![point("2024-01-01", json!(3.0))];
        // (3 - 2) / 3 * 100 = 33.333... -> 33.33
        let drop = detect_price_drop(&history, 2.0).unwrap();
        assert_eq!(drop.drop_percentage, 33.33);
    }
}
