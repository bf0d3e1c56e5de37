//! Shared arithmetic for Butcher-tableau schemes.

/// `sum(row[j] * k[j])` over the length of `row`.
pub(crate) fn weighted(row: &[f64], k: &[f64]) -> f64 {
    row.iter().zip(k).map(|(a, k)| a * k).sum()
}
