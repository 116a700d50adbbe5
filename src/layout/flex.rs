//! # Column Width Distribution
//!
//! Grow and shrink arithmetic for rows of side-by-side columns, as the
//! footer lays them out. Items are `(width, factor)` pairs; the factor is
//! the flex-grow or flex-shrink weight.

/// Distribute remaining space among items based on their grow factors.
pub fn distribute_grow(items: &mut [(f64, f64)], remaining: f64) {
    let total_grow: f64 = items.iter().map(|(_, g)| g).sum();
    if total_grow <= 0.0 || remaining <= 0.0 {
        return;
    }
    for (width, grow) in items.iter_mut() {
        *width += remaining * (*grow / total_grow);
    }
}

/// Shrink items to absorb a (negative) `overflow`, weighted by width times
/// shrink factor so wide columns give up more.
pub fn distribute_shrink(items: &mut [(f64, f64)], overflow: f64) {
    let total_shrink_weighted: f64 = items.iter().map(|(w, s)| w * s).sum();
    if total_shrink_weighted <= 0.0 || overflow >= 0.0 {
        return;
    }
    let overflow = overflow.abs();
    for (width, shrink) in items.iter_mut() {
        let factor = (*width * *shrink) / total_shrink_weighted;
        *width -= overflow * factor;
        *width = width.max(0.0);
    }
}

/// Resolve a row of column widths into `available` mm.
///
/// `Some(w)` is a fixed width, `None` an auto column. Auto columns split
/// whatever the fixed ones leave; if the fixed ones overflow, they shrink
/// proportionally and auto columns get nothing.
pub fn resolve_widths(requested: &[Option<f64>], available: f64) -> Vec<f64> {
    let available = available.max(0.0);
    let fixed_total: f64 = requested.iter().flatten().map(|w| w.max(0.0)).sum();
    let remaining = available - fixed_total;

    if remaining >= 0.0 {
        let mut items: Vec<(f64, f64)> = requested
            .iter()
            .map(|w| match w {
                Some(w) => (w.max(0.0), 0.0),
                None => (0.0, 1.0),
            })
            .collect();
        distribute_grow(&mut items, remaining);
        items.into_iter().map(|(w, _)| w).collect()
    } else {
        let mut items: Vec<(f64, f64)> = requested
            .iter()
            .map(|w| (w.unwrap_or(0.0).max(0.0), 1.0))
            .collect();
        distribute_shrink(&mut items, remaining);
        items.into_iter().map(|(w, _)| w).collect()
    }
}
