//! Price-level diff between two snapshots of one book side.

use std::collections::HashMap;
use tickstop_core::PriceLevel;

/// Compare two ranked level lists.
///
/// Returns `(removed, added)`:
/// - a price present in `old` but not in `new` is removed (old size)
/// - a price present in both with a different size is added (new size)
/// - a price only in `new` is added
///
/// Prices are matched on their fixed-precision key, so `1.5` and `1.50`
/// are the same level. `removed` follows `old` order, `added` follows
/// `new` order.
pub fn diff(old: &[PriceLevel], new: &[PriceLevel]) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
    if old == new {
        return (Vec::new(), Vec::new());
    }

    let mut lookup: HashMap<String, PriceLevel> =
        new.iter().map(|level| (level.price.key(), *level)).collect();

    let mut removed = Vec::new();
    for level in old {
        let key = level.price.key();
        match lookup.get(&key) {
            None => removed.push(*level),
            Some(current) if current.size == level.size => {
                lookup.remove(&key);
            }
            Some(_) => {}
        }
    }

    let added = new
        .iter()
        .filter_map(|level| lookup.remove(&level.price.key()))
        .collect();

    (removed, added)
}
