//! Shuffling and sampling driven by a [`Random`] engine

use super::Random;
use std::collections::HashSet;

/// Shuffle in place (Fisher-Yates, walking from the back)
pub fn shuffle<T>(items: &mut [T], rng: &mut Random) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}

/// Pick one item uniformly; `None` when `items` is empty
pub fn choose<'a, T>(items: &'a [T], rng: &mut Random) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.below(items.len()))
}

/// Pick up to `max` distinct items
///
/// When at least half the items are wanted, the whole slice is shuffled
/// and truncated. Otherwise distinct indices are drawn by rejection and the
/// picked items come back in their original order.
pub fn take<T: Clone>(items: &[T], max: usize, rng: &mut Random) -> Vec<T> {
    if max.saturating_mul(2) >= items.len() {
        let mut all = items.to_vec();
        shuffle(&mut all, rng);
        all.truncate(max);
        return all;
    }

    let mut picked = HashSet::with_capacity(max);
    let mut order = Vec::with_capacity(max);
    while order.len() < max {
        let index = rng.below(items.len());
        if picked.insert(index) {
            order.push(index);
        }
    }
    order.sort_unstable();
    order.into_iter().map(|i| items[i].clone()).collect()
}
