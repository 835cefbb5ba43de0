//! Category ordering for labeled interval charts.

use std::collections::BTreeMap;

/// Map each distinct category to its 1-based rank in sorted order.
pub fn compute_category_index<T, I>(categories: I) -> BTreeMap<T, usize>
where
    T: Ord,
    I: IntoIterator<Item = T>,
{
    let mut index: BTreeMap<T, usize> = categories.into_iter().map(|c| (c, 0)).collect();
    for (rank, slot) in index.values_mut().enumerate() {
        *slot = rank + 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_deduplicated_one_based() {
        assert!(compute_category_index(Vec::<&str>::new()).is_empty());
        assert_eq!(
            compute_category_index(["a"]),
            BTreeMap::from([("a", 1)])
        );
        assert_eq!(
            compute_category_index(["b", "a", "b"]),
            BTreeMap::from([("a", 1), ("b", 2)])
        );
        assert_eq!(
            compute_category_index([3, 1, 2, 1]),
            BTreeMap::from([(1, 1), (2, 2), (3, 3)])
        );
    }
}
