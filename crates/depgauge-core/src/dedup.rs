//! Order-preserving deduplication.

use std::collections::HashSet;
use std::hash::Hash;

/// Remove repeated items, keeping the first occurrence of each.
///
/// Equality is exact; no normalization is applied. A duplicate-free input is
/// returned unchanged.
pub fn dedup<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Split `items` into survivors and duplicates by `key`.
///
/// The first item with a given key survives; every later item with the same
/// key lands in the duplicates list. Both lists keep input order.
pub fn partition_duplicates<T, K, F>(items: Vec<T>, key: F) -> (Vec<T>, Vec<T>)
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut survivors = Vec::with_capacity(items.len());
    let mut duplicates = Vec::new();

    for item in items {
        if seen.insert(key(&item)) {
            survivors.push(item);
        } else {
            duplicates.push(item);
        }
    }

    (survivors, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let out = dedup(vec!["b", "a", "b", "c", "a"]);
        assert_eq!(out, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_dedup_unique_input_unchanged() {
        let input = vec![3, 1, 2];
        assert_eq!(dedup(input.clone()), input);
    }

    #[test]
    fn test_dedup_empty() {
        let out: Vec<String> = dedup(Vec::new());
        assert!(out.is_empty());
    }

    #[test]
    fn test_dedup_exact_equality() {
        let out = dedup(vec!["Mod", "mod", "mod "]);
        assert_eq!(out, vec!["Mod", "mod", "mod "]);
    }

    #[test]
    fn test_dedup_output_has_no_repeats() {
        let input: Vec<u32> = (0..200).map(|i| (i * 7919) % 23).collect();
        let out = dedup(input.clone());

        let unique: HashSet<_> = out.iter().collect();
        assert_eq!(unique.len(), out.len());

        // first occurrences in input order
        let mut expected = Vec::new();
        for v in input {
            if !expected.contains(&v) {
                expected.push(v);
            }
        }
        assert_eq!(out, expected);
    }

    #[test]
    fn test_partition_duplicates() {
        let items = vec![(1, "a"), (2, "b"), (3, "a"), (4, "a")];
        let (kept, dropped) = partition_duplicates(items, |(_, name)| *name);

        assert_eq!(kept, vec![(1, "a"), (2, "b")]);
        assert_eq!(dropped, vec![(3, "a"), (4, "a")]);
    }
}
