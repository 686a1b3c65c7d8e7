//! Grouping encoded envelopes into size-bounded frames.
//!
//! The codec itself handles one envelope at a time. Callers that ship
//! several envelopes per transport write use [`chunk_by_size`] to split
//! them into runs that fit a byte budget.
//!
//! # Example
//!
//! ```
//! use payload_codec::batch::chunk_by_size;
//!
//! let items = vec!["aaaa", "bb", "cc", "dddddd", "e"];
//! let chunks = chunk_by_size(items, 6);
//! assert_eq!(chunks, vec![vec!["aaaa", "bb"], vec!["cc"], vec!["dddddd"], vec!["e"]]);
//! ```

/// Group `items` into consecutive runs whose total length is at most `budget`.
///
/// Order is preserved. An item longer than `budget` is placed in a run of
/// its own. Empty input or a zero budget yields no runs.
pub fn chunk_by_size<I, T>(items: I, budget: usize) -> Vec<Vec<T>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut chunks = Vec::new();
    if budget == 0 {
        return chunks;
    }

    let mut current: Vec<T> = Vec::new();
    let mut current_size = 0usize;

    for item in items {
        let size = item.as_ref().len();
        if !current.is_empty() && current_size + size > budget {
            chunks.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += size;
        current.push(item);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Total byte length of a run.
pub fn run_size<T: AsRef<[u8]>>(run: &[T]) -> usize {
    run.iter().map(|item| item.as_ref().len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let items: Vec<&str> = Vec::new();
        assert!(chunk_by_size(items, 10).is_empty());
    }

    #[test]
    fn test_zero_budget() {
        assert!(chunk_by_size(vec!["a", "b"], 0).is_empty());
    }

    #[test]
    fn test_everything_fits() {
        let chunks = chunk_by_size(vec!["a", "b", "c"], 10);
        assert_eq!(chunks, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_exact_budget_boundary() {
        let chunks = chunk_by_size(vec!["ab", "cd", "ef"], 4);
        assert_eq!(chunks, vec![vec!["ab", "cd"], vec!["ef"]]);
    }

    #[test]
    fn test_oversized_item_alone() {
        let chunks = chunk_by_size(vec!["toolong", "a", "b"], 3);
        assert_eq!(chunks, vec![vec!["toolong"], vec!["a", "b"]]);
    }

    #[test]
    fn test_counts_bytes_not_chars() {
        // "é" is two bytes in UTF-8.
        let chunks = chunk_by_size(vec!["é", "é"], 3);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn test_runs_respect_budget() {
        let items: Vec<Vec<u8>> = (1..=20).map(|n| vec![0u8; n % 7 + 1]).collect();
        let budget = 9;
        let chunks = chunk_by_size(items.clone(), budget);

        for run in &chunks {
            assert!(run.len() == 1 || run_size(run) <= budget);
        }
        let flattened: Vec<Vec<u8>> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }
}
