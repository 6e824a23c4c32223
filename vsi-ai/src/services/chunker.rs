//! Batch chunking
//!
//! Splits an ordered photo batch into sub-batches no larger than the
//! provider's per-call image limit.

use crate::error::AnalysisError;

/// Split `items` into ordered chunks of at most `size` elements
///
/// The last chunk may be shorter. Concatenating the chunks yields `items`
/// exactly. An empty input yields no chunks.
///
/// # Errors
/// `AnalysisError::InvalidArgument` when `size` is zero.
pub fn chunk<T>(items: &[T], size: usize) -> Result<Vec<&[T]>, AnalysisError> {
    if size == 0 {
        return Err(AnalysisError::InvalidArgument(
            "chunk size must be at least 1".to_string(),
        ));
    }
    Ok(items.chunks(size).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_concatenate_to_input() {
        for n in 0..30usize {
            let items: Vec<usize> = (0..n).collect();
            for size in 1..10usize {
                let chunks = chunk(&items, size).unwrap();
                assert_eq!(chunks.len(), n.div_ceil(size), "n={} size={}", n, size);
                assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
                let rejoined: Vec<usize> = chunks.concat();
                assert_eq!(rejoined, items);
            }
        }
    }

    #[test]
    fn test_seventeen_by_eight() {
        let items: Vec<u32> = (0..17).collect();
        let sizes: Vec<usize> = chunk(&items, 8).unwrap().iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![8, 8, 1]);
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = chunk(&[1, 2, 3], 0).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidArgument(_)));
    }
}
