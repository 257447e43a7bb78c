//! Training and decoding data.

use alloc::string::String;
use alloc::vec::Vec;

use crate::errors::{CrfError, Result};

/// A sentence paired with one gold label per word.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaggedSequence<L, W> {
    labels: Vec<L>,
    words: Vec<W>,
    id: String,
}

impl<L, W> TaggedSequence<L, W> {
    /// Creates a new tagged sequence.
    ///
    /// # Errors
    ///
    /// [`CrfError::DimensionMismatch`] if `labels` and `words` differ in
    /// length.
    pub fn new(labels: Vec<L>, words: Vec<W>, id: String) -> Result<Self> {
        if labels.len() != words.len() {
            return Err(CrfError::DimensionMismatch {
                expected: words.len(),
                actual: labels.len(),
            });
        }
        Ok(Self { labels, words, id })
    }

    /// Gold labels, one per word.
    #[inline(always)]
    #[must_use]
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// The words of the sentence.
    #[inline(always)]
    #[must_use]
    pub fn words(&self) -> &[W] {
        &self.words
    }

    /// An opaque identifier for reporting.
    #[inline(always)]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of words.
    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` for the empty sentence.
    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::string::ToString;

    #[test]
    fn test_length_mismatch() {
        let result = TaggedSequence::new(vec!["B"], vec![1u32, 2], "s0".to_string());
        assert_eq!(
            Err(CrfError::DimensionMismatch {
                expected: 2,
                actual: 1
            }),
            result,
        );
    }

    #[test]
    fn test_accessors() {
        let seq = TaggedSequence::new(vec!["B", "O"], vec![7u32, 9], "s1".to_string()).unwrap();
        assert_eq!(&["B", "O"], seq.labels());
        assert_eq!(&[7, 9], seq.words());
        assert_eq!("s1", seq.id());
        assert_eq!(2, seq.len());
        assert!(!seq.is_empty());
    }
}
