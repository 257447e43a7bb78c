//! Per-position tag constraints.
//!
//! Taggers usually know, from a lexicon, that a word can take only a small
//! subset of tags. Restricting the trellis to those tags shrinks both the
//! feature space and the inference cost. The engine consumes constraints
//! through the traits here and never mutates them.

use alloc::vec::Vec;

/// A constraint oracle bound to one sentence.
pub trait AnchoredConstraints {
    /// Allowed tag ids at position `pos`.
    fn allowed_tags(&self, pos: usize) -> &[u32];
}

/// Builds per-sentence constraint views.
pub trait TagConstraints<W> {
    /// The sentence-bound view.
    type Anchored: AnchoredConstraints;

    /// Binds the oracle to one sentence.
    fn anchor(&self, words: &[W]) -> Self::Anchored;
}

/// Allows every non-sentinel tag at every position.
#[derive(Clone, Debug)]
pub struct AllTags {
    tags: Vec<u32>,
}

impl AllTags {
    /// Creates constraints over a tag inventory of `num_labels` ids,
    /// excluding the `start` sentinel.
    ///
    /// # Panics
    ///
    /// `num_labels` must be less than 2^32.
    #[must_use]
    pub fn new(num_labels: usize, start: u32) -> Self {
        let num_labels = u32::try_from(num_labels).unwrap();
        let tags = (0..num_labels).filter(|&tag| tag != start).collect();
        Self { tags }
    }
}

impl AnchoredConstraints for AllTags {
    #[inline(always)]
    fn allowed_tags(&self, _pos: usize) -> &[u32] {
        &self.tags
    }
}

impl<W> TagConstraints<W> for AllTags {
    type Anchored = Self;

    #[inline(always)]
    fn anchor(&self, _words: &[W]) -> Self::Anchored {
        self.clone()
    }
}

/// Fixed per-position allowed sets, one entry per word.
///
/// This is the shape a lexicon lookup produces for one sentence.
#[derive(Clone, Debug)]
pub struct ExplicitConstraints {
    allowed: Vec<Vec<u32>>,
}

impl ExplicitConstraints {
    /// Wraps explicit per-position allowed sets.
    #[must_use]
    pub fn new(allowed: Vec<Vec<u32>>) -> Self {
        Self { allowed }
    }
}

impl AnchoredConstraints for ExplicitConstraints {
    #[inline(always)]
    fn allowed_tags(&self, pos: usize) -> &[u32] {
        &self.allowed[pos]
    }
}

impl<W> TagConstraints<W> for ExplicitConstraints {
    type Anchored = Self;

    #[inline(always)]
    fn anchor(&self, _words: &[W]) -> Self::Anchored {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tags_excludes_sentinel() {
        let constraints = AllTags::new(4, 3);
        let anchored = TagConstraints::<u32>::anchor(&constraints, &[10, 11]);
        assert_eq!(&[0, 1, 2], anchored.allowed_tags(0));
        assert_eq!(&[0, 1, 2], anchored.allowed_tags(1));
    }

    #[test]
    fn test_explicit_per_position() {
        let constraints = ExplicitConstraints::new(vec![vec![0], vec![1, 2]]);
        let anchored = TagConstraints::<u32>::anchor(&constraints, &[10, 11]);
        assert_eq!(&[0], anchored.allowed_tags(0));
        assert_eq!(&[1, 2], anchored.allowed_tags(1));
    }
}
