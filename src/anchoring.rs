//! Sentence-bound scoring.

use alloc::vec::Vec;

use crate::featurizer::AnchoredFeatures;
use crate::utils::FromU32;

/// A scoring function bound to one sentence.
///
/// Positions live in `[0, n)`. [`Anchoring::valid_labels`] additionally
/// accepts the fenceposts `-1` and `n`, which hold the start sentinel
/// alone. A score of `f64::NEG_INFINITY` marks a forbidden transition.
pub trait Anchoring {
    /// Number of positions in the sentence.
    fn len(&self) -> usize;

    /// Returns `true` for the empty sentence.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the tag inventory, the start sentinel included.
    fn num_labels(&self) -> usize;

    /// Id of the start sentinel.
    fn start_label(&self) -> u32;

    /// Allowed tag ids at `pos`, sorted and duplicate-free. Out-of-range
    /// positions yield the start sentinel alone.
    fn valid_labels(&self, pos: isize) -> &[u32];

    /// Log-score of labeling `pos` with `cur` when the previous position
    /// carries `prev`.
    fn score_transition(&self, pos: usize, prev: u32, cur: u32) -> f64;
}

/// The neutral scorer: every transition scores zero and every non-sentinel
/// tag is allowed.
#[derive(Clone, Debug)]
pub struct IdentityAnchoring {
    len: usize,
    num_labels: usize,
    start: u32,
    tags: Vec<u32>,
    start_only: [u32; 1],
}

impl IdentityAnchoring {
    /// Creates a neutral anchoring for a sentence of `len` positions over a
    /// tag inventory of `num_labels` ids.
    ///
    /// # Panics
    ///
    /// `num_labels` must be less than 2^32.
    #[must_use]
    pub fn new(len: usize, num_labels: usize, start: u32) -> Self {
        let tags = (0..u32::try_from(num_labels).unwrap())
            .filter(|&tag| tag != start)
            .collect();
        Self {
            len,
            num_labels,
            start,
            tags,
            start_only: [start],
        }
    }
}

impl Anchoring for IdentityAnchoring {
    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn num_labels(&self) -> usize {
        self.num_labels
    }

    #[inline(always)]
    fn start_label(&self) -> u32 {
        self.start
    }

    #[inline(always)]
    fn valid_labels(&self, pos: isize) -> &[u32] {
        if pos < 0 || pos >= self.len as isize {
            &self.start_only
        } else {
            &self.tags
        }
    }

    #[inline(always)]
    fn score_transition(&self, _pos: usize, _prev: u32, _cur: u32) -> f64 {
        0.0
    }
}

/// Scores transitions as the dot product of a weight vector with the
/// anchored feature table, plus a delegated augment score.
///
/// The feature table is folded into a dense `trans[prev][cur][pos]` cache
/// once, at construction, since inference revisits every transition several
/// times. Forbidden transitions hold `f64::NEG_INFINITY`.
pub struct WeightedAnchoring<A> {
    features: AnchoredFeatures,
    augment: A,
    trans: Vec<f64>,
}

impl<A: Anchoring> WeightedAnchoring<A> {
    /// Binds `weights` and `augment` to an anchored feature table.
    #[must_use]
    pub fn new(features: AnchoredFeatures, weights: &[f64], augment: A) -> Self {
        let n = features.len();
        let k = features.num_labels();
        let mut trans = vec![f64::NEG_INFINITY; k * k * n];
        for pos in 0..n {
            for &cur in features.allowed_tags(pos as isize) {
                for &prev in features.allowed_tags(pos as isize - 1) {
                    if let Some(fids) = features.features(pos, prev, cur) {
                        let mut score = 0.0;
                        for &fid in fids {
                            score += weights[usize::from_u32(fid)];
                        }
                        trans[(usize::from_u32(prev) * k + usize::from_u32(cur)) * n + pos] =
                            score;
                    }
                }
            }
        }
        Self {
            features,
            augment,
            trans,
        }
    }

    /// The anchored feature table this scorer was built from.
    #[inline(always)]
    #[must_use]
    pub fn features(&self) -> &AnchoredFeatures {
        &self.features
    }
}

impl<A: Anchoring> Anchoring for WeightedAnchoring<A> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.features.len()
    }

    #[inline(always)]
    fn num_labels(&self) -> usize {
        self.features.num_labels()
    }

    #[inline(always)]
    fn start_label(&self) -> u32 {
        self.features.start()
    }

    #[inline(always)]
    fn valid_labels(&self, pos: isize) -> &[u32] {
        self.features.allowed_tags(pos)
    }

    #[inline(always)]
    fn score_transition(&self, pos: usize, prev: u32, cur: u32) -> f64 {
        let k = self.features.num_labels();
        let cached =
            self.trans[(usize::from_u32(prev) * k + usize::from_u32(cur)) * self.features.len() + pos];
        cached + self.augment.score_transition(pos, prev, cur)
    }
}
