use alloc::vec::Vec;

use crate::anchoring::Anchoring;
use crate::surface::{AnchoredSurface, FeatureLevel, SurfaceFeaturizer};

#[cfg(feature = "train")]
macro_rules! logsumexp {
    ( $($x:expr,)* ) => {
        {
            let mut y = f64::NEG_INFINITY;
            $(
                y = $crate::math::logsumexp(y, $x);
            )*
            y
        }
    };
    ( $($x:expr),* ) => {
        logsumexp!($( $x, )*)
    };
}

#[cfg(feature = "train")]
pub(crate) use logsumexp;

/// Surface featurizer where each word id is its own single surface feature
/// at both granularities.
pub struct TokenSurface;

pub struct TokenSurfaceView {
    features: Vec<[u32; 1]>,
}

impl AnchoredSurface for TokenSurfaceView {
    fn features_for_word(&self, pos: usize, _level: FeatureLevel) -> &[u32] {
        &self.features[pos]
    }
}

impl SurfaceFeaturizer<u32> for TokenSurface {
    type Anchored = TokenSurfaceView;

    fn anchor(&self, words: &[u32]) -> TokenSurfaceView {
        TokenSurfaceView {
            features: words.iter().map(|&word| [word]).collect(),
        }
    }
}

/// An anchoring with explicit per-transition scores.
///
/// Transitions between allowed tags default to zero; everything else is
/// forbidden.
#[derive(Clone)]
pub struct TableAnchoring {
    len: usize,
    num_labels: usize,
    start: u32,
    allowed: Vec<Vec<u32>>,
    start_only: [u32; 1],
    scores: Vec<f64>,
}

impl TableAnchoring {
    pub fn new(num_labels: usize, start: u32, allowed: Vec<Vec<u32>>) -> Self {
        let len = allowed.len();
        let mut scores = vec![f64::NEG_INFINITY; len * num_labels * num_labels];
        for pos in 0..len {
            let prev_tags = if pos == 0 {
                vec![start]
            } else {
                allowed[pos - 1].clone()
            };
            for &cur in &allowed[pos] {
                for &prev in &prev_tags {
                    scores[(pos * num_labels + prev as usize) * num_labels + cur as usize] = 0.0;
                }
            }
        }
        Self {
            len,
            num_labels,
            start,
            allowed,
            start_only: [start],
            scores,
        }
    }

    pub fn set_score(&mut self, pos: usize, prev: u32, cur: u32, score: f64) {
        self.scores[(pos * self.num_labels + prev as usize) * self.num_labels + cur as usize] =
            score;
    }
}

impl Anchoring for TableAnchoring {
    fn len(&self) -> usize {
        self.len
    }

    fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn start_label(&self) -> u32 {
        self.start
    }

    fn valid_labels(&self, pos: isize) -> &[u32] {
        if pos < 0 || pos >= self.len as isize {
            &self.start_only
        } else {
            &self.allowed[pos as usize]
        }
    }

    fn score_transition(&self, pos: usize, prev: u32, cur: u32) -> f64 {
        self.scores[(pos * self.num_labels + prev as usize) * self.num_labels + cur as usize]
    }
}

/// Three real tags `{0, 1, 2}` plus start `3`, every tag allowed at every
/// position, every score zero.
pub fn uniform_anchoring(len: usize) -> TableAnchoring {
    TableAnchoring::new(4, 3, vec![vec![0, 1, 2]; len])
}
