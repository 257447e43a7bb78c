//! # chaincrf
//!
//! First-order linear-chain Conditional Random Fields (CRFs) for sequence
//! labeling, implemented in pure Rust.
//!
//! The engine scores tag sequences with sparse binary features over
//! `(position, previous tag, current tag)` transitions, restricted to
//! per-position allowed-tag sets. Over one sentence it computes the most
//! probable tag sequence (Viterbi), per-position and per-transition
//! posterior probabilities (forward-backward in log-space), the
//! log-partition function, and expected feature counts under either the
//! model distribution or a gold labeling, which is exactly the gradient a
//! log-likelihood trainer needs. Optimizers, word-shape featurizers, and
//! lexicon induction live outside this crate and plug in through the
//! [`TagConstraints`], [`SurfaceFeaturizer`], and [`Anchoring`] traits.
#![cfg_attr(
    all(feature = "std", feature = "train"),
    doc = "
## Examples

```rust
# fn main() -> Result<(), Box<dyn std::error::Error>> {
use chaincrf::{
    AllTags, AnchoredSurface, CrfModel, FeatureLevel, IndexedFeaturizer, LabelIndex,
    SurfaceFeaturizer, TaggedSequence,
};

// Words arrive pre-mapped to integer ids; here each word fires its own id
// as its only surface feature, at both granularities.
struct TokenSurface;

struct TokenView(Vec<Vec<u32>>);

impl AnchoredSurface for TokenView {
    fn features_for_word(&self, pos: usize, _level: FeatureLevel) -> &[u32] {
        &self.0[pos]
    }
}

impl SurfaceFeaturizer<u32> for TokenSurface {
    type Anchored = TokenView;

    fn anchor(&self, words: &[u32]) -> TokenView {
        TokenView(words.iter().map(|&w| vec![w]).collect())
    }
}

// Index B/I/O plus a start sentinel, allow every tag everywhere.
let label_index = LabelIndex::new([\"B\", \"I\", \"O\"], \"<s>\");
let constraints = AllTags::new(label_index.len(), label_index.start());
let surface = TokenSurface;

let corpus = vec![TaggedSequence::new(
    vec![\"B\", \"I\", \"O\"],
    vec![1, 2, 3],
    \"s1\".into(),
)?];

// One pass over the corpus assigns ids to every reachable feature.
let featurizer = IndexedFeaturizer::build(&corpus, &label_index, &constraints, &surface)?;

// Weights normally come from a trainer; any vector of the right width
// works.
let weights = vec![0.25; featurizer.num_features()];
let model = CrfModel::new(label_index, featurizer, weights);
let inference = model.inference(&constraints, &surface)?;

// Posterior probabilities and the log-partition function.
let marginal = inference.marginal(&[1, 2, 3])?;
assert!(marginal.log_partition().is_finite());
let mut total = 0.0;
for tag in 0..3 {
    total += marginal.position_marginal(0, tag);
}
assert!((total - 1.0).abs() < 1e-9);

// The best tag sequence, and the gradient-ready expected counts.
let (labels, _score) = inference.tag(&[1, 2, 3])?;
assert_eq!(3, labels.len());

let mut counts = inference.empty_counts();
counts.accumulate(&marginal, 1.0)?;
counts.accumulate(&inference.gold_marginal(&corpus[0])?, -1.0)?;
assert!(counts.loss() >= 0.0);
# Ok(())
# }
```
"
)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "alloc"))]
compile_error!("`alloc` feature is currently required to build this crate");

#[macro_use]
extern crate alloc;

mod anchoring;
mod constraints;
mod errors;
mod featurizer;
mod label;
mod model;
mod sequence;
mod surface;
mod utils;
mod viterbi;

#[cfg(feature = "train")]
mod counts;
#[cfg(feature = "train")]
mod forward_backward;
#[cfg(feature = "train")]
mod math;

#[cfg(test)]
mod test_utils;

pub use anchoring::{Anchoring, IdentityAnchoring, WeightedAnchoring};
pub use constraints::{AllTags, AnchoredConstraints, ExplicitConstraints, TagConstraints};
pub use errors::{CrfError, Result};
pub use featurizer::{AnchoredFeatures, IndexedFeaturizer};
pub use label::LabelIndex;
pub use model::{CrfInference, CrfModel};
pub use sequence::TaggedSequence;
pub use surface::{AnchoredSurface, FeatureLevel, SurfaceFeaturizer};
pub use viterbi::search_best_path;

#[cfg(feature = "train")]
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub use counts::ExpectedCounts;
#[cfg(feature = "train")]
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub use forward_backward::{DenseMarginal, GoldMarginal, Marginal};
