//! Surface feature interface.
//!
//! Word-level featurizers (shape, affixes, gazetteers) live outside the
//! engine; it consumes their output as opaque integer ids through the traits
//! here. Two granularities exist: the full [`FeatureLevel::Standard`] set
//! drives unary label features, while the coarser [`FeatureLevel::Minimal`]
//! subset bounds the blow-up of label-bigram features.

/// Granularity of the surface features requested for a position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeatureLevel {
    /// The full surface feature set, paired with unary label features.
    Standard,

    /// A coarse subset, paired with label-bigram features.
    Minimal,
}

/// A surface featurizer bound to one sentence.
pub trait AnchoredSurface {
    /// Surface feature ids firing at `pos` for the given granularity.
    fn features_for_word(&self, pos: usize, level: FeatureLevel) -> &[u32];
}

/// Builds per-sentence surface feature views.
pub trait SurfaceFeaturizer<W> {
    /// The sentence-bound view.
    type Anchored: AnchoredSurface;

    /// Binds the featurizer to one sentence.
    fn anchor(&self, words: &[W]) -> Self::Anchored;
}
