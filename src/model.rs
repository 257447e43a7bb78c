//! The model artifact and inference glue.

use core::hash::Hash;

use alloc::vec::Vec;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::anchoring::{Anchoring, IdentityAnchoring, WeightedAnchoring};
use crate::constraints::TagConstraints;
use crate::errors::{CrfError, Result};
use crate::featurizer::IndexedFeaturizer;
use crate::label::LabelIndex;
use crate::surface::SurfaceFeaturizer;
use crate::viterbi;

#[cfg(feature = "train")]
use crate::counts::ExpectedCounts;
#[cfg(feature = "train")]
use crate::forward_backward::Marginal;
#[cfg(feature = "train")]
use crate::sequence::TaggedSequence;

/// The serializable model artifact: label inventory, feature index, and one
/// weight per feature.
#[derive(Clone, Debug)]
pub struct CrfModel<L> {
    label_index: LabelIndex<L>,
    featurizer: IndexedFeaturizer,
    weights: Vec<f64>,
}

impl<L> CrfModel<L> {
    /// Bundles a feature index with its weight vector.
    #[must_use]
    pub const fn new(
        label_index: LabelIndex<L>,
        featurizer: IndexedFeaturizer,
        weights: Vec<f64>,
    ) -> Self {
        Self {
            label_index,
            featurizer,
            weights,
        }
    }

    /// The label inventory.
    #[inline(always)]
    #[must_use]
    pub const fn label_index(&self) -> &LabelIndex<L> {
        &self.label_index
    }

    /// The feature index.
    #[inline(always)]
    #[must_use]
    pub const fn featurizer(&self) -> &IndexedFeaturizer {
        &self.featurizer
    }

    /// The weight vector, one coordinate per feature.
    #[inline(always)]
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Binds the model to constraint and surface plug-ins for inference.
    ///
    /// # Errors
    ///
    /// [`CrfError::DimensionMismatch`] if the weight vector length differs
    /// from the number of indexed features.
    pub fn inference<'a, C, S>(
        &'a self,
        constraints: &'a C,
        surface: &'a S,
    ) -> Result<CrfInference<'a, L, C, S>> {
        if self.weights.len() != self.featurizer.num_features() {
            return Err(CrfError::DimensionMismatch {
                expected: self.featurizer.num_features(),
                actual: self.weights.len(),
            });
        }
        Ok(CrfInference {
            model: self,
            constraints,
            surface,
        })
    }
}

impl<L: Encode + 'static> Encode for CrfModel<L> {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.label_index, encoder)?;
        Encode::encode(&self.featurizer, encoder)?;
        Encode::encode(&self.weights, encoder)?;
        Ok(())
    }
}

impl<L> Decode for CrfModel<L>
where
    L: Decode + Eq + Hash + Clone + 'static,
{
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let label_index = Decode::decode(decoder)?;
        let featurizer = Decode::decode(decoder)?;
        let weights = Decode::decode(decoder)?;
        Ok(Self {
            label_index,
            featurizer,
            weights,
        })
    }
}

/// Weight-bound inference over sentences.
pub struct CrfInference<'a, L, C, S> {
    model: &'a CrfModel<L>,
    constraints: &'a C,
    surface: &'a S,
}

impl<'a, L, C, S> CrfInference<'a, L, C, S> {
    /// The neutral augment for a sentence of `len` positions.
    #[must_use]
    pub fn base_augment(&self, len: usize) -> IdentityAnchoring {
        IdentityAnchoring::new(
            len,
            self.model.label_index.len(),
            self.model.label_index.start(),
        )
    }

    /// A zero expected-count accumulator sized to the feature index.
    #[cfg(feature = "train")]
    #[must_use]
    pub fn empty_counts(&self) -> ExpectedCounts {
        ExpectedCounts::new(self.model.featurizer.num_features())
    }
}

impl<'a, L, C, S> CrfInference<'a, L, C, S>
where
    L: Eq + Hash + Clone,
{
    fn anchor_with<W, A>(&self, words: &[W], augment: A) -> Result<WeightedAnchoring<A>>
    where
        C: TagConstraints<W>,
        S: SurfaceFeaturizer<W>,
        A: Anchoring,
    {
        let features = self
            .model
            .featurizer
            .anchor(words, self.constraints, self.surface)?;
        Ok(WeightedAnchoring::new(
            features,
            &self.model.weights,
            augment,
        ))
    }

    /// The model posterior for a sentence, under the neutral augment.
    ///
    /// # Errors
    ///
    /// [`CrfError::EmptyConstraint`] or [`CrfError::Infeasible`] when the
    /// sentence admits no labeling.
    #[cfg(feature = "train")]
    #[cfg_attr(docsrs, doc(cfg(feature = "train")))]
    pub fn marginal<W>(
        &self,
        words: &[W],
    ) -> Result<Marginal<WeightedAnchoring<IdentityAnchoring>>>
    where
        C: TagConstraints<W>,
        S: SurfaceFeaturizer<W>,
    {
        self.marginal_with(words, self.base_augment(words.len()))
    }

    /// The model posterior with an external augment folded into every
    /// transition score.
    ///
    /// # Errors
    ///
    /// As [`Self::marginal`].
    #[cfg(feature = "train")]
    #[cfg_attr(docsrs, doc(cfg(feature = "train")))]
    pub fn marginal_with<W, A>(
        &self,
        words: &[W],
        augment: A,
    ) -> Result<Marginal<WeightedAnchoring<A>>>
    where
        C: TagConstraints<W>,
        S: SurfaceFeaturizer<W>,
        A: Anchoring,
    {
        Marginal::forward_backward(self.anchor_with(words, augment)?)
    }

    /// The Dirac marginal at the gold labeling of `sequence`, under the
    /// neutral augment.
    ///
    /// # Errors
    ///
    /// [`CrfError::UnknownLabel`] if a gold label was never indexed, plus
    /// the anchoring errors of [`Self::marginal`].
    #[cfg(feature = "train")]
    #[cfg_attr(docsrs, doc(cfg(feature = "train")))]
    pub fn gold_marginal<W>(
        &self,
        sequence: &TaggedSequence<L, W>,
    ) -> Result<Marginal<WeightedAnchoring<IdentityAnchoring>>>
    where
        C: TagConstraints<W>,
        S: SurfaceFeaturizer<W>,
    {
        self.gold_marginal_with(sequence, self.base_augment(sequence.len()))
    }

    /// The Dirac marginal at the gold labeling, with an external augment.
    ///
    /// # Errors
    ///
    /// As [`Self::gold_marginal`].
    #[cfg(feature = "train")]
    #[cfg_attr(docsrs, doc(cfg(feature = "train")))]
    pub fn gold_marginal_with<W, A>(
        &self,
        sequence: &TaggedSequence<L, W>,
        augment: A,
    ) -> Result<Marginal<WeightedAnchoring<A>>>
    where
        C: TagConstraints<W>,
        S: SurfaceFeaturizer<W>,
        A: Anchoring,
    {
        let mut tags = Vec::with_capacity(sequence.len());
        for label in sequence.labels() {
            tags.push(self.model.label_index.id_of(label)?);
        }
        Marginal::gold(self.anchor_with(sequence.words(), augment)?, tags)
    }

    /// Posterior decoding: the position-wise argmax labeling under
    /// `marginal`. Ties break toward the lowest tag id.
    #[cfg(feature = "train")]
    #[cfg_attr(docsrs, doc(cfg(feature = "train")))]
    #[must_use]
    pub fn annotate<A: Anchoring>(&self, marginal: &Marginal<A>) -> Vec<L> {
        let anchoring = marginal.anchoring();
        let mut labels = Vec::with_capacity(anchoring.len());
        for pos in 0..anchoring.len() {
            let mut best_mass = f64::NEG_INFINITY;
            let mut best_tag = anchoring.start_label();
            for &cur in anchoring.valid_labels(pos as isize) {
                let mass = marginal.position_marginal(pos, cur);
                if mass > best_mass {
                    best_mass = mass;
                    best_tag = cur;
                }
            }
            labels.push(self.model.label_index.label(best_tag).clone());
        }
        labels
    }

    /// Viterbi decoding straight to labels, with the path score.
    ///
    /// # Errors
    ///
    /// As [`Self::marginal`].
    pub fn tag<W>(&self, words: &[W]) -> Result<(Vec<L>, f64)>
    where
        C: TagConstraints<W>,
        S: SurfaceFeaturizer<W>,
    {
        let anchoring = self.anchor_with(words, self.base_augment(words.len()))?;
        let (tags, score) = viterbi::search_best_path(&anchoring)?;
        let labels = tags
            .iter()
            .map(|&tag| self.model.label_index.label(tag).clone())
            .collect();
        Ok((labels, score))
    }
}
