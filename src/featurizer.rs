//! Sparse feature indexing over `(position, previous tag, current tag)`.

use alloc::boxed::Box;
use alloc::vec::Vec;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

use crate::constraints::{AnchoredConstraints, TagConstraints};
use crate::errors::{CrfError, Result};
use crate::label::LabelIndex;
use crate::sequence::TaggedSequence;
use crate::surface::{AnchoredSurface, FeatureLevel, SurfaceFeaturizer};
use crate::utils::FromU32;

fn allowed_at<C>(constraints: &C, pos: usize) -> Result<Vec<u32>>
where
    C: AnchoredConstraints,
{
    let mut tags = constraints.allowed_tags(pos).to_vec();
    tags.sort_unstable();
    tags.dedup();
    if tags.is_empty() {
        return Err(CrfError::EmptyConstraint { position: pos });
    }
    Ok(tags)
}

/// Owns the global sparse feature index.
///
/// Two lookup families exist, both keyed by a surface feature id: unary
/// lookups map the current tag to a feature id, bigram lookups map
/// `prev * K + cur`. Both stay sparse, most cells are never assigned.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedFeaturizer {
    num_labels: u32,
    start: u32,
    unigram_fids: Vec<HashMap<u32, u32>>,
    bigram_fids: Vec<HashMap<u32, u32>>,
    num_features: u32,
}

impl IndexedFeaturizer {
    /// Scans `corpus` once and assigns dense ids to every feature the
    /// constrained trellises can fire.
    ///
    /// Unary features are indexed for every allowed tag. Bigram features
    /// are indexed only at positions with more than one allowed tag, and
    /// only at the [`FeatureLevel::Minimal`] granularity, which is what
    /// keeps the parameter count manageable.
    ///
    /// # Errors
    ///
    /// [`CrfError::EmptyConstraint`] if a position of some sentence has no
    /// allowed tags.
    ///
    /// # Panics
    ///
    /// The number of features must be less than 2^32.
    pub fn build<L, W, C, S>(
        corpus: &[TaggedSequence<L, W>],
        label_index: &LabelIndex<L>,
        constraints: &C,
        surface: &S,
    ) -> Result<Self>
    where
        C: TagConstraints<W>,
        S: SurfaceFeaturizer<W>,
    {
        let mut this = Self {
            num_labels: u32::try_from(label_index.len()).unwrap(),
            start: label_index.start(),
            unigram_fids: Vec::new(),
            bigram_fids: Vec::new(),
            num_features: 0,
        };
        for sequence in corpus {
            let cons = constraints.anchor(sequence.words());
            let surf = surface.anchor(sequence.words());
            let mut prev_tags = vec![this.start];
            for pos in 0..sequence.len() {
                let cur_tags = allowed_at(&cons, pos)?;
                for &cur in &cur_tags {
                    for &sf in surf.features_for_word(pos, FeatureLevel::Standard) {
                        this.index_unigram(sf, cur);
                    }
                    if cur_tags.len() > 1 {
                        for &prev in &prev_tags {
                            for &sf in surf.features_for_word(pos, FeatureLevel::Minimal) {
                                this.index_bigram(sf, prev, cur);
                            }
                        }
                    }
                }
                prev_tags = cur_tags;
            }
        }
        Ok(this)
    }

    fn index_unigram(&mut self, surface_fid: u32, cur: u32) {
        let surface_fid = usize::from_u32(surface_fid);
        if self.unigram_fids.len() <= surface_fid {
            self.unigram_fids.resize(surface_fid + 1, HashMap::new());
        }
        let slot = &mut self.unigram_fids[surface_fid];
        if !slot.contains_key(&cur) {
            slot.insert(cur, self.num_features);
            self.num_features = self.num_features.checked_add(1).unwrap();
        }
    }

    fn index_bigram(&mut self, surface_fid: u32, prev: u32, cur: u32) {
        let surface_fid = usize::from_u32(surface_fid);
        if self.bigram_fids.len() <= surface_fid {
            self.bigram_fids.resize(surface_fid + 1, HashMap::new());
        }
        let key = prev * self.num_labels + cur;
        let slot = &mut self.bigram_fids[surface_fid];
        if !slot.contains_key(&key) {
            slot.insert(key, self.num_features);
            self.num_features = self.num_features.checked_add(1).unwrap();
        }
    }

    /// Returns the number of indexed features.
    #[inline(always)]
    #[must_use]
    pub fn num_features(&self) -> usize {
        usize::from_u32(self.num_features)
    }

    /// Returns the size of the tag inventory, the sentinel included.
    #[inline(always)]
    #[must_use]
    pub fn num_labels(&self) -> usize {
        usize::from_u32(self.num_labels)
    }

    /// Returns the id of the start sentinel.
    #[inline(always)]
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Materializes the transition-to-features table for one sentence.
    ///
    /// Cells whose transition is forbidden by the constraints stay [`None`];
    /// an allowed transition that fires no indexed feature holds an empty
    /// vector instead.
    ///
    /// # Errors
    ///
    /// [`CrfError::EmptyConstraint`] if a position has no allowed tags.
    pub fn anchor<W, C, S>(
        &self,
        words: &[W],
        constraints: &C,
        surface: &S,
    ) -> Result<AnchoredFeatures>
    where
        C: TagConstraints<W>,
        S: SurfaceFeaturizer<W>,
    {
        let n = words.len();
        let k = usize::from_u32(self.num_labels);
        let cons = constraints.anchor(words);
        let surf = surface.anchor(words);
        let mut allowed = Vec::with_capacity(n);
        for pos in 0..n {
            allowed.push(allowed_at(&cons, pos)?);
        }
        let start_only = [self.start];
        let mut table: Vec<Option<Box<[u32]>>> = vec![None; n * k * k];
        for pos in 0..n {
            let cur_tags = &allowed[pos];
            let prev_tags: &[u32] = if pos == 0 {
                &start_only
            } else {
                &allowed[pos - 1]
            };
            let ambiguous = cur_tags.len() > 1;
            for &cur in cur_tags {
                let mut unary = Vec::new();
                for &sf in surf.features_for_word(pos, FeatureLevel::Standard) {
                    if let Some(&fid) = self
                        .unigram_fids
                        .get(usize::from_u32(sf))
                        .and_then(|slot| slot.get(&cur))
                    {
                        unary.push(fid);
                    }
                }
                for &prev in prev_tags {
                    let mut fids = unary.clone();
                    if ambiguous {
                        for &sf in surf.features_for_word(pos, FeatureLevel::Minimal) {
                            if let Some(&fid) = self
                                .bigram_fids
                                .get(usize::from_u32(sf))
                                .and_then(|slot| slot.get(&(prev * self.num_labels + cur)))
                            {
                                fids.push(fid);
                            }
                        }
                    }
                    table[(pos * k + usize::from_u32(prev)) * k + usize::from_u32(cur)] =
                        Some(fids.into_boxed_slice());
                }
            }
        }
        Ok(AnchoredFeatures {
            len: n,
            num_labels: self.num_labels,
            start: self.start,
            start_only,
            allowed,
            table,
        })
    }
}

fn sorted_pairs(map: &HashMap<u32, u32>) -> Vec<(u32, u32)> {
    let mut pairs: Vec<(u32, u32)> = map.iter().map(|(&key, &fid)| (key, fid)).collect();
    pairs.sort_unstable();
    pairs
}

impl Encode for IndexedFeaturizer {
    #[allow(clippy::type_complexity)]
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        let unigram_fids: Vec<Vec<(u32, u32)>> = self.unigram_fids.iter().map(sorted_pairs).collect();
        let bigram_fids: Vec<Vec<(u32, u32)>> = self.bigram_fids.iter().map(sorted_pairs).collect();
        Encode::encode(&self.num_labels, encoder)?;
        Encode::encode(&self.start, encoder)?;
        Encode::encode(&unigram_fids, encoder)?;
        Encode::encode(&bigram_fids, encoder)?;
        Encode::encode(&self.num_features, encoder)?;
        Ok(())
    }
}

impl Decode for IndexedFeaturizer {
    #[allow(clippy::type_complexity)]
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let num_labels = Decode::decode(decoder)?;
        let start = Decode::decode(decoder)?;
        let unigram_fids: Vec<Vec<(u32, u32)>> = Decode::decode(decoder)?;
        let bigram_fids: Vec<Vec<(u32, u32)>> = Decode::decode(decoder)?;
        let num_features = Decode::decode(decoder)?;
        Ok(Self {
            num_labels,
            start,
            unigram_fids: unigram_fids
                .into_iter()
                .map(|pairs| pairs.into_iter().collect())
                .collect(),
            bigram_fids: bigram_fids
                .into_iter()
                .map(|pairs| pairs.into_iter().collect())
                .collect(),
            num_features,
        })
    }
}

/// The per-sentence feature table over `(position, previous tag, current
/// tag)`, together with the normalized allowed-tag sets it was built from.
pub struct AnchoredFeatures {
    len: usize,
    num_labels: u32,
    start: u32,
    start_only: [u32; 1],
    allowed: Vec<Vec<u32>>,
    table: Vec<Option<Box<[u32]>>>,
}

impl AnchoredFeatures {
    /// Number of positions.
    #[inline(always)]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for the empty sentence.
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the tag inventory, the sentinel included.
    #[inline(always)]
    #[must_use]
    pub fn num_labels(&self) -> usize {
        usize::from_u32(self.num_labels)
    }

    /// Id of the start sentinel.
    #[inline(always)]
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Allowed tags at `pos`, sorted and duplicate-free. Out-of-range
    /// positions yield the start sentinel alone.
    #[inline(always)]
    #[must_use]
    pub fn allowed_tags(&self, pos: isize) -> &[u32] {
        if pos < 0 || pos >= self.len as isize {
            &self.start_only
        } else {
            &self.allowed[pos as usize]
        }
    }

    /// The sparse feature vector of a transition, or [`None`] if the
    /// transition is forbidden.
    #[inline(always)]
    #[must_use]
    pub fn features(&self, pos: usize, prev: u32, cur: u32) -> Option<&[u32]> {
        let k = usize::from_u32(self.num_labels);
        self.table[(pos * k + usize::from_u32(prev)) * k + usize::from_u32(cur)].as_deref()
    }
}
