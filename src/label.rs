//! Mapping between opaque labels and dense tag ids.

use core::hash::Hash;

use alloc::vec::Vec;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

use crate::errors::{CrfError, Result};
use crate::utils::FromU32;

/// A bijection between opaque labels and dense tag ids `0..K`.
///
/// One label is the start sentinel, used at the boundary before the first
/// position. The sentinel occupies an ordinary id so that transition tables
/// can be indexed uniformly.
#[derive(Clone, Debug)]
pub struct LabelIndex<L> {
    labels: Vec<L>,
    ids: HashMap<L, u32>,
    start: u32,
}

impl<L> LabelIndex<L> {
    /// Returns the label carrying the given dense id.
    #[inline(always)]
    #[must_use]
    pub fn label(&self, id: u32) -> &L {
        &self.labels[usize::from_u32(id)]
    }

    /// Returns the id of the start sentinel.
    #[inline(always)]
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Returns the number of indexed labels, the sentinel included.
    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if the index holds no labels.
    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<L> LabelIndex<L>
where
    L: Eq + Hash + Clone,
{
    /// Builds an index over `labels` in iteration order, deduplicated, and
    /// designates `start` as the start sentinel, appending it if absent.
    ///
    /// # Panics
    ///
    /// The number of distinct labels must be less than 2^32.
    pub fn new<I>(labels: I, start: L) -> Self
    where
        I: IntoIterator<Item = L>,
    {
        let mut index = Self {
            labels: Vec::new(),
            ids: HashMap::new(),
            start: 0,
        };
        for label in labels {
            index.intern(label);
        }
        index.start = index.intern(start);
        index
    }

    fn intern(&mut self, label: L) -> u32 {
        if let Some(&id) = self.ids.get(&label) {
            return id;
        }
        let id = u32::try_from(self.labels.len()).unwrap();
        self.labels.push(label.clone());
        self.ids.insert(label, id);
        id
    }

    /// Returns the dense id of `label`.
    ///
    /// # Errors
    ///
    /// [`CrfError::UnknownLabel`] if the label was never indexed.
    #[inline(always)]
    pub fn id_of(&self, label: &L) -> Result<u32> {
        self.ids.get(label).copied().ok_or(CrfError::UnknownLabel)
    }
}

impl<L: Encode + 'static> Encode for LabelIndex<L> {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.labels, encoder)?;
        Encode::encode(&self.start, encoder)?;
        Ok(())
    }
}

impl<L> Decode for LabelIndex<L>
where
    L: Decode + Eq + Hash + Clone + 'static,
{
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let labels: Vec<L> = Decode::decode(decoder)?;
        let start = Decode::decode(decoder)?;
        let ids = labels
            .iter()
            .enumerate()
            .map(|(id, label)| (label.clone(), u32::try_from(id).unwrap()))
            .collect();
        Ok(Self { labels, ids, start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use alloc::string::String;

    #[test]
    fn test_insertion_order_dedup() {
        let index = LabelIndex::new(["B", "I", "B", "O", "I"], "<s>");
        assert_eq!(4, index.len());
        assert_eq!(0, index.id_of(&"B").unwrap());
        assert_eq!(1, index.id_of(&"I").unwrap());
        assert_eq!(2, index.id_of(&"O").unwrap());
        assert_eq!(3, index.start());
        assert_eq!(&"O", index.label(2));
    }

    #[test]
    fn test_start_already_indexed() {
        let index = LabelIndex::new(["O", "B"], "O");
        assert_eq!(2, index.len());
        assert_eq!(0, index.start());
    }

    #[test]
    fn test_unknown_label() {
        let index = LabelIndex::new(["B", "I"], "<s>");
        assert_eq!(Err(CrfError::UnknownLabel), index.id_of(&"X"));
    }

    #[test]
    fn test_roundtrip() {
        let index = LabelIndex::new(
            [String::from("B"), String::from("I"), String::from("O")],
            String::from("<s>"),
        );
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&index, config).unwrap();
        let (decoded, _): (LabelIndex<String>, usize) =
            bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(index.len(), decoded.len());
        assert_eq!(index.start(), decoded.start());
        for id in 0..u32::try_from(index.len()).unwrap() {
            assert_eq!(index.label(id), decoded.label(id));
            assert_eq!(id, decoded.id_of(index.label(id)).unwrap());
        }
    }
}
