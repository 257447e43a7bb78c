//! Expected feature counts.

use alloc::vec::Vec;

use crate::anchoring::{Anchoring, WeightedAnchoring};
use crate::errors::{CrfError, Result};
use crate::forward_backward::Marginal;
use crate::utils::FromU32;

/// Accumulates a loss term and per-feature expected counts over one
/// training pass.
///
/// Accumulating the model marginal with scale `+1` and the gold marginal
/// with scale `-1` leaves the log-likelihood gradient in [`Self::counts`]
/// and the negative log-likelihood in [`Self::loss`]. Writers are
/// exclusive: parallel drivers keep one accumulator per worker and reduce
/// afterwards.
#[derive(Clone, Debug)]
pub struct ExpectedCounts {
    loss: f64,
    counts: Vec<f64>,
}

impl ExpectedCounts {
    /// A zero accumulator over `num_features` coordinates.
    #[must_use]
    pub fn new(num_features: usize) -> Self {
        Self {
            loss: 0.0,
            counts: vec![0.0; num_features],
        }
    }

    /// The accumulated loss.
    #[inline(always)]
    #[must_use]
    pub const fn loss(&self) -> f64 {
        self.loss
    }

    /// The accumulated per-feature counts.
    #[inline(always)]
    #[must_use]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Adds `scale`-weighted expected feature counts under `marginal`, and
    /// `scale` times its log-partition to the loss.
    ///
    /// # Errors
    ///
    /// [`CrfError::MissingFeatures`] if posterior mass falls on a
    /// transition that has no feature vector.
    pub fn accumulate<A: Anchoring>(
        &mut self,
        marginal: &Marginal<WeightedAnchoring<A>>,
        scale: f64,
    ) -> Result<()> {
        self.loss += marginal.log_partition() * scale;
        let features = marginal.anchoring().features();
        let counts = &mut self.counts;
        marginal.visit_transitions(|pos, prev, cur, mass| {
            let fids = features
                .features(pos, prev, cur)
                .ok_or(CrfError::MissingFeatures { position: pos })?;
            for &fid in fids {
                counts[usize::from_u32(fid)] += scale * mass;
            }
            Ok(())
        })
    }

    /// Folds another accumulator into this one.
    ///
    /// # Errors
    ///
    /// [`CrfError::DimensionMismatch`] if the two accumulators differ in
    /// width.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.counts.len() != other.counts.len() {
            return Err(CrfError::DimensionMismatch {
                expected: self.counts.len(),
                actual: other.counts.len(),
            });
        }
        self.loss += other.loss;
        for (count, &delta) in self.counts.iter_mut().zip(&other.counts) {
            *count += delta;
        }
        Ok(())
    }
}
