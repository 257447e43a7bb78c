//! Forward-backward in log-space and the marginal protocol.

use alloc::vec::Vec;

use crate::anchoring::Anchoring;
use crate::errors::{CrfError, Result};
use crate::math;
use crate::utils::FromU32;

/// The posterior over labelings of one sentence, or its gold counterpart.
///
/// Both variants answer the same queries, so expected-count accumulation
/// shares one code path between model expectations and observed gold
/// counts.
pub enum Marginal<A> {
    /// Model posterior computed by forward-backward.
    Dense(DenseMarginal<A>),

    /// All mass on one fixed labeling.
    Gold(GoldMarginal<A>),
}

/// Forward-backward tables over one anchoring.
///
/// Table rows are fenceposts `0..=n`; `fwd[i]` holds the log-score of
/// reaching fencepost `i`, `bwd[i]` the log-score of finishing from it.
pub struct DenseMarginal<A> {
    anchoring: A,
    fwd: Vec<f64>,
    bwd: Vec<f64>,
    log_partition: f64,
}

/// A Dirac distribution at a fixed labeling, with the linear score of that
/// labeling standing in for the log-partition.
pub struct GoldMarginal<A> {
    anchoring: A,
    tags: Vec<u32>,
    score: f64,
}

impl<A: Anchoring> Marginal<A> {
    /// Runs forward-backward over `anchoring`.
    ///
    /// # Errors
    ///
    /// [`CrfError::Infeasible`] if no labeling reaches past some position.
    pub fn forward_backward(anchoring: A) -> Result<Self> {
        let n = anchoring.len();
        let k = anchoring.num_labels();

        // forward
        let mut fwd = vec![f64::NEG_INFINITY; (n + 1) * k];
        fwd[usize::from_u32(anchoring.start_label())] = 0.0;
        for pos in 0..n {
            let mut reachable = false;
            for &cur in anchoring.valid_labels(pos as isize) {
                let mut total = f64::NEG_INFINITY;
                for &prev in anchoring.valid_labels(pos as isize - 1) {
                    let score = fwd[pos * k + usize::from_u32(prev)]
                        + anchoring.score_transition(pos, prev, cur);
                    total = math::logsumexp(total, score);
                }
                fwd[(pos + 1) * k + usize::from_u32(cur)] = total;
                reachable |= total != f64::NEG_INFINITY;
            }
            if !reachable {
                return Err(CrfError::Infeasible { position: pos });
            }
        }

        let mut log_partition = f64::NEG_INFINITY;
        for &cell in &fwd[n * k..] {
            log_partition = math::logsumexp(log_partition, cell);
        }

        // backward; row 0 is never read by the marginals and stays -inf
        let mut bwd = vec![f64::NEG_INFINITY; (n + 1) * k];
        for cell in &mut bwd[n * k..] {
            *cell = 0.0;
        }
        for pos in (1..n).rev() {
            for &cur in anchoring.valid_labels(pos as isize - 1) {
                let mut total = f64::NEG_INFINITY;
                for &next in anchoring.valid_labels(pos as isize) {
                    let score = anchoring.score_transition(pos, cur, next)
                        + bwd[(pos + 1) * k + usize::from_u32(next)];
                    total = math::logsumexp(total, score);
                }
                bwd[pos * k + usize::from_u32(cur)] = total;
            }
        }

        Ok(Self::Dense(DenseMarginal {
            anchoring,
            fwd,
            bwd,
            log_partition,
        }))
    }

    /// Builds the degenerate marginal putting all mass on `tags`, with the
    /// labeling's linear score as its log-partition.
    ///
    /// # Errors
    ///
    /// [`CrfError::DimensionMismatch`] if `tags` does not cover the
    /// sentence.
    pub fn gold(anchoring: A, tags: Vec<u32>) -> Result<Self> {
        if tags.len() != anchoring.len() {
            return Err(CrfError::DimensionMismatch {
                expected: anchoring.len(),
                actual: tags.len(),
            });
        }
        let mut score = 0.0;
        let mut prev = anchoring.start_label();
        for (pos, &cur) in tags.iter().enumerate() {
            score += anchoring.score_transition(pos, prev, cur);
            prev = cur;
        }
        Ok(Self::Gold(GoldMarginal {
            anchoring,
            tags,
            score,
        }))
    }

    /// The anchoring this marginal was computed over.
    #[inline(always)]
    pub fn anchoring(&self) -> &A {
        match self {
            Self::Dense(marginal) => &marginal.anchoring,
            Self::Gold(marginal) => &marginal.anchoring,
        }
    }

    /// The log-partition function, or the gold labeling's linear score.
    #[inline(always)]
    #[must_use]
    pub fn log_partition(&self) -> f64 {
        match self {
            Self::Dense(marginal) => marginal.log_partition,
            Self::Gold(marginal) => marginal.score,
        }
    }

    /// Posterior mass of labeling `pos` with `cur` when the previous
    /// position carries `prev`.
    #[must_use]
    pub fn transition_marginal(&self, pos: usize, prev: u32, cur: u32) -> f64 {
        match self {
            Self::Dense(marginal) => marginal.transition_marginal(pos, prev, cur),
            Self::Gold(marginal) => marginal.transition_marginal(pos, prev, cur),
        }
    }

    /// Posterior mass of labeling `pos` with `cur`.
    #[must_use]
    pub fn position_marginal(&self, pos: usize, cur: u32) -> f64 {
        match self {
            Self::Dense(marginal) => {
                let mut total = 0.0;
                for &prev in marginal.anchoring.valid_labels(pos as isize - 1) {
                    total += marginal.transition_marginal(pos, prev, cur);
                }
                total
            }
            Self::Gold(marginal) => {
                if marginal.tags[pos] == cur {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Calls `visit` for every transition carrying non-zero posterior mass.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `visit`.
    pub fn visit_transitions<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(usize, u32, u32, f64) -> Result<()>,
    {
        match self {
            Self::Dense(marginal) => {
                let k = marginal.anchoring.num_labels();
                for pos in 0..marginal.anchoring.len() {
                    for &cur in marginal.anchoring.valid_labels(pos as isize) {
                        if marginal.bwd[(pos + 1) * k + usize::from_u32(cur)]
                            == f64::NEG_INFINITY
                        {
                            continue;
                        }
                        for &prev in marginal.anchoring.valid_labels(pos as isize - 1) {
                            let mass = marginal.transition_marginal(pos, prev, cur);
                            if mass != 0.0 {
                                visit(pos, prev, cur, mass)?;
                            }
                        }
                    }
                }
                Ok(())
            }
            Self::Gold(marginal) => {
                let mut prev = marginal.anchoring.start_label();
                for (pos, &cur) in marginal.tags.iter().enumerate() {
                    visit(pos, prev, cur, 1.0)?;
                    prev = cur;
                }
                Ok(())
            }
        }
    }
}

impl<A: Anchoring> DenseMarginal<A> {
    fn transition_marginal(&self, pos: usize, prev: u32, cur: u32) -> f64 {
        let k = self.anchoring.num_labels();
        let sum = self.fwd[pos * k + usize::from_u32(prev)]
            + self.anchoring.score_transition(pos, prev, cur)
            + self.bwd[(pos + 1) * k + usize::from_u32(cur)];
        if sum == f64::NEG_INFINITY {
            return 0.0;
        }
        (sum - self.log_partition).exp()
    }
}

impl<A: Anchoring> GoldMarginal<A> {
    fn transition_marginal(&self, pos: usize, prev: u32, cur: u32) -> f64 {
        let expected_prev = if pos == 0 {
            self.anchoring.start_label()
        } else {
            self.tags[pos - 1]
        };
        if prev == expected_prev && cur == self.tags[pos] {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::{logsumexp, uniform_anchoring, TableAnchoring};

    fn dense(marginal: &Marginal<TableAnchoring>) -> &DenseMarginal<TableAnchoring> {
        match marginal {
            Marginal::Dense(marginal) => marginal,
            Marginal::Gold(_) => panic!("expected a dense marginal"),
        }
    }

    // All scores zero, tags {0, 1, 2} everywhere: 27 equally likely paths.
    #[test]
    fn test_uniform_three_positions() {
        let marginal = Marginal::forward_backward(uniform_anchoring(3)).unwrap();
        assert!((27f64.ln() - marginal.log_partition()).abs() < 1e-9);
        for pos in 0..3 {
            for tag in 0..3 {
                assert!((marginal.position_marginal(pos, tag) - 1.0 / 3.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_transition_marginals_normalize() {
        let mut anchoring = uniform_anchoring(3);
        for (pos, prev, cur, score) in [
            (0, 3, 0, 0.5),
            (0, 3, 2, -1.0),
            (1, 0, 1, 2.0),
            (1, 2, 0, 0.75),
            (2, 1, 1, -0.25),
            (2, 0, 2, 1.5),
        ] {
            anchoring.set_score(pos, prev, cur, score);
        }
        let marginal = Marginal::forward_backward(anchoring).unwrap();
        for pos in 0..3 {
            let mut total = 0.0;
            for prev in 0..4 {
                for cur in 0..4 {
                    total += marginal.transition_marginal(pos, prev, cur);
                }
            }
            assert!((total - 1.0).abs() < 1e-6);
            let mut by_position = 0.0;
            for cur in 0..4 {
                by_position += marginal.position_marginal(pos, cur);
            }
            assert!((by_position - 1.0).abs() < 1e-6);
        }
    }

    // The partition function must agree whether read off the forward or the
    // backward table.
    #[test]
    fn test_partition_consistency() {
        let mut anchoring = uniform_anchoring(4);
        for pos in 0..4 {
            for prev in 0..4u32 {
                for cur in 0..3u32 {
                    let score = f64::from((pos as u32 + 2) * (prev + 1) * (cur + 3) % 5) * 0.3 - 0.6;
                    anchoring.set_score(pos, prev, cur, score);
                }
            }
        }
        let marginal = Marginal::forward_backward(anchoring).unwrap();
        let tables = dense(&marginal);
        let k = tables.anchoring.num_labels();
        let mut from_backward = f64::NEG_INFINITY;
        for &tag in tables.anchoring.valid_labels(0) {
            from_backward = crate::math::logsumexp(
                from_backward,
                tables.bwd[k + tag as usize] + tables.anchoring.score_transition(0, 3, tag),
            );
        }
        let relative =
            (marginal.log_partition() - from_backward).abs() / marginal.log_partition().abs();
        assert!(relative < 1e-6);
    }

    // Constrained to one tag at position 0 and two at position 1.
    #[test]
    fn test_constrained_pair() {
        let anchoring = TableAnchoring::new(4, 3, vec![vec![0], vec![1, 2]]);
        let marginal = Marginal::forward_backward(anchoring).unwrap();
        assert!((2f64.ln() - marginal.log_partition()).abs() < 1e-9);
        assert!((marginal.position_marginal(0, 0) - 1.0).abs() < 1e-9);
        assert!(marginal.position_marginal(0, 1).abs() < 1e-9);
        assert!((marginal.position_marginal(1, 1) - 0.5).abs() < 1e-9);
        assert!((marginal.position_marginal(1, 2) - 0.5).abs() < 1e-9);
    }

    // Two positions, two usable tags:
    //   path scores: (0,0): 0.75, (0,1): 0.0, (1,0): 2.5, (1,1): 1.0
    #[test]
    fn test_hand_computed_marginals() {
        let mut anchoring = TableAnchoring::new(3, 2, vec![vec![0, 1], vec![0, 1]]);
        anchoring.set_score(0, 2, 0, 0.5);
        anchoring.set_score(0, 2, 1, 1.0);
        anchoring.set_score(1, 0, 0, 0.25);
        anchoring.set_score(1, 0, 1, -0.5);
        anchoring.set_score(1, 1, 0, 1.5);
        anchoring.set_score(1, 1, 1, 0.0);
        let marginal = Marginal::forward_backward(anchoring).unwrap();

        let z = logsumexp!(0.75, 0.0, 2.5, 1.0);
        assert!((z - marginal.log_partition()).abs() < 1e-9);
        let expected = (logsumexp!(0.75, 0.0) - z).exp();
        assert!((marginal.position_marginal(0, 0) - expected).abs() < 1e-9);
        let expected = (2.5 - z).exp();
        assert!((marginal.transition_marginal(1, 1, 0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_visitor_masses_sum_to_length() {
        let mut anchoring = uniform_anchoring(3);
        anchoring.set_score(1, 0, 1, 1.25);
        anchoring.set_score(2, 1, 2, -0.75);
        let marginal = Marginal::forward_backward(anchoring).unwrap();
        let mut total = 0.0;
        let mut visits = 0usize;
        marginal
            .visit_transitions(|_pos, _prev, _cur, mass| {
                total += mass;
                visits += 1;
                Ok(())
            })
            .unwrap();
        // One unit of mass per position.
        assert!((total - 3.0).abs() < 1e-6);
        // Position 0 only has start as a predecessor.
        assert_eq!(3 + 9 + 9, visits);
    }

    #[test]
    fn test_gold_is_a_dirac() {
        let mut anchoring = uniform_anchoring(2);
        anchoring.set_score(0, 3, 0, 0.5);
        anchoring.set_score(1, 0, 2, 1.5);
        let marginal = Marginal::gold(anchoring, vec![0, 2]).unwrap();

        assert!((2.0 - marginal.log_partition()).abs() < 1e-9);
        assert!((marginal.transition_marginal(0, 3, 0) - 1.0).abs() < f64::EPSILON);
        assert!((marginal.transition_marginal(1, 0, 2) - 1.0).abs() < f64::EPSILON);
        assert_eq!(0.0, marginal.transition_marginal(1, 1, 2));
        assert!((marginal.position_marginal(1, 2) - 1.0).abs() < f64::EPSILON);
        assert_eq!(0.0, marginal.position_marginal(1, 1));

        let mut visited = vec![];
        marginal
            .visit_transitions(|pos, prev, cur, mass| {
                visited.push((pos, prev, cur, mass));
                Ok(())
            })
            .unwrap();
        assert_eq!(vec![(0, 3, 0, 1.0), (1, 0, 2, 1.0)], visited);
    }

    #[test]
    fn test_gold_never_exceeds_model() {
        let mut scored = uniform_anchoring(3);
        for (pos, prev, cur, score) in [(0, 3, 1, 1.0), (1, 1, 0, 2.0), (2, 0, 2, 0.5)] {
            scored.set_score(pos, prev, cur, score);
        }
        let model = Marginal::forward_backward(scored.clone()).unwrap();
        let gold = Marginal::gold(scored, vec![1, 0, 2]).unwrap();
        assert!(gold.log_partition() <= model.log_partition());
    }

    #[test]
    fn test_gold_length_mismatch() {
        let anchoring = uniform_anchoring(2);
        let result = Marginal::gold(anchoring, vec![0]);
        assert_eq!(
            Err(CrfError::DimensionMismatch {
                expected: 2,
                actual: 1
            }),
            result.map(|_| ()),
        );
    }

    #[test]
    fn test_infeasible_column() {
        let mut anchoring = uniform_anchoring(2);
        for prev in 0..4 {
            for cur in 0..4 {
                anchoring.set_score(1, prev, cur, f64::NEG_INFINITY);
            }
        }
        let result = Marginal::forward_backward(anchoring);
        assert_eq!(
            Err(CrfError::Infeasible { position: 1 }),
            result.map(|_| ()),
        );
    }

    #[test]
    fn test_empty_sentence() {
        let marginal = Marginal::forward_backward(uniform_anchoring(0)).unwrap();
        assert_eq!(0.0, marginal.log_partition());
    }
}
