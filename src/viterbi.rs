//! Max-product decoding.

use alloc::vec::Vec;

use crate::anchoring::Anchoring;
use crate::errors::{CrfError, Result};
use crate::utils::FromU32;

/// Searches the best labeling under `anchoring` and returns it with its
/// score.
///
/// Ties break toward the lowest previous tag id, so the result is
/// deterministic.
///
/// # Errors
///
/// [`CrfError::Infeasible`] if no labeling reaches past some position.
pub fn search_best_path<A: Anchoring>(anchoring: &A) -> Result<(Vec<u32>, f64)> {
    let n = anchoring.len();
    let k = anchoring.num_labels();
    if n == 0 {
        return Ok((Vec::new(), 0.0));
    }

    let mut best = vec![f64::NEG_INFINITY; (n + 1) * k];
    let mut back = vec![0u32; (n + 1) * k];
    best[usize::from_u32(anchoring.start_label())] = 0.0;
    for pos in 0..n {
        let mut reachable = false;
        for &cur in anchoring.valid_labels(pos as isize) {
            let mut best_score = f64::NEG_INFINITY;
            let mut best_prev = 0;
            for &prev in anchoring.valid_labels(pos as isize - 1) {
                let score = best[pos * k + usize::from_u32(prev)]
                    + anchoring.score_transition(pos, prev, cur);
                debug_assert!(!score.is_nan());
                if score > best_score {
                    best_score = score;
                    best_prev = prev;
                }
            }
            best[(pos + 1) * k + usize::from_u32(cur)] = best_score;
            back[(pos + 1) * k + usize::from_u32(cur)] = best_prev;
            reachable |= best_score != f64::NEG_INFINITY;
        }
        if !reachable {
            return Err(CrfError::Infeasible { position: pos });
        }
    }

    let mut best_score = f64::NEG_INFINITY;
    let mut last = 0;
    for &cur in anchoring.valid_labels(n as isize - 1) {
        let score = best[n * k + usize::from_u32(cur)];
        if score > best_score {
            best_score = score;
            last = cur;
        }
    }

    let mut labels = vec![0u32; n];
    labels[n - 1] = last;
    for pos in (1..n).rev() {
        labels[pos - 1] = back[(pos + 1) * k + usize::from_u32(labels[pos])];
    }
    Ok((labels, best_score))
}
