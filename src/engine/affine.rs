//! Gotoh alignment with separate gap-open and gap-extend penalties.

use super::alignment::overlap_cells;
use super::error::{invalid, AlignResult};
use super::matrix::{Matrix, SimMatrix};
use super::traceback::{missing_code, AffineCode, AlignedIndices, State, TracePath};

#[derive(Debug, Clone)]
pub struct AffineAlignObj {
    /// Best score ending with `A[i]` aligned to `B[j]`.
    pub m: Matrix<f64>,
    /// Best score ending with `A[i]` against a gap.
    pub a: Matrix<f64>,
    /// Best score ending with `B[j]` against a gap.
    pub b: Matrix<f64>,
    /// One code per state, indexed by [`State::index`].
    pub traceback: Matrix<[Option<AffineCode>; 3]>,
    /// State taken at each cell of the reported path.
    pub chosen: Matrix<Option<State>>,
    pub signal_a_len: usize,
    pub signal_b_len: usize,
    pub gap_open: f64,
    pub gap_extend: f64,
    pub free_end_gaps: bool,
    pub indices: AlignedIndices,
    pub score: Vec<f64>,
    /// Sum of similarities over the match-state cells of the path.
    pub sim_score_forw: f64,
    pub n_gaps: usize,
}

impl AffineAlignObj {
    pub fn value(&self, state: State, cell: (usize, usize)) -> f64 {
        match state {
            State::M => self.m[cell],
            State::A => self.a[cell],
            State::B => self.b[cell],
        }
    }

    pub fn final_score(&self) -> f64 {
        self.score.last().copied().unwrap_or(0.0)
    }
}

pub fn do_affine_alignment(
    s: &SimMatrix,
    gap_open: f64,
    gap_extend: f64,
    overlap: bool,
) -> AlignResult<AffineAlignObj> {
    s.validate_scores()?;
    if !gap_open.is_finite() || !gap_extend.is_finite() {
        return invalid(format!(
            "gap penalties must be finite, got open {} and extend {}",
            gap_open, gap_extend
        ));
    }
    let (n, m_len) = s.shape();
    let (rows, cols) = (n + 1, m_len + 1);

    let mut m = Matrix::filled(rows, cols, f64::NEG_INFINITY);
    let mut a = Matrix::filled(rows, cols, f64::NEG_INFINITY);
    let mut b = Matrix::filled(rows, cols, f64::NEG_INFINITY);
    let mut traceback: Matrix<[Option<AffineCode>; 3]> = Matrix::filled(rows, cols, [None; 3]);

    m[(0, 0)] = 0.0;
    for i in 1..rows {
        a[(i, 0)] = if overlap {
            0.0
        } else {
            -(gap_open + (i - 1) as f64 * gap_extend)
        };
        traceback[(i, 0)][State::A.index()] = Some(if i == 1 {
            AffineCode::FromMatch
        } else {
            AffineCode::FromGapExtendA
        });
    }
    for j in 1..cols {
        b[(0, j)] = if overlap {
            0.0
        } else {
            -(gap_open + (j - 1) as f64 * gap_extend)
        };
        traceback[(0, j)][State::B.index()] = Some(if j == 1 {
            AffineCode::FromMatch
        } else {
            AffineCode::FromGapExtendB
        });
    }

    for i in 1..rows {
        for j in 1..cols {
            let diag = (i - 1, j - 1);
            let (from_match, code) = [
                (m[diag], AffineCode::FromMatch),
                (a[diag], AffineCode::FromGapA),
                (b[diag], AffineCode::FromGapB),
            ]
            .into_iter()
            .fold((f64::NEG_INFINITY, AffineCode::FromMatch), |best, next| {
                if next.0 > best.0 {
                    next
                } else {
                    best
                }
            });
            m[(i, j)] = from_match + s[diag];

            let open = m[(i - 1, j)] - gap_open;
            let extend = a[(i - 1, j)] - gap_extend;
            a[(i, j)] = open.max(extend);
            let code_a = if open >= extend {
                AffineCode::FromMatch
            } else {
                AffineCode::FromGapExtendA
            };

            let open = m[(i, j - 1)] - gap_open;
            let extend = b[(i, j - 1)] - gap_extend;
            b[(i, j)] = open.max(extend);
            let code_b = if open >= extend {
                AffineCode::FromMatch
            } else {
                AffineCode::FromGapExtendB
            };

            traceback[(i, j)] = [Some(code), Some(code_a), Some(code_b)];
        }
    }

    let mut obj = AffineAlignObj {
        m,
        a,
        b,
        traceback,
        chosen: Matrix::filled(rows, cols, None),
        signal_a_len: n,
        signal_b_len: m_len,
        gap_open,
        gap_extend,
        free_end_gaps: overlap,
        indices: AlignedIndices::default(),
        score: Vec::new(),
        sim_score_forw: 0.0,
        n_gaps: 0,
    };
    let (start, start_state, best) = best_start(&obj, overlap);
    log::trace!(
        "Affine alignment of {}x{} (open {}, extend {}, overlap {}) starts at {:?} in {:?} with score {}",
        n,
        m_len,
        gap_open,
        gap_extend,
        overlap,
        start,
        start_state,
        best
    );

    let mut trace = TracePath::new(n, m_len);
    for j in (start.1 + 1..=m_len).rev() {
        trace.push(State::B.step(), (n, j), best)?;
        obj.chosen[(n, j)] = Some(State::B);
    }
    for i in (start.0 + 1..=n).rev() {
        trace.push(State::A.step(), (i, m_len), best)?;
        obj.chosen[(i, m_len)] = Some(State::A);
    }

    let (mut cell, mut state) = (start, start_state);
    while cell != (0, 0) {
        let code = obj.traceback[cell][state.index()]
            .ok_or_else(|| missing_code(&format!("{:?}-state", state), cell))?;
        trace.push(state.step(), cell, obj.value(state, cell))?;
        obj.chosen[cell] = Some(state);
        cell = state
            .step()
            .previous(cell)
            .ok_or_else(|| missing_code(&format!("{:?}-state", state), cell))?;
        state = code.source();
    }

    let (indices, score, n_gaps) = trace.finish();
    obj.sim_score_forw = forward_similarity(s, &obj.chosen);
    obj.indices = indices;
    obj.score = score;
    obj.n_gaps = n_gaps;
    Ok(obj)
}

fn best_start(obj: &AffineAlignObj, overlap: bool) -> ((usize, usize), State, f64) {
    let corner = (obj.signal_a_len, obj.signal_b_len);
    let cells: Box<dyn Iterator<Item = (usize, usize)>> = if overlap {
        Box::new(overlap_cells(obj.m.n_row(), obj.m.n_col()))
    } else {
        Box::new(std::iter::once(corner))
    };
    let mut best = (corner, State::M, f64::NEG_INFINITY);
    for cell in cells {
        for state in State::ALL {
            let value = obj.value(state, cell);
            if value > best.2 {
                best = (cell, state, value);
            }
        }
    }
    best
}

/// Sums the similarity of every cell the path crosses in the match state.
pub fn forward_similarity(s: &SimMatrix, chosen: &Matrix<Option<State>>) -> f64 {
    let mut total = 0.0;
    for i in 1..chosen.n_row() {
        for j in 1..chosen.n_col() {
            if chosen[(i, j)] == Some(State::M) {
                total += s[(i - 1, j - 1)];
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::alignment::do_alignment;
    use crate::engine::similarity::seq_similarity;
    use crate::engine::AlignError;
    use rand::Rng;

    fn dna(seq_a: &str, seq_b: &str) -> SimMatrix {
        seq_similarity(seq_a.as_bytes(), seq_b.as_bytes(), 10.0, -2.0).unwrap()
    }

    #[test]
    fn test_global_gcat_reference() {
        let obj = do_affine_alignment(&dna("GCAT", "CAGTG"), 22.0, 7.0, false).unwrap();
        assert_eq!(obj.indices.index_a, vec![1, 2, 3, 4, 0]);
        assert_eq!(obj.indices.index_b, vec![1, 2, 3, 4, 5]);
        assert_eq!(obj.score, vec![-2.0, -4.0, -6.0, 4.0, -18.0]);
        assert_eq!(obj.sim_score_forw, 4.0);
        assert_eq!(obj.n_gaps, 1);
    }

    #[test]
    fn test_overlap_gcat_reference() {
        let obj = do_affine_alignment(&dna("GCAT", "CAGTG"), 22.0, 7.0, true).unwrap();
        assert_eq!(obj.indices.index_a, vec![1, 2, 3, 4, 0, 0]);
        assert_eq!(obj.indices.index_b, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(obj.score, vec![0.0, 10.0, 20.0, 18.0, 18.0, 18.0]);
        assert_eq!(obj.sim_score_forw, 18.0);
        assert_eq!(obj.n_gaps, 2);
    }

    #[test]
    fn test_global_cat_reference() {
        let obj = do_affine_alignment(&dna("CAT", "CAGTG"), 22.0, 7.0, false).unwrap();
        assert_eq!(obj.indices.index_a, vec![1, 2, 0, 0, 3]);
        assert_eq!(obj.indices.index_b, vec![1, 2, 3, 4, 5]);
        assert_eq!(obj.score, vec![10.0, 20.0, -2.0, -9.0, -11.0]);
        assert_eq!(obj.sim_score_forw, 18.0);
        assert_eq!(obj.n_gaps, 1);
        assert_eq!(obj.chosen[(2, 3)], Some(State::B));
        assert_eq!(obj.chosen[(3, 5)], Some(State::M));
    }

    #[test]
    fn test_overlap_cat_reference() {
        let obj = do_affine_alignment(&dna("CAT", "CAGTG"), 22.0, 7.0, true).unwrap();
        assert_eq!(obj.indices.index_a, vec![1, 2, 3, 0, 0]);
        assert_eq!(obj.indices.index_b, vec![1, 2, 3, 4, 5]);
        assert_eq!(obj.score, vec![10.0, 20.0, 18.0, 18.0, 18.0]);
    }

    #[test]
    fn test_forward_similarity_of_mismatches() {
        let obj = do_affine_alignment(&dna("CA", "AG"), 22.0, 7.0, false).unwrap();
        assert_eq!(obj.score, vec![-2.0, -4.0]);
        assert_eq!(obj.sim_score_forw, -4.0);
        assert_eq!(obj.n_gaps, 0);
    }

    #[test]
    fn test_boundary_values() {
        let obj = do_affine_alignment(&dna("GCAT", "CAGTG"), 22.0, 7.0, false).unwrap();
        assert_eq!(obj.a[(1, 0)], -22.0);
        assert_eq!(obj.a[(3, 0)], -36.0);
        assert_eq!(obj.b[(0, 5)], -50.0);
        assert_eq!(obj.m[(2, 0)], f64::NEG_INFINITY);
        assert_eq!(obj.traceback[(2, 0)][State::M.index()], None);
        assert_eq!(
            obj.traceback[(2, 0)][State::A.index()],
            Some(AffineCode::FromGapExtendA)
        );
        let free = do_affine_alignment(&dna("GCAT", "CAGTG"), 22.0, 7.0, true).unwrap();
        assert_eq!(free.a[(3, 0)], 0.0);
        assert_eq!(free.b[(0, 4)], 0.0);
    }

    #[test]
    fn test_equal_open_and_extend_matches_single_gap() {
        let s = dna("GATTACA", "GCATGCT");
        let affine = do_affine_alignment(&s, 3.0, 3.0, false).unwrap();
        let linear = do_alignment(&s, 3.0, false).unwrap();
        assert_eq!(affine.final_score(), linear.final_score());
    }

    fn random_matrix(n_row: usize, n_col: usize) -> SimMatrix {
        let mut rng = rand::rng();
        let data = (0..n_row * n_col).map(|_| rng.random::<f64>()).collect();
        SimMatrix::from_vec(n_row, n_col, data).unwrap()
    }

    #[test]
    fn test_swap_symmetry_and_overlap_bound() {
        for (n_row, n_col) in [(6, 9), (8, 5)] {
            let s = random_matrix(n_row, n_col);
            let global = do_affine_alignment(&s, 0.5, 0.1, false).unwrap();
            let swapped = do_affine_alignment(&s.transpose(), 0.5, 0.1, false).unwrap();
            assert!((global.final_score() - swapped.final_score()).abs() < 1e-9);
            assert_eq!(global.indices.swapped(), swapped.indices);
            let overlap = do_affine_alignment(&s, 0.5, 0.1, true).unwrap();
            assert!(overlap.final_score() >= global.final_score());
        }
    }

    #[test]
    fn test_gap_count_iff_zero_indices() {
        for _ in 0..10 {
            let s = random_matrix(7, 10);
            let obj = do_affine_alignment(&s, 0.3, 0.05, true).unwrap();
            assert_eq!(obj.n_gaps == 0, !obj.indices.has_gaps());
            let obj = do_affine_alignment(&s, 0.3, 0.05, false).unwrap();
            assert!(obj.n_gaps >= 1);
        }
    }

    #[test]
    fn test_deterministic() {
        let s = random_matrix(9, 9);
        let first = do_affine_alignment(&s, 0.2, 0.1, true).unwrap();
        let second = do_affine_alignment(&s, 0.2, 0.1, true).unwrap();
        assert_eq!(first.indices, second.indices);
        assert_eq!(first.score, second.score);
        assert_eq!(first.sim_score_forw, second.sim_score_forw);
    }

    #[test]
    fn test_invalid_penalties() {
        let s = dna("AC", "AC");
        assert!(matches!(
            do_affine_alignment(&s, f64::INFINITY, 1.0, false),
            Err(AlignError::InvalidParameter(_))
        ));
    }
}
