//! Needleman-Wunsch style alignment with a single linear gap penalty.

use super::error::{invalid, AlignResult};
use super::matrix::{Matrix, SimMatrix};
use super::traceback::{missing_code, AlignedIndices, Step, TracePath, TracebackCode};

#[derive(Debug, Clone)]
pub struct AlignObj {
    /// Cumulative score matrix `M`, `(n + 1) x (m + 1)`.
    pub m: Matrix<f64>,
    pub traceback: Matrix<Option<TracebackCode>>,
    /// Bitmask of every move achieving the cell maximum.
    pub ties: Matrix<u8>,
    /// Number of co-optimal paths reaching each cell.
    pub optional_paths: Matrix<u64>,
    /// Summed score of all monotone paths from the origin to each cell.
    pub m_forw: Matrix<f64>,
    /// Cells visited by the reported path.
    pub path: Matrix<bool>,
    pub signal_a_len: usize,
    pub signal_b_len: usize,
    pub gap: f64,
    pub free_end_gaps: bool,
    pub indices: AlignedIndices,
    pub score: Vec<f64>,
    pub score_forw: f64,
    pub n_gaps: usize,
}

impl AlignObj {
    /// Score at the optimal endpoint.
    pub fn final_score(&self) -> f64 {
        self.score.last().copied().unwrap_or(0.0)
    }
}

pub fn do_alignment(s: &SimMatrix, gap: f64, overlap: bool) -> AlignResult<AlignObj> {
    s.validate_scores()?;
    if !gap.is_finite() {
        return invalid(format!("gap penalty must be finite, got {}", gap));
    }
    let (n, m_len) = s.shape();
    let (rows, cols) = (n + 1, m_len + 1);

    let mut m = Matrix::filled(rows, cols, 0.0);
    let mut traceback = Matrix::filled(rows, cols, None);
    let mut ties = Matrix::filled(rows, cols, 0u8);
    let mut optional_paths = Matrix::filled(rows, cols, 1u64);
    let mut all_paths = Matrix::filled(rows, cols, 1.0f64);
    let mut m_forw = Matrix::filled(rows, cols, 0.0);

    for i in 1..rows {
        m[(i, 0)] = if overlap { 0.0 } else { -(i as f64) * gap };
        m_forw[(i, 0)] = m[(i, 0)];
        traceback[(i, 0)] = Some(TracebackCode::Up);
        ties[(i, 0)] = TracebackCode::Up.bit();
    }
    for j in 1..cols {
        m[(0, j)] = if overlap { 0.0 } else { -(j as f64) * gap };
        m_forw[(0, j)] = m[(0, j)];
        traceback[(0, j)] = Some(TracebackCode::Left);
        ties[(0, j)] = TracebackCode::Left.bit();
    }

    for i in 1..rows {
        for j in 1..cols {
            let moves = [
                (TracebackCode::Diag, (i - 1, j - 1), s[(i - 1, j - 1)]),
                (TracebackCode::Up, (i - 1, j), -gap),
                (TracebackCode::Left, (i, j - 1), -gap),
            ];
            let best = moves
                .iter()
                .map(|&(_, p, step)| m[p] + step)
                .fold(f64::NEG_INFINITY, f64::max);

            let mut code = None;
            let mut mask = 0u8;
            let mut n_optional = 0u64;
            let mut n_all = 0.0;
            let mut forw = 0.0;
            for &(move_code, p, step) in &moves {
                if m[p] + step == best {
                    if code.is_none() {
                        code = Some(move_code);
                    }
                    mask |= move_code.bit();
                    n_optional = n_optional.saturating_add(optional_paths[p]);
                }
                n_all += all_paths[p];
                forw += m_forw[p] + all_paths[p] * step;
            }
            m[(i, j)] = best;
            traceback[(i, j)] = code;
            ties[(i, j)] = mask;
            optional_paths[(i, j)] = n_optional;
            all_paths[(i, j)] = n_all;
            m_forw[(i, j)] = forw;
        }
    }

    let (start, best) = if overlap {
        overlap_start(&m)
    } else {
        ((n, m_len), m[(n, m_len)])
    };
    log::trace!(
        "Single-gap alignment of {}x{} (gap {}, overlap {}) starts at {:?} with score {}",
        n,
        m_len,
        gap,
        overlap,
        start,
        best
    );

    let mut path = Matrix::filled(rows, cols, false);
    let mut trace = TracePath::new(n, m_len);
    for j in (start.1 + 1..=m_len).rev() {
        trace.push(Step::AdvanceB, (n, j), best)?;
        path[(n, j)] = true;
    }
    for i in (start.0 + 1..=n).rev() {
        trace.push(Step::AdvanceA, (i, m_len), best)?;
        path[(i, m_len)] = true;
    }

    let mut cell = start;
    while cell != (0, 0) {
        let code = traceback[cell].ok_or_else(|| missing_code("single-gap", cell))?;
        let step = code.step();
        trace.push(step, cell, m[cell])?;
        path[cell] = true;
        cell = step.previous(cell).ok_or_else(|| missing_code("single-gap", cell))?;
    }
    let (indices, score, n_gaps) = trace.finish();

    Ok(AlignObj {
        score_forw: m_forw[start],
        m,
        traceback,
        ties,
        optional_paths,
        m_forw,
        path,
        signal_a_len: n,
        signal_b_len: m_len,
        gap,
        free_end_gaps: overlap,
        indices,
        score,
        n_gaps,
    })
}

/// Best free-end cell: the corner, then the last row right to left, then the
/// last column bottom to top. Only a strictly greater value displaces the
/// current best.
pub(crate) fn overlap_cells(rows: usize, cols: usize) -> impl Iterator<Item = (usize, usize)> {
    let (n, m) = (rows - 1, cols - 1);
    std::iter::once((n, m))
        .chain((0..m).rev().map(move |j| (n, j)))
        .chain((0..n).rev().map(move |i| (i, m)))
}

fn overlap_start(m: &Matrix<f64>) -> ((usize, usize), f64) {
    let mut best_cell = (m.n_row() - 1, m.n_col() - 1);
    let mut best = m[best_cell];
    for cell in overlap_cells(m.n_row(), m.n_col()) {
        if m[cell] > best {
            best = m[cell];
            best_cell = cell;
        }
    }
    (best_cell, best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::similarity::seq_similarity;
    use crate::engine::AlignError;
    use rand::Rng;

    fn dna(seq_a: &str, seq_b: &str) -> SimMatrix {
        seq_similarity(seq_a.as_bytes(), seq_b.as_bytes(), 10.0, -2.0).unwrap()
    }

    fn to_rows<T: Clone>(matrix: &Matrix<T>) -> Vec<Vec<T>> {
        matrix.rows().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_global_dna_reference() {
        let obj = do_alignment(&dna("GCAT", "CAGTG"), 22.0, false).unwrap();
        assert_eq!(obj.indices.index_a, vec![1, 2, 3, 4, 0]);
        assert_eq!(obj.indices.index_b, vec![1, 2, 3, 4, 5]);
        assert_eq!(obj.score, vec![-2.0, -4.0, -6.0, 4.0, -18.0]);
        assert_eq!(obj.n_gaps, 1);
        assert!(!obj.free_end_gaps);
    }

    #[test]
    fn test_overlap_dna_reference() {
        let obj = do_alignment(&dna("GCAT", "CAGTG"), 22.0, true).unwrap();
        assert_eq!(obj.indices.index_a, vec![1, 2, 3, 4, 0, 0]);
        assert_eq!(obj.indices.index_b, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(obj.score, vec![0.0, 10.0, 20.0, 18.0, 18.0, 18.0]);
        assert_eq!(obj.n_gaps, 2);
        assert_eq!(obj.final_score(), 18.0);
    }

    #[test]
    fn test_tie_counts_and_forward_matrix() {
        let s = seq_similarity(b"TTTC", b"TGC", 1.0, -1.0).unwrap();
        let obj = do_alignment(&s, 2.0, false).unwrap();
        assert_eq!(
            to_rows(&obj.optional_paths),
            vec![
                vec![1, 1, 1, 1],
                vec![1, 1, 1, 1],
                vec![1, 2, 1, 2],
                vec![1, 3, 3, 1],
                vec![1, 3, 6, 3],
            ]
        );
        assert_eq!(
            to_rows(&obj.m_forw),
            vec![
                vec![0.0, -2.0, -4.0, -6.0],
                vec![-2.0, -7.0, -22.0, -45.0],
                vec![-4.0, -20.0, -72.0, -184.0],
                vec![-6.0, -41.0, -178.0, -547.0],
                vec![-8.0, -72.0, -366.0, -1274.0],
            ]
        );
        assert_eq!(obj.indices.index_a, vec![1, 2, 3, 4]);
        assert_eq!(obj.indices.index_b, vec![0, 1, 2, 3]);
        assert_eq!(obj.score, vec![-2.0, -1.0, -2.0, -1.0]);
        assert_eq!(obj.score_forw, -1274.0);
    }

    #[test]
    fn test_ties_bitmask_matches_counts() {
        let s = seq_similarity(b"TTTC", b"TGC", 1.0, -1.0).unwrap();
        let obj = do_alignment(&s, 2.0, false).unwrap();
        assert_eq!(
            obj.ties[(2, 1)],
            TracebackCode::Diag.bit() | TracebackCode::Up.bit()
        );
        assert_eq!(obj.traceback[(2, 1)], Some(TracebackCode::Diag));
        assert_eq!(obj.ties[(0, 0)], 0);
        assert_eq!(obj.traceback[(0, 0)], None);
    }

    #[test]
    fn test_path_marks_visited_cells() {
        let obj = do_alignment(&dna("GCAT", "CAGTG"), 22.0, true).unwrap();
        let visited = obj.path.as_slice().iter().filter(|&&v| v).count();
        assert_eq!(visited, obj.indices.len());
        assert!(obj.path[(4, 5)]);
        assert!(obj.path[(1, 0)]);
        assert!(!obj.path[(0, 0)]);
    }

    fn random_matrix(n_row: usize, n_col: usize) -> SimMatrix {
        let mut rng = rand::rng();
        let data = (0..n_row * n_col).map(|_| rng.random::<f64>()).collect();
        SimMatrix::from_vec(n_row, n_col, data).unwrap()
    }

    #[test]
    fn test_global_swap_symmetry() {
        for (n_row, n_col) in [(5, 7), (9, 4), (6, 6)] {
            let s = random_matrix(n_row, n_col);
            let forward = do_alignment(&s, 0.3, false).unwrap();
            let backward = do_alignment(&s.transpose(), 0.3, false).unwrap();
            assert!((forward.final_score() - backward.final_score()).abs() < 1e-9);
            assert_eq!(forward.indices.swapped(), backward.indices);
        }
    }

    #[test]
    fn test_overlap_swap_keeps_score() {
        let s = random_matrix(6, 8);
        let forward = do_alignment(&s, 0.3, true).unwrap();
        let backward = do_alignment(&s.transpose(), 0.3, true).unwrap();
        assert!((forward.final_score() - backward.final_score()).abs() < 1e-9);
    }

    #[test]
    fn test_overlap_not_worse_than_global() {
        for _ in 0..5 {
            let s = random_matrix(7, 5);
            let global = do_alignment(&s, 0.4, false).unwrap();
            let overlap = do_alignment(&s, 0.4, true).unwrap();
            assert!(overlap.final_score() >= global.final_score());
        }
    }

    #[test]
    fn test_gap_count_iff_zero_indices() {
        for _ in 0..10 {
            let s = random_matrix(6, 9);
            let obj = do_alignment(&s, 0.2, true).unwrap();
            assert_eq!(obj.n_gaps == 0, !obj.indices.has_gaps());
        }
        let square = dna("ACGT", "ACGT");
        let obj = do_alignment(&square, 5.0, false).unwrap();
        assert_eq!(obj.n_gaps, 0);
        assert_eq!(obj.indices.index_a, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_deterministic() {
        let s = random_matrix(8, 8);
        let first = do_alignment(&s, 0.1, true).unwrap();
        let second = do_alignment(&s, 0.1, true).unwrap();
        assert_eq!(first.indices, second.indices);
        assert_eq!(first.score, second.score);
        assert_eq!(first.score_forw, second.score_forw);
    }

    #[test]
    fn test_single_cell() {
        let s = SimMatrix::filled(1, 1, 3.0);
        let obj = do_alignment(&s, 1.0, false).unwrap();
        assert_eq!(obj.indices.index_a, vec![1]);
        assert_eq!(obj.indices.index_b, vec![1]);
        assert_eq!(obj.score, vec![3.0]);
    }

    #[test]
    fn test_invalid_input() {
        let s = SimMatrix::filled(0, 0, 0.0);
        assert!(matches!(
            do_alignment(&s, 1.0, false),
            Err(AlignError::InvalidParameter(_))
        ));
        let s = SimMatrix::filled(2, 2, 0.0);
        assert!(matches!(
            do_alignment(&s, f64::NAN, true),
            Err(AlignError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_overlap_cells_order() {
        let cells: Vec<_> = overlap_cells(3, 3).collect();
        assert_eq!(cells, vec![(2, 2), (2, 1), (2, 0), (1, 2), (0, 2)]);
    }
}
