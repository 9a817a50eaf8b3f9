use super::error::{AlignError, AlignResult};

/// Move recorded at a single-penalty DP cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TracebackCode {
    Diag = 0b001,
    Up = 0b010,
    Left = 0b100,
}

impl TracebackCode {
    /// Preference order when several moves tie.
    pub const PREFERENCE: [TracebackCode; 3] =
        [TracebackCode::Diag, TracebackCode::Up, TracebackCode::Left];

    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn step(self) -> Step {
        match self {
            TracebackCode::Diag => Step::Diagonal,
            TracebackCode::Up => Step::AdvanceA,
            TracebackCode::Left => Step::AdvanceB,
        }
    }
}

/// DP state of the affine recursion. `A` consumes a position of signal A
/// only, `B` a position of signal B only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    M = 0,
    A = 1,
    B = 2,
}

impl State {
    pub const ALL: [State; 3] = [State::M, State::A, State::B];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn step(self) -> Step {
        match self {
            State::M => Step::Diagonal,
            State::A => Step::AdvanceA,
            State::B => Step::AdvanceB,
        }
    }
}

/// Where an affine state value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AffineCode {
    FromMatch,
    FromGapA,
    FromGapExtendA,
    FromGapB,
    FromGapExtendB,
}

impl AffineCode {
    /// State occupied at the predecessor cell.
    pub fn source(self) -> State {
        match self {
            AffineCode::FromMatch => State::M,
            AffineCode::FromGapA | AffineCode::FromGapExtendA => State::A,
            AffineCode::FromGapB | AffineCode::FromGapExtendB => State::B,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Diagonal,
    AdvanceA,
    AdvanceB,
}

impl Step {
    pub fn is_gap(self) -> bool {
        !matches!(self, Step::Diagonal)
    }

    /// Predecessor of `(i, j)` reached by undoing this step.
    pub fn previous(self, (i, j): (usize, usize)) -> Option<(usize, usize)> {
        match self {
            Step::Diagonal => Some((i.checked_sub(1)?, j.checked_sub(1)?)),
            Step::AdvanceA => Some((i.checked_sub(1)?, j)),
            Step::AdvanceB => Some((i, j.checked_sub(1)?)),
        }
    }
}

/// Aligned 1-based indices into A and B; 0 marks a gap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignedIndices {
    pub index_a: Vec<usize>,
    pub index_b: Vec<usize>,
}

impl AlignedIndices {
    pub fn len(&self) -> usize {
        self.index_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_a.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.index_a.iter().copied().zip(self.index_b.iter().copied())
    }

    pub fn has_gaps(&self) -> bool {
        self.pairs().any(|(a, b)| a == 0 || b == 0)
    }

    /// Same alignment seen from B's side.
    pub fn swapped(&self) -> Self {
        Self {
            index_a: self.index_b.clone(),
            index_b: self.index_a.clone(),
        }
    }
}

/// Collects an alignment from its last step to its first.
#[derive(Debug)]
pub struct TracePath {
    indices: AlignedIndices,
    scores: Vec<f64>,
    n_gaps: usize,
    last_step: Option<Step>,
    max_steps: usize,
}

impl TracePath {
    pub fn new(n_row: usize, n_col: usize) -> Self {
        let max_steps = n_row + n_col;
        Self {
            indices: AlignedIndices {
                index_a: Vec::with_capacity(max_steps),
                index_b: Vec::with_capacity(max_steps),
            },
            scores: Vec::with_capacity(max_steps),
            n_gaps: 0,
            last_step: None,
            max_steps,
        }
    }

    /// Records the step that ends at cell `(i, j)` with cumulative `score`.
    pub fn push(&mut self, step: Step, (i, j): (usize, usize), score: f64) -> AlignResult<()> {
        if self.scores.len() >= self.max_steps {
            return Err(AlignError::InconsistentTraceback(format!(
                "path exceeds {} steps at cell ({}, {})",
                self.max_steps, i, j
            )));
        }
        let (a, b) = match step {
            Step::Diagonal => (i, j),
            Step::AdvanceA => (i, 0),
            Step::AdvanceB => (0, j),
        };
        if step.is_gap() && self.last_step != Some(step) {
            self.n_gaps += 1;
        }
        self.indices.index_a.push(a);
        self.indices.index_b.push(b);
        self.scores.push(score);
        self.last_step = Some(step);
        Ok(())
    }

    /// Reverses into first-to-last order.
    pub fn finish(mut self) -> (AlignedIndices, Vec<f64>, usize) {
        self.indices.index_a.reverse();
        self.indices.index_b.reverse();
        self.scores.reverse();
        (self.indices, self.scores, self.n_gaps)
    }
}

pub(crate) fn missing_code(state: &str, (i, j): (usize, usize)) -> AlignError {
    AlignError::InconsistentTraceback(format!("no {} traceback code at cell ({}, {})", state, i, j))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_previous() {
        assert_eq!(Step::Diagonal.previous((2, 3)), Some((1, 2)));
        assert_eq!(Step::AdvanceA.previous((2, 3)), Some((1, 3)));
        assert_eq!(Step::AdvanceB.previous((2, 3)), Some((2, 2)));
        assert_eq!(Step::Diagonal.previous((0, 3)), None);
        assert_eq!(Step::AdvanceB.previous((4, 0)), None);
    }

    #[test]
    fn test_codes_are_distinct_bits() {
        let all = TracebackCode::PREFERENCE
            .iter()
            .fold(0u8, |acc, code| acc | code.bit());
        assert_eq!(all, 0b111);
        assert_eq!(std::mem::size_of::<Option<TracebackCode>>(), 1);
    }

    #[test]
    fn test_trace_path_counts_gap_runs() {
        let mut path = TracePath::new(4, 4);
        path.push(Step::AdvanceB, (4, 4), 1.0).unwrap();
        path.push(Step::AdvanceB, (4, 3), 1.0).unwrap();
        path.push(Step::Diagonal, (4, 2), 1.0).unwrap();
        path.push(Step::AdvanceA, (3, 1), 0.5).unwrap();
        path.push(Step::AdvanceB, (2, 1), 0.2).unwrap();
        path.push(Step::Diagonal, (2, 0), 0.1).unwrap();
        let (indices, scores, n_gaps) = path.finish();
        assert_eq!(n_gaps, 3);
        assert_eq!(indices.index_a, vec![2, 0, 3, 4, 0, 0]);
        assert_eq!(indices.index_b, vec![0, 1, 0, 2, 3, 4]);
        assert_eq!(scores, vec![0.1, 0.2, 0.5, 1.0, 1.0, 1.0]);
        assert!(indices.has_gaps());
    }

    #[test]
    fn test_trace_path_rejects_overlong_paths() {
        let mut path = TracePath::new(1, 1);
        path.push(Step::Diagonal, (1, 1), 0.0).unwrap();
        path.push(Step::Diagonal, (1, 1), 0.0).unwrap();
        assert!(matches!(
            path.push(Step::Diagonal, (1, 1), 0.0),
            Err(AlignError::InconsistentTraceback(_))
        ));
    }

    #[test]
    fn test_swapped_indices() {
        let indices = AlignedIndices {
            index_a: vec![1, 2, 0],
            index_b: vec![1, 0, 2],
        };
        let swapped = indices.swapped();
        assert_eq!(swapped.index_a, vec![1, 0, 2]);
        assert_eq!(swapped.swapped(), indices);
        assert_eq!(indices.len(), 3);
    }

    #[test]
    fn test_affine_code_source() {
        assert_eq!(AffineCode::FromMatch.source(), State::M);
        assert_eq!(AffineCode::FromGapExtendA.source(), State::A);
        assert_eq!(AffineCode::FromGapB.source(), State::B);
    }
}
