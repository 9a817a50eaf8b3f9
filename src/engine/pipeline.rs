//! End-to-end alignment of two chromatogram groups.

use super::affine::do_affine_alignment;
use super::alignment::do_alignment;
use super::constrain::{constrain_similarity, no_beef_mask};
use super::error::{invalid, AlignError, AlignResult};
use super::gap_penalty::base_gap_penalty;
use super::matrix::SimMatrix;
use super::similarity::{similarity_matrix, SimParams};
use super::traceback::AlignedIndices;
use std::str::FromStr;

pub const DEFAULT_MAX_CELLS: usize = 25_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignType {
    /// Similarity alone drives the alignment.
    Global,
    /// Similarity is penalised away from a predicted retention-time path.
    Hybrid,
}

impl FromStr for AlignType {
    type Err = AlignError;
    fn from_str(align_type: &str) -> Result<Self, Self::Err> {
        match align_type {
            "global" => Ok(AlignType::Global),
            "hybrid" => Ok(AlignType::Hybrid),
            _ => invalid(format!(
                "unknown alignment type '{}'. Options are: global, hybrid",
                align_type
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignParams {
    pub align_type: AlignType,
    pub sim: SimParams,
    pub gap_quantile: f64,
    /// Gap-open penalty as a multiple of the base gap penalty.
    pub go_factor: f64,
    /// Gap-extend penalty as a multiple of the base gap penalty.
    pub ge_factor: f64,
    /// Fixed linear gap penalty; selects the single-penalty engine.
    pub linear_gap: Option<f64>,
    pub overlap: bool,
    pub samples4gradient: f64,
    pub max_cells: usize,
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            align_type: AlignType::Hybrid,
            sim: SimParams::default(),
            gap_quantile: 0.5,
            go_factor: 0.125,
            ge_factor: 40.0,
            linear_gap: None,
            overlap: true,
            samples4gradient: 100.0,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

impl AlignParams {
    pub fn validate(&self) -> AlignResult<()> {
        self.sim.validate()?;
        if !(0.0..=1.0).contains(&self.gap_quantile) {
            return invalid(format!(
                "gapQuantile must be between 0 and 1, got {}",
                self.gap_quantile
            ));
        }
        if !self.go_factor.is_finite() || !self.ge_factor.is_finite() {
            return invalid("goFactor and geFactor must be finite");
        }
        if let Some(gap) = self.linear_gap {
            if !gap.is_finite() {
                return invalid(format!("gap penalty must be finite, got {}", gap));
            }
        }
        if !(self.samples4gradient > 0.0 && self.samples4gradient.is_finite()) {
            return invalid(format!(
                "samples4gradient must be positive, got {}",
                self.samples4gradient
            ));
        }
        if self.max_cells == 0 {
            return invalid("max_cells must be positive");
        }
        Ok(())
    }
}

/// Expected retention-time path used by hybrid alignment.
#[derive(Debug, Clone, Copy)]
pub struct Constraint<'a> {
    pub t_a: &'a [f64],
    pub t_b: &'a [f64],
    /// Predicted B time of the first A time point.
    pub b1p: f64,
    /// Predicted B time of the last A time point.
    pub b2p: f64,
    /// Half window around the predicted path, in samples.
    pub no_beef: usize,
    pub hard_constrain: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChromAlignment {
    pub indices: AlignedIndices,
    pub score: Vec<f64>,
    /// Forward path score for the single-penalty engine, forward similarity
    /// for the affine one.
    pub score_forw: f64,
    pub n_gaps: usize,
    pub base_gap_penalty: f64,
    pub masked: bool,
}

impl ChromAlignment {
    /// Maps aligned indices to retention times; gaps map to `None`.
    pub fn aligned_times(&self, t_a: &[f64], t_b: &[f64]) -> Vec<(Option<f64>, Option<f64>)> {
        let lookup = |times: &[f64], index: usize| {
            index.checked_sub(1).and_then(|k| times.get(k).copied())
        };
        self.indices
            .pairs()
            .map(|(a, b)| (lookup(t_a, a), lookup(t_b, b)))
            .collect()
    }
}

/// Similarity matrix after optional masking, with the base gap penalty taken
/// before masking.
#[derive(Debug, Clone)]
pub struct PreparedSimilarity {
    pub s: SimMatrix,
    pub base_gap_penalty: f64,
    pub masked: bool,
}

pub fn constrained_similarity(
    signal_a: &[Vec<f64>],
    signal_b: &[Vec<f64>],
    params: &AlignParams,
    constraint: Option<&Constraint>,
) -> AlignResult<PreparedSimilarity> {
    params.validate()?;
    let len_a = signal_a.first().map_or(0, |c| c.len());
    let len_b = signal_b.first().map_or(0, |c| c.len());
    if len_a.saturating_mul(len_b) > params.max_cells {
        return invalid(format!(
            "{}x{} similarity matrix exceeds the limit of {} cells",
            len_a, len_b, params.max_cells
        ));
    }

    let mut s = similarity_matrix(signal_a, signal_b, &params.sim)?;
    let base_gap_penalty = base_gap_penalty(&s, params.gap_quantile, params.sim.sim_type)?;

    let mut masked = false;
    match (params.align_type, constraint) {
        (AlignType::Hybrid, Some(constraint)) => {
            if constraint.t_a.len() != s.n_row() || constraint.t_b.len() != s.n_col() {
                return Err(AlignError::DimensionMismatch(format!(
                    "time vectors of length {} and {} do not match a {}x{} similarity matrix",
                    constraint.t_a.len(),
                    constraint.t_b.len(),
                    s.n_row(),
                    s.n_col()
                )));
            }
            let mask = no_beef_mask(
                constraint.t_a,
                constraint.t_b,
                constraint.b1p,
                constraint.b2p,
                constraint.no_beef,
                constraint.hard_constrain,
            )?;
            if let Some(mask) = mask {
                constrain_similarity(&mut s, &mask, params.samples4gradient)?;
                masked = true;
            }
        }
        (AlignType::Hybrid, None) => {
            return invalid("hybrid alignment needs predicted retention times");
        }
        (AlignType::Global, Some(_)) => {
            log::debug!("Ignoring the retention-time constraint for global alignment");
        }
        (AlignType::Global, None) => {}
    }

    Ok(PreparedSimilarity {
        s,
        base_gap_penalty,
        masked,
    })
}

pub fn align_chromatograms(
    signal_a: &[Vec<f64>],
    signal_b: &[Vec<f64>],
    params: &AlignParams,
    constraint: Option<&Constraint>,
) -> AlignResult<ChromAlignment> {
    let prepared = constrained_similarity(signal_a, signal_b, params, constraint)?;
    let base = prepared.base_gap_penalty;

    let alignment = match params.linear_gap {
        Some(gap) => {
            let obj = do_alignment(&prepared.s, gap, params.overlap)?;
            ChromAlignment {
                indices: obj.indices,
                score: obj.score,
                score_forw: obj.score_forw,
                n_gaps: obj.n_gaps,
                base_gap_penalty: base,
                masked: prepared.masked,
            }
        }
        None => {
            let obj = do_affine_alignment(
                &prepared.s,
                base * params.go_factor,
                base * params.ge_factor,
                params.overlap,
            )?;
            ChromAlignment {
                indices: obj.indices,
                score: obj.score,
                score_forw: obj.sim_score_forw,
                n_gaps: obj.n_gaps,
                base_gap_penalty: base,
                masked: prepared.masked,
            }
        }
    };
    log::debug!(
        "Aligned {}x{} points into {} steps with {} gaps (masked: {})",
        prepared.s.n_row(),
        prepared.s.n_col(),
        alignment.indices.len(),
        alignment.n_gaps,
        alignment.masked
    );
    Ok(alignment)
}
