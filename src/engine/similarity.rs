use super::error::{invalid, AlignError, AlignResult};
use super::matrix::SimMatrix;
use crate::utils::{l2_norm, mean, quantile};
use itertools::{iproduct, Itertools};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    None,
    Mean,
    L2,
}

impl FromStr for Normalization {
    type Err = AlignError;
    fn from_str(normalization: &str) -> Result<Self, Self::Err> {
        match normalization {
            "none" => Ok(Normalization::None),
            "mean" => Ok(Normalization::Mean),
            "L2" | "l2" => Ok(Normalization::L2),
            _ => invalid(format!(
                "unknown normalization '{}'. Options are: none, mean, L2",
                normalization
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimType {
    DotProductMasked,
    DotProduct,
    CosineAngle,
    Cosine2Angle,
    EuclideanDist,
    Covariance,
    Correlation,
    CrossCorrelation,
}

/// Which direction of a score means "more alike".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrientation {
    HigherIsSimilar,
    LowerIsSimilar,
}

impl SimType {
    pub const ALL: [SimType; 8] = [
        SimType::DotProductMasked,
        SimType::DotProduct,
        SimType::CosineAngle,
        SimType::Cosine2Angle,
        SimType::EuclideanDist,
        SimType::Covariance,
        SimType::Correlation,
        SimType::CrossCorrelation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SimType::DotProductMasked => "dotProductMasked",
            SimType::DotProduct => "dotProduct",
            SimType::CosineAngle => "cosineAngle",
            SimType::Cosine2Angle => "cosine2Angle",
            SimType::EuclideanDist => "euclideanDist",
            SimType::Covariance => "covariance",
            SimType::Correlation => "correlation",
            SimType::CrossCorrelation => "crossCorrelation",
        }
    }

    /// Euclidean distance is emitted as `1 / (1 + d)`, so every score type
    /// produced here grows with similarity.
    pub fn orientation(self) -> ScoreOrientation {
        match self {
            SimType::DotProductMasked
            | SimType::DotProduct
            | SimType::CosineAngle
            | SimType::Cosine2Angle
            | SimType::Covariance
            | SimType::Correlation
            | SimType::CrossCorrelation => ScoreOrientation::HigherIsSimilar,
            SimType::EuclideanDist => ScoreOrientation::HigherIsSimilar,
        }
    }
}

impl fmt::Display for SimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimType {
    type Err = AlignError;
    fn from_str(sim_type: &str) -> Result<Self, Self::Err> {
        SimType::ALL
            .into_iter()
            .find(|t| t.name() == sim_type)
            .ok_or_else(|| {
                AlignError::InvalidParameter(format!(
                    "unknown similarity type '{}'. Options are: {}",
                    sim_type,
                    SimType::ALL.iter().map(|t| t.name()).join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub normalization: Normalization,
    pub sim_type: SimType,
    /// dotProductMasked: angular similarity a high dot product must exceed.
    pub cos_angle_thresh: f64,
    /// dotProductMasked: quantile above which dot products are angle-checked.
    pub dot_prod_thresh: f64,
    /// crossCorrelation: diagonal window length, odd.
    pub ker_len: usize,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            normalization: Normalization::Mean,
            sim_type: SimType::DotProductMasked,
            cos_angle_thresh: 0.3,
            dot_prod_thresh: 0.96,
            ker_len: 9,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> AlignResult<()> {
        if !(0.0..=1.0).contains(&self.dot_prod_thresh) {
            return invalid(format!(
                "dotProdThresh must be between 0 and 1, got {}",
                self.dot_prod_thresh
            ));
        }
        if !self.cos_angle_thresh.is_finite() {
            return invalid("cosAngleThresh must be finite");
        }
        if self.ker_len % 2 == 0 {
            return invalid(format!(
                "kernel length must be an odd number, got {}",
                self.ker_len
            ));
        }
        Ok(())
    }
}

/// Builds the similarity matrix of two multi-channel signals. Each side is a
/// list of channels; all channels on a side share their length.
pub fn similarity_matrix(
    signal_a: &[Vec<f64>],
    signal_b: &[Vec<f64>],
    params: &SimParams,
) -> AlignResult<SimMatrix> {
    params.validate()?;
    let len_a = check_channels(signal_a, "A")?;
    let len_b = check_channels(signal_b, "B")?;
    if signal_a.len() != signal_b.len() {
        return invalid(format!(
            "signal A has {} channels but signal B has {}",
            signal_a.len(),
            signal_b.len()
        ));
    }
    log::trace!(
        "Similarity {} ({:?}) for {}x{} time points over {} channels",
        params.sim_type,
        params.normalization,
        len_a,
        len_b,
        signal_a.len()
    );

    let points_a = to_time_major(signal_a, len_a, params.normalization)?;
    let points_b = to_time_major(signal_b, len_b, params.normalization)?;

    let s = match params.sim_type {
        SimType::DotProduct => pairwise(&points_a, &points_b, dot),
        SimType::CosineAngle => pairwise(&points_a, &points_b, cosine),
        SimType::Cosine2Angle => pairwise(&points_a, &points_b, cosine2),
        SimType::EuclideanDist => pairwise(&points_a, &points_b, inverse_distance),
        SimType::Covariance => pairwise(&points_a, &points_b, covariance),
        SimType::Correlation => pairwise(&points_a, &points_b, correlation),
        SimType::DotProductMasked => masked_dot_product(&points_a, &points_b, params)?,
        SimType::CrossCorrelation => {
            diagonal_window_sum(&pairwise(&points_a, &points_b, dot), params.ker_len)
        }
    };
    Ok(s)
}

/// Match/mismatch matrix of two character sequences.
pub fn seq_similarity(
    seq1: &[u8],
    seq2: &[u8],
    match_score: f64,
    mismatch_score: f64,
) -> AlignResult<SimMatrix> {
    if seq1.is_empty() || seq2.is_empty() {
        return invalid("sequences must be non-empty");
    }
    let data = iproduct!(seq1, seq2)
        .map(|(a, b)| if a == b { match_score } else { mismatch_score })
        .collect_vec();
    SimMatrix::from_vec(seq1.len(), seq2.len(), data)
}

fn check_channels(channels: &[Vec<f64>], side: &str) -> AlignResult<usize> {
    let first = match channels.first() {
        Some(first) => first.len(),
        None => return invalid(format!("signal {} has no channels", side)),
    };
    if first == 0 {
        return invalid(format!("signal {} has no time points", side));
    }
    if let Some((index, channel)) = channels.iter().find_position(|c| c.len() != first) {
        return Err(AlignError::DimensionMismatch(format!(
            "signal {} channel {} has {} time points, expected {}",
            side,
            index,
            channel.len(),
            first
        )));
    }
    if channels.iter().flatten().any(|x| !x.is_finite()) {
        return invalid(format!("signal {} has non-finite intensities", side));
    }
    Ok(first)
}

/// Transposes channels into a (time point x channel) matrix and applies the
/// normalization over every value of the side.
fn to_time_major(
    channels: &[Vec<f64>],
    len: usize,
    normalization: Normalization,
) -> AlignResult<SimMatrix> {
    let data = (0..len)
        .flat_map(|t| channels.iter().map(move |c| c[t]))
        .collect_vec();
    let mut points = SimMatrix::from_vec(len, channels.len(), data)?;
    let divisor = match normalization {
        Normalization::None => return Ok(points),
        Normalization::Mean => mean(points.as_slice()).unwrap_or(0.0),
        Normalization::L2 => l2_norm(points.as_slice()),
    };
    if divisor != 0.0 && divisor.is_finite() {
        points.values_mut().iter_mut().for_each(|x| *x /= divisor);
    } else {
        log::debug!("Skipping {:?} normalization of a zero signal", normalization);
    }
    Ok(points)
}

fn pairwise<F>(points_a: &SimMatrix, points_b: &SimMatrix, f: F) -> SimMatrix
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    SimMatrix::from_fn(points_a.n_row(), points_b.n_row(), |i, j| {
        f(points_a.row(i), points_b.row(j))
    })
}

fn dot(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v).map(|(x, y)| x * y).sum()
}

fn cosine(u: &[f64], v: &[f64]) -> f64 {
    let norms = l2_norm(u) * l2_norm(v);
    if norms == 0.0 {
        0.0
    } else {
        dot(u, v) / norms
    }
}

fn cosine2(u: &[f64], v: &[f64]) -> f64 {
    let c = cosine(u, v);
    2.0 * c * c - 1.0
}

fn inverse_distance(u: &[f64], v: &[f64]) -> f64 {
    let dist = u
        .iter()
        .zip(v)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt();
    1.0 / (1.0 + dist)
}

fn covariance(u: &[f64], v: &[f64]) -> f64 {
    let k = u.len();
    if k < 2 {
        return 0.0;
    }
    let mean_u = u.iter().sum::<f64>() / k as f64;
    let mean_v = v.iter().sum::<f64>() / k as f64;
    u.iter()
        .zip(v)
        .map(|(x, y)| (x - mean_u) * (y - mean_v))
        .sum::<f64>()
        / (k - 1) as f64
}

fn correlation(u: &[f64], v: &[f64]) -> f64 {
    let sd = (covariance(u, u) * covariance(v, v)).sqrt();
    if sd == 0.0 {
        0.0
    } else {
        covariance(u, v) / sd
    }
}

// High dot products must also point the same way: entries above the
// `dot_prod_thresh` quantile survive only if their cosine2Angle clears
// `cos_angle_thresh`; all others survive only if 1 clears it.
fn masked_dot_product(
    points_a: &SimMatrix,
    points_b: &SimMatrix,
    params: &SimParams,
) -> AlignResult<SimMatrix> {
    let mut s = pairwise(points_a, points_b, dot);
    let cutoff = quantile(s.as_slice(), params.dot_prod_thresh).ok_or_else(|| {
        AlignError::InvalidParameter("cannot take a quantile of the dot products".into())
    })?;
    let angles = pairwise(points_a, points_b, cosine2);
    for (value, angle) in s.values_mut().iter_mut().zip(angles.as_slice()) {
        let angular = if *value > cutoff { *angle } else { 1.0 };
        if angular <= params.cos_angle_thresh {
            *value = 0.0;
        }
    }
    Ok(s)
}

fn diagonal_window_sum(s: &SimMatrix, ker_len: usize) -> SimMatrix {
    let half = (ker_len / 2) as isize;
    let (n_row, n_col) = (s.n_row() as isize, s.n_col() as isize);
    SimMatrix::from_fn(s.n_row(), s.n_col(), |i, j| {
        let (i, j) = (i as isize, j as isize);
        (-half..=half)
            .map(|d| (i + d, j + d))
            .filter(|&(r, c)| r >= 0 && r < n_row && c >= 0 && c < n_col)
            .map(|(r, c)| s[(r as usize, c as usize)])
            .sum()
    })
}
