use super::error::{invalid, AlignError, AlignResult};
use super::matrix::SimMatrix;
use super::similarity::{ScoreOrientation, SimType};
use crate::utils::quantile;

/// Base gap penalty of a similarity matrix: the `gap_quantile` quantile of its
/// entries, read in the direction the score type considers similar.
pub fn base_gap_penalty(s: &SimMatrix, gap_quantile: f64, sim_type: SimType) -> AlignResult<f64> {
    let penalty = gap_penalty_for(s.as_slice(), gap_quantile, sim_type.orientation())?;
    log::debug!(
        "Base gap penalty {:.6} from {} at quantile {}",
        penalty,
        sim_type,
        gap_quantile
    );
    Ok(penalty)
}

/// Quantile of `values` after flipping lower-is-similar scores so that the
/// returned penalty lives on a higher-is-similar scale. For such scores this
/// equals `-quantile(values, 1 - q)`.
pub fn gap_penalty_for(
    values: &[f64],
    gap_quantile: f64,
    orientation: ScoreOrientation,
) -> AlignResult<f64> {
    if !(0.0..=1.0).contains(&gap_quantile) {
        return invalid(format!(
            "gapQuantile must be between 0 and 1, got {}",
            gap_quantile
        ));
    }
    let estimate = match orientation {
        ScoreOrientation::HigherIsSimilar => quantile(values, gap_quantile),
        ScoreOrientation::LowerIsSimilar => quantile(values, 1.0 - gap_quantile).map(|q| -q),
    };
    estimate.ok_or_else(|| {
        AlignError::InvalidParameter("gap penalty needs a non-empty, NaN-free matrix".into())
    })
}
