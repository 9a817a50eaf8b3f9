//! Penalising similarity cells that stray from an expected retention-time
//! path.

use super::error::{invalid, AlignError, AlignResult};
use super::matrix::SimMatrix;

/// Mean spacing of a time vector, which must be strictly spanning.
pub fn sampling_interval(times: &[f64]) -> AlignResult<f64> {
    match times {
        [] => invalid("time vector is empty"),
        [_] => invalid("a single time point has no sampling interval"),
        [first, .., last] => {
            let interval = (last - first) / (times.len() - 1) as f64;
            if interval > 0.0 && interval.is_finite() {
                Ok(interval)
            } else {
                invalid(format!(
                    "time vector must increase, spans {} to {}",
                    first, last
                ))
            }
        }
    }
}

/// Half window in samples covering `adaptive_rt` seconds of signal A.
pub fn no_beef_from_adaptive_rt(t_a: &[f64], adaptive_rt: f64) -> AlignResult<usize> {
    if !(adaptive_rt >= 0.0 && adaptive_rt.is_finite()) {
        return invalid(format!(
            "adaptive RT window must be a non-negative number, got {}",
            adaptive_rt
        ));
    }
    let sampling_time = sampling_interval(t_a)?;
    Ok((adaptive_rt / sampling_time).ceil() as usize)
}

/// Distance of every cell from the band of half width `no_beef` around the
/// straight path joining the predicted B positions of the first and last A
/// time points. Returns `None` when the prediction is degenerate
/// (`b2p <= b1p`).
pub fn no_beef_mask(
    t_a: &[f64],
    t_b: &[f64],
    b1p: f64,
    b2p: f64,
    no_beef: usize,
    hard_constrain: bool,
) -> AlignResult<Option<SimMatrix>> {
    let (n_row, n_col) = (t_a.len(), t_b.len());
    if n_row == 0 || n_col == 0 {
        return invalid("time vectors must be non-empty");
    }
    if n_row > 1 {
        sampling_interval(t_a)?;
    }
    if !(b1p.is_finite() && b2p.is_finite()) {
        return invalid(format!("predicted times must be finite, got {} and {}", b1p, b2p));
    }
    if b2p <= b1p {
        log::debug!(
            "Skipping the no-beef mask: predicted end {} is not after start {}",
            b2p,
            b1p
        );
        return Ok(None);
    }

    let (b1, b2) = if n_col > 1 {
        let interval = sampling_interval(t_b)?;
        (
            ((b1p - t_b[0]) / interval).round(),
            ((b2p - t_b[0]) / interval).round(),
        )
    } else {
        (0.0, 0.0)
    };
    let slope = if n_row > 1 {
        (b2 - b1) / (n_row - 1) as f64
    } else {
        0.0
    };
    let no_beef = no_beef as f64;
    let stretch = (1.0 + slope * slope).sqrt();
    let outside = ((n_row * n_row + n_col * n_col) as f64).sqrt();

    let mask = SimMatrix::from_fn(n_row, n_col, |i, j| {
        let dist = (j as f64 - (b1 + slope * i as f64)).abs();
        if dist <= no_beef {
            0.0
        } else if hard_constrain {
            outside
        } else {
            (dist - no_beef) / stretch
        }
    });
    Ok(Some(mask))
}

/// Subtracts `2 * max / samples4gradient * mask` from `s`, where `max` is the
/// entry of `s` with the largest magnitude.
pub fn constrain_similarity(
    s: &mut SimMatrix,
    mask: &SimMatrix,
    samples4gradient: f64,
) -> AlignResult<()> {
    if !(samples4gradient > 0.0 && samples4gradient.is_finite()) {
        return invalid(format!(
            "samples4gradient must be positive, got {}",
            samples4gradient
        ));
    }
    if s.shape() != mask.shape() {
        return Err(AlignError::DimensionMismatch(format!(
            "similarity matrix is {:?} but mask is {:?}",
            s.shape(),
            mask.shape()
        )));
    }
    let Some(max_val) = s.max_abs_value() else {
        return Ok(());
    };
    let gradient = 2.0 * max_val / samples4gradient;
    s.values_mut()
        .iter_mut()
        .zip(mask.as_slice())
        .for_each(|(value, distance)| *value -= gradient * distance);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const T_A: [f64; 4] = [3353.2, 3356.6, 3360.0, 3363.5];
    const T_B: [f64; 4] = [3325.9, 3329.3, 3332.7, 3336.1];

    fn assert_rows_eq(actual: &SimMatrix, expected: &[Vec<f64>]) {
        assert_eq!(actual.n_row(), expected.len());
        for (i, row) in expected.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                assert_abs_diff_eq!(actual[(i, j)], *value, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_soft_mask_reference() {
        let mask = no_beef_mask(&T_A, &T_B, 3325.751, 3336.119, 1, false)
            .unwrap()
            .unwrap();
        assert_rows_eq(
            &mask,
            &[
                vec![0.0, 0.0, 0.707, 1.414],
                vec![0.0, 0.0, 0.0, 0.707],
                vec![0.707, 0.0, 0.0, 0.0],
                vec![1.414, 0.707, 0.0, 0.0],
            ],
        );
    }

    #[test]
    fn test_hard_mask_reference() {
        let mask = no_beef_mask(&T_A, &T_B, 3325.751, 3336.119, 1, true)
            .unwrap()
            .unwrap();
        let far = 32f64.sqrt();
        assert_rows_eq(
            &mask,
            &[
                vec![0.0, 0.0, far, far],
                vec![0.0, 0.0, 0.0, far],
                vec![far, 0.0, 0.0, 0.0],
                vec![far, far, 0.0, 0.0],
            ],
        );
    }

    #[test]
    fn test_hard_mask_dominates_soft() {
        let soft = no_beef_mask(&T_A, &T_B, 3325.751, 3336.119, 0, false)
            .unwrap()
            .unwrap();
        let hard = no_beef_mask(&T_A, &T_B, 3325.751, 3336.119, 0, true)
            .unwrap()
            .unwrap();
        for (s, h) in soft.as_slice().iter().zip(hard.as_slice()) {
            assert!(h >= s);
        }
    }

    #[test]
    fn test_degenerate_prediction_skips_mask() {
        assert_eq!(no_beef_mask(&T_A, &T_B, 3336.1, 3336.1, 1, false), Ok(None));
        assert_eq!(no_beef_mask(&T_A, &T_B, 3340.0, 3330.0, 1, true), Ok(None));
    }

    #[test]
    fn test_mask_rejects_bad_times() {
        assert!(no_beef_mask(&[], &T_B, 1.0, 2.0, 1, false).is_err());
        assert!(no_beef_mask(&[5.0, 5.0], &T_B, 1.0, 2.0, 1, false).is_err());
        assert!(no_beef_mask(&T_A, &[4.0, 3.0], 1.0, 2.0, 1, false).is_err());
    }

    #[test]
    fn test_single_time_points() {
        let mask = no_beef_mask(&[10.0], &[20.0], 19.0, 21.0, 0, false)
            .unwrap()
            .unwrap();
        assert_eq!(mask.shape(), (1, 1));
        assert_eq!(mask[(0, 0)], 0.0);
    }

    #[test]
    fn test_no_beef_from_adaptive_rt() {
        assert_eq!(no_beef_from_adaptive_rt(&T_A, 77.82315).unwrap(), 23);
        assert_eq!(no_beef_from_adaptive_rt(&[0.0, 2.0, 4.0], 4.0).unwrap(), 2);
        assert!(no_beef_from_adaptive_rt(&[0.0], 4.0).is_err());
        assert!(no_beef_from_adaptive_rt(&T_A, -1.0).is_err());
    }

    fn reference_similarity() -> SimMatrix {
        SimMatrix::from_rows(&[
            vec![-2.0, -2.0, 10.0, -2.0, 10.0],
            vec![10.0, -2.0, -2.0, -2.0, -2.0],
            vec![-2.0, 10.0, -2.0, -2.0, -2.0],
            vec![-2.0, -2.0, -2.0, 10.0, -2.0],
        ])
        .unwrap()
    }

    fn reference_mask() -> SimMatrix {
        SimMatrix::from_rows(&[
            vec![0.0, 0.0, 0.707, 1.414, 2.121],
            vec![0.0, 0.0, 0.0, 0.707, 1.414],
            vec![0.707, 0.0, 0.0, 0.0, 0.0],
            vec![1.414, 0.707, 0.0, 0.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_constrain_similarity_reference() {
        let mut s = reference_similarity();
        constrain_similarity(&mut s, &reference_mask(), 10.0).unwrap();
        assert_rows_eq(
            &s,
            &[
                vec![-2.0, -2.0, 8.586, -4.828, 5.758],
                vec![10.0, -2.0, -2.0, -3.414, -4.828],
                vec![-3.414, 10.0, -2.0, -2.0, -2.0],
                vec![-4.828, -3.414, -2.0, 10.0, -2.0],
            ],
        );
    }

    #[test]
    fn test_constrain_similarity_monotone_in_samples4gradient() {
        let mask = reference_mask();
        let mut steep = reference_similarity();
        let mut gentle = reference_similarity();
        constrain_similarity(&mut steep, &mask, 10.0).unwrap();
        constrain_similarity(&mut gentle, &mask, 100.0).unwrap();
        let original = reference_similarity();
        for (i, j) in itertools::iproduct!(0..4, 0..5) {
            let (s, g, o) = (steep[(i, j)], gentle[(i, j)], original[(i, j)]);
            if mask[(i, j)] > 0.0 {
                assert!(s < g && g < o, "cell ({}, {})", i, j);
            } else {
                assert_eq!(s, o);
                assert_eq!(g, o);
            }
        }
    }

    #[test]
    fn test_constrain_similarity_errors() {
        let mut s = reference_similarity();
        assert!(matches!(
            constrain_similarity(&mut s, &reference_mask(), 0.0),
            Err(AlignError::InvalidParameter(_))
        ));
        let small = SimMatrix::filled(2, 2, 0.0);
        assert!(matches!(
            constrain_similarity(&mut s, &small, 10.0),
            Err(AlignError::DimensionMismatch(_))
        ));
        assert_eq!(s, reference_similarity());
    }
}
