/// Sample quantile interpolating linearly between the order statistics
/// around `q * (n - 1)`.
pub fn quantile(data: &[f64], q: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=1.0).contains(&q) || data.iter().any(|x| x.is_nan()) {
        return None;
    }
    let mut data_copy = data.to_vec();
    let pos = q * (data.len() - 1) as f64;
    let k = pos.floor() as usize;
    let frac = pos - k as f64;
    let (_, &mut lower, above) = data_copy.select_nth_unstable_by(k, f64::total_cmp);
    if frac == 0.0 || above.is_empty() {
        return Some(lower);
    }
    let upper = above.iter().copied().fold(f64::INFINITY, f64::min);
    Some(lower + (upper - lower) * frac)
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        None
    } else {
        Some(data.iter().sum::<f64>() / data.len() as f64)
    }
}

pub fn l2_norm(data: &[f64]) -> f64 {
    data.iter().map(|x| x * x).sum::<f64>().sqrt()
}
