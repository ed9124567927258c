pub fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

/// Population variance: mean of squared deviations from the mean.
pub fn variance(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let sum_sq = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;
            diff * diff
        })
        .sum::<f64>();

    Some(sum_sq / data.len() as f64)
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Round a ratio to a whole percentage, clamped to 0..=100.
pub fn percent(numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let pct = (numerator as f64 / denominator as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}
