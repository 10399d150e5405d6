use crate::signal::Signal;

/// Derivative-based smoothness heuristic in `[0, 1]`.
///
/// Gaps are dropped first, so differences are taken between consecutive valid samples.
/// Returns 0 with fewer than two valid samples or a zero maximum.
pub fn signal_quality_index(signal: &Signal) -> f64 {
    let valid: Vec<f64> = signal.valid_samples().collect();
    if valid.len() < 2 {
        return 0.0;
    }
    let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 {
        return 0.0;
    }
    let mean_abs_diff =
        valid.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (valid.len() - 1) as f64;
    (1.0 - mean_abs_diff / max).clamp(0.0, 1.0)
}
