use crate::signal::RRSeries;

/// Instantaneous heart rate (bpm) for each RR interval.
pub fn heart_rate(rr: &RRSeries) -> Vec<f64> {
    rr.rr.iter().map(|&interval| 60.0 / interval).collect()
}

/// RMSSD in milliseconds; zero with fewer than two RR intervals.
pub fn rmssd_ms(rr: &RRSeries) -> f64 {
    let n = rr.rr.len();
    if n < 2 {
        return 0.0;
    }
    let sum_sq = rr
        .rr
        .windows(2)
        .map(|w| (w[1] - w[0]).powi(2))
        .sum::<f64>();
    (sum_sq / (n as f64 - 1.0)).sqrt() * 1000.0
}
