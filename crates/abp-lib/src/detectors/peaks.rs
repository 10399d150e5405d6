use crate::{
    error::{AnalysisError, Result},
    signal::{is_missing, PeakSet, Signal},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Height and spacing constraints for beat detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakDetectorConfig {
    /// Percentile of valid samples a peak must reach (exclusive 0..100).
    pub threshold_percentile: f64,
    /// Minimum spacing between accepted peaks (seconds).
    pub min_distance_s: f64,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            threshold_percentile: 70.0,
            min_distance_s: 0.5,
        }
    }
}

impl PeakDetectorConfig {
    /// Minimum spacing in samples at `fs`, validated to be at least one.
    pub fn distance_samples(&self, fs: f64) -> Result<usize> {
        let p = self.threshold_percentile;
        if !p.is_finite() || p <= 0.0 || p >= 100.0 {
            return Err(AnalysisError::PeakDetection(format!(
                "threshold percentile must be inside (0, 100), got {p}"
            )));
        }
        let d = self.min_distance_s;
        if !d.is_finite() || d <= 0.0 {
            return Err(AnalysisError::PeakDetection(format!(
                "minimum distance must be positive, got {d} s"
            )));
        }
        let samples = (d * fs).floor();
        if samples < 1.0 {
            return Err(AnalysisError::PeakDetection(format!(
                "minimum distance {d} s is shorter than one sample at {fs} Hz"
            )));
        }
        Ok(samples as usize)
    }
}

/// Detect heartbeats: local maxima at or above the percentile threshold, thinned so that
/// accepted peaks are at least `min_distance_s` apart.
///
/// When two candidates are too close the taller one wins; on an exact tie the earlier
/// index wins.
pub fn detect_peaks(signal: &Signal, cfg: &PeakDetectorConfig) -> Result<PeakSet> {
    let distance = cfg.distance_samples(signal.fs)?;
    let valid: Vec<f64> = signal.valid_samples().collect();
    let Some(threshold) = percentile(&valid, cfg.threshold_percentile) else {
        log::warn!("no valid samples to threshold; returning no peaks");
        return Ok(PeakSet::empty());
    };
    let data = &signal.data;
    let candidates: Vec<usize> = local_maxima(data)
        .into_iter()
        .filter(|&i| data[i] >= threshold)
        .collect();
    let peaks = select_by_distance(&candidates, data, distance);
    log::debug!(
        "threshold {:.3} ({}th pct): {} candidates, {} peaks kept",
        threshold,
        cfg.threshold_percentile,
        candidates.len(),
        peaks.len()
    );
    Ok(PeakSet::from_indices(peaks))
}

/// Linear-interpolated percentile of `values` (gaps excluded). `None` when nothing is valid.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !is_missing(*v)).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Indices of local maxima. A flat top bounded by lower samples counts once, at its
/// middle (lower middle for even widths). Edge samples never qualify.
fn local_maxima(data: &[f64]) -> Vec<usize> {
    let n = data.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let last = n - 1;
    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(candidates: &[usize], data: &[f64], distance: usize) -> Vec<usize> {
    if distance <= 1 || candidates.len() < 2 {
        return candidates.to_vec();
    }
    // Visit order: tallest first, earlier index first on ties.
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        data[candidates[b]]
            .partial_cmp(&data[candidates[a]])
            .unwrap_or(Ordering::Equal)
            .then(candidates[a].cmp(&candidates[b]))
    });
    let mut keep = vec![true; candidates.len()];
    for &pos in &order {
        if !keep[pos] {
            continue;
        }
        let centre = candidates[pos];
        let mut k = pos;
        while k > 0 && centre - candidates[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = pos + 1;
        while k < candidates.len() && candidates[k] - centre < distance {
            keep[k] = false;
            k += 1;
        }
    }
    candidates
        .iter()
        .zip(keep)
        .filter_map(|(&idx, kept)| kept.then_some(idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::MISSING;
    use std::f64::consts::PI;

    fn signal(data: Vec<f64>, fs: f64) -> Signal {
        Signal::new(data, fs, "mmHg").unwrap()
    }

    fn cfg(threshold_percentile: f64, min_distance_s: f64) -> PeakDetectorConfig {
        PeakDetectorConfig {
            threshold_percentile,
            min_distance_s,
        }
    }

    /// ABP-like pulse train: one systolic bump per beat on a diastolic baseline.
    fn abp_waveform(fs: f64, beats: &[f64]) -> Signal {
        let duration = beats.last().copied().unwrap_or(1.0) + 1.0;
        let n = (duration * fs) as usize;
        let data = (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                let mut v = 80.0 + 2.0 * (2.0 * PI * 0.25 * t).sin();
                for &bt in beats {
                    v += 40.0 * (-0.5 * ((t - bt) / 0.06).powi(2)).exp();
                }
                v
            })
            .collect();
        signal(data, fs)
    }

    #[test]
    fn finds_one_peak_per_beat() {
        let fs = 125.0;
        let beats = [0.5, 1.3, 2.1, 2.85, 3.7, 4.5, 5.25, 6.0];
        let sig = abp_waveform(fs, &beats);
        let peaks = detect_peaks(&sig, &cfg(85.0, 0.4)).unwrap();
        assert_eq!(peaks.len(), beats.len());
        for (idx, bt) in peaks.indices.iter().zip(beats) {
            let expected = (bt * fs).round() as i64;
            assert!((*idx as i64 - expected).abs() <= 1, "{idx} vs {expected}");
        }
    }

    #[test]
    fn peaks_are_strictly_increasing_and_spaced() {
        let fs = 100.0;
        let data: Vec<f64> = (0..2000)
            .map(|i| {
                let t = i as f64 / fs;
                (2.0 * PI * 1.7 * t).sin() + 0.4 * (2.0 * PI * 5.3 * t).sin()
            })
            .collect();
        let sig = signal(data, fs);
        for &(pct, dist) in &[(10.0, 0.3), (50.0, 0.25), (90.0, 1.0), (30.0, 0.01)] {
            let peaks = detect_peaks(&sig, &cfg(pct, dist)).unwrap();
            let min_gap = (dist * fs).floor() as usize;
            for w in peaks.indices.windows(2) {
                assert!(w[1] > w[0]);
                assert!(w[1] - w[0] >= min_gap);
            }
            assert!(peaks.indices.iter().all(|&i| i < sig.len()));
        }
    }

    #[test]
    fn taller_candidate_wins_within_distance() {
        let data = vec![0.0, 5.0, 0.0, 9.0, 0.0, 0.0, 0.0, 0.0];
        let peaks = detect_peaks(&signal(data, 1.0), &cfg(1.0, 3.0)).unwrap();
        assert_eq!(peaks.indices, vec![3]);
    }

    #[test]
    fn earlier_candidate_wins_exact_tie() {
        let data = vec![0.0, 7.0, 0.0, 7.0, 0.0, 0.0, 7.0, 0.0];
        let peaks = detect_peaks(&signal(data, 1.0), &cfg(1.0, 3.0)).unwrap();
        assert_eq!(peaks.indices, vec![1, 6]);
    }

    #[test]
    fn plateau_reports_its_middle() {
        let data = vec![0.0, 1.0, 4.0, 4.0, 4.0, 4.0, 1.0, 0.0];
        let peaks = detect_peaks(&signal(data, 1.0), &cfg(50.0, 1.0)).unwrap();
        assert_eq!(peaks.indices, vec![3]);
    }

    #[test]
    fn flat_signal_has_no_peaks() {
        let sig = signal(vec![60.0; 10], 1.0);
        for &(pct, dist) in &[(1.0, 1.0), (50.0, 2.0), (99.0, 5.0)] {
            assert!(detect_peaks(&sig, &cfg(pct, dist)).unwrap().is_empty());
        }
    }

    #[test]
    fn threshold_excludes_low_maxima() {
        let data = vec![0.0, 2.0, 0.0, 10.0, 0.0, 3.0, 0.0, 11.0, 0.0];
        let peaks = detect_peaks(&signal(data, 1.0), &cfg(80.0, 1.0)).unwrap();
        assert_eq!(peaks.indices, vec![3, 7]);
    }

    #[test]
    fn gaps_never_form_or_border_peaks() {
        let data = vec![0.0, 5.0, MISSING, 6.0, 1.0, 0.0];
        let peaks = detect_peaks(&signal(data, 1.0), &cfg(1.0, 1.0)).unwrap();
        assert!(peaks.is_empty());
    }

    #[test]
    fn all_missing_signal_yields_empty_set() {
        let sig = signal(vec![MISSING; 6], 10.0);
        assert!(detect_peaks(&sig, &cfg(50.0, 0.2)).unwrap().is_empty());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let sig = signal(vec![1.0, 2.0, 1.0], 100.0);
        for bad in [cfg(0.0, 0.5), cfg(100.0, 0.5), cfg(f64::NAN, 0.5), cfg(50.0, 0.0), cfg(50.0, 0.005)] {
            assert!(matches!(
                detect_peaks(&sig, &bad),
                Err(AnalysisError::PeakDetection(_))
            ));
        }
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values = [4.0, 1.0, MISSING, 3.0, 2.0];
        assert_eq!(percentile(&values, 50.0), Some(2.5));
        assert_eq!(percentile(&values, 100.0), Some(4.0));
        assert!((percentile(&values, 70.0).unwrap() - 3.1).abs() < 1e-12);
        assert_eq!(percentile(&[MISSING], 50.0), None);
    }
}
