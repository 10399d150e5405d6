use crate::error::{AnalysisError, Result};
use std::f64::consts::LN_2;

/// Centered convolution returning `data.len()` samples; the kernel overhang at each edge
/// sees zeros. Gaps inside the kernel support propagate into the output.
pub fn convolve_same(data: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = data.len();
    let m = kernel.len();
    if n == 0 || m == 0 {
        return data.to_vec();
    }
    let offset = (m - 1) / 2;
    let mut out = vec![0.0; n];
    for (i, slot) in out.iter_mut().enumerate() {
        // out[i] = sum_j kernel[j] * data[i + offset - j]
        let centre = i + offset;
        let j_min = centre.saturating_sub(n - 1);
        let j_max = centre.min(m - 1);
        let mut acc = 0.0;
        for j in j_min..=j_max {
            acc += kernel[j] * data[centre - j];
        }
        *slot = acc;
    }
    out
}

/// Uniform kernel of `window` taps summing to one.
pub fn running_mean_kernel(window: usize) -> Result<Vec<f64>> {
    if window < 1 {
        return Err(AnalysisError::FilterConfig(
            "running mean window must be at least 1 sample".into(),
        ));
    }
    Ok(vec![1.0 / window as f64; window])
}

pub fn running_mean(data: &[f64], window: usize) -> Result<Vec<f64>> {
    let kernel = running_mean_kernel(window)?;
    if window == 1 {
        return Ok(data.to_vec());
    }
    Ok(convolve_same(data, &kernel))
}

/// Gaussian kernel `exp(-4 ln2 t^2 / w^2)` sampled at `1/fs` over `[-3w, 3w]`,
/// with `w = fwhm_ms / 1000` seconds, normalised to unit sum.
pub fn gaussian_kernel(fwhm_ms: f64, fs: f64) -> Result<Vec<f64>> {
    if !fwhm_ms.is_finite() || fwhm_ms <= 0.0 {
        return Err(AnalysisError::FilterConfig(format!(
            "Gaussian FWHM must be positive, got {fwhm_ms} ms"
        )));
    }
    let w = fwhm_ms / 1000.0;
    let half = (3.0 * w * fs + 1e-9).floor();
    if !half.is_finite() || half > 1e7 {
        return Err(AnalysisError::FilterConfig(format!(
            "Gaussian FWHM {fwhm_ms} ms is too wide for {fs} Hz"
        )));
    }
    let half = half as i64;
    let mut kernel: Vec<f64> = (-half..=half)
        .map(|k| {
            let t = k as f64 / fs;
            (-4.0 * LN_2 * t * t / (w * w)).exp()
        })
        .collect();
    let total: f64 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= total;
    }
    Ok(kernel)
}

pub fn gaussian_smooth(data: &[f64], fwhm_ms: f64, fs: f64) -> Result<Vec<f64>> {
    let kernel = gaussian_kernel(fwhm_ms, fs)?;
    Ok(convolve_same(data, &kernel))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn same_convolution_zero_pads_edges() {
        let out = convolve_same(&[3.0, 3.0, 3.0, 3.0], &[1.0 / 3.0; 3]);
        assert_close(out[0], 2.0, 1e-12);
        assert_close(out[1], 3.0, 1e-12);
        assert_close(out[2], 3.0, 1e-12);
        assert_close(out[3], 2.0, 1e-12);
    }

    #[test]
    fn even_window_overhangs_more_on_the_left() {
        let out = convolve_same(&[4.0, 4.0, 4.0, 4.0], &[0.25; 4]);
        assert_close(out[0], 2.0, 1e-12);
        assert_close(out[1], 3.0, 1e-12);
        assert_close(out[2], 4.0, 1e-12);
        assert_close(out[3], 3.0, 1e-12);
    }

    #[test]
    fn kernel_longer_than_signal_keeps_length() {
        let out = convolve_same(&[1.0, 2.0], &[0.2; 5]);
        assert_eq!(out.len(), 2);
        assert_close(out[0], 0.6, 1e-12);
        assert_close(out[1], 0.6, 1e-12);
    }

    #[test]
    fn window_of_one_is_identity() {
        let data = vec![88.25, 101.5, f64::NAN, 97.0];
        let out = running_mean(&data, 1).unwrap();
        assert_eq!(out.len(), data.len());
        for (a, b) in out.iter().zip(&data) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn rejects_zero_window() {
        assert!(matches!(
            running_mean(&[1.0], 0),
            Err(AnalysisError::FilterConfig(_))
        ));
    }

    #[test]
    fn gap_spreads_over_kernel_support() {
        let mut data = vec![100.0; 9];
        data[4] = f64::NAN;
        let out = running_mean(&data, 3).unwrap();
        let missing: Vec<usize> = (0..9).filter(|&i| out[i].is_nan()).collect();
        assert_eq!(missing, vec![3, 4, 5]);
    }

    #[test]
    fn gaussian_kernel_sums_to_one() {
        for &(fwhm, fs) in &[(100.0, 125.0), (0.5, 125.0), (37.0, 1000.0), (2500.0, 62.5)] {
            let kernel = gaussian_kernel(fwhm, fs).unwrap();
            let total: f64 = kernel.iter().sum();
            assert_close(total, 1.0, 1e-9);
            assert_eq!(kernel.len() % 2, 1);
            let mid = kernel.len() / 2;
            for k in 0..mid {
                assert_close(kernel[k], kernel[kernel.len() - 1 - k], 1e-15);
            }
        }
    }

    #[test]
    fn gaussian_kernel_half_maximum_at_half_fwhm() {
        // 100 ms FWHM at 1 kHz: samples at +/-50 ms sit at half the peak.
        let kernel = gaussian_kernel(100.0, 1000.0).unwrap();
        let mid = kernel.len() / 2;
        assert_eq!(mid, 300);
        assert_close(kernel[mid + 50] / kernel[mid], 0.5, 1e-12);
    }

    #[test]
    fn narrow_gaussian_degenerates_to_identity() {
        let kernel = gaussian_kernel(0.5, 125.0).unwrap();
        assert_eq!(kernel, vec![1.0]);
    }

    #[test]
    fn rejects_non_positive_fwhm() {
        assert!(gaussian_kernel(0.0, 125.0).is_err());
        assert!(gaussian_kernel(-5.0, 125.0).is_err());
    }

    #[test]
    fn smoothing_is_not_idempotent() {
        let impulse = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let once = running_mean(&impulse, 3).unwrap();
        let twice = running_mean(&once, 3).unwrap();
        assert_close(once[3], 1.0 / 3.0, 1e-12);
        assert_close(twice[3], 1.0 / 3.0, 1e-12);
        assert_close(twice[1], 1.0 / 9.0, 1e-12);
        assert!(once.iter().zip(&twice).any(|(a, b)| (a - b).abs() > 1e-3));

        let g_once = gaussian_smooth(&impulse, 20.0, 100.0).unwrap();
        let g_twice = gaussian_smooth(&g_once, 20.0, 100.0).unwrap();
        assert!(g_once.iter().zip(&g_twice).any(|(a, b)| (a - b).abs() > 1e-3));
    }
}
