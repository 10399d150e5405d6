//! Digital Butterworth bandpass design and zero-phase application.
//!
//! The design follows the classic analog-prototype route: Butterworth lowpass poles,
//! lowpass-to-bandpass transform around the prewarped band edges, then the bilinear
//! transform. The result is realised as cascaded second-order sections, which stay
//! numerically stable for the orders accepted here.

use crate::error::{AnalysisError, Result};
use realfft::num_complex::Complex;
use std::f64::consts::PI;

/// Highest accepted design order.
pub const MAX_ORDER: usize = 10;
/// Minimum distance kept between a cutoff and 0 / Nyquist, and between the two cutoffs.
pub const CUTOFF_EPSILON_HZ: f64 = 0.001;

type C64 = Complex<f64>;

/// One second-order section, `a[0]` is always 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    fn response(&self, z_inv: C64) -> C64 {
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + z_inv * self.b[1] + z_inv2 * self.b[2];
        let den = self.a[0] + z_inv * self.a[1] + z_inv2 * self.a[2];
        num / den
    }

    /// Steady-state delay line for a unit step input.
    fn step_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let det = 1.0 + a1 + a2;
        if det.abs() < f64::EPSILON {
            return [0.0, 0.0];
        }
        let r0 = b1 - a1 * b0;
        let r1 = b2 - a2 * b0;
        [(r0 + r1) / det, ((1.0 + a1) * r1 - a2 * r0) / det]
    }

    fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }
}

/// A designed bandpass filter together with the cutoffs it was designed at.
#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthBandpass {
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: usize,
    pub fs: f64,
    pub sections: Vec<Biquad>,
}

/// Clamp both cutoffs into `(0, nyquist)` keeping them at least `CUTOFF_EPSILON_HZ` apart.
pub fn clamp_cutoffs(lowcut_hz: f64, highcut_hz: f64, fs: f64) -> Result<(f64, f64)> {
    if !lowcut_hz.is_finite() || !highcut_hz.is_finite() {
        return Err(AnalysisError::FilterConfig(format!(
            "cutoffs must be finite, got low={lowcut_hz} high={highcut_hz}"
        )));
    }
    let nyquist = 0.5 * fs;
    let low = lowcut_hz.min(nyquist - CUTOFF_EPSILON_HZ).max(CUTOFF_EPSILON_HZ);
    let high = highcut_hz
        .min(nyquist - CUTOFF_EPSILON_HZ)
        .max(low + CUTOFF_EPSILON_HZ);
    if low >= high || high >= nyquist {
        return Err(AnalysisError::FilterConfig(format!(
            "invalid Butterworth band after clamping: low={low} high={high} (nyquist {nyquist})"
        )));
    }
    Ok((low, high))
}

impl ButterworthBandpass {
    pub fn design(lowcut_hz: f64, highcut_hz: f64, order: usize, fs: f64) -> Result<Self> {
        if order == 0 || order > MAX_ORDER {
            return Err(AnalysisError::FilterConfig(format!(
                "Butterworth order must be in 1..={MAX_ORDER}, got {order}"
            )));
        }
        let (low_hz, high_hz) = clamp_cutoffs(lowcut_hz, highcut_hz, fs)?;
        let nyquist = 0.5 * fs;
        let sections = bandpass_sections(order, low_hz / nyquist, high_hz / nyquist)?;
        Ok(Self {
            low_hz,
            high_hz,
            order,
            fs,
            sections,
        })
    }

    /// Minimum signal length is one sample more than the edge padding.
    pub fn padlen(&self) -> usize {
        3 * (2 * self.order + 1)
    }

    /// Complex response at `freq_hz`.
    pub fn response_at(&self, freq_hz: f64) -> C64 {
        let omega = 2.0 * PI * freq_hz / self.fs;
        let z_inv = C64::from_polar(1.0, -omega);
        self.sections
            .iter()
            .fold(C64::new(1.0, 0.0), |acc, s| acc * s.response(z_inv))
    }

    /// Forward-backward filtering with odd edge extension.
    pub fn filtfilt(&self, data: &[f64]) -> Result<Vec<f64>> {
        let n = data.len();
        let padlen = self.padlen();
        if n <= padlen {
            return Err(AnalysisError::FilterExecution(format!(
                "signal of {n} samples is too short for order {} (needs more than {padlen})",
                self.order
            )));
        }
        let extended = odd_extend(data, padlen);
        let zi = self.step_states();

        let mut forward = sosfilt(&self.sections, &extended, &zi, extended[0]);
        forward.reverse();
        let edge = forward[0];
        let mut backward = sosfilt(&self.sections, &forward, &zi, edge);
        backward.reverse();
        Ok(backward[padlen..padlen + n].to_vec())
    }

    /// Per-section steady-state delay lines for a unit step at the cascade input.
    fn step_states(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        let mut states = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            let [z0, z1] = section.step_state();
            states.push([scale * z0, scale * z1]);
            scale *= section.dc_gain();
        }
        states
    }
}

fn bandpass_sections(order: usize, wn_low: f64, wn_high: f64) -> Result<Vec<Biquad>> {
    // Prewarp for a design sampling rate of 2 (normalised frequencies).
    let w1 = 4.0 * (PI * wn_low / 2.0).tan();
    let w2 = 4.0 * (PI * wn_high / 2.0).tan();
    let bw = w2 - w1;
    let wo2 = w1 * w2;

    let mut analog = Vec::with_capacity(2 * order);
    for k in 0..order {
        let m = 2.0 * k as f64 - (order as f64 - 1.0);
        let theta = PI * m / (2.0 * order as f64);
        let prototype = -C64::new(theta.cos(), theta.sin());
        let shifted = prototype * (bw / 2.0);
        let disc = (shifted * shifted - wo2).sqrt();
        analog.push(shifted + disc);
        analog.push(shifted - disc);
    }

    let fs2 = 4.0;
    let denom = analog
        .iter()
        .fold(C64::new(1.0, 0.0), |acc, &p| acc * (fs2 - p));
    let gain = (C64::new((bw * fs2).powi(order as i32), 0.0) / denom).re;
    let digital: Vec<C64> = analog.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();

    if digital.iter().any(|p| p.norm() >= 1.0 || !p.re.is_finite()) {
        return Err(AnalysisError::FilterConfig(
            "Butterworth design produced an unstable pole".into(),
        ));
    }

    let tol = 1e-10;
    let mut reals: Vec<f64> = digital
        .iter()
        .filter(|p| p.im.abs() <= tol)
        .map(|p| p.re)
        .collect();
    reals.sort_by(|a, b| a.total_cmp(b));
    let mut denominators: Vec<[f64; 3]> = digital
        .iter()
        .filter(|p| p.im > tol)
        .map(|p| [1.0, -2.0 * p.re, p.norm_sqr()])
        .collect();
    if reals.len() % 2 != 0 {
        return Err(AnalysisError::FilterConfig(
            "could not pair Butterworth poles into sections".into(),
        ));
    }
    for pair in reals.chunks(2) {
        denominators.push([1.0, -(pair[0] + pair[1]), pair[0] * pair[1]]);
    }
    if denominators.len() != order {
        return Err(AnalysisError::FilterConfig(format!(
            "expected {order} sections, paired {}",
            denominators.len()
        )));
    }

    // Each section carries one zero at z = 1 and one at z = -1.
    let sections = denominators
        .into_iter()
        .enumerate()
        .map(|(i, a)| {
            let g = if i == 0 { gain } else { 1.0 };
            Biquad {
                b: [g, 0.0, -g],
                a,
            }
        })
        .collect();
    Ok(sections)
}

fn odd_extend(data: &[f64], padlen: usize) -> Vec<f64> {
    let n = data.len();
    let first = data[0];
    let last = data[n - 1];
    let mut out = Vec::with_capacity(n + 2 * padlen);
    out.extend((1..=padlen).rev().map(|i| 2.0 * first - data[i]));
    out.extend_from_slice(data);
    out.extend((1..=padlen).map(|i| 2.0 * last - data[n - 1 - i]));
    out
}

/// Direct form II transposed cascade with initial delay lines `zi * x0`.
fn sosfilt(sections: &[Biquad], input: &[f64], zi: &[[f64; 2]], x0: f64) -> Vec<f64> {
    let mut signal = input.to_vec();
    for (section, init) in sections.iter().zip(zi) {
        let [b0, b1, b2] = section.b;
        let [_, a1, a2] = section.a;
        let mut z1 = init[0] * x0;
        let mut z2 = init[1] * x0;
        for v in signal.iter_mut() {
            let x = *v;
            let y = b0 * x + z1;
            z1 = b1 * x - a1 * y + z2;
            z2 = b2 * x - a2 * y;
            *v = y;
        }
    }
    signal
}
