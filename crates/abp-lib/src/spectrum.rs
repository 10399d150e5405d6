use crate::signal::Signal;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};

/// Default display band (Hz)
pub const DEFAULT_FREQ_MIN: f64 = 0.0;
pub const DEFAULT_FREQ_MAX: f64 = 20.0;

/// Single-sided amplitude spectrum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub freqs_hz: Vec<f64>,
    pub magnitude: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.freqs_hz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs_hz.is_empty()
    }

    /// Bins with `fmin <= f <= fmax`.
    pub fn band(&self, fmin: f64, fmax: f64) -> Spectrum {
        let (freqs_hz, magnitude) = self
            .freqs_hz
            .iter()
            .zip(&self.magnitude)
            .filter(|(f, _)| **f >= fmin && **f <= fmax)
            .map(|(&f, &m)| (f, m))
            .unzip();
        Spectrum {
            freqs_hz,
            magnitude,
        }
    }

    /// Frequency of the largest bin above DC.
    pub fn dominant_frequency(&self) -> Option<f64> {
        self.freqs_hz
            .iter()
            .zip(&self.magnitude)
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&f, _)| f)
    }
}

/// FFT amplitude spectrum of the valid samples, `2/N |X_k|` at `k fs / N` for `k < N/2`.
///
/// Gaps are dropped before the transform. Empty with fewer than two valid samples.
pub fn magnitude_spectrum(signal: &Signal) -> Spectrum {
    let mut samples: Vec<f64> = signal.valid_samples().collect();
    let n = samples.len();
    if n < 2 {
        log::warn!("{n} valid samples; spectrum left empty");
        return Spectrum::default();
    }
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(n);
    let mut output = r2c.make_output_vec();
    if let Err(e) = r2c.process(&mut samples, &mut output) {
        log::warn!("fft failed: {e}");
        return Spectrum::default();
    }
    let half = n / 2;
    let scale = 2.0 / n as f64;
    let freqs_hz = (0..half).map(|k| k as f64 * signal.fs / n as f64).collect();
    let magnitude = output[..half].iter().map(|c| scale * c.norm()).collect();
    Spectrum {
        freqs_hz,
        magnitude,
    }
}
