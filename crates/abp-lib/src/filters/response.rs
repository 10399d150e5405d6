use super::{butterworth::ButterworthBandpass, convolve, FilterConfig};
use crate::error::Result;
use realfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_2, PI};

/// Number of evaluation points across `[0, nyquist)`.
pub const RESPONSE_POINTS: usize = 8000;
const DB_FLOOR: f64 = 1e-6;

/// Vertical guide drawn on a response chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
    pub freq_hz: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterResponse {
    /// Magnitude response in dB.
    Frequency {
        title: String,
        freqs_hz: Vec<f64>,
        magnitude_db: Vec<f64>,
        markers: Vec<Marker>,
    },
    /// Kernel shape in the time domain, peak normalised to one.
    Kernel {
        title: String,
        times_s: Vec<f64>,
        amplitude: Vec<f64>,
    },
}

/// Describe how `config` shapes a signal sampled at `fs`.
pub fn filter_response(config: &FilterConfig, fs: f64) -> Result<FilterResponse> {
    config.validate(fs)?;
    let nyquist = 0.5 * fs;
    let freqs_hz: Vec<f64> = (0..RESPONSE_POINTS)
        .map(|k| k as f64 * nyquist / RESPONSE_POINTS as f64)
        .collect();
    let response = match *config {
        FilterConfig::Butterworth {
            lowcut_hz,
            highcut_hz,
            order,
        } => {
            let filter = ButterworthBandpass::design(lowcut_hz, highcut_hz, order, fs)?;
            let magnitude_db = freqs_hz
                .iter()
                .map(|&f| to_db(filter.response_at(f).norm()))
                .collect();
            FilterResponse::Frequency {
                title: "Butterworth Filter Frequency Response".into(),
                freqs_hz,
                magnitude_db,
                markers: vec![
                    Marker {
                        label: "Lowcut".into(),
                        freq_hz: filter.low_hz,
                    },
                    Marker {
                        label: "Highcut".into(),
                        freq_hz: filter.high_hz,
                    },
                ],
            }
        }
        FilterConfig::RunningMean {
            window_size_samples,
        } => {
            let kernel = convolve::running_mean_kernel(window_size_samples)?;
            let magnitude_db = freqs_hz
                .iter()
                .map(|&f| to_db(fir_response(&kernel, 2.0 * PI * f / fs).norm()))
                .collect();
            FilterResponse::Frequency {
                title: format!("Running Mean Filter (window={window_size_samples}) Freq Response"),
                freqs_hz,
                magnitude_db,
                markers: vec![Marker {
                    label: "Approx Cutoff".into(),
                    freq_hz: fs / (2.0 * window_size_samples as f64),
                }],
            }
        }
        FilterConfig::Gaussian { fwhm_ms } => {
            let w = fwhm_ms / 1000.0;
            let step = 0.01 * w;
            let times_s: Vec<f64> = (-300..=300).map(|k| k as f64 * step).collect();
            let amplitude = times_s
                .iter()
                .map(|t| (-4.0 * LN_2 * t * t / (w * w)).exp())
                .collect();
            FilterResponse::Kernel {
                title: format!("Gaussian Filter Time Response (FWHM={fwhm_ms} ms)"),
                times_s,
                amplitude,
            }
        }
    };
    Ok(response)
}

fn to_db(magnitude: f64) -> f64 {
    20.0 * (magnitude + DB_FLOOR).log10()
}

fn fir_response(taps: &[f64], omega: f64) -> Complex<f64> {
    taps.iter()
        .enumerate()
        .map(|(k, &h)| Complex::from_polar(h, -omega * k as f64))
        .fold(Complex::new(0.0, 0.0), |acc, c| acc + c)
}
