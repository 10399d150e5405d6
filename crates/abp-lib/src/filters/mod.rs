pub mod butterworth;
pub mod convolve;
pub mod response;

use crate::{
    error::{AnalysisError, Result},
    signal::Signal,
};
use butterworth::ButterworthBandpass;
use serde::{Deserialize, Serialize};

/// The denoising strategy applied to the range-masked signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Zero-phase Butterworth bandpass.
    Butterworth {
        lowcut_hz: f64,
        highcut_hz: f64,
        order: usize,
    },
    /// Centered moving average.
    RunningMean { window_size_samples: usize },
    /// Gaussian smoothing parameterised by full width at half maximum.
    Gaussian { fwhm_ms: f64 },
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::butterworth_default()
    }
}

impl FilterConfig {
    pub fn butterworth_default() -> Self {
        FilterConfig::Butterworth {
            lowcut_hz: 0.3,
            highcut_hz: 8.0,
            order: 4,
        }
    }

    pub fn running_mean_default() -> Self {
        FilterConfig::RunningMean {
            window_size_samples: 5,
        }
    }

    pub fn gaussian_default() -> Self {
        FilterConfig::Gaussian { fwhm_ms: 100.0 }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterConfig::Butterworth { .. } => "butterworth",
            FilterConfig::RunningMean { .. } => "running_mean",
            FilterConfig::Gaussian { .. } => "gaussian",
        }
    }

    /// Parameter checks that do not need the signal itself.
    pub fn validate(&self, fs: f64) -> Result<()> {
        if !fs.is_finite() || fs <= 0.0 {
            return Err(AnalysisError::FilterConfig(format!(
                "sampling rate must be positive, got {fs}"
            )));
        }
        match *self {
            FilterConfig::Butterworth {
                lowcut_hz,
                highcut_hz,
                order,
            } => ButterworthBandpass::design(lowcut_hz, highcut_hz, order, fs).map(|_| ()),
            FilterConfig::RunningMean {
                window_size_samples,
            } => convolve::running_mean_kernel(window_size_samples).map(|_| ()),
            FilterConfig::Gaussian { fwhm_ms } => convolve::gaussian_kernel(fwhm_ms, fs).map(|_| ()),
        }
    }

    /// Filter `signal`, returning a new signal of identical length, rate and unit.
    pub fn apply(&self, signal: &Signal) -> Result<Signal> {
        let fs = signal.fs;
        self.validate(fs)?;
        let gaps = signal.missing_count();
        if gaps > 0 {
            log::warn!(
                "{} filter input has {} missing samples; output around them is undefined",
                self.name(),
                gaps
            );
        }
        let data = match *self {
            FilterConfig::Butterworth {
                lowcut_hz,
                highcut_hz,
                order,
            } => {
                let filter = ButterworthBandpass::design(lowcut_hz, highcut_hz, order, fs)?;
                log::debug!(
                    "butterworth order {} band {:.3}-{:.3} Hz",
                    order,
                    filter.low_hz,
                    filter.high_hz
                );
                filter.filtfilt(&signal.data)?
            }
            FilterConfig::RunningMean {
                window_size_samples,
            } => convolve::running_mean(&signal.data, window_size_samples)?,
            FilterConfig::Gaussian { fwhm_ms } => {
                convolve::gaussian_smooth(&signal.data, fwhm_ms, fs)?
            }
        };
        if data.len() != signal.len() {
            return Err(AnalysisError::FilterExecution(format!(
                "{} filter changed length from {} to {}",
                self.name(),
                signal.len(),
                data.len()
            )));
        }
        Ok(signal.with_data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_signal(fs: f64, seconds: f64) -> Signal {
        let n = (fs * seconds) as usize;
        let data = (0..n)
            .map(|i| {
                let t = i as f64 / fs;
                let phase = (t % 0.8) - 0.2;
                90.0 + 35.0 * (-(phase * phase) / (2.0 * 0.05f64.powi(2))).exp()
            })
            .collect();
        Signal::new(data, fs, "mmHg").unwrap()
    }

    #[test]
    fn every_strategy_preserves_length_rate_and_unit() {
        let signal = pulse_signal(125.0, 10.0);
        for config in [
            FilterConfig::butterworth_default(),
            FilterConfig::running_mean_default(),
            FilterConfig::gaussian_default(),
        ] {
            let out = config.apply(&signal).unwrap();
            assert_eq!(out.len(), signal.len(), "{}", config.name());
            assert_eq!(out.fs, signal.fs);
            assert_eq!(out.unit, "mmHg");
            assert!(out.data.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn reapplying_changes_the_result() {
        let signal = pulse_signal(125.0, 10.0);
        for config in [
            FilterConfig::butterworth_default(),
            FilterConfig::running_mean_default(),
            FilterConfig::gaussian_default(),
        ] {
            let once = config.apply(&signal).unwrap();
            let twice = config.apply(&once).unwrap();
            let max_diff = once
                .data
                .iter()
                .zip(&twice.data)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            assert!(max_diff > 1e-3, "{} looked idempotent", config.name());
        }
    }

    #[test]
    fn invalid_parameters_are_config_errors() {
        let signal = pulse_signal(125.0, 2.0);
        let bad = [
            FilterConfig::RunningMean {
                window_size_samples: 0,
            },
            FilterConfig::Gaussian { fwhm_ms: 0.0 },
            FilterConfig::Butterworth {
                lowcut_hz: 70.0,
                highcut_hz: 80.0,
                order: 4,
            },
            FilterConfig::Butterworth {
                lowcut_hz: 0.5,
                highcut_hz: 8.0,
                order: 0,
            },
        ];
        for config in bad {
            assert!(matches!(
                config.apply(&signal),
                Err(AnalysisError::FilterConfig(_))
            ));
        }
    }

    #[test]
    fn short_signal_is_an_execution_error() {
        let signal = Signal::new(vec![100.0; 20], 125.0, "mmHg").unwrap();
        assert!(matches!(
            FilterConfig::butterworth_default().apply(&signal),
            Err(AnalysisError::FilterExecution(_))
        ));
    }

    #[test]
    fn config_uses_tagged_representation() {
        let js = serde_json::to_string(&FilterConfig::gaussian_default()).unwrap();
        assert_eq!(js, r#"{"type":"gaussian","fwhm_ms":100.0}"#);
        let parsed: FilterConfig =
            serde_json::from_str(r#"{"type":"running_mean","window_size_samples":9}"#).unwrap();
        assert_eq!(
            parsed,
            FilterConfig::RunningMean {
                window_size_samples: 9
            }
        );
    }
}
