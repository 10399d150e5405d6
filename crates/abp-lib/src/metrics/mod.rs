pub mod hrv;
pub mod pressure;
pub mod sqi;

use crate::{
    error::{AnalysisError, Result},
    signal::{PeakSet, RRSeries, Signal},
};
use serde::{Deserialize, Serialize};

/// Per-variant clinical summary. `Default` is the "unavailable" state: no beats, zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rr: RRSeries,
    /// Instantaneous heart rate per RR interval (bpm)
    pub hr_bpm: Vec<f64>,
    /// RMSSD (ms)
    pub hrv_ms: f64,
    pub sqi: f64,
    /// Pulse pressure in the signal's unit
    pub pp: f64,
}

impl Metrics {
    pub fn mean_hr(&self) -> Option<f64> {
        if self.hr_bpm.is_empty() {
            return None;
        }
        Some(self.hr_bpm.iter().sum::<f64>() / self.hr_bpm.len() as f64)
    }

    /// Display rows `(label, value)` for a metrics panel. Non-positive values show as `N/A`.
    pub fn summary_lines(&self, unit: &str) -> Vec<(String, String)> {
        vec![
            ("Heart Rate (bpm)".into(), format_metric(self.mean_hr(), "bpm")),
            (
                "Heart Rate Variability (RMSSD) (ms)".into(),
                format_metric(positive(self.hrv_ms), "ms"),
            ),
            (format!("Pulse Pressure ({unit})"), format_metric(positive(self.pp), unit)),
            (
                "Signal Quality Index (SQI)".into(),
                format_metric(positive(self.sqi), ""),
            ),
        ]
    }
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

/// `"{value:.2} {unit}"`, or `"N/A"` for absent and NaN values. An empty unit is omitted.
pub fn format_metric(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if !v.is_nan() => {
            if unit.is_empty() {
                format!("{v:.2}")
            } else {
                format!("{v:.2} {unit}")
            }
        }
        _ => "N/A".to_string(),
    }
}

/// Derive HR, HRV, SQI and pulse pressure for one signal variant and its own peaks.
pub fn compute_metrics(signal: &Signal, peaks: &PeakSet) -> Result<Metrics> {
    let rr = RRSeries::from_peaks(peaks, signal.fs);
    let hr_bpm = hrv::heart_rate(&rr);
    let hrv_ms = hrv::rmssd_ms(&rr);
    let sqi = sqi::signal_quality_index(signal);
    let pp = pressure::pulse_pressure(signal, peaks)?;

    if let Some(bad) = rr.rr.iter().chain(&hr_bpm).find(|v| !v.is_finite()) {
        return Err(AnalysisError::Metrics(format!(
            "non-finite RR/HR value {bad}"
        )));
    }
    for (name, value) in [("HRV", hrv_ms), ("SQI", sqi), ("pulse pressure", pp)] {
        if !value.is_finite() {
            return Err(AnalysisError::Metrics(format!("{name} is {value}")));
        }
    }
    log::debug!(
        "{} beats, hrv {:.2} ms, sqi {:.3}, pp {:.2} {}",
        peaks.len(),
        hrv_ms,
        sqi,
        pp,
        signal.unit
    );
    Ok(Metrics {
        rr,
        hr_bpm,
        hrv_ms,
        sqi,
        pp,
    })
}
