use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Gap marker for samples removed by range filtering or flagged invalid at acquisition.
pub const MISSING: f64 = f64::NAN;

/// Returns true when `value` is the gap marker.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Uniformly sampled waveform with its physical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalRepr")]
pub struct Signal {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples; gaps are serialized as `null`
    #[serde(with = "gap_samples")]
    pub data: Vec<f64>,
    /// Physical unit, e.g. "mmHg"
    pub unit: String,
}

#[derive(Deserialize)]
struct SignalRepr {
    fs: f64,
    #[serde(with = "gap_samples")]
    data: Vec<f64>,
    unit: String,
}

impl TryFrom<SignalRepr> for Signal {
    type Error = AnalysisError;

    fn try_from(repr: SignalRepr) -> Result<Self> {
        Signal::new(repr.data, repr.fs, repr.unit)
    }
}

/// Acquisition error unless `fs` is a finite positive rate.
pub fn validate_fs(fs: f64) -> Result<()> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(AnalysisError::Acquisition(format!(
            "sampling rate must be positive, got {fs}"
        )));
    }
    Ok(())
}

impl Signal {
    /// Build a signal, rejecting non-positive or non-finite sampling rates.
    pub fn new(data: Vec<f64>, fs: f64, unit: impl Into<String>) -> Result<Self> {
        validate_fs(fs)?;
        Ok(Self {
            fs,
            data,
            unit: unit.into(),
        })
    }

    /// Same sampling rate and unit, new samples.
    pub fn with_data(&self, data: Vec<f64>) -> Self {
        Self {
            fs: self.fs,
            data,
            unit: self.unit.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 / self.fs
    }

    /// Non-missing samples in order.
    pub fn valid_samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(|v| !is_missing(*v))
    }

    pub fn valid_count(&self) -> usize {
        self.valid_samples().count()
    }

    pub fn missing_count(&self) -> usize {
        self.len() - self.valid_count()
    }

    pub fn min_valid(&self) -> Option<f64> {
        self.valid_samples().reduce(f64::min)
    }

    pub fn max_valid(&self) -> Option<f64> {
        self.valid_samples().reduce(f64::max)
    }
}

/// Heartbeat locations as strictly increasing sample indices into one signal variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakSet {
    pub indices: Vec<usize>,
}

impl PeakSet {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    /// Consecutive peak differences divided by `fs`; empty with fewer than two peaks.
    pub fn from_peaks(peaks: &PeakSet, fs: f64) -> Self {
        let rr = peaks
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / fs)
            .collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }
}

/// Serde adapter mapping the gap marker to `null` and back.
mod gap_samples {
    use super::{is_missing, MISSING};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let values: Vec<Option<f64>> = data
            .iter()
            .map(|&v| if is_missing(v) { None } else { Some(v) })
            .collect();
        values.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(MISSING)).collect())
    }
}
