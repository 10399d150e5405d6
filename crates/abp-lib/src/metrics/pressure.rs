use crate::{
    error::{AnalysisError, Result},
    signal::{is_missing, PeakSet, Signal},
};

/// Pulse pressure: mean of the signal at the peaks minus the minimum valid sample.
///
/// Zero when there are no peaks or nothing valid to measure against.
pub fn pulse_pressure(signal: &Signal, peaks: &PeakSet) -> Result<f64> {
    if peaks.is_empty() {
        return Ok(0.0);
    }
    if let Some(&bad) = peaks.indices.iter().find(|&&i| i >= signal.len()) {
        return Err(AnalysisError::Metrics(format!(
            "peak index {bad} outside signal of {} samples",
            signal.len()
        )));
    }
    let heights: Vec<f64> = peaks
        .indices
        .iter()
        .map(|&i| signal.data[i])
        .filter(|v| !is_missing(*v))
        .collect();
    let Some(min) = signal.min_valid() else {
        return Ok(0.0);
    };
    if heights.is_empty() {
        return Ok(0.0);
    }
    let mean = heights.iter().sum::<f64>() / heights.len() as f64;
    Ok(mean - min)
}
