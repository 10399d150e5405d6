use crate::{
    error::{AnalysisError, Result},
    signal::{is_missing, Signal, MISSING},
};

/// Check value-range bounds before masking.
pub fn validate_range(min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(AnalysisError::Range(format!(
            "bounds must be finite, got [{min}, {max}]"
        )));
    }
    if min >= max {
        return Err(AnalysisError::Range(format!(
            "min ({min}) must be below max ({max})"
        )));
    }
    Ok(())
}

/// Mask samples outside `[min, max]` as missing. Length and in-range samples are preserved.
pub fn apply_range(signal: &Signal, min: f64, max: f64) -> Result<Signal> {
    validate_range(min, max)?;
    let data: Vec<f64> = signal
        .data
        .iter()
        .map(|&v| if v >= min && v <= max { v } else { MISSING })
        .collect();
    let masked = signal.with_data(data);
    if masked.valid_count() == 0 {
        return Err(AnalysisError::Range(format!(
            "no samples inside [{min}, {max}]"
        )));
    }
    Ok(masked)
}

/// Linearly interpolate gaps from their valid neighbours.
///
/// Leading and trailing gaps take the nearest valid value. A signal without any
/// valid sample is returned unchanged.
pub fn interpolate_gaps(signal: &Signal) -> Signal {
    let data = &signal.data;
    let valid: Vec<usize> = (0..data.len()).filter(|&i| !is_missing(data[i])).collect();
    let (Some(&first), Some(&last)) = (valid.first(), valid.last()) else {
        log::warn!("signal has no valid samples; gaps left in place");
        return signal.clone();
    };
    let mut out = data.clone();
    for v in out.iter_mut().take(first) {
        *v = data[first];
    }
    for v in out.iter_mut().skip(last + 1) {
        *v = data[last];
    }
    for pair in valid.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let span = (b - a) as f64;
        for i in a + 1..b {
            let frac = (i - a) as f64 / span;
            out[i] = data[a] + frac * (data[b] - data[a]);
        }
    }
    signal.with_data(out)
}
