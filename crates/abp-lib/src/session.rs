use crate::{
    config::AnalysisConfig,
    detectors::detect_peaks,
    error::Result,
    filters::FilterConfig,
    metrics::{compute_metrics, Metrics},
    range,
    signal::{validate_fs, PeakSet, Signal},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything one successful pipeline run publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Range-masked raw signal
    pub original: Signal,
    pub filtered: Option<Signal>,
    pub peaks_original: PeakSet,
    pub peaks_filtered: PeakSet,
    pub metrics_original: Metrics,
    pub metrics_filtered: Option<Metrics>,
    pub filter: FilterConfig,
}

/// Run the whole chain on `raw`: range mask, optional gap fill, filter, peaks and metrics
/// for both variants. The first failing stage's error is returned unchanged.
pub fn run_pipeline(raw: &Signal, config: &AnalysisConfig) -> Result<AnalysisResult> {
    log::info!(
        "analysing {} samples at {} Hz with {} filter",
        raw.len(),
        raw.fs,
        config.filter.name()
    );
    validate_fs(raw.fs)?;
    range::validate_range(config.range_min, config.range_max)?;
    let original = range::apply_range(raw, config.range_min, config.range_max)?;
    log::debug!(
        "range [{}, {}] masked {} samples",
        config.range_min,
        config.range_max,
        original.missing_count()
    );

    let filter_input = if config.interpolate_gaps {
        range::interpolate_gaps(&original)
    } else {
        original.clone()
    };
    config.filter.validate(original.fs)?;
    let filtered = Some(config.filter.apply(&filter_input)?);

    let peaks_original = detect_peaks(&original, &config.peaks)?;
    let peaks_filtered = match &filtered {
        Some(signal) => detect_peaks(signal, &config.peaks)?,
        None => PeakSet::empty(),
    };
    log::debug!(
        "peaks: {} original, {} filtered",
        peaks_original.len(),
        peaks_filtered.len()
    );

    let metrics_original = compute_metrics(&original, &peaks_original)?;
    let metrics_filtered = match &filtered {
        Some(signal) => Some(compute_metrics(signal, &peaks_filtered)?),
        None => None,
    };

    Ok(AnalysisResult {
        original,
        filtered,
        peaks_original,
        peaks_filtered,
        metrics_original,
        metrics_filtered,
        filter: config.filter,
    })
}

/// One loaded record plus the last successfully published analysis of it.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    raw: Arc<Signal>,
    latest: Option<AnalysisResult>,
}

impl AnalysisSession {
    pub fn new(raw: Signal) -> Self {
        Self {
            raw: Arc::new(raw),
            latest: None,
        }
    }

    pub fn raw(&self) -> &Arc<Signal> {
        &self.raw
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.latest.as_ref()
    }

    /// Re-run the pipeline with `config`. On error the previous result stays in place.
    pub fn apply(&mut self, config: &AnalysisConfig) -> Result<&AnalysisResult> {
        let result = run_pipeline(&self.raw, config)?;
        log::info!(
            "published run: {} / {} peaks",
            result.peaks_original.len(),
            result.peaks_filtered.len()
        );
        Ok(self.latest.insert(result))
    }

    /// Swap in a newly loaded record. Results derived from the old record are dropped.
    pub fn replace_record(&mut self, raw: Signal) {
        self.raw = Arc::new(raw);
        self.latest = None;
    }

    /// Accept a result computed elsewhere if it was derived from this session's current raw
    /// signal. Returns whether it was published.
    pub fn publish(&mut self, source: &Arc<Signal>, result: AnalysisResult) -> bool {
        if !Arc::ptr_eq(source, &self.raw) {
            log::warn!("discarding result computed from a previous record");
            return false;
        }
        self.latest = Some(result);
        true
    }
}
