use crate::{
    error::{AnalysisError, Result},
    signal::{Signal, MISSING},
};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Channel name the analysis expects.
pub const ABP_CHANNEL: &str = "ABP";
/// Digital value WFDB writes for an invalid sample.
pub const WFDB_INVALID_SAMPLE: i64 = -32768;
const DEFAULT_FS: f64 = 250.0;
/// WFDB's default when a signal line leaves the gain out or writes 0.
const DEFAULT_GAIN: f64 = 200.0;
const DEFAULT_UNITS: &str = "mmHg";

/// Naming fields of one signal line: what the data file is called, what the channel is,
/// and which physical unit it is recorded in.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalLabel {
    pub file_name: String,
    pub units: String,
    pub description: String,
}

/// Scan the signal lines of a `.hea` file for their labels.
///
/// Gain, baseline and sampling frequency are read from the decoded header instead.
pub fn signal_labels(text: &str) -> anyhow::Result<Vec<SignalLabel>> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));
    let record_line = lines.next().context("header has no record line")?;
    let n_signals: usize = record_line
        .split_whitespace()
        .nth(1)
        .context("record line lacks a signal count")?
        .parse()
        .with_context(|| format!("bad signal count in record line: {record_line}"))?;

    let labels: Vec<SignalLabel> = lines.take(n_signals).map(label_of).collect();
    if labels.len() != n_signals {
        anyhow::bail!(
            "header declares {} signals but lists {}",
            n_signals,
            labels.len()
        );
    }
    Ok(labels)
}

fn label_of(line: &str) -> SignalLabel {
    let fields: Vec<&str> = line.split_whitespace().collect();
    // gain[(baseline)][/units]
    let units = fields
        .get(2)
        .and_then(|token| token.split_once('/'))
        .map(|(_, units)| units.to_string())
        .unwrap_or_else(|| DEFAULT_UNITS.to_string());
    let description = if fields.len() > 8 {
        fields[8..].join(" ")
    } else {
        String::new()
    };
    SignalLabel {
        file_name: fields.first().map(|f| f.to_string()).unwrap_or_default(),
        units,
        description,
    }
}

/// Linear ADC-to-physical mapping of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelScale {
    /// ADC units per physical unit
    pub gain: f64,
    pub baseline: f64,
}

impl ChannelScale {
    pub fn new(gain: Option<f64>, baseline: f64) -> Self {
        let gain = gain.filter(|g| *g != 0.0).unwrap_or(DEFAULT_GAIN);
        Self { gain, baseline }
    }
}

/// `(digital - baseline) / gain`, with the invalid marker mapped to a gap.
pub fn to_physical(digital: &[i64], scale: &ChannelScale) -> Vec<f64> {
    digital
        .iter()
        .map(|&d| {
            if d == WFDB_INVALID_SAMPLE {
                MISSING
            } else {
                (d as f64 - scale.baseline) / scale.gain
            }
        })
        .collect()
}

fn read_labels(header_path: &Path) -> anyhow::Result<Vec<SignalLabel>> {
    let text = fs::read_to_string(header_path)
        .with_context(|| format!("failed to read {}", header_path.display()))?;
    signal_labels(&text).with_context(|| format!("parsing {}", header_path.display()))
}

fn acquisition(err: anyhow::Error) -> AnalysisError {
    AnalysisError::Acquisition(format!("{err:#}"))
}

/// Load the channel whose description is `channel` as a physical-unit signal.
pub fn load_channel(header_path: &Path, channel: &str) -> Result<Signal> {
    let record = header_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let labels = read_labels(header_path).map_err(acquisition)?;
    let idx = labels
        .iter()
        .position(|l| l.description == channel)
        .ok_or_else(|| {
            let names: Vec<&str> = labels.iter().map(|l| l.description.as_str()).collect();
            AnalysisError::Acquisition(format!(
                "no {channel} channel in {record} (have {names:?})"
            ))
        })?;
    let label = &labels[idx];
    let dir = header_path.parent().unwrap_or_else(|| Path::new("."));
    let data_path = dir.join(&label.file_name);
    if !data_path.exists() {
        return Err(AnalysisError::Acquisition(format!(
            "signal file {} not found",
            data_path.display()
        )));
    }

    let (header, signals) = wfdb_rust::parse_wfdb(header_path);
    let (spec, raw) = match (header.signal_specs.get(idx), signals.get(idx)) {
        (Some(spec), Some(raw)) => (spec, raw),
        _ => {
            return Err(AnalysisError::Acquisition(format!(
                "record {record} decoded {} signals, expected channel {idx}",
                signals.len()
            )))
        }
    };
    let scale = ChannelScale::new(
        spec.adc_gain.map(|g| g as f64),
        spec.baseline.or(spec.adc_zero).unwrap_or(0) as f64,
    );
    let fs = header
        .record
        .sampling_frequency
        .map(|f| f as f64)
        .unwrap_or(DEFAULT_FS);

    let digital: Vec<i64> = raw.iter().map(|&s| s as i64).collect();
    let data = to_physical(&digital, &scale);
    let invalid = data.iter().filter(|v| v.is_nan()).count();
    log::info!(
        "loaded {} channel of {}: {} samples at {} Hz ({} invalid)",
        channel,
        record,
        data.len(),
        fs,
        invalid
    );
    Signal::new(data, fs, label.units.clone())
}

/// Load the `ABP` channel of a record.
pub fn load_abp_record(header_path: &Path) -> Result<Signal> {
    load_channel(header_path, ABP_CHANNEL)
}

/// Header path for `record` stored in `dir`.
pub fn header_path(dir: &Path, record: &str) -> PathBuf {
    dir.join(format!("{record}.hea"))
}
