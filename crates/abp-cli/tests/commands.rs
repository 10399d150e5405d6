use abp_lib::{
    filters::response::FilterResponse,
    plot::{Figure, Series},
    spectrum::Spectrum,
};
use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::{error::Error, f64::consts::PI, fs};
use tempfile::tempdir;

#[derive(Deserialize)]
struct SpectrumOutput {
    original: Spectrum,
    filtered: Option<Spectrum>,
}

fn pulse_samples(fs: f64, seconds: f64) -> Vec<String> {
    let n = (fs * seconds) as usize;
    (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            let phase = t % 1.0;
            let v = 90.0 + 30.0 * (-0.5 * ((phase - 0.3) / 0.06).powi(2)).exp()
                + 2.0 * (2.0 * PI * 0.25 * t).sin();
            format!("{v:.4}")
        })
        .collect()
}

#[test]
fn spectrum_peaks_at_heart_rate() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args(["spectrum", "--fs", "100", "--freq-min", "0.5", "--freq-max", "20"])
        .write_stdin(pulse_samples(100.0, 20.0).join("\n"));
    let output = cmd.assert().success().get_output().stdout.clone();
    let out: SpectrumOutput = serde_json::from_slice(&output)?;
    assert!(out.original.freqs_hz.iter().all(|f| (0.5..=20.0).contains(f)));
    let dominant = out.original.dominant_frequency().unwrap();
    assert!((dominant - 1.0).abs() < 0.06, "dominant {dominant}");
    let filtered = out.filtered.expect("filtered spectrum");
    assert_eq!(filtered.len(), out.original.len());
    Ok(())
}

#[test]
fn spectrum_defaults_to_display_band() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args(["spectrum", "--fs", "100"])
        .write_stdin(pulse_samples(100.0, 20.0).join("\n"));
    let output = cmd.assert().success().get_output().stdout.clone();
    let out: SpectrumOutput = serde_json::from_slice(&output)?;
    assert_eq!(out.original.freqs_hz.first(), Some(&0.0));
    let top = out.original.freqs_hz.last().copied().unwrap();
    assert!(top <= 20.0 && top > 19.9, "top bin {top}");
    Ok(())
}

#[test]
fn spectrum_rejects_inverted_band() {
    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args(["spectrum", "--fs", "100", "--freq-min", "10", "--freq-max", "5"])
        .write_stdin(pulse_samples(100.0, 5.0).join("\n"));
    cmd.assert().failure();
}

#[test]
fn butterworth_response_json() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args(["filter-response", "--fs", "125", "--lowcut-hz", "0.5", "--highcut-hz", "8"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let response: FilterResponse = serde_json::from_slice(&output)?;
    let FilterResponse::Frequency {
        freqs_hz,
        magnitude_db,
        markers,
        ..
    } = response
    else {
        panic!("expected frequency response");
    };
    assert_eq!(freqs_hz.len(), 8000);
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].freq_hz, 0.5);
    let near_centre = freqs_hz.iter().position(|&f| f >= 2.0).unwrap();
    assert!(magnitude_db[near_centre].abs() < 0.5);
    Ok(())
}

#[test]
fn gaussian_response_is_kernel_shape() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args(["filter-response", "--filter", "gaussian", "--fwhm-ms", "80"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(json["kind"], "kernel");
    assert_eq!(json["amplitude"].as_array().unwrap().len(), 601);
    Ok(())
}

#[test]
fn invalid_filter_order_is_rejected() {
    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args(["filter-response", "--order", "11"]);
    let assert = cmd.assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("invalid filter configuration"));
}

#[test]
fn time_figure_is_decimated_with_peak_markers() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("abp.txt");
    fs::write(&input, pulse_samples(125.0, 30.0).join("\n"))?;

    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args([
        "figure",
        "--kind",
        "time",
        "--input",
        input.to_str().unwrap(),
        "--max-points",
        "500",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let fig: Figure = serde_json::from_slice(&output)?;
    assert_eq!(fig.title.as_deref(), Some("Time-Domain Analysis"));
    let lines: Vec<_> = fig
        .series
        .iter()
        .filter_map(|s| match s {
            Series::Line(line) => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.points.len() == 500));
    let markers = fig
        .series
        .iter()
        .filter(|s| matches!(s, Series::Markers(_)))
        .count();
    assert_eq!(markers, 2);
    Ok(())
}

#[test]
fn histogram_figure_has_fifty_bins() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args(["figure", "--kind", "histogram"])
        .write_stdin(pulse_samples(125.0, 10.0).join("\n"));
    let output = cmd.assert().success().get_output().stdout.clone();
    let fig: Figure = serde_json::from_slice(&output)?;
    let Series::Bars(bars) = &fig.series[0] else {
        panic!("expected bars");
    };
    assert_eq!(bars.counts.len(), 50);
    assert_eq!(bars.counts.iter().sum::<usize>(), 1250);
    Ok(())
}

#[test]
fn response_figure_needs_no_signal() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("abp");
    cmd.args(["figure", "--kind", "response", "--fs", "250"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let fig: Figure = serde_json::from_slice(&output)?;
    assert!(fig
        .series
        .iter()
        .any(|s| matches!(s, Series::VLine(v) if v.name == "Highcut")));
    Ok(())
}
