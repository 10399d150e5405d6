use crate::{
    filters::response::FilterResponse,
    session::AnalysisResult,
    signal::{PeakSet, Signal},
    spectrum::Spectrum,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_POINTS: usize = 5000;
pub const HISTOGRAM_BINS: usize = 50;

const ORIGINAL: Color = Color(0x1F4FD8);
const FILTERED: Color = Color(0x2CA02C);
const ORIGINAL_PEAKS: Color = Color(0xD62728);
const FILTERED_PEAKS: Color = Color(0xFF7F0E);
const GUIDE: Color = Color(0x7F7F7F);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

impl Axis {
    fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

impl Style {
    fn solid(color: Color, width: f32) -> Self {
        Self {
            width,
            dash: None,
            color,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    /// `[x, y]`; gaps are `null` in JSON and break the line
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub size: f32,
    pub color: Color,
}

/// Histogram bars: `counts[i]` samples fell in `[edges[i], edges[i + 1])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub name: String,
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VLine {
    pub name: String,
    pub x: f64,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
    Bars(BarSeries),
    VLine(VLine),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    fn with_axes(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x = Axis::labelled(x);
        self.y = Axis::labelled(y);
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }
}

/// Keep at most `max_points` evenly strided points.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

fn signal_line(name: &str, signal: &Signal, max_points: usize, color: Color) -> Series {
    let points: Vec<[f64; 2]> = signal
        .data
        .iter()
        .enumerate()
        .map(|(i, &v)| [signal.time_at(i), v])
        .collect();
    Series::Line(LineSeries {
        name: name.into(),
        points: decimate_points(&points, max_points),
        style: Style::solid(color, 1.4),
    })
}

fn peak_markers(name: &str, signal: &Signal, peaks: &PeakSet, color: Color) -> Option<Series> {
    let points: Vec<[f64; 2]> = peaks
        .indices
        .iter()
        .filter_map(|&i| signal.data.get(i).map(|&v| [signal.time_at(i), v]))
        .collect();
    (!points.is_empty()).then(|| {
        Series::Markers(MarkerSeries {
            name: name.into(),
            points,
            size: 5.0,
            color,
        })
    })
}

/// Original and filtered traces over time with their detected peaks. Peaks are never
/// decimated.
pub fn time_domain_figure(result: &AnalysisResult, max_points: usize) -> Figure {
    let original = &result.original;
    let mut fig = Figure::new(Some("Time-Domain Analysis".into()))
        .with_axes("Time (s)", format!("Amplitude ({})", original.unit));
    fig.add_series(signal_line("Original", original, max_points, ORIGINAL));
    if let Some(markers) =
        peak_markers("Orig Peaks", original, &result.peaks_original, ORIGINAL_PEAKS)
    {
        fig.add_series(markers);
    }
    if let Some(filtered) = &result.filtered {
        fig.add_series(signal_line("Filtered", filtered, max_points, FILTERED));
        if let Some(markers) =
            peak_markers("Filt Peaks", filtered, &result.peaks_filtered, FILTERED_PEAKS)
        {
            fig.add_series(markers);
        }
    }
    fig
}

fn spectrum_line(name: &str, spectrum: &Spectrum, max_points: usize, color: Color) -> Series {
    let points: Vec<[f64; 2]> = spectrum
        .freqs_hz
        .iter()
        .zip(&spectrum.magnitude)
        .map(|(&f, &m)| [f, m])
        .collect();
    Series::Line(LineSeries {
        name: name.into(),
        points: decimate_points(&points, max_points),
        style: Style::solid(color, 1.4),
    })
}

pub fn spectrum_figure(original: &Spectrum, filtered: Option<&Spectrum>, max_points: usize) -> Figure {
    let mut fig = Figure::new(Some("Frequency-Domain Analysis".into()))
        .with_axes("Frequency (Hz)", "Magnitude");
    if !original.is_empty() {
        fig.add_series(spectrum_line("Original", original, max_points, ORIGINAL));
    }
    if let Some(spec) = filtered.filter(|s| !s.is_empty()) {
        fig.add_series(spectrum_line("Filtered", spec, max_points, FILTERED));
    }
    fig
}

/// Equal-width histogram over the valid samples. A constant signal gets one unit-wide span.
pub fn histogram(signal: &Signal, bins: usize) -> (Vec<f64>, Vec<usize>) {
    let (Some(lo), Some(hi)) = (signal.min_valid(), signal.max_valid()) else {
        return (Vec::new(), Vec::new());
    };
    let bins = bins.max(1);
    let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
    let width = (hi - lo) / bins as f64;
    let edges = (0..=bins).map(|i| lo + i as f64 * width).collect();
    let mut counts = vec![0usize; bins];
    for v in signal.valid_samples() {
        let bin = (((v - lo) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    (edges, counts)
}

fn histogram_bars(name: &str, signal: &Signal, bins: usize, color: Color) -> Series {
    let (edges, counts) = histogram(signal, bins);
    Series::Bars(BarSeries {
        name: name.into(),
        edges,
        counts,
        color,
    })
}

pub fn histogram_figure(result: &AnalysisResult, bins: usize) -> Figure {
    let mut fig = Figure::new(Some("ABP Histogram".into()))
        .with_axes(format!("Amplitude ({})", result.original.unit), "Count");
    fig.add_series(histogram_bars("Original", &result.original, bins, ORIGINAL));
    if let Some(filtered) = &result.filtered {
        fig.add_series(histogram_bars("Filtered", filtered, bins, FILTERED));
    }
    fig
}

pub fn response_figure(response: &FilterResponse, max_points: usize) -> Figure {
    match response {
        FilterResponse::Frequency {
            title,
            freqs_hz,
            magnitude_db,
            markers,
        } => {
            let points: Vec<[f64; 2]> = freqs_hz
                .iter()
                .zip(magnitude_db)
                .map(|(&f, &db)| [f, db])
                .collect();
            let mut fig = Figure::new(Some(title.clone()))
                .with_axes("Frequency (Hz)", "Magnitude (dB)");
            fig.add_series(Series::Line(LineSeries {
                name: "Response".into(),
                points: decimate_points(&points, max_points),
                style: Style::solid(ORIGINAL, 2.0),
            }));
            for marker in markers {
                fig.add_series(Series::VLine(VLine {
                    name: marker.label.clone(),
                    x: marker.freq_hz,
                    style: Style {
                        width: 1.0,
                        dash: Some([4.0, 4.0]),
                        color: GUIDE,
                    },
                }));
            }
            fig
        }
        FilterResponse::Kernel {
            title,
            times_s,
            amplitude,
        } => {
            let points: Vec<[f64; 2]> = times_s
                .iter()
                .zip(amplitude)
                .map(|(&t, &a)| [t, a])
                .collect();
            let mut fig = Figure::new(Some(title.clone())).with_axes("Time (s)", "Amplitude");
            fig.add_series(Series::Line(LineSeries {
                name: "Kernel".into(),
                points: decimate_points(&points, max_points),
                style: Style::solid(FILTERED, 2.0),
            }));
            fig
        }
    }
}
