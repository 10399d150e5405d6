use abp_lib::{
    config::{load_config, AnalysisConfig},
    filters::{response::filter_response, FilterConfig},
    io::{csv as csv_io, text as text_io, wfdb as wfdb_io},
    plot::{self, Figure},
    spectrum::{self, magnitude_spectrum, Spectrum},
    AnalysisResult, AnalysisSession, Metrics, Signal,
};
use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "abp", version, about = "ABP: arterial blood pressure waveform analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SignalArgs {
    /// Newline-delimited samples (stdin when omitted)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Sampling rate of --input/--csv samples
    #[arg(long, default_value_t = 125.0)]
    fs: f64,
    #[arg(long, default_value = "mmHg")]
    unit: String,
    /// Read one column of a headed CSV file instead
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long, default_value = "ABP")]
    column: String,
    /// WFDB header (.hea); sampling rate and unit come from the record
    #[arg(long)]
    wfdb_header: Option<PathBuf>,
    #[arg(long, default_value = wfdb_io::ABP_CHANNEL)]
    channel: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FilterKind {
    Butterworth,
    RunningMean,
    Gaussian,
}

#[derive(Args)]
struct FilterArgs {
    /// TOML analysis config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    filter: Option<FilterKind>,
    #[arg(long)]
    lowcut_hz: Option<f64>,
    #[arg(long)]
    highcut_hz: Option<f64>,
    #[arg(long)]
    order: Option<usize>,
    /// Running-mean window (samples)
    #[arg(long)]
    window: Option<usize>,
    #[arg(long)]
    fwhm_ms: Option<f64>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long)]
    range_min: Option<f64>,
    #[arg(long)]
    range_max: Option<f64>,
    #[arg(long)]
    threshold_percentile: Option<f64>,
    #[arg(long)]
    min_distance_s: Option<f64>,
    /// Fill range gaps before filtering
    #[arg(long)]
    interpolate_gaps: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FigureKind {
    Time,
    Histogram,
    Spectrum,
    Response,
}

#[derive(Subcommand)]
enum Commands {
    /// Range mask, filter, detect beats and derive metrics for both variants
    Analyze {
        #[command(flatten)]
        signal: SignalArgs,
        #[command(flatten)]
        config: ConfigArgs,
        /// Print the metrics panel instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Amplitude spectra of the original and filtered signals
    Spectrum {
        #[command(flatten)]
        signal: SignalArgs,
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long, default_value_t = spectrum::DEFAULT_FREQ_MIN)]
        freq_min: f64,
        #[arg(long, default_value_t = spectrum::DEFAULT_FREQ_MAX)]
        freq_max: f64,
    },
    /// Frequency (or kernel) response of a filter at a sampling rate
    FilterResponse {
        #[arg(long, default_value_t = 125.0)]
        fs: f64,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Chart data as JSON
    Figure {
        #[arg(long, value_enum)]
        kind: FigureKind,
        #[command(flatten)]
        signal: SignalArgs,
        #[command(flatten)]
        config: ConfigArgs,
        #[arg(long, default_value_t = plot::DEFAULT_MAX_POINTS)]
        max_points: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            signal,
            config,
            summary,
        } => cmd_analyze(&signal, &config, summary)?,
        Commands::Spectrum {
            signal,
            config,
            freq_min,
            freq_max,
        } => cmd_spectrum(&signal, &config, freq_min, freq_max)?,
        Commands::FilterResponse { fs, filter } => cmd_filter_response(fs, &filter)?,
        Commands::Figure {
            kind,
            signal,
            config,
            max_points,
        } => cmd_figure(kind, &signal, &config, max_points)?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn load_signal(args: &SignalArgs) -> Result<Signal> {
    if let Some(header) = &args.wfdb_header {
        return Ok(wfdb_io::load_channel(header, &args.channel)?);
    }
    let data = match &args.csv {
        Some(path) => csv_io::read_csv_column(path, &args.column)?,
        None => read_samples(args.input.as_deref())?,
    };
    Ok(Signal::new(data, args.fs, args.unit.clone())?)
}

fn base_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(AnalysisConfig::default()),
    }
}

fn current_kind(filter: &FilterConfig) -> FilterKind {
    match filter {
        FilterConfig::Butterworth { .. } => FilterKind::Butterworth,
        FilterConfig::RunningMean { .. } => FilterKind::RunningMean,
        FilterConfig::Gaussian { .. } => FilterKind::Gaussian,
    }
}

/// Apply `--filter` and its parameter flags on top of `base`.
fn resolve_filter(base: FilterConfig, args: &FilterArgs) -> Result<FilterConfig> {
    let kind = args.filter.unwrap_or_else(|| current_kind(&base));
    let start = if kind == current_kind(&base) {
        base
    } else {
        match kind {
            FilterKind::Butterworth => FilterConfig::butterworth_default(),
            FilterKind::RunningMean => FilterConfig::running_mean_default(),
            FilterKind::Gaussian => FilterConfig::gaussian_default(),
        }
    };
    let butterworth_flags =
        args.lowcut_hz.is_some() || args.highcut_hz.is_some() || args.order.is_some();
    let resolved = match start {
        FilterConfig::Butterworth {
            lowcut_hz,
            highcut_hz,
            order,
        } => FilterConfig::Butterworth {
            lowcut_hz: args.lowcut_hz.unwrap_or(lowcut_hz),
            highcut_hz: args.highcut_hz.unwrap_or(highcut_hz),
            order: args.order.unwrap_or(order),
        },
        FilterConfig::RunningMean {
            window_size_samples,
        } => FilterConfig::RunningMean {
            window_size_samples: args.window.unwrap_or(window_size_samples),
        },
        FilterConfig::Gaussian { fwhm_ms } => FilterConfig::Gaussian {
            fwhm_ms: args.fwhm_ms.unwrap_or(fwhm_ms),
        },
    };
    let stray = match kind {
        FilterKind::Butterworth => args.window.is_some() || args.fwhm_ms.is_some(),
        FilterKind::RunningMean => butterworth_flags || args.fwhm_ms.is_some(),
        FilterKind::Gaussian => butterworth_flags || args.window.is_some(),
    };
    if stray {
        bail!("filter parameter flags do not match the {} filter", resolved.name());
    }
    Ok(resolved)
}

fn resolve_config(args: &ConfigArgs) -> Result<AnalysisConfig> {
    let mut config = base_config(args.filter.config.as_deref())?;
    config.filter = resolve_filter(config.filter, &args.filter)?;
    if let Some(v) = args.range_min {
        config.range_min = v;
    }
    if let Some(v) = args.range_max {
        config.range_max = v;
    }
    if let Some(v) = args.threshold_percentile {
        config.peaks.threshold_percentile = v;
    }
    if let Some(v) = args.min_distance_s {
        config.peaks.min_distance_s = v;
    }
    if args.interpolate_gaps {
        config.interpolate_gaps = true;
    }
    Ok(config)
}

fn analyze(signal: &SignalArgs, config: &ConfigArgs) -> Result<AnalysisResult> {
    let config = resolve_config(config)?;
    let raw = load_signal(signal)?;
    let mut session = AnalysisSession::new(raw);
    Ok(session.apply(&config)?.clone())
}

fn print_panel(heading: &str, metrics: &Metrics, unit: &str) {
    println!("{heading}");
    for (label, value) in metrics.summary_lines(unit) {
        println!("  {label}: {value}");
    }
}

fn cmd_analyze(signal: &SignalArgs, config: &ConfigArgs, summary: bool) -> Result<()> {
    let result = analyze(signal, config)?;
    if summary {
        let unit = &result.original.unit;
        print_panel("Original", &result.metrics_original, unit);
        let filtered = result.metrics_filtered.clone().unwrap_or_default();
        print_panel("Filtered", &filtered, unit);
    } else {
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}

#[derive(Serialize)]
struct SpectrumOutput {
    original: Spectrum,
    filtered: Option<Spectrum>,
}

fn spectra(result: &AnalysisResult) -> SpectrumOutput {
    SpectrumOutput {
        original: magnitude_spectrum(&result.original),
        filtered: result.filtered.as_ref().map(magnitude_spectrum),
    }
}

fn cmd_spectrum(
    signal: &SignalArgs,
    config: &ConfigArgs,
    freq_min: f64,
    freq_max: f64,
) -> Result<()> {
    if freq_min.is_nan() || freq_max.is_nan() || freq_min >= freq_max {
        bail!("--freq-min ({freq_min}) must be below --freq-max ({freq_max})");
    }
    let result = analyze(signal, config)?;
    let mut out = spectra(&result);
    out.original = out.original.band(freq_min, freq_max);
    out.filtered = out.filtered.map(|s| s.band(freq_min, freq_max));
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_filter_response(fs: f64, args: &FilterArgs) -> Result<()> {
    let base = base_config(args.config.as_deref())?;
    let filter = resolve_filter(base.filter, args)?;
    let response = filter_response(&filter, fs)?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn cmd_figure(
    kind: FigureKind,
    signal: &SignalArgs,
    config: &ConfigArgs,
    max_points: usize,
) -> Result<()> {
    if max_points == 0 {
        bail!("--max-points must be positive");
    }
    let fig: Figure = match kind {
        FigureKind::Response => {
            let filter = resolve_config(config)?.filter;
            plot::response_figure(&filter_response(&filter, signal.fs)?, max_points)
        }
        FigureKind::Time => plot::time_domain_figure(&analyze(signal, config)?, max_points),
        FigureKind::Histogram => {
            plot::histogram_figure(&analyze(signal, config)?, plot::HISTOGRAM_BINS)
        }
        FigureKind::Spectrum => {
            let out = spectra(&analyze(signal, config)?);
            plot::spectrum_figure(&out.original, out.filtered.as_ref(), max_points)
        }
    };
    println!("{}", serde_json::to_string(&fig)?);
    Ok(())
}
