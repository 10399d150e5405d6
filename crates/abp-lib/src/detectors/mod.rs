pub mod peaks;

pub use peaks::{detect_peaks, PeakDetectorConfig};
