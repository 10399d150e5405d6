pub mod config;
pub mod detectors;
pub mod error;
pub mod filters;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod range;
pub mod session;
pub mod signal;
pub mod spectrum;
pub mod worker;

pub use detectors::*;
pub use error::{AnalysisError, Result};
pub use filters::FilterConfig;
pub use metrics::*;
pub use session::*;
pub use signal::*;
