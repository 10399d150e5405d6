use anyhow::{Context, Result};
use std::path::Path;

/// Parse newline-delimited samples, ignoring blank/comment lines. `NaN` marks a gap.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let val: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a newline-delimited floating point series from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let series = parse_f64_series("# mmHg\n\n 101.5\n99\n# end\n").unwrap();
        assert_eq!(series, vec![101.5, 99.0]);
    }

    #[test]
    fn nan_lines_become_gaps() {
        let series = parse_f64_series("80\nNaN\n82").unwrap();
        assert!(series[1].is_nan());
    }

    #[test]
    fn reports_offending_line() {
        let err = parse_f64_series("1.0\nabc\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_f64_series("# nothing\n").is_err());
    }
}
