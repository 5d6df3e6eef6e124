//! Decoder for MSVC `/Bt+` timing output.
//!
//! The compiler prints one `time(...)=...s` line per component:
//!
//! ```text
//! time(C:\project\src\main.cpp)=1.234s
//! time(c1xx.dll)=0.850s < 0.750s (Frontend), 0.100s (Template instantiation) >
//! time(c2.dll)=0.384s
//! ```
//!
//! `c1`/`c1xx` is the frontend, `c2` the backend; any other target is the
//! translation unit itself.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::error::Result;
use crate::models::trace::{CompilationMetrics, CompilationUnit, PhaseBreakdown};

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*time\(([^)]+)\)=(-?[0-9.]+)s(?:\s*<([^>]*)>)?").expect("static regex")
});

static DETAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?[0-9.]+)s\s*\(([^)]+)\)").expect("static regex"));

pub fn can_parse_content(content: &str) -> bool {
    TIME_RE.is_match(content)
}

fn seconds(field: &str) -> Duration {
    let secs: f64 = field.parse().unwrap_or(0.0);
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

fn is_frontend(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.ends_with("c1xx.dll") || lower.ends_with("c1.dll")
}

fn is_backend(target: &str) -> bool {
    target.to_ascii_lowercase().ends_with("c2.dll")
}

fn apply_details(details: &str, breakdown: &mut PhaseBreakdown) {
    for captures in DETAIL_RE.captures_iter(details) {
        let time = seconds(captures.get(1).map(|m| m.as_str()).unwrap_or_default());
        let label = captures
            .get(2)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if label.contains("template") {
            breakdown.template_instantiation += time;
        } else if label.contains("frontend") || label.contains("pars") {
            breakdown.parsing += time;
        } else if label.contains("codegen") || label.contains("backend") {
            breakdown.codegen += time;
        } else if label.contains("opt") {
            breakdown.optimization += time;
        } else {
            breakdown.other += time;
        }
    }
}

pub fn parse_content(content: &str, source_hint: &Path) -> Result<CompilationUnit> {
    let mut unit = CompilationUnit {
        source_file: source_hint.to_path_buf(),
        ..Default::default()
    };

    let mut metrics = CompilationMetrics::default();

    for captures in TIME_RE.captures_iter(content) {
        let target = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let time = seconds(captures.get(2).map(|m| m.as_str()).unwrap_or_default());

        if is_frontend(target) {
            metrics.frontend_time = time;
            if let Some(details) = captures.get(3) {
                apply_details(details.as_str(), &mut metrics.breakdown);
            }
        } else if is_backend(target) {
            metrics.backend_time = time;
            metrics.breakdown.codegen += time;
        } else {
            unit.source_file = PathBuf::from(target.trim());
            metrics.total_time = time;
        }
    }

    if metrics.total_time.is_zero() {
        metrics.total_time = metrics.frontend_time + metrics.backend_time;
    }

    unit.metrics = metrics;
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_OUTPUT: &str = "\
time(C:\\project\\src\\main.cpp)=2.000s
time(c1xx.dll)=1.200s
time(c2.dll)=0.800s
";

    const DETAILED_OUTPUT: &str = "\
time(C:\\project\\src\\main.cpp)=1.234s
time(c1xx.dll)=0.850s < 0.750s (Frontend), 0.100s (Template instantiation) >
time(c2.dll)=0.384s
";

    #[test]
    fn recognises_bt_output() {
        assert!(can_parse_content(BASIC_OUTPUT));
        assert!(can_parse_content(DETAILED_OUTPUT));
        assert!(!can_parse_content("some random text"));
    }

    #[test]
    fn splits_frontend_and_backend() {
        let unit = parse_content(BASIC_OUTPUT, Path::new("")).unwrap();

        assert_eq!(
            unit.source_file,
            PathBuf::from("C:\\project\\src\\main.cpp")
        );
        assert_eq!(unit.metrics.total_time, Duration::from_secs(2));
        assert_eq!(unit.metrics.frontend_time, Duration::from_secs_f64(1.2));
        assert_eq!(unit.metrics.backend_time, Duration::from_secs_f64(0.8));
    }

    #[test]
    fn detail_segments_feed_the_breakdown() {
        let unit = parse_content(DETAILED_OUTPUT, Path::new("")).unwrap();

        assert_eq!(unit.metrics.breakdown.parsing, Duration::from_secs_f64(0.75));
        assert_eq!(
            unit.metrics.breakdown.template_instantiation,
            Duration::from_secs_f64(0.10)
        );
        assert_eq!(unit.metrics.breakdown.codegen, Duration::from_secs_f64(0.384));
    }

    #[test]
    fn missing_source_line_falls_back_to_component_sum() {
        let content = "time(c1xx.dll)=1.000s\ntime(c2.dll)=0.500s\n";
        let unit = parse_content(content, Path::new("hint.cpp")).unwrap();

        assert_eq!(unit.source_file, PathBuf::from("hint.cpp"));
        assert_eq!(unit.metrics.total_time, Duration::from_secs_f64(1.5));
    }

    #[test]
    fn negative_times_clamp_to_zero() {
        let content = "time(a.cpp)=-1.000s\n";
        let unit = parse_content(content, Path::new("")).unwrap();
        assert_eq!(unit.metrics.total_time, Duration::ZERO);
    }
}
