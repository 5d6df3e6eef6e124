//! Decoder for GCC `-ftime-report` output.
//!
//! The report is a fixed-width table of `usr / sys / wall` columns:
//!
//! ```text
//! Time variable                                   usr           sys          wall
//! phase parsing                         :   0.50 ( 25%)   0.10 (  5%)   0.60 ( 30%)
//! phase opt and generate                :   0.40 ( 20%)   0.08 (  4%)   0.48 ( 24%)
//!  TOTAL                                :   1.95          0.24          2.20
//! ```
//!
//! Wall-clock columns drive all figures. GCC reports no per-include or
//! per-template timing, so those sequences stay empty.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

use crate::models::error::Result;
use crate::models::trace::{CompilationMetrics, CompilationUnit, PhaseBreakdown};

static PHASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*phase\s+(.+?)\s*:\s*(-?[0-9.]+)\s*\(\s*-?[0-9]+\s*%\)\s*(-?[0-9.]+)\s*\(\s*-?[0-9]+\s*%\)\s*(-?[0-9.]+)\s*\(\s*-?[0-9]+\s*%\)",
    )
    .expect("static regex")
});

static TOTAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*TOTAL\s*:\s*(-?[0-9.]+)\s+(-?[0-9.]+)\s+(-?[0-9.]+)")
        .expect("static regex")
});

pub fn can_parse_content(content: &str) -> bool {
    content.contains("Time variable") || PHASE_RE.is_match(content)
}

/// Seconds-as-float to a clamped duration; malformed or negative fields
/// decode as zero per the input contract.
fn seconds(field: &str) -> Duration {
    let secs: f64 = field.parse().unwrap_or(0.0);
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

fn classify_phase(name: &str, wall: Duration, breakdown: &mut PhaseBreakdown) {
    let lower = name.to_ascii_lowercase();
    if lower.contains("template") {
        breakdown.template_instantiation += wall;
    } else if lower.contains("pars") {
        breakdown.parsing += wall;
    } else if lower.contains("opt") {
        breakdown.optimization += wall;
    } else if lower.contains("generate") || lower.contains("codegen") || lower.contains("expand") {
        breakdown.codegen += wall;
    } else {
        breakdown.other += wall;
    }
}

pub fn parse_content(content: &str, source_hint: &Path) -> Result<CompilationUnit> {
    let mut breakdown = PhaseBreakdown::default();

    for captures in PHASE_RE.captures_iter(content) {
        let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let wall = seconds(captures.get(4).map(|m| m.as_str()).unwrap_or_default());
        classify_phase(name, wall, &mut breakdown);
    }

    let total_time = TOTAL_RE
        .captures(content)
        .map(|c| seconds(c.get(3).map(|m| m.as_str()).unwrap_or_default()))
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| breakdown.total());

    let frontend_time = breakdown.parsing + breakdown.template_instantiation + breakdown.other;
    let backend_time = breakdown.codegen + breakdown.optimization;

    Ok(CompilationUnit {
        source_file: source_hint.to_path_buf(),
        metrics: CompilationMetrics {
            total_time,
            frontend_time,
            backend_time,
            breakdown,
        },
        ..Default::default()
    })
}
