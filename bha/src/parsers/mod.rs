//! Trace decoders and trace-file discovery.
//!
//! Format selection sniffs file content rather than trusting extensions;
//! it is the only dynamic-lookup point in the pipeline. Decoders clamp
//! out-of-contract values (negative durations, missing fields) instead of
//! rejecting records.

pub mod clang;
pub mod gcc;
pub mod msvc;

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::error::{BhaError, Result};
use crate::models::trace::CompilationUnit;

/// The trace formats this crate decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// GCC `-ftime-report` text.
    GccTimeReport,
    /// Clang `-ftime-trace` Chrome trace JSON.
    ClangTimeTrace,
    /// MSVC `/Bt+` stdout.
    MsvcBuildTiming,
}

impl TraceFormat {
    pub fn name(&self) -> &'static str {
        match self {
            TraceFormat::GccTimeReport => "GCC",
            TraceFormat::ClangTimeTrace => "Clang",
            TraceFormat::MsvcBuildTiming => "MSVC",
        }
    }

    /// Sniffs the format from content. JSON traces are unambiguous; MSVC
    /// is checked before GCC because `/Bt+` logs sometimes embed
    /// time-report-like noise from wrapper scripts.
    pub fn detect(content: &str) -> Option<TraceFormat> {
        if clang::can_parse_content(content) {
            Some(TraceFormat::ClangTimeTrace)
        } else if msvc::can_parse_content(content) {
            Some(TraceFormat::MsvcBuildTiming)
        } else if gcc::can_parse_content(content) {
            Some(TraceFormat::GccTimeReport)
        } else {
            None
        }
    }
}

const TRACE_EXTENSIONS: [&str; 3] = ["json", "txt", "log"];

/// Parses trace content in an explicit format.
pub fn parse_trace_content(
    content: &str,
    source_hint: &Path,
    format: TraceFormat,
) -> Result<CompilationUnit> {
    let unit = match format {
        TraceFormat::GccTimeReport => gcc::parse_content(content, source_hint)?,
        TraceFormat::ClangTimeTrace => clang::parse_content(content, source_hint)?,
        TraceFormat::MsvcBuildTiming => msvc::parse_content(content, source_hint)?,
    };

    if unit.source_file.as_os_str().is_empty() {
        // Tolerated per the input contract; surfaced as-is in output.
        warn!(format = format.name(), "trace record has an empty source path");
    }

    Ok(unit)
}

/// Reads and decodes one trace file, sniffing its format.
pub fn parse_trace_file(path: &Path) -> Result<CompilationUnit> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BhaError::io(format!("failed to read trace: {}", path.display()), e))?;

    let format = TraceFormat::detect(&content).ok_or_else(|| {
        BhaError::Parse(format!("unrecognised trace format: {}", path.display()))
    })?;
    debug!(path = %path.display(), format = format.name(), "parsing trace");

    parse_trace_content(&content, &source_hint_for(path), format)
}

/// Derives the unit path hint from the trace file name: `main.cpp.json`
/// hints `main.cpp`. Decoders override the hint when the trace itself
/// names the source file.
fn source_hint_for(path: &Path) -> PathBuf {
    let is_trace_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| TRACE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if is_trace_ext {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

/// Collects candidate trace files: a file is returned as-is, a directory is
/// walked recursively for `.json`/`.txt`/`.log` files. Output is sorted for
/// deterministic parse order.
pub fn collect_trace_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| TRACE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    files
}
