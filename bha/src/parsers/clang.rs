//! Decoder for Clang `-ftime-trace` output (Chrome trace JSON).
//!
//! The trace is a flat `traceEvents` array of microsecond-resolution spans.
//! `Source` events become include records (nesting depth is recovered from
//! interval containment), `Instantiate*` events become template records,
//! and the `Total *` summary events feed the phase breakdown.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::models::error::{BhaError, Result};
use crate::models::trace::{
    CompilationMetrics, CompilationUnit, IncludeRecord, PhaseBreakdown, TemplateRecord,
};

#[derive(Debug, Default, Deserialize)]
struct TraceFile {
    #[serde(rename = "traceEvents", default)]
    trace_events: Vec<TraceEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct TraceEvent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    ts: i64,
    #[serde(default)]
    dur: i64,
    #[serde(default)]
    args: Option<EventArgs>,
}

#[derive(Debug, Default, Deserialize)]
struct EventArgs {
    #[serde(default)]
    detail: Option<String>,
}

pub fn can_parse_content(content: &str) -> bool {
    content.contains("\"traceEvents\"")
}

/// Microseconds-as-int to a clamped duration.
fn micros(value: i64) -> Duration {
    Duration::from_micros(value.max(0) as u64)
}

fn detail(event: &TraceEvent) -> Option<&str> {
    event.args.as_ref().and_then(|a| a.detail.as_deref())
}

pub fn parse_content(content: &str, source_hint: &Path) -> Result<CompilationUnit> {
    let trace: TraceFile = serde_json::from_str(content)
        .map_err(|e| BhaError::Parse(format!("invalid time-trace JSON: {e}")))?;

    let mut unit = CompilationUnit {
        source_file: source_hint.to_path_buf(),
        ..Default::default()
    };

    let mut breakdown = PhaseBreakdown::default();
    let mut total_time = Duration::ZERO;
    let mut frontend_time = Duration::ZERO;
    let mut backend_time = Duration::ZERO;

    // (ts, end, header, dur) for depth recovery.
    let mut source_events: Vec<(i64, i64, String, Duration)> = Vec::new();
    let mut template_times: FxHashMap<String, (usize, Duration)> = FxHashMap::default();
    let mut template_order: Vec<String> = Vec::new();

    for event in &trace.trace_events {
        let dur = micros(event.dur);
        match event.name.as_str() {
            "ExecuteCompiler" => total_time = total_time.max(dur),
            "Total Frontend" => frontend_time = dur,
            "Total Backend" => backend_time = dur,
            "Total Source" => breakdown.parsing = dur,
            "Total InstantiateFunction" | "Total InstantiateClass" => {
                breakdown.template_instantiation += dur;
            }
            "Total CodeGen Function" => breakdown.codegen = dur,
            "Total OptFunction" | "Total OptModule" => breakdown.optimization += dur,
            "Source" => {
                if let Some(header) = detail(event) {
                    let ts = event.ts.max(0);
                    source_events.push((ts, ts + event.dur.max(0), header.to_string(), dur));
                }
            }
            "InstantiateFunction" | "InstantiateClass" => {
                if let Some(signature) = detail(event) {
                    let entry = template_times
                        .entry(signature.to_string())
                        .or_insert_with(|| {
                            template_order.push(signature.to_string());
                            (0, Duration::ZERO)
                        });
                    entry.0 += 1;
                    entry.1 += dur;
                }
            }
            _ => {}
        }
    }

    // Parent Source spans strictly contain their nested includes, so the
    // number of still-open spans at an event's start is its depth.
    source_events.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
    let mut open_ends: Vec<i64> = Vec::new();
    for (ts, end, header, parse_time) in source_events {
        while let Some(&open_end) = open_ends.last() {
            if open_end <= ts {
                open_ends.pop();
            } else {
                break;
            }
        }
        unit.includes.push(IncludeRecord {
            header: PathBuf::from(header),
            parse_time,
            depth: open_ends.len(),
        });
        open_ends.push(end);
    }

    for signature in template_order {
        let (count, time) = template_times[&signature];
        unit.templates.push(TemplateRecord {
            signature,
            instantiation_count: count.max(1),
            total_time: time,
        });
    }

    if total_time.is_zero() {
        total_time = frontend_time + backend_time;
    }

    unit.metrics = CompilationMetrics {
        total_time,
        frontend_time,
        backend_time,
        breakdown,
    };

    Ok(unit)
}
