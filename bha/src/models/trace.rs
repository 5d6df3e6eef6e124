use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Per-phase timing breakdown reported by the compiler.
///
/// Phases a decoder cannot attribute land in `other`; sums are never
/// renormalised even when decoder rounding makes them exceed the unit total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBreakdown {
    pub parsing: Duration,
    pub template_instantiation: Duration,
    pub codegen: Duration,
    pub optimization: Duration,
    pub other: Duration,
}

impl PhaseBreakdown {
    pub fn total(&self) -> Duration {
        self.parsing + self.template_instantiation + self.codegen + self.optimization + self.other
    }
}

/// Timing metrics for one translation unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationMetrics {
    pub total_time: Duration,
    pub frontend_time: Duration,
    pub backend_time: Duration,
    pub breakdown: PhaseBreakdown,
}

/// One observed header inclusion, in observation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeRecord {
    pub header: PathBuf,
    pub parse_time: Duration,
    /// Lexical include depth as reported by the decoder; 0 = direct include.
    pub depth: usize,
}

/// Aggregated instantiations of one template signature within a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub signature: String,
    pub instantiation_count: usize,
    pub total_time: Duration,
}

/// Optional memory statistics for a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub peak_memory_bytes: u64,
    pub frontend_peak_bytes: u64,
    pub backend_peak_bytes: u64,
    pub max_stack_bytes: u64,
}

impl MemoryMetrics {
    pub fn has_data(&self) -> bool {
        self.peak_memory_bytes > 0
            || self.frontend_peak_bytes > 0
            || self.backend_peak_bytes > 0
            || self.max_stack_bytes > 0
    }
}

/// Canonical record for one compiler invocation, as produced by a decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub source_file: PathBuf,
    pub metrics: CompilationMetrics,
    /// Observation-ordered include sequence.
    #[serde(default)]
    pub includes: Vec<IncludeRecord>,
    #[serde(default)]
    pub templates: Vec<TemplateRecord>,
    #[serde(default)]
    pub memory: MemoryMetrics,
}

/// A whole build: every unit plus the driver-reported wall-clock time.
///
/// `total_time` may be less than the sum of unit times when units compiled
/// in parallel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTrace {
    pub units: Vec<CompilationUnit>,
    pub total_time: Duration,
    pub timestamp: DateTime<Utc>,
}

impl BuildTrace {
    pub fn new(units: Vec<CompilationUnit>, total_time: Duration) -> Self {
        Self {
            units,
            total_time,
            timestamp: Utc::now(),
        }
    }

    /// Builds a trace whose wall time is the sum of unit times (used when the
    /// driver did not report one, i.e. a sequential lower bound is assumed).
    pub fn from_units(units: Vec<CompilationUnit>) -> Self {
        let total_time = units.iter().map(|u| u.metrics.total_time).sum();
        Self::new(units, total_time)
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}
