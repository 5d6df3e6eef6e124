use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::graph::Cycle;
use crate::models::trace::{MemoryMetrics, PhaseBreakdown};

/// Per-file analysis outcome, ranked within the build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysisResult {
    pub file: PathBuf,
    pub compile_time: Duration,
    pub frontend_time: Duration,
    pub backend_time: Duration,
    pub breakdown: PhaseBreakdown,
    /// Share of the build wall time, `0.0` when the trace total is zero.
    pub time_percent: f64,
    /// 1-based dense rank by descending compile time.
    pub rank: usize,
    pub include_count: usize,
    pub template_count: usize,
    #[serde(default)]
    pub memory: MemoryMetrics,
}

/// Build-wide performance figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    pub total_build_time: Duration,
    /// Sum of per-unit compile times.
    pub sequential_time: Duration,
    /// Driver-reported wall time.
    pub parallel_time: Duration,
    /// `sequential / parallel`; values above 1.0 indicate parallel speedup.
    pub parallelism_efficiency: f64,
    pub total_files: usize,
    pub avg_file_time: Duration,
    pub median_file_time: Duration,
    pub p90_file_time: Duration,
    pub p99_file_time: Duration,
    /// Files above the slow threshold, bounded for display.
    pub slowest_files: Vec<FileAnalysisResult>,
    /// Unbounded count of files above the slow threshold.
    pub slowest_file_count: usize,
    pub critical_path: Vec<PathBuf>,
    #[serde(default)]
    pub total_memory: MemoryMetrics,
    #[serde(default)]
    pub peak_memory: MemoryMetrics,
    #[serde(default)]
    pub average_memory: MemoryMetrics,
}

/// Aggregated figures for one header across every including unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub path: PathBuf,
    pub total_parse_time: Duration,
    pub inclusion_count: usize,
    /// Distinct translation units that include this header.
    pub including_files: usize,
    /// `ms(total_parse_time) * ln(1 + including_files)`, normalised so the
    /// heaviest header scores 1.0. Only the induced ranking is meaningful.
    pub impact_score: f64,
}

/// Include-dependency aggregate for the whole build.
///
/// A file that is both a translation unit and a header elsewhere contributes
/// time to both this aggregate and the unit figures; the two views are not
/// disjoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyAnalysis {
    pub total_includes: usize,
    pub unique_headers: usize,
    pub max_include_depth: usize,
    pub total_include_time: Duration,
    /// Headers by descending impact score, then path.
    pub headers: Vec<HeaderInfo>,
    /// Cycles in the unit -> header inclusion graph.
    pub cycles: Vec<Cycle>,
}

/// Aggregated instantiation figures for one template signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    /// Base name, the signature up to its first type-argument list.
    pub name: String,
    pub full_signature: String,
    pub total_time: Duration,
    pub instantiation_count: usize,
    /// Share of the build wall time.
    pub time_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateAnalysis {
    pub total_template_time: Duration,
    /// Share of the build wall time spent instantiating templates.
    pub template_time_percent: f64,
    pub total_instantiations: usize,
    /// Templates by descending total time, then name.
    pub templates: Vec<TemplateInfo>,
}

/// A file whose time and fan-out jointly limit build parallelism.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub file: PathBuf,
    pub compile_time: Duration,
    /// Direct dependents in the unit graph.
    pub dependent_count: usize,
    /// `ms(compile_time) * (1 + ln(1 + dependent_count))`, times 1.5 on the
    /// critical path.
    pub bottleneck_score: f64,
    pub on_critical_path: bool,
}

/// The fused output of a full analysis run. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub performance: PerformanceAnalysis,
    /// Per-unit results by descending compile time (insertion-order ties).
    pub files: Vec<FileAnalysisResult>,
    pub dependencies: DependencyAnalysis,
    pub templates: TemplateAnalysis,
    pub bottlenecks: Vec<Bottleneck>,
}
