//! Configuration: analysis thresholds, suggestion policy and resource
//! limits, loadable from a `bha.toml` file and overridable from the CLI.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::models::error::{BhaError, Result};
use crate::models::suggestion::Priority;

/// Tunables for the analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Files at or above this compile time count as "slow".
    pub min_duration_threshold: Duration,
    /// Cap on reported cycles per cycle-detection pass.
    pub max_cycles: usize,
    /// Cap on the bottleneck list.
    pub max_bottlenecks: usize,
    /// Display cap for the slowest-files list (the count is unbounded).
    pub slowest_display_cap: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_duration_threshold: Duration::from_millis(10),
            max_cycles: 10,
            max_bottlenecks: 20,
            slowest_display_cap: 20,
        }
    }
}

/// Policy knobs for the suggestion engine. The defaults implement the
/// shipped heuristics; tests pin them through here.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggesterOptions {
    pub max_suggestions: usize,
    pub min_confidence: f64,
    pub min_priority: Priority,
    pub include_unsafe: bool,
    /// A header must be included this often to become a PCH candidate.
    pub pch_min_inclusions: usize,
    /// ... and cost at least this much aggregate parse time.
    pub pch_min_parse_time: Duration,
    /// A template must account for this share (percent) of template time.
    pub template_share_threshold: f64,
    /// A directory needs this many small files to suggest a unity build.
    pub unity_min_files: usize,
    /// "Small" for unity-build purposes.
    pub unity_max_file_time: Duration,
}

impl Default for SuggesterOptions {
    fn default() -> Self {
        Self {
            max_suggestions: 20,
            min_confidence: 0.5,
            min_priority: Priority::Low,
            include_unsafe: false,
            pch_min_inclusions: 5,
            pch_min_parse_time: Duration::from_millis(200),
            template_share_threshold: 10.0,
            unity_min_files: 5,
            unity_max_file_time: Duration::from_millis(250),
        }
    }
}

/// Resource ceilings enforced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_memory_bytes: u64,
    pub max_execution_time: Duration,
    pub max_graph_nodes: usize,
    pub max_graph_edges: usize,
    pub max_compilation_units: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_bytes: 8 * 1024 * 1024 * 1024,
            max_execution_time: Duration::from_secs(300),
            max_graph_nodes: 100_000,
            max_graph_edges: 1_000_000,
            max_compilation_units: 50_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct AnalysisSection {
    min_duration_ms: u64,
    max_cycles: usize,
    max_bottlenecks: usize,
    top_slowest: usize,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        let defaults = AnalysisOptions::default();
        Self {
            min_duration_ms: defaults.min_duration_threshold.as_millis() as u64,
            max_cycles: defaults.max_cycles,
            max_bottlenecks: defaults.max_bottlenecks,
            top_slowest: defaults.slowest_display_cap,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SuggestionSection {
    max_suggestions: usize,
    min_confidence: f64,
    include_unsafe: bool,
    pch_min_inclusions: usize,
    pch_min_parse_ms: u64,
    template_share_percent: f64,
    unity_min_files: usize,
    unity_max_file_ms: u64,
}

impl Default for SuggestionSection {
    fn default() -> Self {
        let defaults = SuggesterOptions::default();
        Self {
            max_suggestions: defaults.max_suggestions,
            min_confidence: defaults.min_confidence,
            include_unsafe: defaults.include_unsafe,
            pch_min_inclusions: defaults.pch_min_inclusions,
            pch_min_parse_ms: defaults.pch_min_parse_time.as_millis() as u64,
            template_share_percent: defaults.template_share_threshold,
            unity_min_files: defaults.unity_min_files,
            unity_max_file_ms: defaults.unity_max_file_time.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LimitsSection {
    max_memory_mb: u64,
    max_execution_secs: u64,
    max_graph_nodes: usize,
    max_graph_edges: usize,
    max_compilation_units: usize,
}

impl Default for LimitsSection {
    fn default() -> Self {
        let defaults = ResourceLimits::default();
        Self {
            max_memory_mb: defaults.max_memory_bytes / (1024 * 1024),
            max_execution_secs: defaults.max_execution_time.as_secs(),
            max_graph_nodes: defaults.max_graph_nodes,
            max_graph_edges: defaults.max_graph_edges,
            max_compilation_units: defaults.max_compilation_units,
        }
    }
}

/// On-disk configuration (`bha.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BhaConfig {
    analysis: AnalysisSection,
    suggestions: SuggestionSection,
    limits: LimitsSection,
    /// Snapshot storage root; relative to the working directory.
    pub snapshot_dir: Option<String>,
}

impl BhaConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BhaError::io(format!("failed to read config: {}", path.display()), e))?;
        Self::load_from_str(&content)
    }

    pub fn load_from_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| BhaError::Parse(format!("invalid config: {e}")))
    }

    /// Loads `bha.toml` from the working directory if present, otherwise
    /// returns defaults.
    pub fn discover() -> Result<Self> {
        let candidate = Path::new("bha.toml");
        if candidate.is_file() {
            Self::load_from_file(candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            min_duration_threshold: Duration::from_millis(self.analysis.min_duration_ms),
            max_cycles: self.analysis.max_cycles,
            max_bottlenecks: self.analysis.max_bottlenecks,
            slowest_display_cap: self.analysis.top_slowest,
        }
    }

    pub fn suggester_options(&self) -> SuggesterOptions {
        SuggesterOptions {
            max_suggestions: self.suggestions.max_suggestions,
            min_confidence: self.suggestions.min_confidence,
            min_priority: Priority::Low,
            include_unsafe: self.suggestions.include_unsafe,
            pch_min_inclusions: self.suggestions.pch_min_inclusions,
            pch_min_parse_time: Duration::from_millis(self.suggestions.pch_min_parse_ms),
            template_share_threshold: self.suggestions.template_share_percent,
            unity_min_files: self.suggestions.unity_min_files,
            unity_max_file_time: Duration::from_millis(self.suggestions.unity_max_file_ms),
        }
    }

    pub fn resource_limits(&self) -> ResourceLimits {
        ResourceLimits {
            max_memory_bytes: self.limits.max_memory_mb * 1024 * 1024,
            max_execution_time: Duration::from_secs(self.limits.max_execution_secs),
            max_graph_nodes: self.limits.max_graph_nodes,
            max_graph_edges: self.limits.max_graph_edges,
            max_compilation_units: self.limits.max_compilation_units,
        }
    }
}
