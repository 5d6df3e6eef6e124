//! Snapshot storage and build comparison.
//!
//! Snapshots are JSON v2.0 files under a storage root (default
//! `.bha/snapshots/`), one per name, with a separate `.baseline` pointer
//! file whose body is the baseline snapshot's name. Loading tolerates
//! unknown fields and defaults missing ones; saving refuses to overwrite
//! unless explicitly told to.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::analysis::{
    AnalysisResult, DependencyAnalysis, FileAnalysisResult, HeaderInfo, PerformanceAnalysis,
    TemplateAnalysis, TemplateInfo,
};
use crate::models::error::{BhaError, Result};
use crate::models::suggestion::{Priority, SuggestedAction, Suggestion, SuggestionType, TargetFile};
use crate::utils::duration::{delta_ns, duration_to_ms, ms_to_duration};
use crate::utils::paths::file_id;

const SNAPSHOT_VERSION: &str = "2.0";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Per-file significance threshold: changes within ±10% are noise.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 0.10;

// ---------------------------------------------------------------------------
// Metadata and comparison models
// ---------------------------------------------------------------------------

/// Descriptive metadata stored alongside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Best-effort; empty when the build did not run inside a repository.
    pub git_commit: String,
    pub git_branch: String,
    pub file_count: usize,
    pub total_build_time: Duration,
    pub tags: Vec<String>,
}

/// A complete stored snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub analysis: AnalysisResult,
    pub suggestions: Vec<Suggestion>,
}

/// A per-file timing change between two analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub file: PathBuf,
    pub old_time: Duration,
    pub new_time: Duration,
    /// Signed nanoseconds; positive means slower.
    pub delta_ns: i64,
    pub percent_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderChange {
    pub header: PathBuf,
    pub old_inclusions: usize,
    pub new_inclusions: usize,
    pub old_time: Duration,
    pub new_time: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateChange {
    pub name: String,
    pub old_count: usize,
    pub new_count: usize,
    pub old_time: Duration,
    pub new_time: Duration,
}

/// The diff between an old and a new analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Signed nanoseconds; positive means the build got slower.
    pub build_time_delta_ns: i64,
    pub build_time_percent_change: f64,
    pub file_count_delta: i64,

    /// Files that got significantly slower, by |delta| descending.
    pub regressions: Vec<FileChange>,
    /// Files that got significantly faster, by |delta| descending.
    pub improvements: Vec<FileChange>,
    pub new_files: Vec<PathBuf>,
    pub removed_files: Vec<PathBuf>,

    pub header_regressions: Vec<HeaderChange>,
    pub header_improvements: Vec<HeaderChange>,
    pub template_regressions: Vec<TemplateChange>,
    pub template_improvements: Vec<TemplateChange>,
}

impl ComparisonResult {
    pub fn is_regression(&self) -> bool {
        self.build_time_delta_ns > 0
    }

    pub fn is_improvement(&self) -> bool {
        self.build_time_delta_ns < 0
    }

    /// Whole-build significance: more than a 5% swing either way.
    pub fn is_significant(&self) -> bool {
        self.build_time_percent_change.abs() > 5.0
    }
}

// ---------------------------------------------------------------------------
// Snapshot JSON v2.0
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PerformanceJson {
    total_build_time_ms: f64,
    sequential_time_ms: f64,
    parallel_time_ms: f64,
    parallelism_efficiency: f64,
    total_files: usize,
    avg_file_time_ms: f64,
    median_file_time_ms: f64,
    p90_file_time_ms: f64,
    p99_file_time_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileJson {
    path: String,
    compile_time_ms: f64,
    frontend_time_ms: f64,
    backend_time_ms: f64,
    time_percent: f64,
    rank: usize,
    include_count: usize,
    template_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct HeaderJson {
    path: String,
    total_parse_time_ms: f64,
    inclusion_count: usize,
    including_files: usize,
    impact_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct DependenciesJson {
    total_includes: usize,
    unique_headers: usize,
    max_include_depth: usize,
    total_include_time_ms: f64,
    headers: Vec<HeaderJson>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct TemplateJson {
    name: String,
    full_signature: String,
    total_time_ms: f64,
    instantiation_count: usize,
    time_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct TemplatesJson {
    total_template_time_ms: f64,
    template_time_percent: f64,
    total_instantiations: usize,
    templates: Vec<TemplateJson>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct SuggestionJson {
    #[serde(rename = "type")]
    suggestion_type: String,
    title: String,
    description: String,
    target_file: String,
    target_line: usize,
    confidence: f64,
    priority: String,
    estimated_savings_ms: f64,
    is_safe: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct SnapshotJson {
    version: String,
    name: String,
    description: String,
    created_at: String,
    git_commit: String,
    git_branch: String,
    file_count: usize,
    total_build_time_ms: f64,
    tags: Vec<String>,
    performance: PerformanceJson,
    files: Vec<FileJson>,
    dependencies: DependenciesJson,
    templates: TemplatesJson,
    suggestions: Vec<SuggestionJson>,
}

fn suggestion_type_from_str(s: &str) -> SuggestionType {
    match s {
        "forward_decl" => SuggestionType::ForwardDecl,
        "unity_build" => SuggestionType::UnityBuild,
        "template_reduction" => SuggestionType::TemplateReduction,
        "include_removal" => SuggestionType::IncludeRemoval,
        "header_split" => SuggestionType::HeaderSplit,
        _ => SuggestionType::Pch,
    }
}

fn priority_from_str(s: &str) -> Priority {
    match s {
        "critical" => Priority::Critical,
        "high" => Priority::High,
        "medium" => Priority::Medium,
        _ => Priority::Low,
    }
}

fn encode(snapshot: &Snapshot) -> SnapshotJson {
    let analysis = &snapshot.analysis;
    let perf = &analysis.performance;

    SnapshotJson {
        version: SNAPSHOT_VERSION.to_string(),
        name: snapshot.metadata.name.clone(),
        description: snapshot.metadata.description.clone(),
        created_at: snapshot
            .metadata
            .created_at
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        git_commit: snapshot.metadata.git_commit.clone(),
        git_branch: snapshot.metadata.git_branch.clone(),
        file_count: snapshot.metadata.file_count,
        total_build_time_ms: duration_to_ms(snapshot.metadata.total_build_time),
        tags: snapshot.metadata.tags.clone(),
        performance: PerformanceJson {
            total_build_time_ms: duration_to_ms(perf.total_build_time),
            sequential_time_ms: duration_to_ms(perf.sequential_time),
            parallel_time_ms: duration_to_ms(perf.parallel_time),
            parallelism_efficiency: perf.parallelism_efficiency,
            total_files: perf.total_files,
            avg_file_time_ms: duration_to_ms(perf.avg_file_time),
            median_file_time_ms: duration_to_ms(perf.median_file_time),
            p90_file_time_ms: duration_to_ms(perf.p90_file_time),
            p99_file_time_ms: duration_to_ms(perf.p99_file_time),
        },
        files: analysis
            .files
            .iter()
            .map(|f| FileJson {
                path: f.file.to_string_lossy().into_owned(),
                compile_time_ms: duration_to_ms(f.compile_time),
                frontend_time_ms: duration_to_ms(f.frontend_time),
                backend_time_ms: duration_to_ms(f.backend_time),
                time_percent: f.time_percent,
                rank: f.rank,
                include_count: f.include_count,
                template_count: f.template_count,
            })
            .collect(),
        dependencies: DependenciesJson {
            total_includes: analysis.dependencies.total_includes,
            unique_headers: analysis.dependencies.unique_headers,
            max_include_depth: analysis.dependencies.max_include_depth,
            total_include_time_ms: duration_to_ms(analysis.dependencies.total_include_time),
            headers: analysis
                .dependencies
                .headers
                .iter()
                .map(|h| HeaderJson {
                    path: h.path.to_string_lossy().into_owned(),
                    total_parse_time_ms: duration_to_ms(h.total_parse_time),
                    inclusion_count: h.inclusion_count,
                    including_files: h.including_files,
                    impact_score: h.impact_score,
                })
                .collect(),
        },
        templates: TemplatesJson {
            total_template_time_ms: duration_to_ms(analysis.templates.total_template_time),
            template_time_percent: analysis.templates.template_time_percent,
            total_instantiations: analysis.templates.total_instantiations,
            templates: analysis
                .templates
                .templates
                .iter()
                .map(|t| TemplateJson {
                    name: t.name.clone(),
                    full_signature: t.full_signature.clone(),
                    total_time_ms: duration_to_ms(t.total_time),
                    instantiation_count: t.instantiation_count,
                    time_percent: t.time_percent,
                })
                .collect(),
        },
        suggestions: snapshot
            .suggestions
            .iter()
            .map(|s| SuggestionJson {
                suggestion_type: s.suggestion_type.as_str().to_string(),
                title: s.title.clone(),
                description: s.description.clone(),
                target_file: s.target_file.path.to_string_lossy().into_owned(),
                target_line: s.target_file.line_start,
                confidence: s.confidence,
                priority: s.priority.as_str().to_string(),
                estimated_savings_ms: duration_to_ms(s.estimated_savings),
                is_safe: s.is_safe,
            })
            .collect(),
    }
}

fn decode(json: SnapshotJson, fallback_name: &str) -> Snapshot {
    let created_at = DateTime::parse_from_rfc3339(&json.created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let metadata = SnapshotMetadata {
        name: if json.name.is_empty() {
            fallback_name.to_string()
        } else {
            json.name
        },
        description: json.description,
        created_at,
        git_commit: json.git_commit,
        git_branch: json.git_branch,
        file_count: json.file_count,
        total_build_time: ms_to_duration(json.total_build_time_ms),
        tags: json.tags,
    };

    let performance = PerformanceAnalysis {
        total_build_time: ms_to_duration(json.performance.total_build_time_ms),
        sequential_time: ms_to_duration(json.performance.sequential_time_ms),
        parallel_time: ms_to_duration(json.performance.parallel_time_ms),
        parallelism_efficiency: json.performance.parallelism_efficiency,
        total_files: json.performance.total_files,
        avg_file_time: ms_to_duration(json.performance.avg_file_time_ms),
        median_file_time: ms_to_duration(json.performance.median_file_time_ms),
        p90_file_time: ms_to_duration(json.performance.p90_file_time_ms),
        p99_file_time: ms_to_duration(json.performance.p99_file_time_ms),
        ..Default::default()
    };

    let files: Vec<FileAnalysisResult> = json
        .files
        .into_iter()
        .map(|f| FileAnalysisResult {
            file: PathBuf::from(f.path),
            compile_time: ms_to_duration(f.compile_time_ms),
            frontend_time: ms_to_duration(f.frontend_time_ms),
            backend_time: ms_to_duration(f.backend_time_ms),
            time_percent: f.time_percent,
            rank: f.rank,
            include_count: f.include_count,
            template_count: f.template_count,
            ..Default::default()
        })
        .collect();

    let dependencies = DependencyAnalysis {
        total_includes: json.dependencies.total_includes,
        unique_headers: json.dependencies.unique_headers,
        max_include_depth: json.dependencies.max_include_depth,
        total_include_time: ms_to_duration(json.dependencies.total_include_time_ms),
        headers: json
            .dependencies
            .headers
            .into_iter()
            .map(|h| HeaderInfo {
                path: PathBuf::from(h.path),
                total_parse_time: ms_to_duration(h.total_parse_time_ms),
                inclusion_count: h.inclusion_count,
                including_files: h.including_files,
                impact_score: h.impact_score,
            })
            .collect(),
        cycles: Vec::new(),
    };

    let templates = TemplateAnalysis {
        total_template_time: ms_to_duration(json.templates.total_template_time_ms),
        template_time_percent: json.templates.template_time_percent,
        total_instantiations: json.templates.total_instantiations,
        templates: json
            .templates
            .templates
            .into_iter()
            .map(|t| TemplateInfo {
                name: t.name,
                full_signature: t.full_signature,
                total_time: ms_to_duration(t.total_time_ms),
                instantiation_count: t.instantiation_count,
                time_percent: t.time_percent,
            })
            .collect(),
    };

    let suggestions = json
        .suggestions
        .into_iter()
        .map(|s| {
            let mut suggestion = Suggestion::new(
                suggestion_type_from_str(&s.suggestion_type),
                priority_from_str(&s.priority),
                s.title,
            );
            suggestion.description = s.description;
            suggestion.confidence = s.confidence;
            suggestion.estimated_savings = ms_to_duration(s.estimated_savings_ms);
            suggestion.is_safe = s.is_safe;
            suggestion.target_file = TargetFile {
                path: PathBuf::from(s.target_file),
                line_start: s.target_line,
                line_end: s.target_line,
                action: SuggestedAction::Edit,
            };
            suggestion
        })
        .collect();

    Snapshot {
        metadata,
        analysis: AnalysisResult {
            performance,
            files,
            dependencies,
            templates,
            bottlenecks: Vec::new(),
        },
        suggestions,
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// File-backed snapshot store. Requires no locking beyond "no concurrent
/// writer for the same snapshot name".
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub const DEFAULT_ROOT: &'static str = ".bha/snapshots";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    fn baseline_file(&self) -> PathBuf {
        self.root.join(".baseline")
    }

    fn ensure_directory(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            BhaError::io(
                format!("failed to create storage directory: {}", self.root.display()),
                e,
            )
        })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.snapshot_path(name).is_file()
    }

    /// Snapshot names become file names under the storage root, so anything
    /// that could traverse out of it is rejected.
    fn validate_name(name: &str) -> Result<()> {
        let ok = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains("..")
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if ok {
            Ok(())
        } else {
            Err(BhaError::InvalidName(name.to_string()))
        }
    }

    /// Saves a snapshot. Refuses to overwrite an existing name unless
    /// `overwrite` is set; `created_at` is the current UTC instant.
    pub fn save(
        &self,
        name: &str,
        analysis: &AnalysisResult,
        suggestions: &[Suggestion],
        description: &str,
        tags: &[String],
        overwrite: bool,
    ) -> Result<()> {
        Self::validate_name(name)?;
        if self.exists(name) && !overwrite {
            return Err(BhaError::AlreadyExists(name.to_string()));
        }
        self.ensure_directory()?;

        let snapshot = Snapshot {
            metadata: SnapshotMetadata {
                name: name.to_string(),
                description: description.to_string(),
                created_at: Utc::now(),
                git_commit: git_commit(),
                git_branch: git_branch(),
                file_count: analysis.files.len(),
                total_build_time: analysis.performance.total_build_time,
                tags: tags.to_vec(),
            },
            analysis: analysis.clone(),
            suggestions: suggestions.to_vec(),
        };

        let json = encode(&snapshot);
        let body = serde_json::to_string_pretty(&json)?;
        let path = self.snapshot_path(name);
        std::fs::write(&path, body + "\n")
            .map_err(|e| BhaError::io(format!("failed to write snapshot: {}", path.display()), e))?;

        debug!(name, path = %path.display(), "snapshot saved");
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Snapshot> {
        Self::validate_name(name)?;
        let path = self.snapshot_path(name);
        if !path.is_file() {
            return Err(BhaError::NotFound(format!("snapshot: {name}")));
        }

        let body = std::fs::read_to_string(&path)
            .map_err(|e| BhaError::io(format!("failed to read snapshot: {}", path.display()), e))?;
        let json: SnapshotJson = serde_json::from_str(&body)
            .map_err(|e| BhaError::Parse(format!("snapshot {name}: {e}")))?;

        if !json.version.starts_with("2.") {
            return Err(BhaError::UnsupportedVersion(json.version));
        }

        Ok(decode(json, name))
    }

    /// Lists snapshot metadata, newest first. Unreadable snapshots are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<SnapshotMetadata>> {
        let mut snapshots = Vec::new();
        if !self.root.is_dir() {
            return Ok(snapshots);
        }

        let entries = std::fs::read_dir(&self.root)
            .map_err(|e| BhaError::io(format!("failed to list snapshots: {}", self.root.display()), e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if name == ".baseline" {
                continue;
            }
            match self.load(name) {
                Ok(snapshot) => snapshots.push(snapshot.metadata),
                Err(err) => warn!(name, "skipping unreadable snapshot: {err}"),
            }
        }

        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(snapshots)
    }

    /// Deletes a snapshot; clears the baseline pointer if it pointed here.
    pub fn remove(&self, name: &str) -> Result<()> {
        Self::validate_name(name)?;
        let path = self.snapshot_path(name);
        if !path.is_file() {
            return Err(BhaError::NotFound(format!("snapshot: {name}")));
        }
        std::fs::remove_file(&path)
            .map_err(|e| BhaError::io(format!("failed to remove snapshot: {}", path.display()), e))?;

        if self.get_baseline().as_deref() == Some(name) {
            self.clear_baseline()?;
        }
        Ok(())
    }

    pub fn set_baseline(&self, name: &str) -> Result<()> {
        if !self.exists(name) {
            return Err(BhaError::NotFound(format!("snapshot: {name}")));
        }
        self.ensure_directory()?;
        std::fs::write(self.baseline_file(), name)
            .map_err(|e| BhaError::io("failed to set baseline", e))
    }

    /// The baseline name, if one is set and its snapshot still exists.
    pub fn get_baseline(&self) -> Option<String> {
        let body = std::fs::read_to_string(self.baseline_file()).ok()?;
        let name = body.lines().next()?.trim().to_string();
        if !name.is_empty() && self.exists(&name) {
            Some(name)
        } else {
            None
        }
    }

    pub fn clear_baseline(&self) -> Result<()> {
        let path = self.baseline_file();
        if path.is_file() {
            std::fs::remove_file(&path)
                .map_err(|e| BhaError::io("failed to clear baseline", e))?;
        }
        Ok(())
    }

    pub fn compare(&self, old_name: &str, new_name: &str) -> Result<ComparisonResult> {
        let old = self.load(old_name)?;
        let new = self.load(new_name)?;
        Ok(compare_analyses(
            &old.analysis,
            &new.analysis,
            DEFAULT_SIGNIFICANCE_THRESHOLD,
        ))
    }

    pub fn compare_with_analysis(
        &self,
        snapshot_name: &str,
        current: &AnalysisResult,
    ) -> Result<ComparisonResult> {
        let old = self.load(snapshot_name)?;
        Ok(compare_analyses(
            &old.analysis,
            current,
            DEFAULT_SIGNIFICANCE_THRESHOLD,
        ))
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROOT)
    }
}

fn git_commit() -> String {
    git2::Repository::discover(".")
        .ok()
        .and_then(|repo| {
            let head = repo.head().ok()?;
            head.target().map(|oid| oid.to_string())
        })
        .unwrap_or_default()
}

fn git_branch() -> String {
    git2::Repository::discover(".")
        .ok()
        .and_then(|repo| {
            let head = repo.head().ok()?;
            head.shorthand().map(str::to_string)
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Diffs two analyses. Iteration follows the deterministically ordered
/// result vectors, so emission order is stable; change lists are sorted by
/// |delta| descending afterwards.
pub fn compare_analyses(
    old: &AnalysisResult,
    new: &AnalysisResult,
    significance_threshold: f64,
) -> ComparisonResult {
    let mut result = ComparisonResult::default();

    let old_total = old.performance.total_build_time;
    let new_total = new.performance.total_build_time;
    result.build_time_delta_ns = delta_ns(new_total, old_total);
    if old_total > Duration::ZERO {
        result.build_time_percent_change =
            100.0 * result.build_time_delta_ns as f64 / old_total.as_nanos() as f64;
    }

    result.file_count_delta = new.files.len() as i64 - old.files.len() as i64;

    let old_files: FxHashMap<String, &FileAnalysisResult> =
        old.files.iter().map(|f| (file_id(&f.file), f)).collect();
    let new_files: FxHashMap<String, &FileAnalysisResult> =
        new.files.iter().map(|f| (file_id(&f.file), f)).collect();

    for old_file in &old.files {
        let id = file_id(&old_file.file);
        match new_files.get(&id) {
            None => result.removed_files.push(old_file.file.clone()),
            Some(new_file) => {
                let delta = delta_ns(new_file.compile_time, old_file.compile_time);
                let percent = if old_file.compile_time > Duration::ZERO {
                    100.0 * delta as f64 / old_file.compile_time.as_nanos() as f64
                } else {
                    0.0
                };

                if percent.abs() > significance_threshold * 100.0 {
                    let change = FileChange {
                        file: old_file.file.clone(),
                        old_time: old_file.compile_time,
                        new_time: new_file.compile_time,
                        delta_ns: delta,
                        percent_change: percent,
                    };
                    if delta > 0 {
                        result.regressions.push(change);
                    } else {
                        result.improvements.push(change);
                    }
                }
            }
        }
    }

    for new_file in &new.files {
        if !old_files.contains_key(&file_id(&new_file.file)) {
            result.new_files.push(new_file.file.clone());
        }
    }

    result.regressions.sort_by_key(|c| std::cmp::Reverse(c.delta_ns.abs()));
    result.improvements.sort_by_key(|c| std::cmp::Reverse(c.delta_ns.abs()));

    let new_headers: FxHashMap<String, &HeaderInfo> = new
        .dependencies
        .headers
        .iter()
        .map(|h| (file_id(&h.path), h))
        .collect();

    for old_header in &old.dependencies.headers {
        let Some(new_header) = new_headers.get(&file_id(&old_header.path)) else {
            continue;
        };
        if old_header.inclusion_count == new_header.inclusion_count
            && old_header.total_parse_time == new_header.total_parse_time
        {
            continue;
        }
        let change = HeaderChange {
            header: old_header.path.clone(),
            old_inclusions: old_header.inclusion_count,
            new_inclusions: new_header.inclusion_count,
            old_time: old_header.total_parse_time,
            new_time: new_header.total_parse_time,
        };
        if new_header.inclusion_count > old_header.inclusion_count
            || new_header.total_parse_time > old_header.total_parse_time
        {
            result.header_regressions.push(change);
        } else {
            result.header_improvements.push(change);
        }
    }

    let new_templates: FxHashMap<&str, &TemplateInfo> = new
        .templates
        .templates
        .iter()
        .map(|t| (t.full_signature.as_str(), t))
        .collect();

    for old_template in &old.templates.templates {
        let Some(new_template) = new_templates.get(old_template.full_signature.as_str()) else {
            continue;
        };
        if old_template.instantiation_count == new_template.instantiation_count
            && old_template.total_time == new_template.total_time
        {
            continue;
        }
        let change = TemplateChange {
            name: old_template.full_signature.clone(),
            old_count: old_template.instantiation_count,
            new_count: new_template.instantiation_count,
            old_time: old_template.total_time,
            new_time: new_template.total_time,
        };
        if new_template.instantiation_count > old_template.instantiation_count
            || new_template.total_time > old_template.total_time
        {
            result.template_regressions.push(change);
        } else {
            result.template_improvements.push(change);
        }
    }

    result
}
