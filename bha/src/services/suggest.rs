//! The suggestion engine: rule-based generators over the fused analysis.
//!
//! Each rule produces at most one suggestion per trigger, with a
//! deterministic savings estimate. A failing rule is logged and contributes
//! nothing; suggestion generation never aborts an analysis.

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::config::SuggesterOptions;
use crate::models::analysis::AnalysisResult;
use crate::models::error::Result;
use crate::models::suggestion::{
    CodeSnippet, Priority, SuggestedAction, Suggestion, SuggestionType, TargetFile,
};
use crate::models::trace::BuildTrace;
use crate::utils::duration::{format_duration, percent_of};
use crate::utils::paths::file_id;

/// The rule generators, invoked in fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggesterKind {
    PrecompiledHeader,
    CycleBreak,
    TemplateReduction,
    CriticalPathIncludes,
    UnityBuild,
}

impl SuggesterKind {
    pub fn name(&self) -> &'static str {
        match self {
            SuggesterKind::PrecompiledHeader => "pch",
            SuggesterKind::CycleBreak => "cycle-break",
            SuggesterKind::TemplateReduction => "template-reduction",
            SuggesterKind::CriticalPathIncludes => "critical-path-includes",
            SuggesterKind::UnityBuild => "unity-build",
        }
    }

    fn run(
        &self,
        trace: &BuildTrace,
        analysis: &AnalysisResult,
        options: &SuggesterOptions,
    ) -> Result<Vec<Suggestion>> {
        match self {
            SuggesterKind::PrecompiledHeader => suggest_pch(analysis, options),
            SuggesterKind::CycleBreak => suggest_cycle_breaks(analysis),
            SuggesterKind::TemplateReduction => suggest_template_reduction(trace, analysis, options),
            SuggesterKind::CriticalPathIncludes => suggest_critical_path_includes(trace, analysis),
            SuggesterKind::UnityBuild => suggest_unity_builds(trace, analysis, options),
        }
    }
}

/// Explicit registry of suggestion rules.
#[derive(Debug, Clone)]
pub struct SuggesterRegistry {
    kinds: Vec<SuggesterKind>,
}

impl SuggesterRegistry {
    pub fn standard() -> Self {
        Self {
            kinds: vec![
                SuggesterKind::PrecompiledHeader,
                SuggesterKind::CycleBreak,
                SuggesterKind::TemplateReduction,
                SuggesterKind::CriticalPathIncludes,
                SuggesterKind::UnityBuild,
            ],
        }
    }

    pub fn with_kinds(kinds: Vec<SuggesterKind>) -> Self {
        Self { kinds }
    }

    pub fn kinds(&self) -> &[SuggesterKind] {
        &self.kinds
    }
}

impl Default for SuggesterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Runs every registered rule, then filters by confidence, safety and
/// priority, sorts by `(priority, savings desc)` and trims to the limit.
pub fn generate_all_suggestions(
    registry: &SuggesterRegistry,
    trace: &BuildTrace,
    analysis: &AnalysisResult,
    options: &SuggesterOptions,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for kind in registry.kinds() {
        match kind.run(trace, analysis, options) {
            Ok(mut batch) => suggestions.append(&mut batch),
            Err(err) => {
                warn!(suggester = kind.name(), "suggester failed: {err}");
            }
        }
    }

    suggestions.retain(|s| {
        s.confidence >= options.min_confidence
            && s.priority <= options.min_priority
            && (s.is_safe || options.include_unsafe)
    });

    suggestions.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.estimated_savings.cmp(&a.estimated_savings))
    });
    suggestions.truncate(options.max_suggestions);
    suggestions
}

fn with_savings(mut s: Suggestion, savings: Duration, build_total: Duration) -> Suggestion {
    s.estimated_savings = savings;
    s.estimated_savings_percent = percent_of(savings, build_total);
    s
}

/// Headers included often enough, and expensive enough in aggregate, belong
/// in a precompiled header. Savings: all but one parse is eliminated.
fn suggest_pch(analysis: &AnalysisResult, options: &SuggesterOptions) -> Result<Vec<Suggestion>> {
    let build_total = analysis.performance.total_build_time;
    let mut suggestions = Vec::new();

    for header in &analysis.dependencies.headers {
        if header.inclusion_count < options.pch_min_inclusions
            || header.total_parse_time < options.pch_min_parse_time
        {
            continue;
        }

        let savings = header.total_parse_time * (header.inclusion_count as u32 - 1)
            / header.inclusion_count as u32;

        let mut s = Suggestion::new(
            SuggestionType::Pch,
            Priority::High,
            format!("Precompile {}", header.path.display()),
        );
        s.confidence = 0.8;
        s.description = format!(
            "{} is parsed {} times across {} files for a total of {}.",
            header.path.display(),
            header.inclusion_count,
            header.including_files,
            format_duration(header.total_parse_time),
        );
        s.rationale = "A precompiled header is parsed once and reused by every \
                       translation unit, so repeated inclusions become nearly free."
            .to_string();
        s.target_file = TargetFile::new(header.path.clone(), SuggestedAction::Edit);
        s.implementation_steps = vec![
            format!("Add {} to the precompiled header set", header.path.display()),
            "Enable PCH in the build system (target_precompile_headers for CMake)".to_string(),
            "Rebuild and compare".to_string(),
        ];
        s.caveats = vec![
            "PCH invalidation makes edits to this header rebuild everything that uses the PCH"
                .to_string(),
        ];
        s.before_code = CodeSnippet::cpp(format!("#include \"{}\"", header.path.display()));
        s.after_code = CodeSnippet::cpp("// covered by pch.h");
        s.verification = "Re-run the traced build and compare header parse totals".to_string();
        s.is_safe = true;

        suggestions.push(with_savings(s, savings, build_total));
    }

    Ok(suggestions)
}

/// One split suggestion per detected include cycle. The target is the
/// member participating in the most cycles overall, i.e. the best cycle
/// breaker. Savings: a tenth of the cycle's node time (re-parse slack).
fn suggest_cycle_breaks(analysis: &AnalysisResult) -> Result<Vec<Suggestion>> {
    let build_total = analysis.performance.total_build_time;
    let mut suggestions = Vec::new();

    let mut participation: FxHashMap<&str, usize> = FxHashMap::default();
    for cycle in &analysis.dependencies.cycles {
        for node in &cycle.nodes {
            *participation.entry(node.as_str()).or_insert(0) += 1;
        }
    }

    for cycle in &analysis.dependencies.cycles {
        let Some(entry) = cycle
            .nodes
            .iter()
            .max_by_key(|n| participation.get(n.as_str()).copied().unwrap_or(0))
        else {
            continue;
        };

        let mut s = Suggestion::new(
            SuggestionType::HeaderSplit,
            Priority::High,
            format!("Break include cycle through {entry}"),
        );
        s.confidence = 0.7;
        s.description = format!(
            "Include cycle: {}. Cyclic headers force redundant parses and defeat \
             dependency-based rebuild pruning.",
            cycle.nodes.join(" -> "),
        );
        s.rationale = "Splitting declarations from definitions (or introducing a \
                       forward-declaration header) removes the back edge."
            .to_string();
        s.target_file = TargetFile::new(PathBuf::from(entry), SuggestedAction::Split);
        s.secondary_files = cycle.nodes[1..]
            .iter()
            .filter(|n| *n != entry)
            .map(|n| TargetFile::new(PathBuf::from(n), SuggestedAction::Edit))
            .collect();
        s.implementation_steps = vec![
            format!("Move the declarations {entry} exports into a new -fwd header"),
            "Point the other cycle members at the forward header".to_string(),
            "Verify the include graph is acyclic again".to_string(),
        ];
        s.caveats = vec!["Splitting a header changes include paths for downstream code".to_string()];
        s.is_safe = false;

        suggestions.push(with_savings(s, cycle.total_time / 10, build_total));
    }

    Ok(suggestions)
}

/// Template signatures that dominate instantiation time. Savings: half the
/// signature's total time (explicit instantiation amortises the rest).
fn suggest_template_reduction(
    trace: &BuildTrace,
    analysis: &AnalysisResult,
    options: &SuggesterOptions,
) -> Result<Vec<Suggestion>> {
    let build_total = analysis.performance.total_build_time;
    let template_total = analysis.templates.total_template_time;
    if template_total.is_zero() {
        return Ok(Vec::new());
    }

    let mut suggestions = Vec::new();
    for info in &analysis.templates.templates {
        let share = percent_of(info.total_time, template_total);
        if share < options.template_share_threshold {
            continue;
        }

        let host = trace
            .units
            .iter()
            .find(|u| u.templates.iter().any(|t| t.signature == info.full_signature))
            .map(|u| u.source_file.clone())
            .unwrap_or_default();

        let mut s = Suggestion::new(
            SuggestionType::TemplateReduction,
            Priority::Medium,
            format!("Reduce instantiations of {}", info.name),
        );
        s.confidence = 0.6;
        s.description = format!(
            "{} accounts for {share:.1}% of all template time ({} over {} instantiations).",
            info.full_signature,
            format_duration(info.total_time),
            info.instantiation_count,
        );
        s.rationale = "An extern template declaration plus one explicit instantiation \
                       compiles the template once instead of per translation unit."
            .to_string();
        s.target_file = TargetFile::new(host, SuggestedAction::Edit);
        s.implementation_steps = vec![
            format!("Declare `extern template` for {} in a shared header", info.full_signature),
            "Explicitly instantiate it in a single .cpp".to_string(),
        ];
        s.before_code = CodeSnippet::cpp(format!("// each TU instantiates {}", info.full_signature));
        s.after_code = CodeSnippet::cpp(format!("extern template class {};", info.full_signature));
        s.verification = "Instantiation counts for the signature should drop to one".to_string();
        s.is_safe = true;

        suggestions.push(with_savings(s, info.total_time / 2, build_total));
    }

    Ok(suggestions)
}

/// Files on the critical path whose compile time exceeds P90 get a
/// forward-declaration suggestion, plus an include-removal suggestion for
/// their heaviest include.
fn suggest_critical_path_includes(
    trace: &BuildTrace,
    analysis: &AnalysisResult,
) -> Result<Vec<Suggestion>> {
    let build_total = analysis.performance.total_build_time;
    let p90 = analysis.performance.p90_file_time;
    let mut suggestions = Vec::new();

    let units: FxHashMap<String, &crate::models::trace::CompilationUnit> = trace
        .units
        .iter()
        .map(|u| (file_id(&u.source_file), u))
        .collect();

    for path in &analysis.performance.critical_path {
        let id = file_id(path);
        let Some(unit) = units.get(&id) else {
            continue; // headers on the path are covered by the PCH rule
        };
        if unit.metrics.total_time <= p90 {
            continue;
        }

        let mut s = Suggestion::new(
            SuggestionType::ForwardDecl,
            Priority::High,
            format!("Forward-declare heavy types in {}", path.display()),
        );
        s.confidence = 0.5;
        s.description = format!(
            "{} sits on the critical path and its {} compile time is above the \
             P90 of {}.",
            path.display(),
            format_duration(unit.metrics.total_time),
            format_duration(p90),
        );
        s.rationale = "Forward declarations let dependents compile against names \
                       without parsing full definitions, shortening the critical chain."
            .to_string();
        s.target_file = TargetFile::new(path.clone(), SuggestedAction::Edit);
        s.implementation_steps = vec![
            "Replace includes that are only needed for pointers/references with forward declarations"
                .to_string(),
            "Move remaining includes into the .cpp".to_string(),
        ];
        s.is_safe = true;
        suggestions.push(with_savings(
            s,
            unit.metrics.total_time * 15 / 100,
            build_total,
        ));

        if let Some(heaviest) = unit.includes.iter().max_by_key(|i| i.parse_time) {
            let mut s = Suggestion::new(
                SuggestionType::IncludeRemoval,
                Priority::High,
                format!(
                    "Drop {} from {}",
                    heaviest.header.display(),
                    path.display()
                ),
            );
            s.confidence = 0.5;
            s.description = format!(
                "{} spends {} parsing {}; if the dependency is incidental, removing \
                 it shortens the critical path directly.",
                path.display(),
                format_duration(heaviest.parse_time),
                heaviest.header.display(),
            );
            s.rationale =
                "The heaviest include on a critical-path file is the single largest \
                 parse cost that one edit can remove."
                    .to_string();
            s.target_file = TargetFile::new(path.clone(), SuggestedAction::Edit);
            s.secondary_files =
                vec![TargetFile::new(heaviest.header.clone(), SuggestedAction::Edit)];
            s.caveats = vec![
                "Verify nothing in the file needs the header transitively".to_string(),
            ];
            s.is_safe = false;
            suggestions.push(with_savings(s, heaviest.parse_time, build_total));
        }
    }

    Ok(suggestions)
}

/// Directories with many quick-compiling units amortise per-invocation
/// overhead poorly; a unity build merges them. Savings: 30% of their sum.
fn suggest_unity_builds(
    trace: &BuildTrace,
    analysis: &AnalysisResult,
    options: &SuggesterOptions,
) -> Result<Vec<Suggestion>> {
    let build_total = analysis.performance.total_build_time;

    let mut by_dir: FxHashMap<PathBuf, Vec<&crate::models::trace::CompilationUnit>> =
        FxHashMap::default();
    let mut dir_order: Vec<PathBuf> = Vec::new();
    for unit in &trace.units {
        if unit.metrics.total_time > options.unity_max_file_time {
            continue;
        }
        let dir = unit
            .source_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        by_dir.entry(dir.clone()).or_insert_with(|| {
            dir_order.push(dir);
            Vec::new()
        }).push(unit);
    }

    let mut suggestions = Vec::new();
    for dir in dir_order {
        let units = &by_dir[&dir];
        if units.len() < options.unity_min_files {
            continue;
        }

        let combined: Duration = units.iter().map(|u| u.metrics.total_time).sum();
        let dir_display = if dir.as_os_str().is_empty() {
            ".".to_string()
        } else {
            dir.display().to_string()
        };

        let mut s = Suggestion::new(
            SuggestionType::UnityBuild,
            Priority::Medium,
            format!("Unity build for {dir_display}"),
        );
        s.confidence = 0.5;
        s.description = format!(
            "{} contains {} small files totalling {}; most of that is repeated \
             header parsing and compiler startup.",
            dir_display,
            units.len(),
            format_duration(combined),
        );
        s.rationale = "Compiling the files as one unit parses shared headers once."
            .to_string();
        s.target_file = TargetFile::new(dir.join("unity.cpp"), SuggestedAction::Create);
        s.secondary_files = units
            .iter()
            .map(|u| TargetFile::new(u.source_file.clone(), SuggestedAction::Edit))
            .collect();
        s.implementation_steps = vec![
            format!("Generate a unity source including the {} files", units.len()),
            "Exclude the originals from the direct build".to_string(),
        ];
        s.caveats = vec![
            "Unity builds surface ODR conflicts and anonymous-namespace clashes".to_string(),
            "Incremental rebuilds of one file become rebuilds of the group".to_string(),
        ];
        s.is_safe = false;

        suggestions.push(with_savings(s, combined * 3 / 10, build_total));
    }

    Ok(suggestions)
}
