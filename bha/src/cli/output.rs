//! Text and JSON renderers for CLI results.

use serde_json::{json, Value};

use crate::models::analysis::AnalysisResult;
use crate::models::suggestion::Suggestion;
use crate::services::snapshot::{ComparisonResult, SnapshotMetadata};
use crate::utils::duration::{duration_to_ms, format_delta, format_duration};
use crate::utils::paths::abbreviate;

fn limit_or_all<T>(items: &[T], limit: usize) -> &[T] {
    if limit == 0 || limit >= items.len() {
        items
    } else {
        &items[..limit]
    }
}

pub fn render_analysis_text(result: &AnalysisResult, top: usize) -> String {
    let mut out = String::new();
    let perf = &result.performance;

    out.push_str("# Build Analysis\n\n");
    out.push_str(&format!(
        "Total build time:       {}\n",
        format_duration(perf.total_build_time)
    ));
    out.push_str(&format!(
        "Sequential time:        {}\n",
        format_duration(perf.sequential_time)
    ));
    out.push_str(&format!(
        "Parallelism:            {:.2}x\n",
        perf.parallelism_efficiency
    ));
    out.push_str(&format!("Files:                  {}\n", perf.total_files));
    out.push_str(&format!(
        "Avg / median file time: {} / {}\n",
        format_duration(perf.avg_file_time),
        format_duration(perf.median_file_time)
    ));
    out.push_str(&format!(
        "P90 / P99 file time:    {} / {}\n",
        format_duration(perf.p90_file_time),
        format_duration(perf.p99_file_time)
    ));

    if !result.files.is_empty() {
        out.push_str(&format!("\n## Slowest Files (top {})\n\n", limit_or_all(&result.files, top).len()));
        for file in limit_or_all(&result.files, top) {
            out.push_str(&format!(
                "{:>4}. {:<50} {:>10} {:>6.1}%\n",
                file.rank,
                abbreviate(&file.file, 50),
                format_duration(file.compile_time),
                file.time_percent,
            ));
        }
    }

    if !result.dependencies.headers.is_empty() {
        out.push_str(&format!(
            "\n## Headers ({} unique, {} inclusions, {} parse time)\n\n",
            result.dependencies.unique_headers,
            result.dependencies.total_includes,
            format_duration(result.dependencies.total_include_time),
        ));
        for header in limit_or_all(&result.dependencies.headers, top) {
            out.push_str(&format!(
                "  {:<50} {:>10}  x{:<4} impact {:.2}\n",
                abbreviate(&header.path, 50),
                format_duration(header.total_parse_time),
                header.inclusion_count,
                header.impact_score,
            ));
        }
        if !result.dependencies.cycles.is_empty() {
            out.push_str(&format!(
                "\n  WARNING: {} include cycle(s) detected\n",
                result.dependencies.cycles.len()
            ));
            for cycle in &result.dependencies.cycles {
                out.push_str(&format!("    {}\n", cycle.nodes.join(" -> ")));
            }
        }
    }

    if !result.templates.templates.is_empty() {
        out.push_str(&format!(
            "\n## Templates ({} instantiations, {} / {:.1}% of build)\n\n",
            result.templates.total_instantiations,
            format_duration(result.templates.total_template_time),
            result.templates.template_time_percent,
        ));
        for template in limit_or_all(&result.templates.templates, top) {
            out.push_str(&format!(
                "  {:<60} {:>10}  x{}\n",
                template.name,
                format_duration(template.total_time),
                template.instantiation_count,
            ));
        }
    }

    if !perf.critical_path.is_empty() {
        out.push_str(&format!(
            "\n## Critical Path ({} nodes)\n\n",
            perf.critical_path.len()
        ));
        for path in &perf.critical_path {
            out.push_str(&format!("  {}\n", path.display()));
        }
    }

    if !result.bottlenecks.is_empty() {
        out.push_str("\n## Bottlenecks\n\n");
        for bottleneck in limit_or_all(&result.bottlenecks, top) {
            out.push_str(&format!(
                "  {:<50} {:>10}  {:>4} dependents  score {:>8.0}{}\n",
                abbreviate(&bottleneck.file, 50),
                format_duration(bottleneck.compile_time),
                bottleneck.dependent_count,
                bottleneck.bottleneck_score,
                if bottleneck.on_critical_path {
                    "  [critical path]"
                } else {
                    ""
                },
            ));
        }
    }

    out
}

pub fn render_analysis_json(result: &AnalysisResult) -> Value {
    let perf = &result.performance;
    json!({
        "performance": {
            "total_build_time_ms": duration_to_ms(perf.total_build_time),
            "sequential_time_ms": duration_to_ms(perf.sequential_time),
            "parallel_time_ms": duration_to_ms(perf.parallel_time),
            "parallelism_efficiency": perf.parallelism_efficiency,
            "total_files": perf.total_files,
            "avg_file_time_ms": duration_to_ms(perf.avg_file_time),
            "median_file_time_ms": duration_to_ms(perf.median_file_time),
            "p90_file_time_ms": duration_to_ms(perf.p90_file_time),
            "p99_file_time_ms": duration_to_ms(perf.p99_file_time),
            "critical_path": perf.critical_path.iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>(),
        },
        "files": result.files.iter().map(|f| json!({
            "rank": f.rank,
            "path": f.file.to_string_lossy(),
            "compile_time_ms": duration_to_ms(f.compile_time),
            "time_percent": f.time_percent,
            "include_count": f.include_count,
            "template_count": f.template_count,
        })).collect::<Vec<_>>(),
        "dependencies": {
            "total_includes": result.dependencies.total_includes,
            "unique_headers": result.dependencies.unique_headers,
            "max_include_depth": result.dependencies.max_include_depth,
            "total_include_time_ms": duration_to_ms(result.dependencies.total_include_time),
            "cycles": result.dependencies.cycles.iter()
                .map(|c| c.nodes.clone())
                .collect::<Vec<_>>(),
            "headers": result.dependencies.headers.iter().map(|h| json!({
                "path": h.path.to_string_lossy(),
                "total_parse_time_ms": duration_to_ms(h.total_parse_time),
                "inclusion_count": h.inclusion_count,
                "including_files": h.including_files,
                "impact_score": h.impact_score,
            })).collect::<Vec<_>>(),
        },
        "templates": {
            "total_template_time_ms": duration_to_ms(result.templates.total_template_time),
            "template_time_percent": result.templates.template_time_percent,
            "total_instantiations": result.templates.total_instantiations,
            "templates": result.templates.templates.iter().map(|t| json!({
                "name": t.name,
                "full_signature": t.full_signature,
                "total_time_ms": duration_to_ms(t.total_time),
                "instantiation_count": t.instantiation_count,
                "time_percent": t.time_percent,
            })).collect::<Vec<_>>(),
        },
        "bottlenecks": result.bottlenecks.iter().map(|b| json!({
            "file": b.file.to_string_lossy(),
            "compile_time_ms": duration_to_ms(b.compile_time),
            "dependent_count": b.dependent_count,
            "bottleneck_score": b.bottleneck_score,
            "on_critical_path": b.on_critical_path,
        })).collect::<Vec<_>>(),
    })
}

pub fn render_suggestions_text(suggestions: &[Suggestion], detailed: bool) -> String {
    if suggestions.is_empty() {
        return "No suggestions. The build looks healthy.\n".to_string();
    }

    let mut out = String::new();
    if detailed {
        for (i, s) in suggestions.iter().enumerate() {
            out.push_str(&format!(
                "\n{}\n[{}/{}] {} {}: {}\n{}\n\n",
                "=".repeat(70),
                i + 1,
                suggestions.len(),
                s.priority.as_str().to_uppercase(),
                s.suggestion_type.as_str(),
                s.title,
                "=".repeat(70),
            ));
            out.push_str(&format!("Description:\n  {}\n\n", s.description));
            if !s.rationale.is_empty() {
                out.push_str(&format!("Rationale:\n  {}\n\n", s.rationale));
            }
            out.push_str(&format!(
                "Target: {} ({})\n",
                s.target_file.path.display(),
                s.target_file.action.as_str()
            ));
            if !s.implementation_steps.is_empty() {
                out.push_str("Steps:\n");
                for (j, step) in s.implementation_steps.iter().enumerate() {
                    out.push_str(&format!("  {}. {step}\n", j + 1));
                }
            }
            if !s.before_code.code.is_empty() {
                out.push_str(&format!("Before:\n  {}\n", s.before_code.code));
            }
            if !s.after_code.code.is_empty() {
                out.push_str(&format!("After:\n  {}\n", s.after_code.code));
            }
            out.push_str(&format!(
                "Impact: saves ~{} ({:.1}% of build), confidence {:.0}%\n",
                format_duration(s.estimated_savings),
                s.estimated_savings_percent,
                s.confidence * 100.0,
            ));
            if !s.caveats.is_empty() {
                out.push_str("Caveats:\n");
                for caveat in &s.caveats {
                    out.push_str(&format!("  - {caveat}\n"));
                }
            }
            if !s.verification.is_empty() {
                out.push_str(&format!("Verification:\n  {}\n", s.verification));
            }
        }
    } else {
        for (i, s) in suggestions.iter().enumerate() {
            out.push_str(&format!(
                "{:>3}. [{:<8}] {:<60} ~{}\n",
                i + 1,
                s.priority.as_str(),
                s.title,
                format_duration(s.estimated_savings),
            ));
        }
    }

    let total_savings: std::time::Duration =
        suggestions.iter().map(|s| s.estimated_savings).sum();
    out.push_str(&format!(
        "\nTotal: {} suggestions, potential savings {}\n",
        suggestions.len(),
        format_duration(total_savings)
    ));
    out
}

pub fn render_suggestions_json(suggestions: &[Suggestion]) -> Value {
    json!(suggestions
        .iter()
        .map(|s| json!({
            "type": s.suggestion_type.as_str(),
            "priority": s.priority.as_str(),
            "title": s.title,
            "description": s.description,
            "target_file": s.target_file.path.to_string_lossy(),
            "target_line": s.target_file.line_start,
            "confidence": s.confidence,
            "estimated_savings_ms": duration_to_ms(s.estimated_savings),
            "estimated_savings_percent": s.estimated_savings_percent,
            "is_safe": s.is_safe,
        }))
        .collect::<Vec<_>>())
}

pub fn render_comparison_text(result: &ComparisonResult) -> String {
    let mut out = String::new();
    out.push_str("# Build Comparison\n\n");
    out.push_str(&format!(
        "Build time change: {} ({:+.1}%)\n",
        format_delta(result.build_time_delta_ns),
        result.build_time_percent_change,
    ));
    out.push_str(&format!("File count change: {:+}\n", result.file_count_delta));

    let verdict = if result.is_regression() && result.is_significant() {
        "REGRESSION"
    } else if result.is_improvement() && result.is_significant() {
        "IMPROVEMENT"
    } else {
        "no significant change"
    };
    out.push_str(&format!("Verdict: {verdict}\n"));

    if !result.regressions.is_empty() {
        out.push_str(&format!("\n## Regressions ({})\n\n", result.regressions.len()));
        for change in &result.regressions {
            out.push_str(&format!(
                "  {:<50} {} -> {} ({:+.1}%)\n",
                abbreviate(&change.file, 50),
                format_duration(change.old_time),
                format_duration(change.new_time),
                change.percent_change,
            ));
        }
    }

    if !result.improvements.is_empty() {
        out.push_str(&format!(
            "\n## Improvements ({})\n\n",
            result.improvements.len()
        ));
        for change in &result.improvements {
            out.push_str(&format!(
                "  {:<50} {} -> {} ({:+.1}%)\n",
                abbreviate(&change.file, 50),
                format_duration(change.old_time),
                format_duration(change.new_time),
                change.percent_change,
            ));
        }
    }

    if !result.new_files.is_empty() {
        out.push_str(&format!("\nNew files: {}\n", result.new_files.len()));
    }
    if !result.removed_files.is_empty() {
        out.push_str(&format!("Removed files: {}\n", result.removed_files.len()));
    }
    if !result.header_regressions.is_empty() {
        out.push_str(&format!(
            "Header regressions: {}\n",
            result.header_regressions.len()
        ));
    }
    if !result.template_regressions.is_empty() {
        out.push_str(&format!(
            "Template regressions: {}\n",
            result.template_regressions.len()
        ));
    }

    out
}

pub fn render_comparison_json(result: &ComparisonResult) -> Value {
    json!({
        "build_time_delta_ms": result.build_time_delta_ns as f64 / 1_000_000.0,
        "build_time_percent_change": result.build_time_percent_change,
        "file_count_delta": result.file_count_delta,
        "is_regression": result.is_regression(),
        "is_improvement": result.is_improvement(),
        "is_significant": result.is_significant(),
        "regressions": result.regressions.iter().map(|c| json!({
            "file": c.file.to_string_lossy(),
            "old_time_ms": duration_to_ms(c.old_time),
            "new_time_ms": duration_to_ms(c.new_time),
            "percent_change": c.percent_change,
        })).collect::<Vec<_>>(),
        "improvements": result.improvements.iter().map(|c| json!({
            "file": c.file.to_string_lossy(),
            "old_time_ms": duration_to_ms(c.old_time),
            "new_time_ms": duration_to_ms(c.new_time),
            "percent_change": c.percent_change,
        })).collect::<Vec<_>>(),
        "new_files": result.new_files.iter()
            .map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
        "removed_files": result.removed_files.iter()
            .map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
    })
}

pub fn render_snapshot_list_text(snapshots: &[SnapshotMetadata]) -> String {
    if snapshots.is_empty() {
        return "No snapshots. Create one with: bha snapshot save <name> <trace-files...>\n"
            .to_string();
    }

    let mut out = String::new();
    out.push_str(&format!("{} snapshot(s):\n\n", snapshots.len()));
    for meta in snapshots {
        out.push_str(&format!(
            "  {:<24} {}  {:>5} files  {:>10}",
            meta.name,
            meta.created_at.format("%Y-%m-%d %H:%M:%S"),
            meta.file_count,
            format_duration(meta.total_build_time),
        ));
        if !meta.tags.is_empty() {
            out.push_str(&format!("  [{}]", meta.tags.join(", ")));
        }
        out.push('\n');
    }
    out
}

pub fn render_snapshot_list_json(snapshots: &[SnapshotMetadata]) -> Value {
    json!(snapshots
        .iter()
        .map(|m| json!({
            "name": m.name,
            "description": m.description,
            "created_at": m.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "git_commit": m.git_commit,
            "git_branch": m.git_branch,
            "file_count": m.file_count,
            "total_build_time_ms": duration_to_ms(m.total_build_time),
            "tags": m.tags,
        }))
        .collect::<Vec<_>>())
}
