//! Template instantiation analysis: per-signature aggregation and ranking.

use rustc_hash::FxHashMap;
use std::time::Duration;

use crate::config::AnalysisOptions;
use crate::models::analysis::{TemplateAnalysis, TemplateInfo};
use crate::models::trace::BuildTrace;
use crate::utils::duration::percent_of;

/// Base name of a template signature: everything before the first
/// type-argument list, e.g. `std::vector<int>` -> `std::vector`.
pub fn template_base_name(signature: &str) -> String {
    match signature.find('<') {
        Some(pos) => signature[..pos].trim().to_string(),
        None => signature.trim().to_string(),
    }
}

#[derive(Default)]
struct TemplateAccumulator {
    total_time: Duration,
    instantiation_count: usize,
}

/// Aggregates template records by full signature across all units.
pub fn analyze(trace: &BuildTrace, _options: &AnalysisOptions) -> TemplateAnalysis {
    let mut result = TemplateAnalysis::default();
    let mut accumulators: FxHashMap<String, TemplateAccumulator> = FxHashMap::default();
    let mut signature_order: Vec<String> = Vec::new();

    for unit in &trace.units {
        for record in &unit.templates {
            let entry = accumulators.entry(record.signature.clone()).or_insert_with(|| {
                signature_order.push(record.signature.clone());
                TemplateAccumulator::default()
            });
            entry.total_time += record.total_time;
            entry.instantiation_count += record.instantiation_count;
        }
    }

    for signature in &signature_order {
        let acc = &accumulators[signature];
        result.total_template_time += acc.total_time;
        result.total_instantiations += acc.instantiation_count;
        result.templates.push(TemplateInfo {
            name: template_base_name(signature),
            full_signature: signature.clone(),
            total_time: acc.total_time,
            instantiation_count: acc.instantiation_count,
            time_percent: percent_of(acc.total_time, trace.total_time),
        });
    }

    result.template_time_percent = percent_of(result.total_template_time, trace.total_time);

    result.templates.sort_by(|a, b| {
        b.total_time
            .cmp(&a.total_time)
            .then_with(|| a.full_signature.cmp(&b.full_signature))
    });

    result
}
