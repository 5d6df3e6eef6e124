//! The analysis pipeline: explicit analyzer registry, parallel fan-out over
//! the immutable trace, and a single join point before bottleneck scoring.

use tracing::{debug, info_span};

use crate::config::AnalysisOptions;
use crate::models::analysis::{AnalysisResult, DependencyAnalysis, TemplateAnalysis};
use crate::models::error::Result;
use crate::models::trace::BuildTrace;
use crate::services::bottleneck::identify_bottlenecks;
use crate::services::limits::{CancelFlag, ResourceLimiter};
use crate::services::performance::{self, PerformanceOutput};
use crate::services::{dependency, template};

/// The analyzers the pipeline can run. A tagged set rather than trait
/// objects: the pipeline invokes each kind in fixed order, and nothing is
/// looked up dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    Performance,
    Dependencies,
    Templates,
}

impl AnalyzerKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyzerKind::Performance => "performance",
            AnalyzerKind::Dependencies => "dependencies",
            AnalyzerKind::Templates => "templates",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnalyzerKind::Performance => "File timings, percentiles and the critical path",
            AnalyzerKind::Dependencies => "Header costs, impact scores and include cycles",
            AnalyzerKind::Templates => "Template instantiation hot spots",
        }
    }
}

enum AnalyzerOutput {
    Performance(Box<PerformanceOutput>),
    Dependencies(DependencyAnalysis),
    Templates(TemplateAnalysis),
}

/// Explicit registry of analyzers, passed to the pipeline instead of a
/// process-global table.
#[derive(Debug, Clone)]
pub struct AnalyzerRegistry {
    kinds: Vec<AnalyzerKind>,
}

impl AnalyzerRegistry {
    /// All analyzers in their fixed invocation order.
    pub fn standard() -> Self {
        Self {
            kinds: vec![
                AnalyzerKind::Performance,
                AnalyzerKind::Dependencies,
                AnalyzerKind::Templates,
            ],
        }
    }

    pub fn with_kinds(kinds: Vec<AnalyzerKind>) -> Self {
        Self { kinds }
    }

    pub fn kinds(&self) -> &[AnalyzerKind] {
        &self.kinds
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Drives a full analysis run. The three aggregate analyzers share no
/// mutable state and run as parallel tasks over the same trace; their
/// outputs merge at one join point before bottleneck scoring.
pub struct AnalysisPipeline {
    registry: AnalyzerRegistry,
    limiter: ResourceLimiter,
    cancel: CancelFlag,
}

impl AnalysisPipeline {
    pub fn new(registry: AnalyzerRegistry, limiter: ResourceLimiter) -> Self {
        Self {
            registry,
            limiter,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&mut self, trace: &BuildTrace, options: &AnalysisOptions) -> Result<AnalysisResult> {
        let _span = info_span!("analysis", units = trace.units.len()).entered();

        self.limiter.start_timer();
        self.limiter.check_unit_count(trace.units.len())?;
        self.limiter.check_memory_limit()?;
        self.cancel.check()?;

        // The unit graph backs both the performance analyzer and bottleneck
        // scoring; build it once and gate on its size.
        let graph = performance::build_unit_graph(trace);
        self.limiter.check_graph_size(graph.node_count(), graph.edge_count())?;
        self.cancel.check()?;

        let run_one = |kind: AnalyzerKind| -> AnalyzerOutput {
            debug!(analyzer = kind.name(), "running analyzer");
            match kind {
                AnalyzerKind::Performance => AnalyzerOutput::Performance(Box::new(
                    performance::analyze(trace, &graph, options),
                )),
                AnalyzerKind::Dependencies => {
                    AnalyzerOutput::Dependencies(dependency::analyze(trace, options))
                }
                AnalyzerKind::Templates => {
                    AnalyzerOutput::Templates(template::analyze(trace, options))
                }
            }
        };

        // Registry order is preserved in the merged output regardless of
        // completion order.
        let mut outputs: Vec<AnalyzerOutput> = Vec::with_capacity(self.registry.kinds().len());
        let kinds = self.registry.kinds().to_vec();
        match kinds.as_slice() {
            [a, b, c] => {
                let (out_a, (out_b, out_c)) =
                    rayon::join(|| run_one(*a), || rayon::join(|| run_one(*b), || run_one(*c)));
                outputs.push(out_a);
                outputs.push(out_b);
                outputs.push(out_c);
            }
            _ => {
                for kind in &kinds {
                    outputs.push(run_one(*kind));
                }
            }
        }

        self.limiter.check_time_limit()?;
        self.limiter.check_memory_limit()?;
        self.cancel.check()?;

        let mut result = AnalysisResult::default();
        let mut critical_path_nodes: Vec<String> = Vec::new();
        for output in outputs {
            match output {
                AnalyzerOutput::Performance(perf) => {
                    result.performance = perf.performance;
                    result.files = perf.files;
                    critical_path_nodes = perf.critical_path_nodes;
                }
                AnalyzerOutput::Dependencies(deps) => result.dependencies = deps,
                AnalyzerOutput::Templates(templates) => result.templates = templates,
            }
        }

        result.bottlenecks =
            identify_bottlenecks(&graph, &critical_path_nodes, options.max_bottlenecks);

        self.limiter.check_time_limit()?;
        Ok(result)
    }
}

/// Convenience entry point with the standard registry and default limits.
pub fn run_full_analysis(trace: &BuildTrace, options: &AnalysisOptions) -> Result<AnalysisResult> {
    let mut pipeline = AnalysisPipeline::new(AnalyzerRegistry::standard(), ResourceLimiter::default());
    pipeline.run(trace, options)
}

/// Variant used by callers hosting cancellation externally.
pub fn run_full_analysis_cancellable(
    trace: &BuildTrace,
    options: &AnalysisOptions,
    limiter: ResourceLimiter,
    cancel: CancelFlag,
) -> Result<AnalysisResult> {
    let mut pipeline =
        AnalysisPipeline::new(AnalyzerRegistry::standard(), limiter).with_cancel_flag(cancel);
    pipeline.run(trace, options)
}
