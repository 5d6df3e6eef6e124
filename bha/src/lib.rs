//! # bha: build hotspot analyzer
//!
//! Analyses compiler-emitted build traces (GCC `-ftime-report`, Clang
//! `-ftime-trace`, MSVC `/Bt+`) to find the files, headers and templates
//! that dominate compilation time, rank them, suggest optimisations with
//! estimated savings, and compare builds over time through named
//! snapshots.
//!
//! The analysis core is a pure pipeline: immutable [`models::trace::BuildTrace`]
//! in, immutable [`models::analysis::AnalysisResult`] out. The three
//! aggregate analysers (performance, dependencies, templates) run as
//! parallel tasks over the shared trace and join before bottleneck scoring
//! and suggestion generation.

pub mod cli;
pub mod config;
pub mod models;
pub mod parsers;
pub mod services;
pub mod utils;

// Re-exports for library consumers.
pub use config::{AnalysisOptions, BhaConfig, ResourceLimits, SuggesterOptions};
pub use models::analysis::AnalysisResult;
pub use models::error::{BhaError, Result};
pub use models::trace::{BuildTrace, CompilationUnit};
pub use services::pipeline::{run_full_analysis, AnalysisPipeline, AnalyzerRegistry};
pub use services::snapshot::{compare_analyses, ComparisonResult, Snapshot, SnapshotStore};
pub use services::suggest::{generate_all_suggestions, SuggesterRegistry};
