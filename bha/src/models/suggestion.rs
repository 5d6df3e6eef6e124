use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Kind of optimisation a suggestion proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Pch,
    ForwardDecl,
    UnityBuild,
    TemplateReduction,
    IncludeRemoval,
    HeaderSplit,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Pch => "pch",
            SuggestionType::ForwardDecl => "forward_decl",
            SuggestionType::UnityBuild => "unity_build",
            SuggestionType::TemplateReduction => "template_reduction",
            SuggestionType::IncludeRemoval => "include_removal",
            SuggestionType::HeaderSplit => "header_split",
        }
    }
}

/// Priority buckets, ordered most-urgent-first so that an ascending sort
/// puts critical suggestions at the top.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the suggestion wants done to its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedAction {
    #[default]
    Edit,
    Create,
    Remove,
    Split,
}

impl SuggestedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestedAction::Edit => "edit",
            SuggestedAction::Create => "create",
            SuggestedAction::Remove => "remove",
            SuggestedAction::Split => "split",
        }
    }
}

/// The file a suggestion targets, with an optional line range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetFile {
    pub path: PathBuf,
    pub line_start: usize,
    pub line_end: usize,
    pub action: SuggestedAction,
}

impl TargetFile {
    pub fn new(path: impl Into<PathBuf>, action: SuggestedAction) -> Self {
        Self {
            path: path.into(),
            line_start: 0,
            line_end: 0,
            action,
        }
    }

    pub fn has_line_range(&self) -> bool {
        self.line_start > 0
    }
}

/// An illustrative code fragment attached to a suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub code: String,
    pub language: String,
}

impl CodeSnippet {
    pub fn cpp(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: "cpp".to_string(),
        }
    }
}

/// One optimisation suggestion with its expected payoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion_type: SuggestionType,
    pub priority: Priority,
    /// How likely the change is to deliver the estimate, in `[0, 1]`.
    pub confidence: f64,
    pub estimated_savings: Duration,
    /// Savings as a share of the build wall time.
    pub estimated_savings_percent: f64,
    pub title: String,
    pub description: String,
    pub rationale: String,
    pub target_file: TargetFile,
    #[serde(default)]
    pub secondary_files: Vec<TargetFile>,
    #[serde(default)]
    pub implementation_steps: Vec<String>,
    #[serde(default)]
    pub caveats: Vec<String>,
    #[serde(default)]
    pub before_code: CodeSnippet,
    #[serde(default)]
    pub after_code: CodeSnippet,
    #[serde(default)]
    pub verification: String,
    /// False for changes that can alter build semantics (unity builds,
    /// include removal, header splits).
    pub is_safe: bool,
}

impl Suggestion {
    pub fn new(
        suggestion_type: SuggestionType,
        priority: Priority,
        title: impl Into<String>,
    ) -> Self {
        Self {
            suggestion_type,
            priority,
            confidence: 0.0,
            estimated_savings: Duration::ZERO,
            estimated_savings_percent: 0.0,
            title: title.into(),
            description: String::new(),
            rationale: String::new(),
            target_file: TargetFile::default(),
            secondary_files: Vec::new(),
            implementation_steps: Vec::new(),
            caveats: Vec::new(),
            before_code: CodeSnippet::default(),
            after_code: CodeSnippet::default(),
            verification: String::new(),
            is_safe: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_critical_first() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);

        let mut priorities = vec![Priority::Low, Priority::Critical, Priority::Medium];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Critical, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn target_line_range() {
        let mut target = TargetFile::new("src/a.cpp", SuggestedAction::Edit);
        assert!(!target.has_line_range());
        target.line_start = 12;
        target.line_end = 20;
        assert!(target.has_line_range());
    }
}
