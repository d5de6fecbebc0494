//! Rule document validation with structured errors and suggestions.
//!
//! Validates both document kinds: AutomationRuleSet (metadata, rule ids,
//! condition trees, reason templates) and ScoringConfig (weights, tier
//! ordering). Returns a [`ValidationResult`] with errors (block loading)
//! and warnings (advisory).

mod rule_set_checks;
mod scoring_checks;

pub mod fuzzy;

use serde::{Deserialize, Serialize};

use crate::schema::{parse_document, RuleDocument};
use fuzzy::is_kebab_case;

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"spec.rules[2].when.count.within"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn warn_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    /// All error messages joined into one line, prefixed with their paths.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| {
                if e.path.is_empty() {
                    e.message.clone()
                } else {
                    format!("{}: {}", e.path, e.message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Shared checks ───────────────────────────────────────────────────

fn validate_common_metadata(
    api_version: &str,
    kind: &str,
    expected_kind: &str,
    id: &str,
    result: &mut ValidationResult,
) {
    if api_version != "v1" {
        result.error(
            "apiVersion",
            format!("apiVersion must be 'v1', got '{}'", api_version),
        );
    }
    if kind != expected_kind {
        result.error(
            "kind",
            format!("kind must be '{}', got '{}'", expected_kind, kind),
        );
    }
    if !is_kebab_case(id) {
        result.error(
            "metadata.id",
            format!(
                "id must be kebab-case (lowercase alphanumeric + hyphens), got '{}'",
                id
            ),
        );
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate any [`RuleDocument`] variant, dispatching to the appropriate validator.
pub fn validate_document(doc: &RuleDocument) -> ValidationResult {
    let mut result = ValidationResult::new();
    match doc {
        RuleDocument::AutomationRuleSet(set) => {
            validate_common_metadata(
                &set.api_version,
                &set.kind,
                "AutomationRuleSet",
                &set.metadata.id,
                &mut result,
            );
            rule_set_checks::validate_rule_set(set, &mut result);
        }
        RuleDocument::ScoringConfig(rule) => {
            validate_common_metadata(
                &rule.api_version,
                &rule.kind,
                "ScoringConfig",
                &rule.metadata.id,
                &mut result,
            );
            scoring_checks::validate_scoring_config(&rule.spec, &mut result);
        }
    }
    result
}

/// Parse raw YAML and validate. Parse failures become a single root-level error.
pub fn validate_yaml(yaml: &str) -> ValidationResult {
    match parse_document(yaml) {
        Ok(doc) => validate_document(&doc),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error("", e);
            result
        }
    }
}
