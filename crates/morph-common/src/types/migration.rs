use serde::{Deserialize, Serialize};

use crate::error::{MorphError, Result};

/// Source and target technology stacks for one migration run.
///
/// Passed by value into every transformation call; nothing downstream
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationConfig {
    /// Legacy stack labels (e.g. "Java 8", "Spring Boot 1.5")
    pub source_techs: Vec<String>,

    /// Modern stack labels (e.g. "Java 17", "Spring Boot 3.2")
    pub target_techs: Vec<String>,
}

impl MigrationConfig {
    /// Build a config, rejecting empty stacks and blank labels.
    pub fn new<S, T>(source_techs: S, target_techs: T) -> Result<Self>
    where
        S: IntoIterator,
        S::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let source_techs = normalize_labels("source", source_techs)?;
        let target_techs = normalize_labels("target", target_techs)?;
        Ok(Self {
            source_techs,
            target_techs,
        })
    }

    /// Comma-joined source stack, as it appears in prompts
    pub fn source_stack(&self) -> String {
        self.source_techs.join(", ")
    }

    /// Comma-joined target stack, as it appears in prompts
    pub fn target_stack(&self) -> String {
        self.target_techs.join(", ")
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source_techs: vec![
                "Java 8".to_string(),
                "Spring Boot 1.5".to_string(),
                "JUnit 4".to_string(),
            ],
            target_techs: vec![
                "Java 17".to_string(),
                "Spring Boot 3.2".to_string(),
                "JUnit 5".to_string(),
                "Spring Security 6".to_string(),
            ],
        }
    }
}

fn normalize_labels<I>(side: &str, labels: I) -> Result<Vec<String>>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let labels: Vec<String> = labels
        .into_iter()
        .map(|label| label.into().trim().to_string())
        .collect();

    if labels.is_empty() {
        return Err(MorphError::config(format!("{} stack must not be empty", side)));
    }
    if labels.iter().any(String::is_empty) {
        return Err(MorphError::config(format!(
            "{} stack contains a blank label",
            side
        )));
    }

    Ok(labels)
}

/// Severity of a security finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}

/// One entry of the security report returned for a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIssue {
    pub severity: Severity,
    pub description: String,
    pub remediation: String,
}

/// Structured output of a successful transformation.
///
/// Field names on the wire follow the transformation service's schema;
/// all four are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    /// Rewritten code targeting the modern stack
    pub modern_code: String,

    /// Generated unit tests for the rewritten code
    pub unit_tests: String,

    /// Markdown notes explaining the changes
    pub documentation: String,

    /// Ordered security findings, possibly empty
    pub security_report: Vec<SecurityIssue>,
}
