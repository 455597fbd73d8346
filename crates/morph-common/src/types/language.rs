use serde::{Deserialize, Serialize};

/// Source language detected from a file path suffix.
///
/// Only used for presentation and defaults; migration never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    Cobol,
    Go,
    TypeScript,
    JavaScript,
    #[default]
    Unknown,
}

impl Language {
    /// Classify a path by its suffix. Matching is case-sensitive.
    pub fn from_path(path: &str) -> Self {
        const SUFFIXES: &[(&str, Language)] = &[
            (".java", Language::Java),
            (".py", Language::Python),
            (".cbl", Language::Cobol),
            (".cob", Language::Cobol),
            (".go", Language::Go),
            (".ts", Language::TypeScript),
            (".tsx", Language::TypeScript),
            (".js", Language::JavaScript),
            (".jsx", Language::JavaScript),
        ];

        SUFFIXES
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix))
            .map(|(_, language)| *language)
            .unwrap_or(Language::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::Cobol => "cobol",
            Language::Go => "go",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_known_suffixes() {
        assert_eq!(Language::from_path("src/Main.java"), Language::Java);
        assert_eq!(Language::from_path("tool.py"), Language::Python);
        assert_eq!(Language::from_path("PAYROLL.cbl"), Language::Cobol);
        assert_eq!(Language::from_path("batch/LEDGER.cob"), Language::Cobol);
        assert_eq!(Language::from_path("cmd/main.go"), Language::Go);
        assert_eq!(Language::from_path("index.ts"), Language::TypeScript);
        assert_eq!(Language::from_path("App.tsx"), Language::TypeScript);
        assert_eq!(Language::from_path("legacy.js"), Language::JavaScript);
        assert_eq!(Language::from_path("Widget.jsx"), Language::JavaScript);
    }

    #[test]
    fn test_from_path_unknown() {
        assert_eq!(Language::from_path("README.md"), Language::Unknown);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
        assert_eq!(Language::from_path("Main.JAVA"), Language::Unknown);
        assert_eq!(Language::from_path("java"), Language::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(Language::TypeScript.to_string(), "typescript");
        assert_eq!(Language::Unknown.to_string(), "unknown");
    }
}
