//! Code block annotation detection.
//!
//! A code block may open with a comment line naming a file:
//!
//! ```text
//! # *deploy.sh      runnable as-is
//! // config.yaml    written to config.yaml on save
//! ```
//!
//! [`detect`] resolves the block's language, the annotated filename, and
//! whether the block is directly executable. It never fails; anything it
//! does not understand falls back to a shell script.

use crate::doc::{Block, BlockKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filename reported for blocks that resolve to no language at all.
pub const DEFAULT_FILENAME: &str = "script.sh";

const COMMENT_MARKERS: [&str; 2] = ["// ", "# "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Bash,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    Java,
    Json,
    Yaml,
    Markdown,
    Dockerfile,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::Bash,
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::Json,
        Language::Yaml,
        Language::Markdown,
        Language::Dockerfile,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Language::Bash => "bash",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Markdown => "markdown",
            Language::Dockerfile => "dockerfile",
        }
    }

    /// Resolves a fence tag or language name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let language = match name.trim().to_ascii_lowercase().as_str() {
            "bash" | "sh" | "shell" | "zsh" => Language::Bash,
            "python" | "py" => Language::Python,
            "javascript" | "js" | "node" => Language::JavaScript,
            "typescript" | "ts" => Language::TypeScript,
            "go" | "golang" => Language::Go,
            "rust" | "rs" => Language::Rust,
            "java" => Language::Java,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "markdown" | "md" => Language::Markdown,
            "dockerfile" | "docker" => Language::Dockerfile,
            _ => return None,
        };
        Some(language)
    }

    /// Resolves a filename by its extension (or by name, for `Dockerfile`).
    pub fn from_filename(filename: &str) -> Option<Self> {
        let base = filename.rsplit('/').next().unwrap_or(filename);
        if base.eq_ignore_ascii_case("dockerfile") {
            return Some(Language::Dockerfile);
        }
        let (stem, extension) = base.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Self::from_extension(extension)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let language = match extension.to_ascii_lowercase().as_str() {
            "sh" | "bash" | "zsh" => Language::Bash,
            "py" => Language::Python,
            "js" | "mjs" | "cjs" => Language::JavaScript,
            "ts" => Language::TypeScript,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "java" => Language::Java,
            "json" => Language::Json,
            "yaml" | "yml" => Language::Yaml,
            "md" => Language::Markdown,
            _ => return None,
        };
        Some(language)
    }

    pub fn is_shell(self) -> bool {
        self == Language::Bash
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Detection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub executable: bool,
}

impl Detection {
    /// True when the block names a file to write rather than a script to run.
    pub fn is_save_target(&self) -> bool {
        !self.executable && self.filename.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Annotation<'a> {
    filename: &'a str,
    executable: bool,
}

fn annotation(text: &str) -> Option<Annotation<'_>> {
    let first = text.lines().next()?;
    let rest = COMMENT_MARKERS
        .iter()
        .find_map(|marker| first.strip_prefix(marker))?;
    let token = rest.split_whitespace().next()?;
    let (filename, executable) = match token.strip_prefix('*') {
        Some(name) => (name, true),
        None => (token, false),
    };
    if filename.is_empty() {
        return None;
    }
    Some(Annotation {
        filename,
        executable,
    })
}

pub fn detect(block: &Block) -> Detection {
    if block.kind != BlockKind::CodeBlock {
        return Detection::default();
    }

    let declared = block.language().and_then(Language::from_name);
    match annotation(&block.text) {
        Some(annotation) => {
            let language = Language::from_filename(annotation.filename)
                .or(declared)
                .unwrap_or(Language::Bash);
            Detection {
                language: Some(language),
                filename: Some(annotation.filename.to_string()),
                executable: annotation.executable,
            }
        }
        None => match declared {
            Some(language) => Detection {
                language: Some(language),
                filename: None,
                executable: language.is_shell(),
            },
            None => Detection {
                language: Some(Language::Bash),
                filename: Some(DEFAULT_FILENAME.to_string()),
                executable: true,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(language: Option<&str>, text: &str) -> Block {
        Block::code(language, text)
    }

    #[test]
    fn test_non_code_block_is_empty() {
        let block = Block::new(BlockKind::Unstyled, "# *run.sh");
        assert_eq!(detect(&block), Detection::default());
    }

    #[test]
    fn test_declared_shell_is_executable() {
        let detection = detect(&code(Some("bash"), "echo hi"));
        assert_eq!(detection.language, Some(Language::Bash));
        assert!(detection.executable);
        assert_eq!(detection.filename, None);
    }

    #[test]
    fn test_declared_other_language_is_not_executable() {
        let detection = detect(&code(Some("python"), "print(1)"));
        assert_eq!(detection.language, Some(Language::Python));
        assert!(!detection.executable);
    }

    #[test]
    fn test_executable_annotation() {
        let detection = detect(&code(None, "// *deploy.sh\nkubectl apply"));
        assert_eq!(detection.language, Some(Language::Bash));
        assert_eq!(detection.filename.as_deref(), Some("deploy.sh"));
        assert!(detection.executable);
    }

    #[test]
    fn test_file_annotation_overrides_language() {
        let detection = detect(&code(Some("bash"), "# config.yaml\nkey: 1"));
        assert_eq!(detection.language, Some(Language::Yaml));
        assert_eq!(detection.filename.as_deref(), Some("config.yaml"));
        assert!(!detection.executable);
        assert!(detection.is_save_target());
    }

    #[test]
    fn test_annotation_without_extension_keeps_language() {
        let detection = detect(&code(Some("python"), "# main\nprint(1)"));
        assert_eq!(detection.language, Some(Language::Python));
        assert_eq!(detection.filename.as_deref(), Some("main"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_shell() {
        let detection = detect(&code(Some("cobol"), "DISPLAY 'HI'."));
        assert_eq!(detection.language, Some(Language::Bash));
        assert_eq!(detection.filename.as_deref(), Some(DEFAULT_FILENAME));
        assert!(detection.executable);
    }

    #[test]
    fn test_empty_block_defaults() {
        let detection = detect(&code(None, ""));
        assert_eq!(detection.language, Some(Language::Bash));
        assert!(detection.executable);
    }

    #[test]
    fn test_marker_needs_space() {
        let detection = detect(&code(Some("python"), "#!/usr/bin/env python"));
        assert_eq!(detection.filename, None);
    }

    #[test]
    fn test_bare_star_is_not_an_annotation() {
        let detection = detect(&code(Some("go"), "// * \nfunc main() {}"));
        assert_eq!(detection.filename, None);
        assert_eq!(detection.language, Some(Language::Go));
    }

    #[test]
    fn test_language_names() {
        assert_eq!(Language::from_name("ZSH"), Some(Language::Bash));
        assert_eq!(Language::from_filename("Dockerfile"), Some(Language::Dockerfile));
        assert_eq!(Language::from_filename(".bashrc"), None);
        assert_eq!(Language::from_filename("dir/app.ts"), Some(Language::TypeScript));
        for language in Language::ALL {
            assert_eq!(Language::from_name(language.tag()), Some(language));
        }
    }

    #[test]
    fn test_detection_json() {
        let json = serde_json::to_string(&detect(&code(None, "# *a.py"))).unwrap();
        assert_eq!(
            json,
            r#"{"language":"python","filename":"a.py","executable":true}"#
        );
    }
}
