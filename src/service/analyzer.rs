//! Project context analysis.
//!
//! Walks a project directory and reports its dominant language, framework,
//! the presence of common repository files, and what is missing.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
    "venv",
];

const MAX_DEPTH: usize = 8;

/// Result of analyzing a project directory.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectContext {
    pub path: PathBuf,
    /// Most common source language, or `unknown`.
    pub language: String,
    /// Source file count per language.
    pub languages: BTreeMap<String, usize>,
    pub framework: Option<String>,
    pub file_count: usize,
    pub has_readme: bool,
    pub has_license: bool,
    pub has_gitignore: bool,
    pub has_contributing: bool,
    pub has_changelog: bool,
    pub has_ci_cd: bool,
    pub recommendations: Vec<String>,
}

/// Maps a file extension to a source language; `None` for non-source files.
pub fn extension_to_language(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        "rs" => "rust",
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "mts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "php" => "php",
        "cs" => "csharp",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "swift" => "swift",
        "scala" => "scala",
        "ex" | "exs" => "elixir",
        "sh" | "bash" | "zsh" => "shell",
        _ => return None,
    };
    Some(lang)
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Any top-level entry whose name starts with `prefix` (case-insensitive).
fn has_prefixed(root: &Path, prefix: &str) -> bool {
    let prefix = prefix.to_lowercase();
    std::fs::read_dir(root)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_name().to_string_lossy().to_lowercase().starts_with(&prefix))
        })
        .unwrap_or(false)
}

fn has_ci_workflows(root: &Path) -> bool {
    let workflows = root.join(".github").join("workflows");
    let github_actions = std::fs::read_dir(&workflows)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.ends_with(".yml") || name.ends_with(".yaml")
            })
        })
        .unwrap_or(false);
    github_actions || root.join(".gitlab-ci.yml").exists()
}

/// Detect a framework from marker files at the project root.
fn detect_framework(root: &Path) -> Option<String> {
    let read = |name: &str| std::fs::read_to_string(root.join(name)).ok();

    if let Some(package) = read("package.json") {
        for (needle, framework) in [
            ("\"next\"", "next"),
            ("\"react\"", "react"),
            ("\"vue\"", "vue"),
            ("\"svelte\"", "svelte"),
            ("\"express\"", "express"),
        ] {
            if package.contains(needle) {
                return Some(framework.to_string());
            }
        }
        return Some("node".to_string());
    }

    let python_manifest = ["pyproject.toml", "requirements.txt", "setup.py"]
        .iter()
        .filter_map(|name| read(name))
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();
    if !python_manifest.is_empty() {
        for framework in ["django", "fastapi", "flask"] {
            if python_manifest.contains(framework) {
                return Some(framework.to_string());
            }
        }
        return Some("python".to_string());
    }

    let markers = [
        ("Cargo.toml", "cargo"),
        ("go.mod", "go-modules"),
        ("pom.xml", "maven"),
        ("build.gradle", "gradle"),
        ("build.gradle.kts", "gradle"),
        ("Gemfile", "bundler"),
        ("composer.json", "composer"),
    ];
    markers
        .iter()
        .find(|(file, _)| root.join(file).exists())
        .map(|(_, framework)| framework.to_string())
}

fn recommendations(ctx: &ProjectContext) -> Vec<String> {
    let checks = [
        (ctx.has_readme, "Add a README file to describe your project"),
        (ctx.has_license, "Add a LICENSE file to clarify usage rights"),
        (
            ctx.has_gitignore,
            "Add a .gitignore file to exclude unnecessary files",
        ),
        (ctx.has_ci_cd, "Set up GitHub Actions for CI/CD"),
        (
            ctx.has_contributing,
            "Add CONTRIBUTING.md to guide contributors",
        ),
        (ctx.has_changelog, "Add a CHANGELOG to track releases"),
    ];
    checks
        .iter()
        .filter(|(present, _)| !present)
        .map(|(_, advice)| advice.to_string())
        .collect()
}

/// Analyze the project rooted at `path`.
pub fn analyze(path: &Path) -> Result<ProjectContext> {
    if !path.is_dir() {
        return Err(Error::Analysis(format!(
            "Path '{}' does not exist or is not a directory",
            path.display()
        )));
    }

    let mut languages: BTreeMap<String, usize> = BTreeMap::new();
    let mut file_count = 0;

    for entry in WalkDir::new(path)
        .max_depth(MAX_DEPTH)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        file_count += 1;
        if let Some(lang) = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(extension_to_language)
        {
            *languages.entry(lang.to_string()).or_default() += 1;
        }
    }

    // Ties resolve to the alphabetically first language.
    let language = languages
        .iter()
        .fold(None::<(&String, usize)>, |best, (lang, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((lang, count)),
        })
        .map(|(lang, _)| lang.clone())
        .unwrap_or_else(|| "unknown".to_string());

    let mut ctx = ProjectContext {
        path: path.to_path_buf(),
        language,
        languages,
        framework: detect_framework(path),
        file_count,
        has_readme: has_prefixed(path, "README"),
        has_license: has_prefixed(path, "LICENSE"),
        has_gitignore: path.join(".gitignore").exists(),
        has_contributing: has_prefixed(path, "CONTRIBUTING"),
        has_changelog: has_prefixed(path, "CHANGELOG"),
        has_ci_cd: has_ci_workflows(path),
        recommendations: Vec::new(),
    };
    ctx.recommendations = recommendations(&ctx);

    debug!(
        "Analyzed {}: {} files, language {}",
        path.display(),
        ctx.file_count,
        ctx.language
    );
    Ok(ctx)
}
