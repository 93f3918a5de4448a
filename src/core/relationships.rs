use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use super::analyzer::FactTable;
use super::languages::{simple_type_name, split_top_level, Capture, Language, PatternSpec, TargetKind, PROJECT_MARKERS};

/// Kind of a directed file-to-file edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Import,
    Extends,
    Implements,
    Calls,
    References,
    Config,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Import => "import",
            RelationshipKind::Extends => "extends",
            RelationshipKind::Implements => "implements",
            RelationshipKind::Calls => "calls",
            RelationshipKind::References => "references",
            RelationshipKind::Config => "config",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved reference from one project file to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// The file whose text contained the reference
    pub source_file: PathBuf,
    /// The existing project file the reference resolved to
    pub target_file: PathBuf,
    pub kind: RelationshipKind,
    /// Pattern label and the reference text as written
    pub details: String,
}

impl Relationship {
    pub fn touches(&self, path: &Path) -> bool {
        self.source_file == path || self.target_file == path
    }
}

/// One row of a language's pattern table, compiled
struct CompiledPattern {
    spec: PatternSpec,
    regex: Regex,
    inner: Option<Regex>,
}

impl CompiledPattern {
    fn compile(spec: PatternSpec) -> Result<Self> {
        let inner = match spec.capture {
            Capture::Each(inner) => Some(Regex::new(inner)?),
            Capture::Whole | Capture::List => None,
        };

        Ok(Self {
            spec,
            regex: Regex::new(spec.pattern)?,
            inner,
        })
    }

    /// Reference names carried by one capture
    fn references<'a>(&self, captured: &'a str) -> Vec<&'a str> {
        let references = match (&self.spec.capture, &self.inner) {
            (Capture::List, _) => split_top_level(captured),
            (Capture::Each(_), Some(inner)) => inner
                .captures_iter(captured)
                .filter_map(|cap| cap.get(1))
                .map(|m| m.as_str().trim())
                .collect(),
            _ => vec![captured.trim()],
        };

        references.into_iter().filter(|r| !r.is_empty()).collect()
    }
}

/// Scans source text for references and resolves them to project files
pub struct RelationshipExtractor {
    root: PathBuf,
    patterns: HashMap<Language, Vec<CompiledPattern>>,
}

impl RelationshipExtractor {
    /// `root` anchors package-style imports when no project marker is found
    pub fn new(root: &Path) -> Result<Self> {
        let mut patterns = HashMap::new();
        for language in Language::ALL {
            let compiled = language
                .profile()
                .reference_patterns
                .iter()
                .map(|spec| CompiledPattern::compile(*spec))
                .collect::<Result<Vec<_>>>()?;
            patterns.insert(language, compiled);
        }

        Ok(Self {
            root: root.to_path_buf(),
            patterns,
        })
    }

    /// Every resolvable reference in `content`, in pattern table order.
    ///
    /// Targets are always files of `table`; unresolved references yield no edge.
    pub fn extract(&self, path: &Path, content: &str, language: Language, table: &FactTable) -> Vec<Relationship> {
        let Some(patterns) = self.patterns.get(&language) else {
            return vec![];
        };

        let mut relationships = Vec::new();
        for pattern in patterns {
            for cap in pattern.regex.captures_iter(content) {
                let Some(captured) = cap.get(1) else { continue };

                for reference in pattern.references(captured.as_str()) {
                    let target = match pattern.spec.target {
                        TargetKind::ImportPath => self.resolve_import(path, reference, language, table),
                        TargetKind::Symbol => table
                            .resolve_symbol(simple_type_name(reference))
                            .map(Path::to_path_buf),
                    };

                    let Some(target_file) = target else {
                        debug!("Unresolved {} reference '{}' in {}", pattern.spec.kind, reference, path.display());
                        continue;
                    };

                    relationships.push(Relationship {
                        source_file: path.to_path_buf(),
                        target_file,
                        kind: pattern.spec.kind,
                        details: format!("{} {}", pattern.spec.detail, reference),
                    });
                }
            }
        }

        relationships
    }

    /// Resolve a relative or package-style import to a file known to `table`
    pub fn resolve_import(&self, from: &Path, import: &str, language: Language, table: &FactTable) -> Option<PathBuf> {
        if is_relative_import(import) {
            let base = normalize_path(&from.parent()?.join(import));
            return probe(&base, language, table);
        }

        let profile = language.profile();
        let project_root = self.project_root(from);

        let mut import = import.to_string();
        if language == Language::Go {
            if let Some(module) = go_module(&project_root) {
                if import == module {
                    import.clear();
                } else if let Some(rest) = import.strip_prefix(&format!("{}/", module)) {
                    import = rest.to_string();
                }
            }
        }

        let relative: PathBuf = import
            .split(profile.package_separator)
            .filter(|segment| !segment.is_empty())
            .collect();
        if relative.as_os_str().is_empty() {
            return None;
        }

        profile
            .source_roots
            .iter()
            .find_map(|source_root| probe(&normalize_path(&project_root.join(source_root).join(&relative)), language, table))
    }

    /// Nearest ancestor of `from` holding a project marker, else the analysis root
    fn project_root(&self, from: &Path) -> PathBuf {
        from.parent()
            .into_iter()
            .flat_map(Path::ancestors)
            .find(|dir| PROJECT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone())
    }
}

fn is_relative_import(import: &str) -> bool {
    import == "." || import == ".." || import.starts_with("./") || import.starts_with("../")
}

/// First candidate for an import base path that the run parsed
fn probe(base: &Path, language: Language, table: &FactTable) -> Option<PathBuf> {
    let profile = language.profile();
    let mut candidates = Vec::new();

    if Language::from_path(base).is_some() {
        candidates.push(base.to_path_buf());
    }
    for extension in profile.extensions {
        candidates.push(with_appended_extension(base, extension));
    }
    if let Some(stem) = profile.index_stem {
        for extension in profile.extensions {
            candidates.push(base.join(format!("{}.{}", stem, extension)));
        }
    }
    if profile.directory_packages {
        if let Some(last) = base.file_name() {
            candidates.push(base.join(format!("{}.{}", last.to_string_lossy(), language.canonical_extension())));
        }
    }

    candidates.into_iter().find(|candidate| table.get(candidate).is_some())
}

/// `user.service` + `ts` -> `user.service.ts`
fn with_appended_extension(base: &Path, extension: &str) -> PathBuf {
    let mut raw = base.as_os_str().to_owned();
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}

/// Resolve `.` and `..` components without touching the filesystem
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Module path declared in `<dir>/go.mod`
fn go_module(dir: &Path) -> Option<String> {
    let content = std::fs::read_to_string(dir.join("go.mod")).ok()?;
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix("module "))
        .map(|module| module.trim().trim_matches('"').to_string())
}
