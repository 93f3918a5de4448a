use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Suffixes that name a service, tried in order
const SERVICE_SUFFIXES: &[&str] = &[
    "Controller",
    "Service",
    "Handler",
    "Repository",
    "Manager",
    "Provider",
    "Component",
];

/// Label used when a file sits directly in the analysis root
pub const ROOT_SERVICE: &str = "Root";

/// Finer-grained role of a file inside its service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Controller,
    Service,
    Model,
    Repository,
    Config,
    Utility,
    Test,
    Unknown,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Controller => "controller",
            FileCategory::Service => "service",
            FileCategory::Model => "model",
            FileCategory::Repository => "repository",
            FileCategory::Config => "config",
            FileCategory::Utility => "utility",
            FileCategory::Test => "test",
            FileCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File name substrings, checked in order before the directory fallback
const FILE_NAME_KEYWORDS: &[(&[&str], FileCategory)] = &[
    (&["controller", "handler", "router"], FileCategory::Controller),
    (&["service", "manager", "provider"], FileCategory::Service),
    (&["model", "entity", "dto", "domain"], FileCategory::Model),
    (&["repository", "dao", "data"], FileCategory::Repository),
    (&["config", "setting", "property"], FileCategory::Config),
    (&["util", "helper", "tool"], FileCategory::Utility),
    (&["test", "spec"], FileCategory::Test),
];

/// Directory names matched exactly, singular and plural
const DIRECTORY_LABELS: &[(&[&str], FileCategory)] = &[
    (&["controller", "controllers"], FileCategory::Controller),
    (&["service", "services"], FileCategory::Service),
    (&["model", "models"], FileCategory::Model),
    (&["repository", "repositories"], FileCategory::Repository),
    (&["config", "configs"], FileCategory::Config),
    (&["utility", "utilities"], FileCategory::Utility),
    (&["test", "tests"], FileCategory::Test),
];

/// Files sharing one derived service name, in first-seen order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceGroup {
    pub name: String,
    pub files: Vec<PathBuf>,
}

/// Partitions files into services using only their paths
pub struct ServiceGrouper {
    root: Option<PathBuf>,
    suffix_patterns: Vec<Regex>,
}

impl ServiceGrouper {
    /// `root`, when given, makes the directory fallback relative to it
    pub fn new(root: Option<&Path>) -> Result<Self> {
        let suffix_patterns = SERVICE_SUFFIXES
            .iter()
            .map(|suffix| Regex::new(&format!(r"(?i)^(.+?)[_.-]?{}$", suffix)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            root: root.map(Path::to_path_buf),
            suffix_patterns,
        })
    }

    /// `UserController.go` -> `User`, `helpers.go` in `utils/` -> `utils`
    pub fn extract_service_name(&self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        for pattern in &self.suffix_patterns {
            if let Some(cap) = pattern.captures(&stem) {
                return pascal_case(&cap[1]);
            }
        }

        let relative = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);

        match relative.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && parent != Path::new(".") => parent
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| ROOT_SERVICE.to_string()),
            _ => ROOT_SERVICE.to_string(),
        }
    }

    /// Category from the file name, then from the parent directory name
    pub fn categorize(&self, path: &Path) -> FileCategory {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        for (keywords, category) in FILE_NAME_KEYWORDS {
            if keywords.iter().any(|keyword| file_name.contains(keyword)) {
                return *category;
            }
        }

        let directory = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        DIRECTORY_LABELS
            .iter()
            .find(|(labels, _)| labels.contains(&directory.as_str()))
            .map(|(_, category)| *category)
            .unwrap_or(FileCategory::Unknown)
    }

    /// Group every path exactly once under its derived service name
    pub fn group<'a, I>(&self, paths: I) -> Vec<ServiceGroup>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut groups: Vec<ServiceGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for path in paths {
            let name = self.extract_service_name(path);
            match index.get(&name) {
                Some(&i) => {
                    if !groups[i].files.iter().any(|f| f == path) {
                        groups[i].files.push(path.to_path_buf());
                    }
                }
                None => {
                    index.insert(name.clone(), groups.len());
                    groups.push(ServiceGroup {
                        name,
                        files: vec![path.to_path_buf()],
                    });
                }
            }
        }

        groups
    }
}

/// `user_profile` -> `UserProfile`, `order` -> `Order`
fn pascal_case(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c == '-' || c == '.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
