use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ServicemapError};

/// Directory names never descended into during traversal
pub const DEFAULT_IGNORED_DIRECTORIES: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    "bin",
    "obj",
    ".idea",
    ".vscode",
    "coverage",
    "logs",
    "tmp",
    "temp",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Relationship analysis settings
    pub analysis: AnalysisConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Directory analyzed when no source is given on the command line
    pub source_dir: PathBuf,

    /// Where `analyze` writes its report when no output is given
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Languages to support (go, java, typescript)
    pub languages: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,

    /// Directory names skipped in addition to hidden directories
    pub ignored_directories: Vec<String>,

    /// Whether .gitignore rules are honoured while walking
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Scan files for relationships on the rayon pool
    pub parallel_extraction: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format (json, summary)
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "Unnamed Project".to_string(),
                source_dir: PathBuf::from("."),
                report_path: None,
            },
            parsing: ParsingConfig::default(),
            analysis: AnalysisConfig {
                parallel_extraction: false,
            },
            output: OutputConfig {
                format: "summary".to_string(),
                pretty: true,
            },
        }
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            languages: vec!["go".to_string(), "java".to_string(), "typescript".to_string()],
            max_file_size: 1024 * 1024, // 1MB
            ignored_directories: DEFAULT_IGNORED_DIRECTORIES
                .iter()
                .map(|d| d.to_string())
                .collect(),
            respect_gitignore: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ServicemapError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ServicemapError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = ["servicemap.toml", "Servicemap.toml", ".servicemap.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_ignores_build_output() {
        let config = Config::default();
        for dir in ["node_modules", "target", ".git", "temp"] {
            assert!(config.parsing.ignored_directories.iter().any(|d| d == dir));
        }
        assert!(!config.analysis.parallel_extraction);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("servicemap.toml");

        let mut config = Config::default();
        config.project.name = "billing".to_string();
        config.analysis.parallel_extraction = true;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.project.name, "billing");
        assert!(loaded.analysis.parallel_extraction);
        assert_eq!(loaded.parsing.languages, config.parsing.languages);
    }

    #[test]
    fn test_missing_explicit_path_falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_or_default(Some(temp.path().join("absent.toml"))).unwrap();
        assert_eq!(config.project.name, "Unnamed Project");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.toml");
        std::fs::write(&path, "project = [").unwrap();

        match Config::load(&path) {
            Err(ServicemapError::Config(_)) => {}
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
