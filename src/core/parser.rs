use std::collections::HashMap;
use std::path::{Path, PathBuf};
use ignore::{DirEntry, WalkBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::ParsingConfig;
use crate::error::{Result, ServicemapError};
use super::languages::{GoParser, JavaParser, Language, LanguageParser, TypeScriptParser};

/// Structural facts extracted from one source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralFact {
    /// Absolute file path
    pub path: PathBuf,

    /// Programming language detected
    pub language: Language,

    /// Content hash for change detection
    pub content_hash: String,

    /// Declared classes, structs, interfaces, enums
    pub types: Vec<TypeDecl>,

    /// Declared functions and methods
    pub functions: Vec<FunctionDecl>,

    /// HTTP endpoints declared in the file
    pub endpoints: Vec<ApiEndpoint>,

    /// File-level documentation/comments
    pub file_docs: Option<String>,

    /// Raw source content, kept for relationship extraction
    #[serde(skip)]
    pub source_content: String,
}

impl StructuralFact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn declares_type(&self, name: &str) -> bool {
        self.types.iter().any(|t| t.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    /// struct, interface, class, enum, record, type
    pub kind: String,
    pub members: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// Receiver or enclosing type, when the language makes it explicit
    pub receiver: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub docs: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    /// Upper-case HTTP method, `ANY` when unrestricted
    pub method: String,
    pub path: String,
    pub handler: Option<String>,
    pub summary: Option<String>,
    pub parameters: Vec<EndpointParam>,
    pub responses: Vec<EndpointResponse>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointParam {
    pub name: String,
    /// path, query, body, header
    pub location: String,
    pub type_name: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointResponse {
    pub status: String,
    pub description: Option<String>,
}

/// A file the provider could not turn into a fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of parsing a directory tree
#[derive(Debug, Clone, Default)]
pub struct ParsedDirectory {
    /// Facts in traversal order
    pub facts: Vec<StructuralFact>,
    pub skipped: Vec<SkippedFile>,
}

/// Source of structural facts consumed by the analyzer
pub trait FactProvider: Send + Sync {
    /// Facts for one file, or `None` when it cannot be parsed
    fn parse(&self, path: &Path) -> Option<StructuralFact>;

    /// Facts for every recognized file under `dir`
    fn parse_directory(&self, dir: &Path) -> Result<ParsedDirectory>;

    /// Extensions the provider attempts to parse
    fn recognized_extensions(&self) -> Vec<&'static str>;
}

/// Multi-language code parser that delegates to language-specific parsers
pub struct CodeParser {
    config: ParsingConfig,
    language_parsers: HashMap<Language, Box<dyn LanguageParser>>,
}

impl CodeParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        let mut language_parsers: HashMap<Language, Box<dyn LanguageParser>> = HashMap::new();

        // Initialize language parsers based on configuration
        for name in &config.languages {
            match Language::from_name(name) {
                Some(Language::Go) => {
                    language_parsers.insert(Language::Go, Box::new(GoParser::new()?));
                }
                Some(Language::Java) => {
                    language_parsers.insert(Language::Java, Box::new(JavaParser::new()?));
                }
                Some(Language::TypeScript) => {
                    language_parsers.insert(Language::TypeScript, Box::new(TypeScriptParser::new()?));
                }
                None => {
                    warn!("Skipping unsupported language '{}'", name);
                }
            }
        }

        Ok(Self {
            config: config.clone(),
            language_parsers,
        })
    }

    /// Parse a single source file
    pub fn parse_file<P: AsRef<Path>>(&self, file_path: P) -> Result<StructuralFact> {
        let path = file_path.as_ref();
        let (language, parser) = self.parser_for(path).ok_or_else(|| {
            ServicemapError::Parser(format!("Could not detect language for file: {}", path.display()))
        })?;

        let source_content = std::fs::read_to_string(path)?;

        if source_content.len() > self.config.max_file_size {
            return Err(ServicemapError::Parser(format!(
                "File {} exceeds maximum size limit",
                path.display()
            )));
        }

        let items = parser.parse(&source_content, path)?;
        let file_docs = parser.extract_file_docs(&source_content);

        Ok(StructuralFact {
            path: path.to_path_buf(),
            language,
            content_hash: calculate_hash(&source_content),
            types: items.types,
            functions: items.functions,
            endpoints: items.endpoints,
            file_docs,
            source_content,
        })
    }

    fn parser_for(&self, path: &Path) -> Option<(Language, &dyn LanguageParser)> {
        let language = Language::from_path(path)?;
        self.language_parsers
            .get(&language)
            .map(|parser| (language, parser.as_ref()))
    }

    /// Determine if a file should be parsed based on configuration
    fn should_parse_file(&self, path: &Path) -> bool {
        self.parser_for(path).is_some()
    }

    fn is_ignored_directory(entry: &DirEntry, ignored: &[String]) -> bool {
        // The walk root is never filtered, even when it is a hidden temp dir
        if entry.depth() == 0 || !entry.file_type().map_or(false, |ft| ft.is_dir()) {
            return false;
        }

        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || ignored.iter().any(|d| d.as_str() == name)
    }
}

impl FactProvider for CodeParser {
    fn parse(&self, path: &Path) -> Option<StructuralFact> {
        match self.parse_file(path) {
            Ok(fact) => Some(fact),
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    fn parse_directory(&self, dir: &Path) -> Result<ParsedDirectory> {
        let metadata = std::fs::metadata(dir).map_err(|source| ServicemapError::RootUnavailable {
            path: dir.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ServicemapError::RootUnavailable {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            });
        }
        // Surface unreadable roots before the walker swallows them as entry errors
        std::fs::read_dir(dir).map_err(|source| ServicemapError::RootUnavailable {
            path: dir.to_path_buf(),
            source,
        })?;

        let ignored = self.config.ignored_directories.clone();
        let respect_gitignore = self.config.respect_gitignore;
        let walker = WalkBuilder::new(dir)
            .hidden(false)
            .git_ignore(respect_gitignore)
            .git_global(respect_gitignore)
            .git_exclude(respect_gitignore)
            .ignore(respect_gitignore)
            .parents(respect_gitignore)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| !Self::is_ignored_directory(entry, &ignored))
            .build();

        let mut parsed = ParsedDirectory::default();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if !entry.file_type().map_or(false, |ft| ft.is_file()) || !self.should_parse_file(path) {
                continue;
            }

            match self.parse_file(path) {
                Ok(fact) => parsed.facts.push(fact),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    parsed.skipped.push(SkippedFile {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "Parsed {} files under {} ({} skipped)",
            parsed.facts.len(),
            dir.display(),
            parsed.skipped.len()
        );

        Ok(parsed)
    }

    fn recognized_extensions(&self) -> Vec<&'static str> {
        Language::ALL
            .into_iter()
            .filter(|lang| self.language_parsers.contains_key(lang))
            .flat_map(|lang| lang.profile().extensions.iter().copied())
            .collect()
    }
}

/// Calculate SHA256 hash of content
pub(crate) fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_directory_skips_denied_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "api/user_controller.go", "package api\n\ntype UserController struct {}\n");
        write(root, "node_modules/lib/index.ts", "export class Lib {}\n");
        write(root, "build/Gen.java", "public class Gen {}\n");
        write(root, ".cache/Cached.java", "public class Cached {}\n");
        write(root, "README.md", "# readme\n");

        let parser = CodeParser::new(&ParsingConfig::default()).unwrap();
        let parsed = parser.parse_directory(root).unwrap();

        assert_eq!(parsed.facts.len(), 1);
        assert_eq!(parsed.facts[0].file_name(), "user_controller.go");
        assert!(parsed.facts[0].declares_type("UserController"));
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let parser = CodeParser::new(&ParsingConfig::default()).unwrap();

        match parser.parse_directory(&temp.path().join("absent")) {
            Err(ServicemapError::RootUnavailable { .. }) => {}
            other => panic!("expected root error, got {:?}", other.map(|p| p.facts.len())),
        }
    }

    #[test]
    fn test_oversized_file_is_skipped_and_reported() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "big/Huge.java", &"// padding\n".repeat(200));
        write(root, "small/Tiny.java", "class Tiny {}\n");

        let config = ParsingConfig {
            max_file_size: 512,
            ..ParsingConfig::default()
        };
        let parser = CodeParser::new(&config).unwrap();
        let parsed = parser.parse_directory(root).unwrap();

        assert_eq!(parsed.facts.len(), 1);
        assert_eq!(parsed.skipped.len(), 1);
        assert!(parsed.skipped[0].path.ends_with("big/Huge.java"));
        assert!(parser.parse(&root.join("big/Huge.java")).is_none());
    }

    #[test]
    fn test_recognized_extensions_follow_configured_languages() {
        let config = ParsingConfig {
            languages: vec!["java".to_string(), "cobol".to_string()],
            ..ParsingConfig::default()
        };
        let parser = CodeParser::new(&config).unwrap();
        assert_eq!(parser.recognized_extensions(), vec!["java"]);
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(calculate_hash("abc"), calculate_hash("abc"));
        assert_ne!(calculate_hash("abc"), calculate_hash("abd"));
    }
}
