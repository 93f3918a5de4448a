//! Language-specific parsers for the supported source languages
//!
//! Each language gets its own module with a consistent interface for
//! extracting structural facts, plus a static table describing how the
//! relationship extractor recognises and resolves references in that
//! language. Adding a language means adding a module and a `Language`
//! variant; the extractor itself has no per-language control flow.

mod go;
mod java;
mod typescript;

pub use go::GoParser;
pub use java::JavaParser;
pub use typescript::TypeScriptParser;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::Result;
use super::parser::{ApiEndpoint, FunctionDecl, Parameter, TypeDecl};
use super::relationships::RelationshipKind;

/// Trait that all language parsers must implement
pub trait LanguageParser: Send + Sync {
    /// Parse source code and extract structured information
    fn parse(&self, content: &str, file_path: &Path) -> Result<ParsedItems>;

    /// Extract file-level documentation from source code
    fn extract_file_docs(&self, content: &str) -> Option<String>;

    /// The language this parser handles
    fn language(&self) -> Language;
}

/// Items a language parser pulls out of one file
#[derive(Debug, Clone, Default)]
pub struct ParsedItems {
    pub types: Vec<TypeDecl>,
    pub functions: Vec<FunctionDecl>,
    pub endpoints: Vec<ApiEndpoint>,
}

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Java,
    TypeScript,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Go, Language::Java, Language::TypeScript];

    pub fn name(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Java => "java",
            Language::TypeScript => "typescript",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "go" | "golang" => Some(Language::Go),
            "java" => Some(Language::Java),
            "typescript" | "ts" => Some(Language::TypeScript),
            _ => None,
        }
    }

    /// Detect the language from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|lang| lang.profile().extensions.contains(&extension))
    }

    pub fn profile(&self) -> &'static LanguageProfile {
        match self {
            Language::Go => &go::PROFILE,
            Language::Java => &java::PROFILE,
            Language::TypeScript => &typescript::PROFILE,
        }
    }

    /// The extension appended when probing for import targets
    pub fn canonical_extension(&self) -> &'static str {
        self.profile().extensions[0]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of how references are found and resolved in one language
#[derive(Debug)]
pub struct LanguageProfile {
    /// Recognized extensions, canonical first
    pub extensions: &'static [&'static str],
    /// Separator used by package-style imports
    pub package_separator: char,
    /// Roots probed under the project root for package-style imports, in order
    pub source_roots: &'static [&'static str],
    /// File stem probed inside a directory import (e.g. `index` for TypeScript)
    pub index_stem: Option<&'static str>,
    /// Whether a package import names a directory whose eponymous file is probed
    pub directory_packages: bool,
    /// Ordered reference patterns
    pub reference_patterns: &'static [PatternSpec],
}

/// One row of a language's reference pattern table
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    pub kind: RelationshipKind,
    pub pattern: &'static str,
    pub capture: Capture,
    pub target: TargetKind,
    /// Prefix used for the edge's details text
    pub detail: &'static str,
}

/// How the first capture group of a pattern is turned into reference names
#[derive(Debug, Clone, Copy)]
pub enum Capture {
    /// The capture is one reference
    Whole,
    /// The capture is a comma separated list of references
    List,
    /// Every first-group match of the inner pattern within the capture
    Each(&'static str),
}

/// What a captured reference names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A relative or package-style import path
    ImportPath,
    /// A declared type name
    Symbol,
}

/// Project marker files and directories that anchor package-style imports
pub const PROJECT_MARKERS: &[&str] = &[
    "go.mod",
    "package.json",
    "tsconfig.json",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    ".git",
];

// Shared scanning helpers

/// 1-based line number of a byte offset
pub(crate) fn line_of(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())].matches('\n').count() + 1
}

/// Body between the brace at `open` and its matching close brace
pub(crate) fn block_body(content: &str, open: usize) -> Option<&str> {
    let bytes = content.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[open + 1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Contents between the paren at `open` and its matching close paren
pub(crate) fn paren_body(content: &str, open: usize) -> Option<&str> {
    let bytes = content.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[open + 1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested inside brackets
pub(crate) fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// `pkg.Repository<User>` -> `Repository`
pub(crate) fn simple_type_name(raw: &str) -> &str {
    let without_generics = raw.split('<').next().unwrap_or(raw).trim();
    let without_array = without_generics.trim_end_matches("[]").trim();
    without_array
        .rsplit('.')
        .next()
        .unwrap_or(without_array)
        .trim_start_matches('*')
        .trim()
}

/// Comment lines immediately above `offset`, with markers stripped, in source order
pub(crate) fn comment_block_before(content: &str, offset: usize) -> Vec<String> {
    let head = &content[..offset.min(content.len())];
    let mut lines: Vec<&str> = head.lines().collect();
    // The partial line holding `offset` is not part of the block
    if !head.ends_with('\n') {
        lines.pop();
    }

    let mut block = Vec::new();
    // Unclosed parens of a multi-line annotation seen while walking upwards
    let mut annotation_depth = 0i32;
    for line in lines.iter().rev() {
        let trimmed = line.trim();
        let balance = trimmed.matches(')').count() as i32 - trimmed.matches('(').count() as i32;
        let is_comment = trimmed.starts_with("//") || trimmed.starts_with('*') || trimmed.starts_with("/*");

        if !is_comment && (annotation_depth > 0 || balance > 0 || trimmed.starts_with('@')) {
            annotation_depth = (annotation_depth + balance).max(0);
            continue;
        }

        if is_comment {
            let text = trimmed
                .trim_end_matches("*/")
                .trim_start_matches('/')
                .trim_start_matches('*')
                .trim();
            if !text.is_empty() {
                block.push(text.to_string());
            }
        } else {
            break;
        }
    }
    block.reverse();
    block
}

/// Join a controller prefix and a route path with exactly one slash between them
pub(crate) fn join_route(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');
    let path = path.trim().trim_start_matches('/');

    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", path),
        (false, true) => format!("/{}", prefix),
        (false, false) => format!("/{}/{}", prefix, path),
    }
}

/// Statements at the top level of a type body.
///
/// Nested blocks end the statement they follow and are dropped; comments are
/// removed and string literals never open or close a block.
pub(crate) fn top_level_statements(body: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut brace_depth = 0usize;
    let mut paren_depth = 0usize;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        // Comments
        if c == '/' && chars.peek() == Some(&'/') {
            for next in chars.by_ref() {
                if next == '\n' {
                    break;
                }
            }
            current.push('\n');
            continue;
        }
        if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut last = ' ';
            for next in chars.by_ref() {
                if last == '*' && next == '/' {
                    break;
                }
                last = next;
            }
            continue;
        }

        // String literals
        if c == '"' || c == '\'' || c == '`' {
            let mut escaped = false;
            let mut literal = String::from(c);
            for next in chars.by_ref() {
                literal.push(next);
                if escaped {
                    escaped = false;
                } else if next == '\\' {
                    escaped = true;
                } else if next == c {
                    break;
                }
            }
            if brace_depth == 0 {
                current.push_str(&literal);
            }
            continue;
        }

        if brace_depth > 0 {
            match c {
                '{' => brace_depth += 1,
                '}' => brace_depth -= 1,
                _ => {}
            }
            continue;
        }

        match c {
            '(' => {
                paren_depth += 1;
                current.push(c);
            }
            ')' => {
                paren_depth = paren_depth.saturating_sub(1);
                current.push(c);
            }
            '{' if paren_depth == 0 => {
                brace_depth = 1;
                statements.push(std::mem::take(&mut current));
            }
            ';' if paren_depth == 0 => statements.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    statements.push(current);

    statements
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `name type` / `name: type` / `Type name` parameter text
pub(crate) fn parse_parameters(raw: &str, style: ParamStyle) -> Vec<Parameter> {
    split_top_level(raw)
        .into_iter()
        .filter_map(|part| {
            let part = strip_annotations(part);
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match style {
                ParamStyle::NameThenType => {
                    let mut tokens = part.splitn(2, char::is_whitespace);
                    let name = tokens.next()?.to_string();
                    let type_name = tokens.next().map(|t| t.trim().to_string());
                    Some(Parameter { name, type_name })
                }
                ParamStyle::TypeThenName => {
                    let (type_part, name) = part.rsplit_once(char::is_whitespace)?;
                    let type_part = type_part.trim().trim_start_matches("final ").trim();
                    Some(Parameter {
                        name: name.to_string(),
                        type_name: Some(type_part.to_string()),
                    })
                }
                ParamStyle::NameColonType => {
                    let part = part
                        .trim_start_matches("public ")
                        .trim_start_matches("private ")
                        .trim_start_matches("protected ")
                        .trim_start_matches("readonly ");
                    match part.split_once(':') {
                        Some((name, type_name)) => Some(Parameter {
                            name: name.split('=').next()?.trim().trim_end_matches('?').to_string(),
                            type_name: Some(type_name.split('=').next()?.trim().to_string()),
                        }),
                        None => Some(Parameter {
                            name: part.split('=').next()?.trim().to_string(),
                            type_name: None,
                        }),
                    }
                }
            }
        })
        .collect()
}

/// Parameter declaration order of a language
#[derive(Debug, Clone, Copy)]
pub(crate) enum ParamStyle {
    NameThenType,
    TypeThenName,
    NameColonType,
}

/// Drop `@Annotation` / `@Annotation(...)` prefixes from a parameter
pub(crate) fn strip_annotations(part: &str) -> String {
    let mut rest = part.trim();
    while let Some(stripped) = rest.strip_prefix('@') {
        let name_end = stripped
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(stripped.len());
        let mut after = &stripped[name_end..];
        if after.starts_with('(') {
            match after.find(')') {
                Some(close) => after = &after[close + 1..],
                None => after = "",
            }
        }
        rest = after.trim_start();
    }
    rest.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_path(Path::new("a/user.go")), Some(Language::Go));
        assert_eq!(Language::from_path(Path::new("User.java")), Some(Language::Java));
        assert_eq!(Language::from_path(Path::new("app.tsx")), Some(Language::TypeScript));
        assert_eq!(Language::from_path(Path::new("main.rs")), None);
        assert_eq!(Language::TypeScript.canonical_extension(), "ts");
    }

    #[test]
    fn test_block_body_handles_nesting() {
        let src = "type A struct { b struct { c int } }";
        let open = src.find('{').unwrap();
        assert_eq!(block_body(src, open), Some(" b struct { c int } "));
        assert_eq!(block_body("{ unterminated", 0), None);
    }

    #[test]
    fn test_split_top_level_respects_generics() {
        let parts = split_top_level("Map<String, Long> a, List<User> b");
        assert_eq!(parts, vec!["Map<String, Long> a", "List<User> b"]);
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("com.acme.Repository<User>"), "Repository");
        assert_eq!(simple_type_name("*UserStore"), "UserStore");
        assert_eq!(simple_type_name(" Base "), "Base");
    }

    #[test]
    fn test_parse_java_parameters_with_annotations() {
        let params = parse_parameters("@PathVariable @Min(1) Long id, @RequestBody final UserDTO body", ParamStyle::TypeThenName);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "id");
        assert_eq!(params[0].type_name.as_deref(), Some("Long"));
        assert_eq!(params[1].name, "body");
        assert_eq!(params[1].type_name.as_deref(), Some("UserDTO"));
    }

    #[test]
    fn test_parse_ts_parameters() {
        let params = parse_parameters("private readonly users: UserService, limit = 10", ParamStyle::NameColonType);
        assert_eq!(params[0].name, "users");
        assert_eq!(params[0].type_name.as_deref(), Some("UserService"));
        assert_eq!(params[1].name, "limit");
        assert_eq!(params[1].type_name, None);
    }

    #[test]
    fn test_join_route() {
        assert_eq!(join_route("/api/v1/users", "/{id}"), "/api/v1/users/{id}");
        assert_eq!(join_route("/api/v1/users/", ""), "/api/v1/users");
        assert_eq!(join_route("", "health"), "/health");
        assert_eq!(join_route("", ""), "/");
    }

    #[test]
    fn test_top_level_statements_drop_nested_blocks() {
        let body = r#"
            // counter
            private int count = 0;
            @GetMapping("/{id}")
            public int get() { return count; }
            /* hidden; */ private String name = "a;b";
        "#;
        let statements = top_level_statements(body);
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], "private int count = 0");
        assert!(statements[1].ends_with("public int get()"));
        assert_eq!(statements[2], r#"private String name = "a;b""#);
    }

    #[test]
    fn test_comment_block_skips_multiline_annotations() {
        let src = "/**\n * Fetch.\n */\n@ApiResponses({\n    @ApiResponse(code = 1)\n})\n@Get\npublic void fetch() {}\n";
        let offset = src.find("public").unwrap();
        assert_eq!(comment_block_before(src, offset), vec!["Fetch."]);
    }

    #[test]
    fn test_comment_block_before() {
        let src = "package x\n\n// Handles users\n// and more\nfunc A() {}\n";
        let offset = src.find("func").unwrap();
        assert_eq!(comment_block_before(src, offset), vec!["Handles users", "and more"]);
    }
}
