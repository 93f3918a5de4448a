use std::path::Path;
use regex::Regex;

use crate::error::Result;
use super::super::parser::{ApiEndpoint, EndpointParam, EndpointResponse, FunctionDecl, TypeDecl};
use super::super::relationships::RelationshipKind;
use super::{
    block_body, comment_block_before, line_of, paren_body, parse_parameters, Capture, Language,
    LanguageParser, LanguageProfile, ParamStyle, ParsedItems, PatternSpec, TargetKind,
};

pub(super) static PROFILE: LanguageProfile = LanguageProfile {
    extensions: &["go"],
    package_separator: '/',
    source_roots: &[".", "src"],
    index_stem: None,
    directory_packages: true,
    reference_patterns: REFERENCE_PATTERNS,
};

const REFERENCE_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        kind: RelationshipKind::Import,
        pattern: r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#,
        capture: Capture::Whole,
        target: TargetKind::ImportPath,
        detail: "import",
    },
    PatternSpec {
        kind: RelationshipKind::Import,
        pattern: r"(?s)\bimport\s*\(([^)]*)\)",
        capture: Capture::Each(r#""([^"]+)""#),
        target: TargetKind::ImportPath,
        detail: "import",
    },
    // Embedded struct or interface on a line of its own inside a type body
    PatternSpec {
        kind: RelationshipKind::Extends,
        pattern: r"(?s)\btype\s+\w+\s+(?:struct|interface)\s*\{([^}]*)\}",
        capture: Capture::Each(r"(?m)^[ \t]*\*?((?:\w+\.)?[A-Z]\w*)[ \t]*$"),
        target: TargetKind::Symbol,
        detail: "embeds",
    },
    // Named struct fields only; function bodies never match
    PatternSpec {
        kind: RelationshipKind::References,
        pattern: r"(?s)\btype\s+\w+\s+struct\s*\{([^}]*)\}",
        capture: Capture::Each(r"(?m)^[ \t]*\w+[ \t]+(?:\[\])?\*?((?:\w+\.)?[A-Z]\w*)"),
        target: TargetKind::Symbol,
        detail: "field",
    },
    PatternSpec {
        kind: RelationshipKind::Calls,
        pattern: r"\bNew([A-Z]\w*)\s*\(",
        capture: Capture::Whole,
        target: TargetKind::Symbol,
        detail: "constructs",
    },
    PatternSpec {
        kind: RelationshipKind::Config,
        pattern: r"\b(?:config|cfg|conf)\.([A-Z]\w*)",
        capture: Capture::Whole,
        target: TargetKind::Symbol,
        detail: "configured by",
    },
];

/// Go-specific parser using regular expressions
pub struct GoParser {
    type_regex: Regex,
    alias_regex: Regex,
    func_regex: Regex,
    route_regex: Regex,
    handle_func_regex: Regex,
    swagger_router_regex: Regex,
    swagger_param_regex: Regex,
    swagger_response_regex: Regex,
    swagger_summary_regex: Regex,
    path_param_regex: Regex,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            type_regex: Regex::new(r"(?m)^type\s+(\w+)\s+(struct|interface)\s*\{")?,
            alias_regex: Regex::new(r"(?m)^type\s+(\w+)\s+([\w.\[\]*]+)[ \t]*$")?,
            func_regex: Regex::new(r"(?m)^func\s+(?:\(\s*(?:\w+\s+)?\*?(\w+)\s*\)\s*)?(\w+)\s*\(")?,
            route_regex: Regex::new(
                r#"\b\w+\.(GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS|Get|Post|Put|Delete|Patch)\(\s*"([^"]*)"\s*,\s*([\w.]+)"#,
            )?,
            handle_func_regex: Regex::new(
                r#"\bHandleFunc\(\s*"([^"]*)"\s*,\s*([\w.]+)\s*\)(?:\.Methods\(\s*"(\w+)")?"#,
            )?,
            swagger_router_regex: Regex::new(r"@Router\s+(\S+)\s+\[(\w+)\]")?,
            swagger_param_regex: Regex::new(r"@Param\s+(\S+)\s+(\w+)\s+(\S+)\s+(true|false)")?,
            swagger_response_regex: Regex::new(r"@(?:Success|Failure)\s+(\d{3})(?:\s+\{\w+\}\s+(\S+))?")?,
            swagger_summary_regex: Regex::new(r"@Summary\s+(.+)")?,
            path_param_regex: Regex::new(r"[:{](\w+)")?,
        })
    }
}

impl LanguageParser for GoParser {
    fn parse(&self, content: &str, _file_path: &Path) -> Result<ParsedItems> {
        let mut items = ParsedItems::default();

        self.extract_types(content, &mut items.types);
        self.extract_functions(content, &mut items);
        self.extract_routes(content, &mut items.endpoints);

        Ok(items)
    }

    fn extract_file_docs(&self, content: &str) -> Option<String> {
        let mut doc_lines = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if let Some(comment) = trimmed.strip_prefix("//") {
                let comment = comment.trim();
                if !comment.is_empty() {
                    doc_lines.push(comment.to_string());
                }
            } else if trimmed.is_empty() && doc_lines.is_empty() {
                continue;
            } else {
                break;
            }
        }

        if doc_lines.is_empty() {
            None
        } else {
            Some(doc_lines.join(" "))
        }
    }

    fn language(&self) -> Language {
        Language::Go
    }
}

impl GoParser {
    fn extract_types(&self, content: &str, types: &mut Vec<TypeDecl>) {
        for cap in self.type_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let kind = cap[2].to_string();
            let members = block_body(content, whole.end() - 1)
                .map(|body| Self::members(body))
                .unwrap_or_default();

            types.push(TypeDecl {
                name: cap[1].to_string(),
                kind,
                members,
                line: line_of(content, whole.start()),
            });
        }

        for cap in self.alias_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            types.push(TypeDecl {
                name: cap[1].to_string(),
                kind: "type".to_string(),
                members: vec![],
                line: line_of(content, whole.start()),
            });
        }

        types.sort_by_key(|t| t.line);
    }

    /// Field names of a struct, method names of an interface
    fn members(body: &str) -> Vec<String> {
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("//"))
            .filter_map(|line| {
                line.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                    .find(|token| !token.is_empty())
                    .map(str::to_string)
            })
            .collect()
    }

    fn extract_functions(&self, content: &str, items: &mut ParsedItems) {
        for cap in self.func_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let open = whole.end() - 1;
            let Some(raw_params) = paren_body(content, open) else {
                continue;
            };

            let after = &content[open + raw_params.len() + 2..];
            let return_type = after
                .split(|c: char| c == '{' || c == '\n')
                .next()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);

            let comments = comment_block_before(content, whole.start());
            let docs: Vec<&str> = comments
                .iter()
                .map(String::as_str)
                .filter(|line| !line.starts_with('@'))
                .collect();
            let name = cap[2].to_string();
            let line = line_of(content, whole.start());

            if comments.iter().any(|c| c.starts_with("@Router")) {
                if let Some(endpoint) = self.swagger_endpoint(&comments, &name, line) {
                    items.endpoints.push(endpoint);
                }
            }

            items.functions.push(FunctionDecl {
                name,
                receiver: cap.get(1).map(|m| m.as_str().to_string()),
                parameters: parse_parameters(raw_params, ParamStyle::NameThenType),
                return_type,
                docs: (!docs.is_empty()).then(|| docs.join(" ")),
                line,
            });
        }
    }

    /// Endpoint described by swag-style `@Router` annotations above a handler
    fn swagger_endpoint(&self, comments: &[String], handler: &str, line: usize) -> Option<ApiEndpoint> {
        let block = comments.join("\n");
        let router = self.swagger_router_regex.captures(&block)?;

        let parameters = self
            .swagger_param_regex
            .captures_iter(&block)
            .map(|cap| EndpointParam {
                name: cap[1].to_string(),
                location: cap[2].to_string(),
                type_name: Some(cap[3].to_string()),
                required: &cap[4] == "true",
            })
            .collect();

        let responses = self
            .swagger_response_regex
            .captures_iter(&block)
            .map(|cap| EndpointResponse {
                status: cap[1].to_string(),
                description: cap.get(2).map(|m| m.as_str().to_string()),
            })
            .collect();

        Some(ApiEndpoint {
            method: router[2].to_uppercase(),
            path: router[1].to_string(),
            handler: Some(handler.to_string()),
            summary: self
                .swagger_summary_regex
                .captures(&block)
                .map(|cap| cap[1].trim().to_string()),
            parameters,
            responses,
            line,
        })
    }

    /// Router registrations: gin/echo/chi style and net/http + gorilla HandleFunc
    fn extract_routes(&self, content: &str, endpoints: &mut Vec<ApiEndpoint>) {
        for cap in self.route_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let path = cap[2].to_string();
            endpoints.push(ApiEndpoint {
                method: cap[1].to_uppercase(),
                parameters: self.path_parameters(&path),
                handler: Some(last_segment(&cap[3])),
                summary: None,
                path,
                responses: vec![],
                line: line_of(content, whole.start()),
            });
        }

        for cap in self.handle_func_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let path = cap[1].to_string();
            endpoints.push(ApiEndpoint {
                method: cap
                    .get(3)
                    .map(|m| m.as_str().to_uppercase())
                    .unwrap_or_else(|| "ANY".to_string()),
                parameters: self.path_parameters(&path),
                handler: Some(last_segment(&cap[2])),
                summary: None,
                path,
                responses: vec![],
                line: line_of(content, whole.start()),
            });
        }
    }

    fn path_parameters(&self, path: &str) -> Vec<EndpointParam> {
        self.path_param_regex
            .captures_iter(path)
            .map(|cap| EndpointParam {
                name: cap[1].to_string(),
                location: "path".to_string(),
                type_name: None,
                required: true,
            })
            .collect()
    }
}

fn last_segment(qualified: &str) -> String {
    qualified.rsplit('.').next().unwrap_or(qualified).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_API: &str = r#"// Package api exposes user endpoints
package api

import (
	"net/http"

	"github.com/gin-gonic/gin"
)

// UserService handles user-related operations
type UserService struct {
	db *Database
}

type UserID int64

// GetUser retrieves a user by their ID
// @Summary Get user by ID
// @Param id path int true "User ID"
// @Success 200 {object} User
// @Failure 404 {object} ErrorResponse
// @Router /api/v1/users/{id} [get]
func (s *UserService) GetUser(c *gin.Context) {
	c.JSON(http.StatusOK, nil)
}

func Register(r *gin.Engine, s *UserService) error {
	r.POST("/api/v1/users", s.CreateUser)
	http.HandleFunc("/healthz", health)
	return nil
}
"#;

    #[test]
    fn test_extracts_types_and_members() {
        let parser = GoParser::new().unwrap();
        let items = parser.parse(USER_API, Path::new("user_api.go")).unwrap();

        assert_eq!(items.types.len(), 2);
        assert_eq!(items.types[0].name, "UserService");
        assert_eq!(items.types[0].kind, "struct");
        assert_eq!(items.types[0].members, vec!["db"]);
        assert_eq!(items.types[1].name, "UserID");
        assert_eq!(items.types[1].kind, "type");
    }

    #[test]
    fn test_extracts_functions_with_receivers() {
        let parser = GoParser::new().unwrap();
        let items = parser.parse(USER_API, Path::new("user_api.go")).unwrap();

        let get_user = items.functions.iter().find(|f| f.name == "GetUser").unwrap();
        assert_eq!(get_user.receiver.as_deref(), Some("UserService"));
        assert_eq!(get_user.parameters[0].name, "c");
        assert_eq!(get_user.parameters[0].type_name.as_deref(), Some("*gin.Context"));
        assert_eq!(get_user.docs.as_deref(), Some("GetUser retrieves a user by their ID"));

        let register = items.functions.iter().find(|f| f.name == "Register").unwrap();
        assert_eq!(register.return_type.as_deref(), Some("error"));
        assert_eq!(register.parameters.len(), 2);
    }

    #[test]
    fn test_extracts_swagger_and_router_endpoints() {
        let parser = GoParser::new().unwrap();
        let items = parser.parse(USER_API, Path::new("user_api.go")).unwrap();

        assert_eq!(items.endpoints.len(), 3);

        let get = &items.endpoints[0];
        assert_eq!(get.method, "GET");
        assert_eq!(get.path, "/api/v1/users/{id}");
        assert_eq!(get.handler.as_deref(), Some("GetUser"));
        assert_eq!(get.summary.as_deref(), Some("Get user by ID"));
        assert_eq!(get.parameters[0].name, "id");
        assert!(get.parameters[0].required);
        assert_eq!(get.responses.len(), 2);
        assert_eq!(get.responses[1].status, "404");

        let post = &items.endpoints[1];
        assert_eq!(post.method, "POST");
        assert_eq!(post.handler.as_deref(), Some("CreateUser"));

        let health = &items.endpoints[2];
        assert_eq!(health.method, "ANY");
        assert_eq!(health.path, "/healthz");
    }

    #[test]
    fn test_file_docs() {
        let parser = GoParser::new().unwrap();
        assert_eq!(
            parser.extract_file_docs(USER_API).as_deref(),
            Some("Package api exposes user endpoints")
        );
        assert_eq!(parser.extract_file_docs("package x\n"), None);
    }
}
