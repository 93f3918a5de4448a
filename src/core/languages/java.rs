use std::path::Path;
use regex::Regex;

use crate::error::Result;
use super::super::parser::{ApiEndpoint, EndpointParam, EndpointResponse, FunctionDecl, TypeDecl};
use super::super::relationships::RelationshipKind;
use super::{
    block_body, comment_block_before, join_route, line_of, paren_body, parse_parameters,
    split_top_level, top_level_statements, Capture, Language, LanguageParser, LanguageProfile,
    ParamStyle, ParsedItems, PatternSpec, TargetKind,
};

pub(super) static PROFILE: LanguageProfile = LanguageProfile {
    extensions: &["java"],
    package_separator: '.',
    source_roots: &["src/main/java", "src", "."],
    index_stem: None,
    directory_packages: false,
    reference_patterns: REFERENCE_PATTERNS,
};

const REFERENCE_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        kind: RelationshipKind::Import,
        pattern: r"(?m)^\s*import\s+([\w.]+)\s*;",
        capture: Capture::Whole,
        target: TargetKind::ImportPath,
        detail: "import",
    },
    PatternSpec {
        kind: RelationshipKind::Extends,
        pattern: r"\bclass\s+\w+(?:<[^>{]*>)?\s+extends\s+([\w.]+)",
        capture: Capture::Whole,
        target: TargetKind::Symbol,
        detail: "extends",
    },
    PatternSpec {
        kind: RelationshipKind::Implements,
        pattern: r"\bimplements\s+([\w.,\s<>]+?)\s*\{",
        capture: Capture::List,
        target: TargetKind::Symbol,
        detail: "implements",
    },
    PatternSpec {
        kind: RelationshipKind::Extends,
        pattern: r"\binterface\s+\w+(?:<[^>{]*>)?\s+extends\s+([\w.,\s<>]+?)\s*\{",
        capture: Capture::List,
        target: TargetKind::Symbol,
        detail: "extends",
    },
    PatternSpec {
        kind: RelationshipKind::References,
        pattern: r"@(?:Autowired|Inject|Resource)\s+(?:(?:private|protected|public|final)\s+)*([\w.]+)",
        capture: Capture::Whole,
        target: TargetKind::Symbol,
        detail: "injected",
    },
    PatternSpec {
        kind: RelationshipKind::References,
        pattern: r"\bprivate\s+final\s+([\w.]+)(?:<[^>;]*>)?\s+\w+\s*;",
        capture: Capture::Whole,
        target: TargetKind::Symbol,
        detail: "constructor injected",
    },
    PatternSpec {
        kind: RelationshipKind::Calls,
        pattern: r"\bnew\s+([\w.]+)\s*(?:<[^>]*>)?\s*\(",
        capture: Capture::Whole,
        target: TargetKind::Symbol,
        detail: "instantiates",
    },
    PatternSpec {
        kind: RelationshipKind::Config,
        pattern: r"@(?:Import|EnableConfigurationProperties|ContextConfiguration)\s*\(([^)]*)\)",
        capture: Capture::Each(r"([\w.]+)\.class"),
        target: TargetKind::Symbol,
        detail: "configured by",
    },
];

const NOT_A_RETURN_TYPE: &[&str] = &["return", "new", "throw", "else", "case", "yield", "assert"];
const NOT_A_METHOD: &[&str] = &["if", "for", "while", "switch", "catch", "synchronized", "try"];

/// Java-specific parser with Spring MVC endpoint detection
pub struct JavaParser {
    type_regex: Regex,
    method_regex: Regex,
    mapping_regex: Regex,
    quoted_regex: Regex,
    request_method_regex: Regex,
    response_code_regex: Regex,
    response_status_regex: Regex,
    summary_regex: Regex,
    named_param_regex: Regex,
}

/// A method with its source position, used to attach endpoints
struct JavaMethod {
    offset: usize,
    raw_params: String,
    decl: FunctionDecl,
}

/// A type with the byte range of its body
struct JavaType {
    start: usize,
    end: usize,
    route_prefix: Option<String>,
    decl: TypeDecl,
}

impl JavaParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            type_regex: Regex::new(
                r"(?m)^[ \t]*(?:(?:public|protected|private|abstract|final|static|sealed|non-sealed|strictfp)\s+)*(class|interface|enum|record|@interface)\s+(\w+)",
            )?,
            method_regex: Regex::new(
                r"(?m)^[ \t]*(?:(?:public|protected|private|static|final|abstract|synchronized|default|native)\s+)*(?:<[^>]+>\s+)?([\w.]+(?:<[^;{}()]*>)?(?:\[\])*)\s+(\w+)\s*\(",
            )?,
            mapping_regex: Regex::new(r"@(Get|Post|Put|Delete|Patch|Request)Mapping\b(?:\s*\(([^)]*)\))?")?,
            quoted_regex: Regex::new(r#""([^"]*)""#)?,
            request_method_regex: Regex::new(r"RequestMethod\.(\w+)")?,
            response_code_regex: Regex::new(
                r#"responseCode\s*=\s*"(\d{3})"(?:\s*,\s*description\s*=\s*"([^"]*)")?"#,
            )?,
            response_status_regex: Regex::new(r"@ResponseStatus\s*\(\s*(?:(?:code|value)\s*=\s*)?HttpStatus\.(\w+)")?,
            summary_regex: Regex::new(r#"summary\s*=\s*"([^"]*)""#)?,
            named_param_regex: Regex::new(
                r#"@(?:PathVariable|RequestParam|RequestHeader)\s*\(\s*(?:(?:name|value)\s*=\s*)?"(\w+)""#,
            )?,
        })
    }
}

impl LanguageParser for JavaParser {
    fn parse(&self, content: &str, _file_path: &Path) -> Result<ParsedItems> {
        let mut types = self.extract_types(content);
        let methods = self.extract_methods(content, &types);

        for java_type in &mut types {
            let mut members: Vec<String> = methods
                .iter()
                .filter(|m| m.offset > java_type.start && m.offset < java_type.end)
                .map(|m| m.decl.name.clone())
                .collect();
            members.splice(0..0, self.field_names(content, java_type));
            java_type.decl.members = members;
        }

        let endpoints = self.extract_endpoints(content, &types, &methods);

        Ok(ParsedItems {
            types: types.into_iter().map(|t| t.decl).collect(),
            functions: methods.into_iter().map(|m| m.decl).collect(),
            endpoints,
        })
    }

    fn extract_file_docs(&self, content: &str) -> Option<String> {
        let mut doc_lines = Vec::new();
        let mut in_javadoc = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.starts_with("/*") {
                in_javadoc = !trimmed.ends_with("*/");
                let text = trimmed.trim_start_matches('/').trim_start_matches('*').trim_end_matches("*/").trim();
                if !text.is_empty() {
                    doc_lines.push(text.to_string());
                }
            } else if in_javadoc {
                if trimmed.ends_with("*/") {
                    in_javadoc = false;
                }
                let text = trimmed.trim_end_matches("*/").trim_start_matches('*').trim();
                // Javadoc tags describe authorship, not the file
                if !text.is_empty() && !text.starts_with('@') {
                    doc_lines.push(text.to_string());
                }
            } else if let Some(comment) = trimmed.strip_prefix("//") {
                if !comment.trim().is_empty() {
                    doc_lines.push(comment.trim().to_string());
                }
            } else if trimmed.is_empty() || trimmed.starts_with("package") || trimmed.starts_with("import") {
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
        Language::Java
    }
}

impl JavaParser {
    fn extract_types(&self, content: &str) -> Vec<JavaType> {
        let mut types = Vec::new();

        for cap in self.type_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let Some(brace) = content[whole.end()..].find('{').map(|i| whole.end() + i) else {
                continue;
            };
            let body_len = block_body(content, brace).map_or(0, str::len);

            types.push(JavaType {
                start: brace,
                end: brace + body_len + 1,
                route_prefix: None,
                decl: TypeDecl {
                    name: cap[2].to_string(),
                    kind: cap[1].trim_start_matches('@').to_string(),
                    members: vec![],
                    line: line_of(content, whole.start()),
                },
            });
        }

        types
    }

    fn extract_methods(&self, content: &str, types: &[JavaType]) -> Vec<JavaMethod> {
        let mut methods = Vec::new();

        for cap in self.method_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let return_type = &cap[1];
            let name = &cap[2];
            if NOT_A_RETURN_TYPE.contains(&return_type) || NOT_A_METHOD.contains(&name) {
                continue;
            }

            let open = whole.end() - 1;
            let Some(raw_params) = paren_body(content, open) else { continue };
            let rest = content[open + raw_params.len() + 2..].trim_start();
            if !(rest.starts_with('{') || rest.starts_with(';') || rest.starts_with("throws")) {
                continue;
            }

            let docs = comment_block_before(content, whole.start());
            let receiver = types
                .iter()
                .filter(|t| whole.start() > t.start && whole.start() < t.end)
                .min_by_key(|t| t.end - t.start)
                .map(|t| t.decl.name.clone());

            methods.push(JavaMethod {
                offset: whole.start(),
                raw_params: raw_params.to_string(),
                decl: FunctionDecl {
                    name: name.to_string(),
                    receiver,
                    parameters: parse_parameters(raw_params, ParamStyle::TypeThenName),
                    return_type: Some(return_type.to_string()).filter(|r| r != "void"),
                    docs: docs
                        .iter()
                        .find(|line| !line.starts_with('@'))
                        .cloned(),
                    line: line_of(content, whole.start()),
                },
            });
        }

        methods
    }

    /// Field names declared directly in a type body
    fn field_names(&self, content: &str, java_type: &JavaType) -> Vec<String> {
        let Some(body) = block_body(content, java_type.start) else {
            return vec![];
        };

        let statements = top_level_statements(body);
        if java_type.decl.kind == "enum" {
            return statements
                .first()
                .map(|constants| {
                    split_top_level(constants)
                        .into_iter()
                        .filter_map(|c| c.split('(').next())
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty() && c.chars().all(|ch| ch.is_alphanumeric() || ch == '_'))
                        .collect()
                })
                .unwrap_or_default();
        }

        statements
            .iter()
            .filter_map(|statement| {
                let declaration = statement.split('=').next()?.trim();
                if declaration.contains('(') || declaration.is_empty() {
                    return None;
                }
                let name = declaration.rsplit(char::is_whitespace).next()?;
                let is_identifier = name.chars().all(|c| c.is_alphanumeric() || c == '_');
                (is_identifier && declaration.contains(char::is_whitespace)).then(|| name.to_string())
            })
            .collect()
    }

    fn extract_endpoints(&self, content: &str, types: &[JavaType], methods: &[JavaMethod]) -> Vec<ApiEndpoint> {
        // Class-level mappings become prefixes for the type that follows them
        let mut prefixes: Vec<(usize, String)> = Vec::new();
        let mut method_mappings = Vec::new();

        for cap in self.mapping_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let args = cap.get(2).map_or("", |m| m.as_str());
            let next_type = types.iter().map(|t| t.start).filter(|s| *s > whole.end()).min();
            let next_method = methods.iter().position(|m| m.offset > whole.end());

            let is_class_level = match (next_type, next_method) {
                (Some(t), Some(m)) => t < methods[m].offset,
                (Some(_), None) => true,
                _ => false,
            };

            let path = self
                .quoted_regex
                .captures(args)
                .map(|c| c[1].to_string())
                .unwrap_or_default();

            if is_class_level {
                if let Some(type_start) = next_type {
                    prefixes.push((type_start, path));
                }
            } else if let Some(index) = next_method {
                let method = match &cap[1] {
                    "Request" => self
                        .request_method_regex
                        .captures(args)
                        .map(|c| c[1].to_uppercase())
                        .unwrap_or_else(|| "ANY".to_string()),
                    verb => verb.to_uppercase(),
                };
                method_mappings.push((index, method, path, whole.start()));
            }
        }

        let types: Vec<JavaType> = types
            .iter()
            .map(|t| JavaType {
                route_prefix: prefixes.iter().find(|(s, _)| *s == t.start).map(|(_, p)| p.clone()),
                start: t.start,
                end: t.end,
                decl: t.decl.clone(),
            })
            .collect();

        method_mappings
            .into_iter()
            .map(|(index, http_method, path, annotation_start)| {
                let method = &methods[index];
                let prefix = types
                    .iter()
                    .filter(|t| method.offset > t.start && method.offset < t.end)
                    .min_by_key(|t| t.end - t.start)
                    .and_then(|t| t.route_prefix.clone())
                    .unwrap_or_default();

                let window_start = if index > 0 { methods[index - 1].offset } else { 0 };
                let window = &content[window_start..method.offset];

                ApiEndpoint {
                    method: http_method,
                    path: join_route(&prefix, &path),
                    handler: Some(method.decl.name.clone()),
                    summary: self.summary_regex.captures(window).map(|c| c[1].to_string()),
                    parameters: self.endpoint_parameters(&method.raw_params),
                    responses: self.responses(window),
                    line: line_of(content, annotation_start),
                }
            })
            .collect()
    }

    fn endpoint_parameters(&self, raw_params: &str) -> Vec<EndpointParam> {
        split_top_level(raw_params)
            .into_iter()
            .filter_map(|part| {
                let location = if part.contains("@PathVariable") {
                    "path"
                } else if part.contains("@RequestParam") {
                    "query"
                } else if part.contains("@RequestBody") {
                    "body"
                } else if part.contains("@RequestHeader") {
                    "header"
                } else {
                    return None;
                };

                let parsed = parse_parameters(part, ParamStyle::TypeThenName).into_iter().next()?;
                let name = self
                    .named_param_regex
                    .captures(part)
                    .map(|c| c[1].to_string())
                    .unwrap_or(parsed.name);

                Some(EndpointParam {
                    name,
                    location: location.to_string(),
                    type_name: parsed.type_name,
                    required: !part.replace(' ', "").contains("required=false"),
                })
            })
            .collect()
    }

    fn responses(&self, window: &str) -> Vec<EndpointResponse> {
        let mut responses: Vec<EndpointResponse> = self
            .response_code_regex
            .captures_iter(window)
            .map(|c| EndpointResponse {
                status: c[1].to_string(),
                description: c.get(2).map(|m| m.as_str().to_string()),
            })
            .collect();

        if let Some(status) = self.response_status_regex.captures(window) {
            responses.push(EndpointResponse {
                status: status[1].to_string(),
                description: None,
            });
        }

        responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROLLER: &str = r#"package com.example.api.controller;

import com.example.api.dto.UserDTO;
import com.example.api.service.UserService;

/**
 * REST Controller for user management operations.
 *
 * @author API Team
 */
@RestController
@RequestMapping("/api/v1/users")
public class UserController extends BaseController implements Auditable, Traceable<UserDTO> {

    @Autowired
    private UserService userService;

    private final int pageSize = 20;

    /**
     * Retrieve a user by id.
     */
    @Operation(summary = "Get user by ID")
    @ApiResponses({
        @ApiResponse(responseCode = "200", description = "User found"),
        @ApiResponse(responseCode = "404", description = "User not found")
    })
    @GetMapping("/{id}")
    public ResponseEntity<UserDTO> getUser(@PathVariable @Min(1) Long id) {
        UserDTO user = userService.findById(id);
        if (user == null) {
            throw new UserNotFoundException(id);
        }
        return ResponseEntity.ok(user);
    }

    @PostMapping
    @ResponseStatus(HttpStatus.CREATED)
    public UserDTO createUser(@Valid @RequestBody CreateUserRequest request,
                              @RequestParam(value = "notify", required = false) Boolean sendMail) {
        return userService.createUser(request);
    }
}

enum Status { ACTIVE, SUSPENDED("s"); }
"#;

    #[test]
    fn test_extracts_types_with_members() {
        let parser = JavaParser::new().unwrap();
        let items = parser.parse(CONTROLLER, Path::new("UserController.java")).unwrap();

        assert_eq!(items.types.len(), 2);
        let controller = &items.types[0];
        assert_eq!(controller.name, "UserController");
        assert_eq!(controller.kind, "class");
        assert_eq!(controller.members, vec!["userService", "pageSize", "getUser", "createUser"]);

        let status = &items.types[1];
        assert_eq!(status.kind, "enum");
        assert_eq!(status.members, vec!["ACTIVE", "SUSPENDED"]);
    }

    #[test]
    fn test_extracts_methods_not_statements() {
        let parser = JavaParser::new().unwrap();
        let items = parser.parse(CONTROLLER, Path::new("UserController.java")).unwrap();

        let names: Vec<_> = items.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["getUser", "createUser"]);

        let get_user = &items.functions[0];
        assert_eq!(get_user.receiver.as_deref(), Some("UserController"));
        assert_eq!(get_user.return_type.as_deref(), Some("ResponseEntity<UserDTO>"));
        assert_eq!(get_user.docs.as_deref(), Some("Retrieve a user by id."));
        assert_eq!(get_user.parameters[0].name, "id");
    }

    #[test]
    fn test_extracts_spring_endpoints_with_class_prefix() {
        let parser = JavaParser::new().unwrap();
        let items = parser.parse(CONTROLLER, Path::new("UserController.java")).unwrap();

        assert_eq!(items.endpoints.len(), 2);

        let get = &items.endpoints[0];
        assert_eq!(get.method, "GET");
        assert_eq!(get.path, "/api/v1/users/{id}");
        assert_eq!(get.summary.as_deref(), Some("Get user by ID"));
        assert_eq!(get.parameters.len(), 1);
        assert_eq!(get.parameters[0].location, "path");
        let statuses: Vec<_> = get.responses.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["200", "404"]);

        let post = &items.endpoints[1];
        assert_eq!(post.method, "POST");
        assert_eq!(post.path, "/api/v1/users");
        assert_eq!(post.handler.as_deref(), Some("createUser"));
        assert_eq!(post.parameters.len(), 2);
        assert_eq!(post.parameters[0].location, "body");
        assert_eq!(post.parameters[1].name, "notify");
        assert!(!post.parameters[1].required);
        assert_eq!(post.responses[0].status, "CREATED");
    }

    #[test]
    fn test_file_docs_skip_javadoc_tags() {
        let parser = JavaParser::new().unwrap();
        assert_eq!(
            parser.extract_file_docs(CONTROLLER).as_deref(),
            Some("REST Controller for user management operations.")
        );
    }
}
