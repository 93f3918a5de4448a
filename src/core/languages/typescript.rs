use std::path::Path;
use regex::Regex;

use crate::error::Result;
use super::super::parser::{ApiEndpoint, EndpointParam, EndpointResponse, FunctionDecl, TypeDecl};
use super::super::relationships::RelationshipKind;
use super::{
    block_body, comment_block_before, join_route, line_of, paren_body, parse_parameters,
    split_top_level, strip_annotations, top_level_statements, Capture, Language, LanguageParser,
    LanguageProfile, ParamStyle, ParsedItems, PatternSpec, TargetKind,
};

pub(super) static PROFILE: LanguageProfile = LanguageProfile {
    extensions: &["ts", "tsx"],
    package_separator: '/',
    source_roots: &["src", "."],
    index_stem: Some("index"),
    directory_packages: false,
    reference_patterns: REFERENCE_PATTERNS,
};

const REFERENCE_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        kind: RelationshipKind::Import,
        pattern: r#"(?m)^\s*import\s+(?:type\s+)?[\w*{}\s,$]+?\s+from\s+['"]([^'"]+)['"]"#,
        capture: Capture::Whole,
        target: TargetKind::ImportPath,
        detail: "import",
    },
    PatternSpec {
        kind: RelationshipKind::Import,
        pattern: r#"(?m)^\s*import\s+['"]([^'"]+)['"]"#,
        capture: Capture::Whole,
        target: TargetKind::ImportPath,
        detail: "import",
    },
    PatternSpec {
        kind: RelationshipKind::Import,
        pattern: r#"(?m)^\s*export\s+(?:\*|\{[^}]*\})\s+from\s+['"]([^'"]+)['"]"#,
        capture: Capture::Whole,
        target: TargetKind::ImportPath,
        detail: "re-export",
    },
    PatternSpec {
        kind: RelationshipKind::Import,
        pattern: r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        capture: Capture::Whole,
        target: TargetKind::ImportPath,
        detail: "require",
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
    // Constructor parameter properties are the DI seam in Angular and NestJS
    PatternSpec {
        kind: RelationshipKind::References,
        pattern: r"\bconstructor\s*\(([^)]*)\)",
        capture: Capture::Each(r":\s*([A-Z]\w*)"),
        target: TargetKind::Symbol,
        detail: "injected",
    },
    PatternSpec {
        kind: RelationshipKind::Calls,
        pattern: r"\bnew\s+([A-Z][\w.]*)\s*(?:<[^>]*>)?\s*\(",
        capture: Capture::Whole,
        target: TargetKind::Symbol,
        detail: "instantiates",
    },
    PatternSpec {
        kind: RelationshipKind::Config,
        pattern: r"@Module\s*\(\s*\{[^}]*?\bimports\s*:\s*\[([^\]]*)\]",
        capture: Capture::Each(r"\b([A-Z]\w*)"),
        target: TargetKind::Symbol,
        detail: "module imports",
    },
];

const NOT_A_METHOD: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "constructor", "super", "await",
    "typeof", "new",
];

/// Receivers whose `.get('/path', ...)` style calls register Express routes
const ROUTER_RECEIVERS: &[&str] = &["app", "router", "server", "api"];

/// TypeScript parser covering NestJS controllers and Express routers
pub struct TypeScriptParser {
    type_regex: Regex,
    alias_regex: Regex,
    function_regex: Regex,
    arrow_regex: Regex,
    method_regex: Regex,
    controller_regex: Regex,
    route_decorator_regex: Regex,
    express_route_regex: Regex,
    named_param_regex: Regex,
    summary_regex: Regex,
    api_response_regex: Regex,
    http_code_regex: Regex,
    path_param_regex: Regex,
}

struct TsType {
    start: usize,
    end: usize,
    decl: TypeDecl,
}

struct TsMethod {
    offset: usize,
    raw_params: String,
    decl: FunctionDecl,
}

impl TypeScriptParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            type_regex: Regex::new(
                r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(class|interface|enum)\s+(\w+)",
            )?,
            alias_regex: Regex::new(r"(?m)^[ \t]*(?:export\s+)?type\s+(\w+)(?:<[^=]*>)?\s*=")?,
            function_regex: Regex::new(
                r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*(?:<[^(]*>)?\s*\(",
            )?,
            arrow_regex: Regex::new(
                r"(?m)^[ \t]*(?:export\s+)?(?:const|let)\s+(\w+)\s*(?::[^=\n]+)?=\s*(?:async\s+)?\(",
            )?,
            method_regex: Regex::new(
                r"(?m)^[ \t]+(?:(?:public|private|protected|static|async|readonly|abstract|override|get|set)\s+)*(\w+)\s*(?:<[^(]*>)?\s*\(",
            )?,
            controller_regex: Regex::new(r#"@Controller\s*\(\s*(?:['"`]([^'"`]*)['"`])?"#)?,
            route_decorator_regex: Regex::new(
                r#"@(Get|Post|Put|Delete|Patch|Options|Head|All)\s*\(\s*(?:['"`]([^'"`]*)['"`])?\s*\)"#,
            )?,
            express_route_regex: Regex::new(
                r#"\b(\w+)\.(get|post|put|delete|patch|options|head|all)\s*\(\s*['"`]([^'"`]+)['"`]\s*,([^\n]*)"#,
            )?,
            named_param_regex: Regex::new(r#"@(?:Param|Query|Headers)\s*\(\s*['"]([^'"]+)['"]"#)?,
            summary_regex: Regex::new(r#"@ApiOperation\s*\(\s*\{[^}]*?summary\s*:\s*['"`]([^'"`]*)['"`]"#)?,
            api_response_regex: Regex::new(
                r#"@ApiResponse\s*\(\s*\{[^}]*?status\s*:\s*(?:HttpStatus\.)?(\w+)(?:[^}]*?description\s*:\s*['"`]([^'"`]*)['"`])?"#,
            )?,
            http_code_regex: Regex::new(r"@HttpCode\s*\(\s*(?:HttpStatus\.)?(\w+)\s*\)")?,
            path_param_regex: Regex::new(r"[:{](\w+)")?,
        })
    }
}

impl LanguageParser for TypeScriptParser {
    fn parse(&self, content: &str, _file_path: &Path) -> Result<ParsedItems> {
        let mut types = self.extract_types(content);
        let methods = self.extract_methods(content, &types);

        for ts_type in &mut types {
            let Some(body) = block_body(content, ts_type.start) else { continue };
            let mut members = field_names(&ts_type.decl.kind, body);
            members.extend(
                methods
                    .iter()
                    .filter(|m| m.offset > ts_type.start && m.offset < ts_type.end)
                    .map(|m| m.decl.name.clone()),
            );
            ts_type.decl.members = members;
        }

        let mut endpoints = self.extract_decorated_endpoints(content, &types, &methods);
        endpoints.extend(self.extract_express_routes(content));
        endpoints.sort_by_key(|e| e.line);

        let mut functions: Vec<FunctionDecl> = methods.into_iter().map(|m| m.decl).collect();
        functions.extend(self.extract_functions(content));
        functions.sort_by_key(|f| f.line);

        let mut type_decls: Vec<TypeDecl> = types.into_iter().map(|t| t.decl).collect();
        for cap in self.alias_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            type_decls.push(TypeDecl {
                name: cap[1].to_string(),
                kind: "type".to_string(),
                members: vec![],
                line: line_of(content, whole.start()),
            });
        }
        type_decls.sort_by_key(|t| t.line);

        Ok(ParsedItems {
            types: type_decls,
            functions,
            endpoints,
        })
    }

    fn extract_file_docs(&self, content: &str) -> Option<String> {
        let mut doc_lines = Vec::new();
        let mut in_block = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if in_block || trimmed.starts_with("/*") {
                in_block = !trimmed.ends_with("*/");
                let text = trimmed
                    .trim_end_matches("*/")
                    .trim_start_matches('/')
                    .trim_start_matches('*')
                    .trim();
                if !text.is_empty() && !text.starts_with('@') {
                    doc_lines.push(text.to_string());
                }
            } else if let Some(comment) = trimmed.strip_prefix("//") {
                let comment = comment.trim();
                if !comment.is_empty() {
                    doc_lines.push(comment.to_string());
                }
            } else if !trimmed.is_empty() {
                break;
            }
        }

        (!doc_lines.is_empty()).then(|| doc_lines.join(" "))
    }

    fn language(&self) -> Language {
        Language::TypeScript
    }
}

impl TypeScriptParser {
    fn extract_types(&self, content: &str) -> Vec<TsType> {
        let mut types = Vec::new();

        for cap in self.type_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let Some(brace) = content[whole.end()..].find('{').map(|i| whole.end() + i) else {
                continue;
            };
            let body_len = block_body(content, brace).map_or(0, str::len);

            types.push(TsType {
                start: brace,
                end: brace + body_len + 1,
                decl: TypeDecl {
                    name: cap[2].to_string(),
                    kind: cap[1].to_string(),
                    members: vec![],
                    line: line_of(content, whole.start()),
                },
            });
        }

        types
    }

    /// Methods declared directly in class bodies
    fn extract_methods(&self, content: &str, types: &[TsType]) -> Vec<TsMethod> {
        let mut methods = Vec::new();

        for cap in self.method_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let name = &cap[1];
            if NOT_A_METHOD.contains(&name) {
                continue;
            }

            let Some(owner) = types
                .iter()
                .filter(|t| t.decl.kind == "class" && whole.start() > t.start && whole.start() < t.end)
                .min_by_key(|t| t.end - t.start)
            else {
                continue;
            };

            let open = whole.end() - 1;
            let Some(raw_params) = paren_body(content, open) else { continue };
            let rest = content[open + raw_params.len() + 2..].trim_start();
            let return_type = if rest.starts_with('{') {
                None
            } else if let Some(annotation) = rest.strip_prefix(':') {
                let brace = annotation.find('{');
                let semicolon = annotation.find(';');
                match (brace, semicolon) {
                    (Some(b), Some(s)) if s < b => continue,
                    (Some(b), _) => Some(annotation[..b].trim().to_string()),
                    (None, _) => continue,
                }
            } else {
                continue;
            };

            let docs = comment_block_before(content, whole.start());
            let docs: Vec<&str> = docs.iter().map(String::as_str).filter(|l| !l.starts_with('@')).collect();

            methods.push(TsMethod {
                offset: whole.start(),
                raw_params: raw_params.to_string(),
                decl: FunctionDecl {
                    name: name.to_string(),
                    receiver: Some(owner.decl.name.clone()),
                    parameters: parse_parameters(raw_params, ParamStyle::NameColonType),
                    return_type: return_type.filter(|r| r != "void"),
                    docs: (!docs.is_empty()).then(|| docs.join(" ")),
                    line: line_of(content, whole.start()),
                },
            });
        }

        methods
    }

    /// `function` declarations and `const x = (...) =>` arrow functions
    fn extract_functions(&self, content: &str) -> Vec<FunctionDecl> {
        let mut functions = Vec::new();

        for (regex, arrow) in [(&self.function_regex, false), (&self.arrow_regex, true)] {
            for cap in regex.captures_iter(content) {
                let Some(whole) = cap.get(0) else { continue };
                let open = whole.end() - 1;
                let Some(raw_params) = paren_body(content, open) else { continue };
                let rest = content[open + raw_params.len() + 2..].trim_start();

                let return_type = if arrow {
                    let Some(arrow_at) = rest.find("=>") else { continue };
                    let signature = &rest[..arrow_at];
                    if signature.contains(|c: char| c == ';' || c == '\n') {
                        continue;
                    }
                    signature.trim().strip_prefix(':').map(|r| r.trim().to_string())
                } else {
                    rest.strip_prefix(':')
                        .and_then(|r| r.split('{').next())
                        .map(|r| r.trim().to_string())
                };

                let docs = comment_block_before(content, whole.start());
                let docs: Vec<&str> = docs.iter().map(String::as_str).filter(|l| !l.starts_with('@')).collect();

                functions.push(FunctionDecl {
                    name: cap[1].to_string(),
                    receiver: None,
                    parameters: parse_parameters(raw_params, ParamStyle::NameColonType),
                    return_type: return_type.filter(|r| !r.is_empty() && r != "void"),
                    docs: (!docs.is_empty()).then(|| docs.join(" ")),
                    line: line_of(content, whole.start()),
                });
            }
        }

        functions
    }

    /// NestJS `@Controller` prefixes combined with `@Get`/`@Post`/... handlers
    fn extract_decorated_endpoints(&self, content: &str, types: &[TsType], methods: &[TsMethod]) -> Vec<ApiEndpoint> {
        let prefixes: Vec<(usize, String)> = self
            .controller_regex
            .captures_iter(content)
            .filter_map(|cap| {
                let whole = cap.get(0)?;
                let class_start = types
                    .iter()
                    .filter(|t| t.decl.kind == "class" && t.start > whole.end())
                    .map(|t| t.start)
                    .min()?;
                Some((class_start, cap.get(1).map_or("", |m| m.as_str()).to_string()))
            })
            .collect();

        let mut endpoints = Vec::new();
        for cap in self.route_decorator_regex.captures_iter(content) {
            let Some(whole) = cap.get(0) else { continue };
            let Some(index) = methods.iter().position(|m| m.offset > whole.end()) else {
                continue;
            };
            let method = &methods[index];

            let prefix = types
                .iter()
                .filter(|t| method.offset > t.start && method.offset < t.end)
                .min_by_key(|t| t.end - t.start)
                .and_then(|t| prefixes.iter().find(|(start, _)| *start == t.start))
                .map(|(_, p)| p.as_str())
                .unwrap_or("");

            let window_start = if index > 0 { methods[index - 1].offset } else { 0 };
            let window = &content[window_start..method.offset];

            let http_method = match &cap[1] {
                "All" => "ANY".to_string(),
                verb => verb.to_uppercase(),
            };

            endpoints.push(ApiEndpoint {
                method: http_method,
                path: join_route(prefix, cap.get(2).map_or("", |m| m.as_str())),
                handler: Some(method.decl.name.clone()),
                summary: self.summary_regex.captures(window).map(|c| c[1].to_string()),
                parameters: self.endpoint_parameters(&method.raw_params),
                responses: self.responses(window),
                line: line_of(content, whole.start()),
            });
        }

        endpoints
    }

    fn extract_express_routes(&self, content: &str) -> Vec<ApiEndpoint> {
        self.express_route_regex
            .captures_iter(content)
            .filter(|cap| {
                let receiver = &cap[1];
                ROUTER_RECEIVERS.contains(&receiver) || receiver.ends_with("Router") || receiver.ends_with("router")
            })
            .filter_map(|cap| {
                let whole = cap.get(0)?;
                let path = cap[3].to_string();
                let tail = cap[4].trim().trim_end_matches(';').trim_end_matches(')').trim();
                let handler = tail
                    .rsplit(',')
                    .next()
                    .map(str::trim)
                    .filter(|h| !h.is_empty() && h.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$'))
                    .map(|h| h.rsplit('.').next().unwrap_or(h).to_string());

                Some(ApiEndpoint {
                    method: match &cap[2] {
                        "all" => "ANY".to_string(),
                        verb => verb.to_uppercase(),
                    },
                    parameters: self.path_parameters(&path),
                    path,
                    handler,
                    summary: None,
                    responses: vec![],
                    line: line_of(content, whole.start()),
                })
            })
            .collect()
    }

    fn endpoint_parameters(&self, raw_params: &str) -> Vec<EndpointParam> {
        split_top_level(raw_params)
            .into_iter()
            .filter_map(|part| {
                let location = if part.contains("@Param(") {
                    "path"
                } else if part.contains("@Query(") {
                    "query"
                } else if part.contains("@Body(") {
                    "body"
                } else if part.contains("@Headers(") {
                    "header"
                } else {
                    return None;
                };

                let parsed = parse_parameters(part, ParamStyle::NameColonType).into_iter().next()?;
                let name = self
                    .named_param_regex
                    .captures(part)
                    .map(|c| c[1].to_string())
                    .unwrap_or(parsed.name);

                Some(EndpointParam {
                    name,
                    location: location.to_string(),
                    type_name: parsed.type_name,
                    required: !part.contains("?:"),
                })
            })
            .collect()
    }

    fn responses(&self, window: &str) -> Vec<EndpointResponse> {
        let mut responses: Vec<EndpointResponse> = self
            .api_response_regex
            .captures_iter(window)
            .map(|c| EndpointResponse {
                status: c[1].to_string(),
                description: c.get(2).map(|m| m.as_str().to_string()),
            })
            .collect();

        if let Some(code) = self.http_code_regex.captures(window) {
            responses.push(EndpointResponse {
                status: code[1].to_string(),
                description: None,
            });
        }

        responses
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

/// Property names of a class, members of an interface, constants of an enum
fn field_names(kind: &str, body: &str) -> Vec<String> {
    let statements = top_level_statements(body);

    if kind == "enum" {
        let joined = statements.join(",");
        return split_top_level(&joined)
            .into_iter()
            .filter_map(|constant| constant.split('=').next())
            .map(|constant| constant.trim().trim_matches(|c: char| c == '\'' || c == '"').to_string())
            .filter(|constant| !constant.is_empty())
            .collect();
    }

    let mut names = Vec::new();
    for statement in &statements {
        // Depth of a decorator argument list spanning several lines
        let mut decorator_depth = 0i32;

        for line in statement.lines() {
            let trimmed = line.trim();
            let balance = trimmed.matches('(').count() as i32 - trimmed.matches(')').count() as i32;
            if decorator_depth > 0 {
                decorator_depth = (decorator_depth + balance).max(0);
                continue;
            }

            let declaration = if trimmed.starts_with('@') {
                if balance > 0 {
                    decorator_depth = balance;
                    continue;
                }
                strip_annotations(trimmed)
            } else {
                trimmed.to_string()
            };

            let mut declaration = declaration.trim();
            for modifier in ["public ", "private ", "protected ", "static ", "readonly ", "declare ", "override ", "abstract "] {
                declaration = declaration.trim_start_matches(modifier).trim_start();
            }
            if declaration.is_empty() {
                continue;
            }
            if kind == "class" && declaration.split('=').next().is_some_and(|d| d.contains('(')) {
                // The rest of the statement is a method signature
                break;
            }

            let name: String = declaration
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            let follows = declaration[name.len()..].trim_start().chars().next();
            if !name.is_empty() && matches!(follows, None | Some(':' | '?' | '!' | '=' | '(' | ',')) {
                names.push(name);
            }
        }
    }

    names
}
