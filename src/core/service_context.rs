use std::collections::HashSet;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::analyzer::FactTable;
use super::parser::{ApiEndpoint, StructuralFact, TypeDecl};
use super::relationships::Relationship;
use super::service_grouper::{FileCategory, ServiceGroup, ServiceGrouper};

/// Name of the context collecting files no service group claimed
pub const GENERAL_SERVICE: &str = "General";

/// Everything known about one service, ready for documentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceContext {
    pub name: String,

    /// Deepest directory containing every member file
    pub root_path: PathBuf,

    pub controllers: Vec<StructuralFact>,
    pub services: Vec<StructuralFact>,
    pub models: Vec<StructuralFact>,
    pub repositories: Vec<StructuralFact>,
    pub configs: Vec<StructuralFact>,
    pub utilities: Vec<StructuralFact>,
    pub tests: Vec<StructuralFact>,

    /// Endpoints declared in controller files
    pub api_endpoints: Vec<ApiEndpoint>,

    /// Edges with either end in this service
    pub relationships: Vec<Relationship>,

    /// Types declared in service files
    pub business_logic: Vec<TypeDecl>,

    /// Types declared in model files
    pub data_models: Vec<TypeDecl>,

    /// Hash over member content hashes, sorted by path
    pub content_hash: String,
}

impl ServiceContext {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            root_path: PathBuf::from("."),
            controllers: Vec::new(),
            services: Vec::new(),
            models: Vec::new(),
            repositories: Vec::new(),
            configs: Vec::new(),
            utilities: Vec::new(),
            tests: Vec::new(),
            api_endpoints: Vec::new(),
            relationships: Vec::new(),
            business_logic: Vec::new(),
            data_models: Vec::new(),
            content_hash: String::new(),
        }
    }

    fn buckets(&self) -> [&Vec<StructuralFact>; 7] {
        [
            &self.controllers,
            &self.services,
            &self.models,
            &self.repositories,
            &self.configs,
            &self.utilities,
            &self.tests,
        ]
    }

    /// Member file paths, bucket by bucket
    pub fn files(&self) -> Vec<&Path> {
        self.buckets()
            .into_iter()
            .flatten()
            .map(|fact| fact.path.as_path())
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.buckets().iter().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }

    /// Facts of one category; unknown files live with the utilities
    pub fn bucket(&self, category: FileCategory) -> &[StructuralFact] {
        match category {
            FileCategory::Controller => &self.controllers,
            FileCategory::Service => &self.services,
            FileCategory::Model => &self.models,
            FileCategory::Repository => &self.repositories,
            FileCategory::Config => &self.configs,
            FileCategory::Test => &self.tests,
            FileCategory::Utility | FileCategory::Unknown => &self.utilities,
        }
    }

    fn add(&mut self, category: FileCategory, fact: &StructuralFact) {
        match category {
            FileCategory::Controller => {
                self.api_endpoints.extend(fact.endpoints.iter().cloned());
                self.controllers.push(fact.clone());
            }
            FileCategory::Service => {
                self.business_logic.extend(fact.types.iter().cloned());
                self.services.push(fact.clone());
            }
            FileCategory::Model => {
                self.data_models.extend(fact.types.iter().cloned());
                self.models.push(fact.clone());
            }
            FileCategory::Repository => self.repositories.push(fact.clone()),
            FileCategory::Config => self.configs.push(fact.clone()),
            FileCategory::Test => self.tests.push(fact.clone()),
            FileCategory::Utility | FileCategory::Unknown => self.utilities.push(fact.clone()),
        }
    }

    /// Attach matching edges and compute derived fields
    fn finish(&mut self, relationships: &[Relationship]) {
        let (root_path, content_hash, touching) = {
            let files = self.files();
            let members: HashSet<&Path> = files.iter().copied().collect();
            let touching: Vec<Relationship> = relationships
                .iter()
                .filter(|r| members.contains(r.source_file.as_path()) || members.contains(r.target_file.as_path()))
                .cloned()
                .collect();
            (calculate_root_path(&files), calculate_context_hash(&self.buckets()), touching)
        };

        self.root_path = root_path;
        self.content_hash = content_hash;
        self.relationships = touching;
    }
}

/// Reserved for links between services; no analysis populates it yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    pub from_service: String,
    pub to_service: String,
    pub description: String,
}

/// Turns service groups into populated contexts
pub struct ContextAssembler<'a> {
    grouper: &'a ServiceGrouper,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(grouper: &'a ServiceGrouper) -> Self {
        Self { grouper }
    }

    /// One context per group in group order, then `General` for unclaimed files
    pub fn assemble(&self, groups: &[ServiceGroup], table: &FactTable, relationships: &[Relationship]) -> Vec<ServiceContext> {
        let mut contexts = Vec::new();
        let mut consumed: HashSet<&Path> = HashSet::new();

        for group in groups {
            let mut context = ServiceContext::new(&group.name);

            for file in &group.files {
                let Some(fact) = table.get(file) else {
                    debug!("No facts for {}, leaving it out of {}", file.display(), group.name);
                    continue;
                };
                if !consumed.insert(fact.path.as_path()) {
                    continue;
                }
                context.add(self.grouper.categorize(file), fact);
            }

            if context.is_empty() {
                continue;
            }
            context.finish(relationships);
            contexts.push(context);
        }

        let mut general = ServiceContext::new(GENERAL_SERVICE);
        for fact in table.facts() {
            if !consumed.contains(fact.path.as_path()) {
                general.add(self.grouper.categorize(&fact.path), fact);
            }
        }
        if !general.is_empty() {
            general.finish(relationships);
            contexts.push(general);
        }

        contexts
    }
}

/// Common ancestor of the member files' directories
fn calculate_root_path(files: &[&Path]) -> PathBuf {
    let mut parents = files.iter().map(|f| f.parent().unwrap_or(Path::new(".")));
    let Some(first) = parents.next() else {
        return PathBuf::from(".");
    };

    parents.fold(first.to_path_buf(), |common, parent| find_common_path(&common, parent))
}

fn find_common_path(path1: &Path, path2: &Path) -> PathBuf {
    path1
        .components()
        .zip(path2.components())
        .take_while(|(c1, c2)| c1 == c2)
        .map(|(c1, _)| c1)
        .collect()
}

fn calculate_context_hash(buckets: &[&Vec<StructuralFact>]) -> String {
    let mut hasher = Sha256::new();

    // Sort files by path for consistent hashing
    let mut facts: Vec<&StructuralFact> = buckets.iter().flat_map(|bucket| bucket.iter()).collect();
    facts.sort_by(|a, b| a.path.cmp(&b.path));

    for fact in facts {
        hasher.update(fact.content_hash.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::languages::Language;
    use crate::core::relationships::RelationshipKind;

    fn fact(path: &str, types: &[&str]) -> StructuralFact {
        StructuralFact {
            path: PathBuf::from(path),
            language: Language::Go,
            content_hash: format!("hash-{}", path),
            types: types
                .iter()
                .map(|name| TypeDecl {
                    name: name.to_string(),
                    kind: "struct".to_string(),
                    members: vec![],
                    line: 1,
                })
                .collect(),
            functions: vec![],
            endpoints: vec![],
            file_docs: None,
            source_content: String::new(),
        }
    }

    fn edge(from: &str, to: &str) -> Relationship {
        Relationship {
            source_file: PathBuf::from(from),
            target_file: PathBuf::from(to),
            kind: RelationshipKind::Import,
            details: format!("import {}", to),
        }
    }

    #[test]
    fn test_relationship_filter_includes_both_ends_only() {
        let table = FactTable::new(vec![
            fact("/p/foo/FooService.go", &["FooService"]),
            fact("/p/bar/BarService.go", &["BarService"]),
            fact("/p/baz/BazService.go", &["BazService"]),
        ]);
        let relationships = vec![edge("/p/foo/FooService.go", "/p/bar/BarService.go")];

        let grouper = ServiceGrouper::new(Some(Path::new("/p"))).unwrap();
        let groups = grouper.group(table.paths());
        let contexts = ContextAssembler::new(&grouper).assemble(&groups, &table, &relationships);

        let by_name = |name: &str| contexts.iter().find(|c| c.name == name).unwrap();
        assert_eq!(by_name("Foo").relationships, relationships);
        assert_eq!(by_name("Bar").relationships, relationships);
        assert!(by_name("Baz").relationships.is_empty());
    }

    #[test]
    fn test_buckets_and_derived_facts() {
        let table = FactTable::new(vec![
            fact("/p/User/user_service.go", &["UserService"]),
            fact("/p/User/user_model.go", &["User", "Address"]),
            fact("/p/User/user_store_helper.go", &[]),
        ]);

        let grouper = ServiceGrouper::new(Some(Path::new("/p"))).unwrap();
        let groups = grouper.group(table.paths());
        let contexts = ContextAssembler::new(&grouper).assemble(&groups, &table, &[]);

        assert_eq!(contexts.len(), 1);
        let user = &contexts[0];
        assert_eq!(user.name, "User");
        assert_eq!(user.root_path, PathBuf::from("/p/User"));
        assert_eq!(user.services.len(), 1);
        assert_eq!(user.models.len(), 1);
        assert_eq!(user.utilities.len(), 1);
        assert_eq!(user.bucket(FileCategory::Unknown).len(), 1);
        let models: Vec<_> = user.data_models.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(models, vec!["User", "Address"]);
        assert_eq!(user.business_logic[0].name, "UserService");
        assert_eq!(user.file_count(), 3);
    }

    #[test]
    fn test_ungrouped_files_land_in_general() {
        let table = FactTable::new(vec![
            fact("/p/api/OrderController.go", &[]),
            fact("/p/misc/extra.go", &[]),
        ]);
        let grouper = ServiceGrouper::new(Some(Path::new("/p"))).unwrap();
        // Only the controller is grouped; the other file is left for the catch-all
        let groups = vec![ServiceGroup {
            name: "Order".to_string(),
            files: vec![PathBuf::from("/p/api/OrderController.go"), PathBuf::from("/p/api/missing.go")],
        }];

        let contexts = ContextAssembler::new(&grouper).assemble(&groups, &table, &[]);

        let names: Vec<_> = contexts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Order", GENERAL_SERVICE]);
        assert_eq!(contexts[0].files(), vec![Path::new("/p/api/OrderController.go")]);
        assert_eq!(contexts[1].files(), vec![Path::new("/p/misc/extra.go")]);
    }

    #[test]
    fn test_content_hash_ignores_bucket_order() {
        let a = fact("/p/a.go", &[]);
        let b = fact("/p/b.go", &[]);
        let first = vec![a.clone(), b.clone()];
        let second = vec![b, a];
        assert_eq!(calculate_context_hash(&[&first]), calculate_context_hash(&[&second]));
    }

    #[test]
    fn test_find_common_path() {
        assert_eq!(
            find_common_path(Path::new("/p/user/api"), Path::new("/p/user/models")),
            PathBuf::from("/p/user")
        );
        assert_eq!(calculate_root_path(&[]), PathBuf::from("."));
    }
}
