use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use super::{AnalysisRun, ServiceAnalyzer};

/// Name of the configuration file written by `init`
const CONFIG_FILE_NAME: &str = "servicemap.toml";

/// Main orchestration engine behind the CLI commands
pub struct Engine {
    config: Config,
}

impl Engine {
    /// Create a new engine from a config file, or the defaults when none is found
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        Ok(Self { config })
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full analysis for `source` off the async runtime
    pub async fn run_analysis(&self, source: Option<PathBuf>) -> Result<AnalysisRun> {
        let source_dir = source.unwrap_or_else(|| self.config.project.source_dir.clone());
        let config = self.config.clone();

        let run = tokio::task::spawn_blocking(move || {
            let analyzer = ServiceAnalyzer::new(&config)?;
            analyzer.analyze_directory(&source_dir)
        })
        .await
        .context("Analysis task panicked")??;

        for skipped in &run.skipped {
            debug!("Skipped {}: {}", skipped.path.display(), skipped.reason);
        }

        Ok(run)
    }

    /// Analyze a codebase and emit the report as JSON or a text summary
    pub async fn analyze(&self, source: Option<PathBuf>, output: Option<PathBuf>, format: Option<String>) -> Result<()> {
        let format = format.unwrap_or_else(|| self.config.output.format.clone());
        let run = self.run_analysis(source).await?;

        let rendered = match format.as_str() {
            "json" => {
                let report = run.report(&self.config.project.name);
                if self.config.output.pretty {
                    serde_json::to_string_pretty(&report)?
                } else {
                    serde_json::to_string(&report)?
                }
            }
            "summary" => render_summary(&run, &self.config.project.name),
            other => bail!("Unsupported report format '{}' (expected json or summary)", other),
        };

        let output = output.or_else(|| self.config.project.report_path.clone());
        emit(&rendered, output.as_deref())
    }

    /// Emit the dependency graph of one service as JSON or Mermaid
    pub async fn graph(&self, service: &str, source: Option<PathBuf>, format: &str) -> Result<()> {
        let run = self.run_analysis(source).await?;
        let graph = run.dependency_graph(service)?;

        if graph.is_empty() {
            warn!("No relationships touch service '{}'", service);
        }

        let rendered = match format {
            "json" => serde_json::to_string_pretty(&graph)?,
            "mermaid" => graph.to_mermaid(),
            other => bail!("Unsupported graph format '{}' (expected json or mermaid)", other),
        };

        emit(&rendered, None)
    }

    /// Write a default configuration file into `path`
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        info!("Initializing servicemap in: {}", target_dir.display());

        let config_path = target_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            warn!("⚠️ {} already exists, leaving it untouched", config_path.display());
            return Ok(());
        }

        std::fs::create_dir_all(&target_dir)?;

        let mut config = Config::default();
        if let Some(name) = target_dir.canonicalize()?.file_name() {
            config.project.name = name.to_string_lossy().to_string();
        }
        config.save(&config_path)?;

        info!("✅ Wrote {}", config_path.display());
        Ok(())
    }
}

/// Human-readable overview of a run, one block per service
pub fn render_summary(run: &AnalysisRun, project: &str) -> String {
    let summary = run.summary();
    let mut out = String::new();

    let _ = writeln!(out, "Project: {}", project);
    let _ = writeln!(out, "Root: {}", run.root.display());
    let _ = writeln!(
        out,
        "{} files, {} services, {} relationships, {} endpoints, {} skipped",
        summary.files, summary.services, summary.relationships, summary.endpoints, summary.skipped
    );

    for context in &run.contexts {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {} ({} files)", context.name, context.file_count());
        let buckets = [
            ("controllers", &context.controllers),
            ("services", &context.services),
            ("models", &context.models),
            ("repositories", &context.repositories),
            ("configs", &context.configs),
            ("utilities", &context.utilities),
            ("tests", &context.tests),
        ];
        for (label, facts) in buckets {
            if facts.is_empty() {
                continue;
            }
            let names: Vec<String> = facts.iter().map(|fact| fact.file_name()).collect();
            let _ = writeln!(out, "  {}: {}", label, names.join(", "));
        }
        for endpoint in &context.api_endpoints {
            let _ = writeln!(out, "  endpoint: {} {}", endpoint.method, endpoint.path);
        }
        if !context.relationships.is_empty() {
            let _ = writeln!(out, "  relationships: {}", context.relationships.len());
        }
    }

    out
}

fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("📝 Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Order");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("OrderController.java"),
            "import com.acme.OrderService;\n\npublic class OrderController {\n    private final OrderService service;\n}\n",
        )
        .unwrap();
        std::fs::write(dir.join("OrderService.java"), "public class OrderService {}\n").unwrap();
        temp
    }

    #[tokio::test]
    async fn test_analyze_writes_json_report() {
        let temp = project();
        let out = temp.path().join("reports/servicemap.json");
        let engine = Engine::with_config(Config::default());

        engine
            .analyze(Some(temp.path().to_path_buf()), Some(out.clone()), Some("json".to_string()))
            .await
            .unwrap();

        let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report["summary"]["services"], 1);
        assert_eq!(report["contexts"][0]["name"], "Order");
        assert_eq!(report["relationships"][0]["kind"], "references");
    }

    #[tokio::test]
    async fn test_summary_lists_buckets() {
        let temp = project();
        let engine = Engine::with_config(Config::default());
        let run = engine.run_analysis(Some(temp.path().to_path_buf())).await.unwrap();

        let summary = render_summary(&run, "shop");
        assert!(summary.contains("2 files, 1 services, 1 relationships"));
        assert!(summary.contains("## Order (2 files)"));
        assert!(summary.contains("controllers: OrderController.java"));
        assert!(summary.contains("services: OrderService.java"));
    }

    #[tokio::test]
    async fn test_unknown_format_is_rejected() {
        let temp = project();
        let engine = Engine::with_config(Config::default());
        let result = engine
            .analyze(Some(temp.path().to_path_buf()), None, Some("yaml".to_string()))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_init_writes_default_config_once() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("billing");
        let engine = Engine::with_config(Config::default());

        engine.init(Some(target.clone())).await.unwrap();
        let config = Config::load(target.join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.project.name, "billing");

        std::fs::write(target.join(CONFIG_FILE_NAME), "custom").unwrap();
        engine.init(Some(target.clone())).await.unwrap();
        assert_eq!(std::fs::read_to_string(target.join(CONFIG_FILE_NAME)).unwrap(), "custom");
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let engine = Engine::with_config(Config::default());
        assert!(engine.run_analysis(Some(temp.path().join("absent"))).await.is_err());
    }
}
