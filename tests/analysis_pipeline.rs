use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

use servicemap::config::Config;
use servicemap::core::{Engine, FileCategory, RelationshipKind, ServiceAnalyzer, GENERAL_SERVICE};

fn shop() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("pom.xml").write_str("<project/>").unwrap();
    temp.child("src/main/java/com/shop/orders/OrderController.java")
        .write_str(
            r#"package com.shop.orders;

import com.shop.orders.OrderService;

@RestController
@RequestMapping("/orders")
public class OrderController {
    @Autowired
    private OrderService orderService;

    @GetMapping("/{id}")
    public Order get(@PathVariable String id) {
        return orderService.find(id);
    }
}
"#,
        )
        .unwrap();
    temp.child("src/main/java/com/shop/orders/OrderService.java")
        .write_str(
            r#"package com.shop.orders;

public class OrderService {
    private final OrderRepository repository;

    public Order find(String id) {
        return repository.load(id);
    }
}
"#,
        )
        .unwrap();
    temp.child("src/main/java/com/shop/orders/OrderRepository.java")
        .write_str("package com.shop.orders;\n\npublic interface OrderRepository {\n    Order load(String id);\n}\n")
        .unwrap();
    temp.child("src/main/java/com/shop/orders/models/Order.java")
        .write_str("package com.shop.orders.models;\n\npublic class Order {\n    private String id;\n}\n")
        .unwrap();
    temp.child("web/src/payment.controller.ts")
        .write_str(
            "import { PaymentService } from './payment.service';\nimport { Ignored } from '../node_modules/lib';\n\nexport class PaymentController {\n  constructor(private readonly payments: PaymentService) {}\n}\n",
        )
        .unwrap();
    temp.child("web/src/payment.service.ts")
        .write_str("export class PaymentService {}\n")
        .unwrap();
    temp.child("web/node_modules/lib/index.ts")
        .write_str("export class Ignored {}\n")
        .unwrap();
    temp.child("README.md").write_str("# shop\n").unwrap();
    temp
}

#[test]
fn groups_mixed_language_project_into_services() {
    let temp = shop();
    let analyzer = ServiceAnalyzer::new(&Config::default()).unwrap();
    let run = analyzer.analyze_directory(temp.path()).unwrap();

    let names: Vec<_> = run.contexts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Order", "models", "Payment"]);
    assert!(run.context(GENERAL_SERVICE).is_none());

    let order = run.context("Order").unwrap();
    assert_eq!(order.bucket(FileCategory::Controller).len(), 1);
    assert_eq!(order.bucket(FileCategory::Service).len(), 1);
    assert_eq!(order.bucket(FileCategory::Repository).len(), 1);
    assert_eq!(order.api_endpoints.len(), 1);
    assert_eq!(order.api_endpoints[0].path, "/orders/{id}");

    let payment = run.context("Payment").unwrap();
    assert_eq!(payment.file_count(), 2);
    assert!(payment
        .relationships
        .iter()
        .any(|r| r.kind == RelationshipKind::Import && r.target_file.ends_with("payment.service.ts")));

    // node_modules never reaches the fact table
    assert!(run.facts.paths().all(|p| !p.to_string_lossy().contains("node_modules")));
    assert_eq!(run.facts.len(), 6);
}

#[test]
fn every_edge_targets_an_analyzed_file() {
    let temp = shop();
    let analyzer = ServiceAnalyzer::new(&Config::default()).unwrap();
    let run = analyzer.analyze_directory(temp.path()).unwrap();

    assert!(!run.relationships.is_empty());
    for relationship in &run.relationships {
        assert!(run.facts.get(&relationship.target_file).is_some());
        assert!(run.contexts.iter().any(|c| c.files().contains(&relationship.target_file.as_path())));
    }
    // The node_modules import exists on disk but is never an edge
    assert!(run
        .relationships
        .iter()
        .all(|r| !r.target_file.to_string_lossy().contains("node_modules")));
}

#[test]
fn dependency_graph_renders_as_mermaid() {
    let temp = shop();
    let analyzer = ServiceAnalyzer::new(&Config::default()).unwrap();
    let run = analyzer.analyze_directory(temp.path()).unwrap();

    let mermaid = run.dependency_graph("Payment").unwrap().to_mermaid();
    let expected = predicate::str::starts_with("graph LR\n")
        .and(predicate::str::contains("payment_controller_ts -->|import| payment_service_ts"));
    assert!(expected.eval(mermaid.as_str()));
}

#[tokio::test]
async fn analyze_command_writes_json_report() {
    let temp = shop();
    let report = temp.child("out/report.json");
    let engine = Engine::with_config(Config::default());

    engine
        .analyze(
            Some(temp.path().to_path_buf()),
            Some(report.path().to_path_buf()),
            Some("json".to_string()),
        )
        .await
        .unwrap();

    report.assert(predicate::path::is_file());
    let content = std::fs::read_to_string(report.path()).unwrap();
    let has_services = predicate::str::contains("\"name\": \"Order\"")
        .and(predicate::str::contains("\"name\": \"Payment\""))
        .and(predicate::str::contains("\"cross_references\": []"));
    assert!(has_services.eval(content.as_str()));
}

#[tokio::test]
async fn init_writes_loadable_config() {
    let temp = TempDir::new().unwrap();
    let engine = Engine::with_config(Config::default());

    engine.init(Some(temp.path().to_path_buf())).await.unwrap();

    let config_file = temp.child("servicemap.toml");
    config_file.assert(predicate::path::is_file());
    let config = Config::load(config_file.path()).unwrap();
    assert_eq!(config.output.format, "summary");
}
