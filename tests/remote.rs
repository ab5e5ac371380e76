#![cfg(feature = "remote")]

use adequacy::{
    serve_with_listener, AdequacyError, Consumption, Link, ModelError, Network, Node,
    OptimizerConfig, Production, RemoteOptimizer, ScenarioError, ServerConfig, Storage, Study,
};
use tokio::net::TcpListener;

async fn spawn_server(token: Option<&str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut config = ServerConfig::new(
        addr,
        OptimizerConfig {
            workers: 2,
            ..OptimizerConfig::default()
        },
    );
    if let Some(token) = token {
        config = config.with_token(token);
    }
    tokio::spawn(serve_with_listener(config, listener));
    format!("http://{}", addr)
}

fn two_nodes() -> Study {
    let study = Study::new(1, 2);
    let a = Node::new()
        .with_production(Production::new("nuclear", 10.0, study.constant(30.0)))
        .with_link(Link::new("b", 2.0, study.constant(10.0)));
    let b = Node::new()
        .with_consumption(Consumption::new("load", 1e6, study.constant(20.0)))
        .with_production(Production::new("gas", 20.0, study.constant(20.0)));
    study.with_network("default", Network::new().with_node("a", a).with_node("b", b))
}

#[tokio::test]
async fn remote_solve_matches_local_semantics() {
    let url = spawn_server(Some("secret")).await;
    let remote = RemoteOptimizer::new(url, "secret");

    let result = remote.solve_async(&two_nodes()).await.unwrap();

    let link = &result.node("default", "a").unwrap().link("b").unwrap().quantity;
    assert!(link.iter().all(|v| (v - 10.0).abs() < 1e-3));
    assert_eq!(result.objective.len(), 2);
    assert!((result.objective[0] - (100.0 + 20.0 + 200.0)).abs() < 1e-2);
}

#[tokio::test]
async fn wrong_token_is_denied() {
    let url = spawn_server(Some("secret")).await;

    let err = RemoteOptimizer::new(url, "guess").solve_async(&two_nodes()).await.unwrap_err();

    assert!(matches!(err, AdequacyError::Remote(ref msg) if msg.contains("access denied")));
}

#[tokio::test]
async fn invalid_study_is_rejected() {
    let url = spawn_server(None).await;

    let err = RemoteOptimizer::new(url, "").solve_async(&Study::new(0, 1)).await.unwrap_err();

    assert!(matches!(err, AdequacyError::Model(ModelError::Rejected(_))));
}

#[tokio::test]
async fn scenario_failures_cross_the_wire() {
    let url = spawn_server(None).await;
    let mut study = two_nodes();
    study
        .networks
        .get_mut("default")
        .unwrap()
        .nodes
        .get_mut("b")
        .unwrap()
        .storages
        .push(Storage::new("cell", 0.0, 0.0, 100.0).with_initial(50.0));

    let err = RemoteOptimizer::new(url, "").solve_async(&study).await.unwrap_err();

    assert_eq!(
        err.failures(),
        &[
            ScenarioError::AdequacyInfeasible { scenario: 0 },
            ScenarioError::AdequacyInfeasible { scenario: 1 },
        ]
    );
}

#[tokio::test]
async fn server_reports_its_backend() {
    let url = spawn_server(None).await;

    let info = RemoteOptimizer::new(url, "").server_info().await.unwrap();

    assert_eq!(info.backend, "lp (Clarabel)");
    assert_eq!(info.workers, 2);
    assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
}
