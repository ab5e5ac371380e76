use adequacy::{Consumption, Network, Node, Production, Study, StudyResult};
use std::process::Command;

fn study() -> Study {
    let study = Study::new(2, 1);
    let node = Node::new()
        .with_consumption(Consumption::new("load", 1e6, study.constant(10.0)))
        .with_production(Production::new("gas", 30.0, study.constant(20.0)));
    study.with_network("default", Network::new().with_node("a", node))
}

#[test]
fn solve_writes_result_file() {
    let dir = tempfile::tempdir().unwrap();
    let study_path = dir.path().join("study.json");
    let result_path = dir.path().join("result.json");
    std::fs::write(&study_path, serde_json::to_string(&study()).unwrap()).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_adequacy"))
        .args(["solve", "--workers", "1", "-o"])
        .arg(&result_path)
        .arg(&study_path)
        .status()
        .unwrap();

    assert!(status.success());
    let result: StudyResult = serde_json::from_str(&std::fs::read_to_string(&result_path).unwrap()).unwrap();
    let gas = &result.node("default", "a").unwrap().production("gas").unwrap().quantity;
    assert!(gas.iter().all(|v| (v - 10.0).abs() < 1e-3));
}

#[test]
fn infeasible_study_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let study_path = dir.path().join("study.json");
    let mut study = study();
    let node = study.networks.get_mut("default").unwrap().nodes.get_mut("a").unwrap();
    node.storages.push(adequacy::Storage::new("cell", 0.0, 0.0, 20.0).with_initial(30.0));
    std::fs::write(&study_path, serde_json::to_string(&study).unwrap()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_adequacy"))
        .arg("solve")
        .arg(&study_path)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scenario 0: adequacy problem is infeasible"), "{}", stderr);
}

#[test]
fn unknown_backend_is_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_adequacy"))
        .args(["solve", "--backend", "glop", "missing.json"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown solver backend"));
}
