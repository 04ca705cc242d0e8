use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn cmd(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tire-intel").unwrap();
    cmd.arg("--root").arg(root.path());
    cmd
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("tire-intel")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("setup"))
        .stdout(contains("query"))
        .stdout(contains("dashboard"))
        .stdout(contains("security"));
}

#[test]
fn query_defect_json() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .args(["--json", "query", "Why are defect rates increasing?"])
        .assert()
        .success()
        .stdout(contains("\"defect_analysis\""))
        .stdout(contains("\"confidence\": 0.9"));
}

#[test]
fn query_graph_rag_is_demonstration() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .args(["query", "supplier relationships", "--type", "graph_rag"])
        .assert()
        .success()
        .stdout(contains("Demonstration Mode"))
        .stdout(contains("Confidence: 85.00%"));
}

#[test]
fn query_rejects_injection_but_exits_zero() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .args(["query", "'; DROP TABLE users; --"])
        .assert()
        .success()
        .stdout(contains("Error: Invalid input detected"));
    assert!(root.path().join("data/logs/security.json").exists());
}

#[test]
fn unknown_query_type_fails() {
    let root = TempDir::new().unwrap();
    cmd(&root).args(["query", "x", "--type", "vector_rag"]).assert().failure();
}

#[test]
fn setup_creates_workspace() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .arg("setup")
        .assert()
        .success()
        .stdout(contains("System setup completed"));

    assert!(root.path().join("knowledge/tire_manufacturing/.gitkeep").exists());
    let env = std::fs::read_to_string(root.path().join(".env")).unwrap();
    assert!(env.contains("OLLAMA_MODEL=llama3.1:8b"));
}

#[test]
fn test_writes_report_then_dashboard_reads_it() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .arg("test")
        .assert()
        .success()
        .stdout(contains("basic_tests: passed"));
    assert!(root.path().join("data/reports/cv_test_report.json").exists());

    cmd(&root)
        .arg("dashboard")
        .assert()
        .success()
        .stdout(contains("Sensitivity: 92.00%"))
        .stdout(contains("Daily report saved"))
        .stdout(contains("Chart saved to"));
    let svg = std::fs::read_to_string(root.path().join("data/reports/performance_chart.svg")).unwrap();
    assert!(svg.contains("<svg"));
}

#[test]
fn dashboard_without_data_reports_error() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .arg("dashboard")
        .assert()
        .success()
        .stdout(contains("No CV test data available"));
}

#[test]
fn security_reports_owasp_score() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .args(["--json", "security"])
        .assert()
        .success()
        .stdout(contains("\"score\": 3"))
        .stdout(contains("A03_Injection"));
}

#[test]
fn start_answers_until_quit() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .arg("start")
        .write_stdin("how do I optimize curing?\nquit\nnever read\n")
        .assert()
        .success()
        .stdout(contains("Confidence: 85.00%"))
        .stdout(contains("Goodbye"));
}

#[test]
fn dev_commands_succeed() {
    let root = TempDir::new().unwrap();
    for sub in ["format", "lint", "security-scan"] {
        cmd(&root)
            .args(["dev", sub])
            .assert()
            .success()
            .stdout(contains("not yet available"));
    }
}

#[test]
fn status_lists_components() {
    let root = TempDir::new().unwrap();
    cmd(&root)
        .arg("status")
        .assert()
        .success()
        .stdout(contains("reasoner"))
        .stdout(contains("❌ File: .env"));
}
