use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;

use crate::commands::ready_orchestrator;
use crate::core::business_intelligence::{BusinessIntelligence, KpiDashboard};
use crate::core::config::Settings;
use crate::core::orchestrator::{
    Orchestrator, OrchestratorState, OutcomeStatus, QueryOutcome, QueryType, SystemTestReport, INVALID_SESSION_ERROR,
};
use crate::instances::cv_testing::TestReport;
use crate::output::{panel, percent, print_json, print_one};
use crate::web::server::{start_web_server, AppState};

const QUIT_WORDS: &[&str] = &["quit", "exit", "q"];
const SESSION_USER: &str = "cli";

#[derive(Debug, Serialize)]
struct TestSummary {
    system_tests: SystemTestReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    cv_tests: Option<TestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cv_error: Option<String>,
}

pub async fn query(json: bool, settings: Settings, query: &str, query_type: QueryType) -> anyhow::Result<()> {
    let mut orchestrator = ready_orchestrator(settings).await?;
    let outcome = orchestrator.process_query(query, query_type).await;
    print_one(json, outcome, render_outcome)
}

pub async fn test(json: bool, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = ready_orchestrator(settings).await?;
    let summary = run_tests(&orchestrator).await;
    print_one(json, summary, render_tests)
}

pub async fn start(settings: Settings, run_system_tests: bool) -> anyhow::Result<()> {
    println!("{}", panel("Tire Manufacturing Intelligence", "Starting..."));

    let mut orchestrator = ready_orchestrator(settings).await?;
    println!("{}", status_panel(&orchestrator));

    if run_system_tests {
        println!("\n🧪 Running system tests...");
        let summary = run_tests(&orchestrator).await;
        println!("{}", render_tests(&summary));
        println!("✅ All tests completed!");
    }

    let mut token = orchestrator.security().generate_session_token(SESSION_USER);
    println!("\n🎯 System ready for queries!");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("\nEnter query (or 'quit' to exit): ");
        let line = match lines.next_line().await.context("failed to read stdin")? {
            Some(line) => line,
            None => break,
        };

        let query = line.trim();
        if QUIT_WORDS.contains(&query.to_lowercase().as_str()) {
            break;
        }
        if query.is_empty() {
            continue;
        }

        let outcome = orchestrator.process_session_query(&token, query, QueryType::Auto).await;
        println!("{}", render_outcome(&outcome));
        if outcome.error.as_deref() == Some(INVALID_SESSION_ERROR) {
            info!("Session expired, opening a new one");
            println!("Session expired. A new session has been opened; please repeat the query.");
            token = orchestrator.security().generate_session_token(SESSION_USER);
        }
    }

    if let Err(e) = orchestrator.shutdown().await {
        warn!("Shutdown reported an error: {}", e);
    }
    println!("\n👋 Goodbye!");
    Ok(())
}

pub async fn dashboard(json: bool, settings: Settings, serve: bool, port: Option<u16>) -> anyhow::Result<()> {
    let bi = BusinessIntelligence::new(&settings);

    match bi.generate_daily_report() {
        Ok((report, path)) => {
            if json {
                print_json(&report)?;
            } else {
                println!("{}", render_kpis(&report.detailed_metrics));
                println!("\nRecommendations:");
                for recommendation in &report.recommendations {
                    println!("  • {}", recommendation);
                }
                println!("\n📄 Daily report saved to {}", path.display());
            }
            match bi.generate_performance_chart() {
                Ok(chart) if !json => println!("📈 Chart saved to {}", chart.display()),
                Ok(_) => {}
                Err(e) => warn!("Performance chart not written: {}", e),
            }
        }
        Err(e) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({"ok": false, "error": e.to_string()}))?);
            } else {
                println!("Error: {}", e);
                println!("Run `tire-intel test` to generate test data first.");
            }
        }
    }

    if !serve {
        return Ok(());
    }

    let port = port.unwrap_or(settings.dashboard_port);
    let orchestrator = ready_orchestrator(settings).await?;
    let _collector = orchestrator
        .metrics()
        .start_collection(orchestrator.get_all_instances().clone());

    println!("🚀 Dashboard API on http://127.0.0.1:{}/api/health (Ctrl+C to stop)", port);
    start_web_server(
        AppState {
            orchestrator: Arc::new(RwLock::new(orchestrator)),
            bi,
        },
        port,
    )
    .await
    .context("web server failed")
}

async fn run_tests(orchestrator: &Orchestrator) -> TestSummary {
    let system_tests = orchestrator.run_system_tests();
    match orchestrator.run_cv_tests().await {
        Ok(report) => TestSummary { system_tests, cv_tests: Some(report), cv_error: None },
        Err(e) => {
            warn!("Performance harness failed: {}", e);
            TestSummary { system_tests, cv_tests: None, cv_error: Some(e.to_string()) }
        }
    }
}

fn status_panel(orchestrator: &Orchestrator) -> String {
    let status = orchestrator.get_status();
    let checks = orchestrator.run_system_tests();
    let present = checks.configuration_files.values().filter(|exists| **exists).count();

    let body = format!(
        "System Status: {}\n\
         Components: {}\n\
         Configuration Files: {}/{}\n\n\
         Available Capabilities:\n\
         • Manufacturing reasoning (auto)\n\
         • Agentic RAG multi-step retrieval\n\
         • Defect detection performance testing\n\
         • Security controls and audit log\n\
         • Business intelligence dashboard\n\n\
         Demonstration Mode:\n\
         • Traditional RAG\n\
         • GraphRAG",
        status.state.as_str().to_uppercase(),
        status.active_components,
        present,
        checks.configuration_files.len(),
    );
    panel("Tire Manufacturing Intelligence", &body)
}

fn render_outcome(outcome: &QueryOutcome) -> String {
    match outcome.status {
        OutcomeStatus::Success => format!(
            "\nQuery: {}\nMethod: {} ({})\nResponse:\n{}\n\nConfidence: {}",
            outcome.query,
            outcome.method,
            outcome.query_type.as_str(),
            outcome.response,
            percent(outcome.confidence),
        ),
        OutcomeStatus::Error => format!(
            "Error: {}",
            outcome.error.as_deref().unwrap_or("Unknown error")
        ),
    }
}

fn render_tests(summary: &TestSummary) -> String {
    let tests = &summary.system_tests;
    let mut lines = vec![
        "📊 Test Results Summary:".to_string(),
        format!("  basic_tests: {}", tests.status),
    ];

    let missing_dirs = tests.missing_directories();
    if missing_dirs.is_empty() {
        lines.push("    All directories present".to_string());
    } else {
        let shown: Vec<&str> = missing_dirs.iter().take(3).copied().collect();
        lines.push(format!("    Missing directories: {}", shown.join(", ")));
    }

    let missing_files = tests.missing_configuration_files();
    if missing_files.is_empty() {
        lines.push("    All config files present".to_string());
    } else {
        lines.push(format!("    Missing config files: {}", missing_files.join(", ")));
    }

    match (&summary.cv_tests, &summary.cv_error) {
        (Some(report), _) => {
            let perf = &report.performance_metrics;
            lines.push(format!("  cv_tests: {}", report.test_status));
            lines.push(format!(
                "    Average inference: {:.4}s ({:.1} FPS)",
                perf.average_inference_time, perf.fps
            ));
            lines.push(format!(
                "    Meets 100ms requirement: {}",
                if perf.meets_100ms_requirement { "yes" } else { "no" }
            ));
        }
        (None, Some(error)) => lines.push(format!("  cv_tests: failed ({})", error)),
        (None, None) => {}
    }

    if tests.system_status != OrchestratorState::Ready {
        lines.push(format!("  system_status: {}", tests.system_status.as_str()));
    }
    lines.join("\n")
}

fn render_kpis(kpis: &KpiDashboard) -> String {
    let perf = &kpis.performance_metrics;
    let quality = &kpis.quality_metrics;
    let body = format!(
        "Inference speed: {:.2} ms\n\
         Throughput: {:.1} FPS\n\
         Meets requirements: {}\n\n\
         Sensitivity: {}\n\
         Specificity: {}\n\
         Total tests: {}\n\n\
         Last updated: {}\n\
         Test status: {}",
        perf.inference_speed_ms,
        perf.fps,
        if perf.meets_requirements { "yes" } else { "no" },
        percent(quality.sensitivity),
        percent(quality.specificity),
        quality.total_tests,
        kpis.system_health.last_updated,
        kpis.system_health.test_status,
    );
    panel("Manufacturing KPIs", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_summary_includes_harness_results() {
        let tmp = TempDir::new().unwrap();
        let orchestrator = ready_orchestrator(Settings::with_root(tmp.path())).await.unwrap();

        let summary = run_tests(&orchestrator).await;
        assert!(summary.cv_error.is_none());
        let rendered = render_tests(&summary);
        assert!(rendered.contains("basic_tests: passed"));
        assert!(rendered.contains("Meets 100ms requirement: yes"));
        assert!(rendered.contains("Missing config files: .env"));
    }

    #[tokio::test]
    async fn outcomes_render_confidence_as_percent() {
        let tmp = TempDir::new().unwrap();
        let mut orchestrator = ready_orchestrator(Settings::with_root(tmp.path())).await.unwrap();

        let outcome = orchestrator.process_query("tread crack near bead", QueryType::Auto).await;
        let rendered = render_outcome(&outcome);
        assert!(rendered.contains("Method: Manufacturing Reasoner (auto)"));
        assert!(rendered.contains("Confidence: 90.00%"));

        let rejected = orchestrator.process_query("<script>", QueryType::Auto).await;
        assert_eq!(render_outcome(&rejected), "Error: Invalid input detected");
    }

    #[tokio::test]
    async fn status_panel_shows_ready_state() {
        let tmp = TempDir::new().unwrap();
        let orchestrator = ready_orchestrator(Settings::with_root(tmp.path())).await.unwrap();

        let rendered = status_panel(&orchestrator);
        assert!(rendered.contains("System Status: READY"));
        assert!(rendered.contains("Configuration Files: 0/4"));
    }
}
