use std::collections::BTreeMap;
use std::fs;

use anyhow::Context;
use log::info;
use serde::Serialize;

use crate::cli::DevCommands;
use crate::commands::ready_orchestrator;
use crate::core::config::{Settings, DEFAULT_ENV_CONTENT, WORKSPACE_DIRECTORIES};
use crate::core::metrics::SystemMetricsSummary;
use crate::core::security::{grade, owasp_checklist, ControlStatus, OwaspCheck, SecurityGrade, SecurityManager, SecurityReport};
use crate::output::{panel, print_json, print_one};

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum EnvFileAction {
    Existing,
    CopiedFromTemplate,
    CreatedDefault,
}

#[derive(Debug, Serialize)]
struct SetupReport {
    directories: Vec<String>,
    env_file: EnvFileAction,
}

#[derive(Debug, Serialize)]
struct ComponentLine {
    id: String,
    status: String,
    tasks_processed: u64,
    tasks_failed: u64,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    version: String,
    configuration_files: BTreeMap<String, bool>,
    directories: BTreeMap<String, bool>,
    components: Vec<ComponentLine>,
    summary: SystemMetricsSummary,
}

#[derive(Debug, Serialize)]
struct SecurityStatus {
    report: SecurityReport,
    owasp: Vec<OwaspCheck>,
    score: usize,
    grade: SecurityGrade,
}

pub fn setup(json: bool, settings: &Settings) -> anyhow::Result<()> {
    let report = setup_workspace(settings)?;
    print_one(json, report, |r| {
        let mut lines: Vec<String> = r
            .directories
            .iter()
            .map(|d| format!("✅ Created directory: {}", d))
            .collect();
        lines.push(match r.env_file {
            EnvFileAction::Existing => "✅ Keeping existing .env".to_string(),
            EnvFileAction::CopiedFromTemplate => "✅ Created .env file from template".to_string(),
            EnvFileAction::CreatedDefault => "✅ Created basic .env configuration file".to_string(),
        });
        lines.push(String::new());
        lines.push("🎉 System setup completed!".to_string());
        lines.push("Next steps:".to_string());
        lines.push("  1. Edit .env if needed".to_string());
        lines.push("  2. Run tests: tire-intel test".to_string());
        lines.push("  3. Start system: tire-intel start".to_string());
        lines.join("\n")
    })
}

pub async fn status(json: bool, settings: &Settings) -> anyhow::Result<()> {
    let report = system_status(settings).await?;
    print_one(json, report, render_status)
}

pub fn security(json: bool, settings: &Settings) -> anyhow::Result<()> {
    let manager = SecurityManager::new(settings.security_log_path());
    let owasp = owasp_checklist();
    let score = owasp.iter().filter(|c| c.status == ControlStatus::Basic).count();
    let status = SecurityStatus {
        report: manager.security_report(),
        grade: grade(score),
        owasp,
        score,
    };
    print_one(json, status, render_security)
}

pub fn dev(json: bool, command: &DevCommands) -> anyhow::Result<()> {
    let (message, hint) = match command {
        DevCommands::Format => ("🎨 Code formatting is not yet available from this CLI", "Run: cargo fmt"),
        DevCommands::Lint => ("🔍 Code linting is not yet available from this CLI", "Run: cargo clippy"),
        DevCommands::SecurityScan => ("🔒 Security scanning is not yet available from this CLI", "Run: cargo audit"),
    };
    if json {
        print_json(serde_json::json!({"available": false, "message": message, "hint": hint}))
    } else {
        println!("{}", message);
        println!("{}", hint);
        Ok(())
    }
}

/// Create the workspace tree and `.env`
fn setup_workspace(settings: &Settings) -> anyhow::Result<SetupReport> {
    info!("Setting up workspace at {}", settings.root.display());

    let mut directories = Vec::new();
    for directory in WORKSPACE_DIRECTORIES {
        let path = settings.path(directory);
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        let gitkeep = path.join(".gitkeep");
        if !gitkeep.exists() {
            fs::write(&gitkeep, "")
                .with_context(|| format!("failed to write {}", gitkeep.display()))?;
        }
        directories.push(directory.to_string());
    }

    let env_file = settings.env_file();
    let action = if env_file.exists() {
        EnvFileAction::Existing
    } else if settings.env_template().exists() {
        fs::copy(settings.env_template(), &env_file)
            .with_context(|| format!("failed to copy template to {}", env_file.display()))?;
        EnvFileAction::CopiedFromTemplate
    } else {
        fs::write(&env_file, DEFAULT_ENV_CONTENT)
            .with_context(|| format!("failed to write {}", env_file.display()))?;
        EnvFileAction::CreatedDefault
    };

    Ok(SetupReport { directories, env_file: action })
}

async fn system_status(settings: &Settings) -> anyhow::Result<StatusReport> {
    let orchestrator = ready_orchestrator(settings.clone()).await?;
    orchestrator.collect_metrics().await;
    let checks = orchestrator.run_system_tests();

    let metrics = orchestrator.metrics();
    let mut components = Vec::new();
    for instance in orchestrator.get_all_instances().values() {
        let component = instance.read().await;
        let latest = metrics.get_latest_component_metrics(component.id()).await;
        components.push(ComponentLine {
            id: component.id().to_string(),
            status: component.status().to_string(),
            tasks_processed: latest.as_ref().map_or(0, |m| m.tasks_processed),
            tasks_failed: latest.as_ref().map_or(0, |m| m.tasks_failed),
        });
    }
    components.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(StatusReport {
        version: checks.version,
        configuration_files: checks.configuration_files,
        directories: checks.required_directories,
        components,
        summary: metrics.get_system_summary().await,
    })
}

fn render_status(report: &StatusReport) -> String {
    let mark = |exists: bool| if exists { "✅" } else { "❌" };

    let mut lines = vec![format!("✅ Version: {}", report.version)];
    for (file, exists) in &report.configuration_files {
        lines.push(format!("{} File: {}", mark(*exists), file));
    }
    for (dir, exists) in &report.directories {
        lines.push(format!("{} Directory: {}", mark(*exists), dir));
    }
    lines.push(String::new());
    for c in &report.components {
        lines.push(format!(
            "{:<12} {:<10} processed={} failed={}",
            c.id, c.status, c.tasks_processed, c.tasks_failed
        ));
    }
    lines.join("\n")
}

fn render_security(status: &SecurityStatus) -> String {
    let report = &status.report;
    let body = format!(
        "Blocked identifiers: {}\nActive sessions: {}\nEvents (24h): {}\nEvent types: {}",
        report.blocked_identifiers,
        report.active_sessions,
        report.recent_security_events,
        if report.event_types.is_empty() { "none".to_string() } else { report.event_types.join(", ") },
    );

    let mut lines = vec![panel("Security Status", &body), String::new()];
    for check in &status.owasp {
        lines.push(format!("{:<34} {:<16} {}", check.id, check.status.label(), check.notes));
    }
    lines.push(String::new());
    lines.push(format!("OWASP score: {}/10 ({:?})", status.score, status.grade));
    lines.join("\n")
}
