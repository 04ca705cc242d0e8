use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Local;
use log::{info, debug};
use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::core::component::{
    Component, ComponentStatus, ComponentTask, ComponentError, ComponentMetrics, ComponentConfig
};
use crate::instances::common::{BaseComponent, EventType};

pub const DEFAULT_ITERATIONS: usize = 10;
/// Upper bound on one harness run; each iteration sleeps while holding the tester
pub const MAX_ITERATIONS: usize = 1000;
/// Simulated per-frame work
const SIMULATED_INFERENCE: Duration = Duration::from_millis(1);
/// Mean inference time must stay under this many seconds
pub const LATENCY_REQUIREMENT_SECS: f64 = 0.1;

// Accuracy figures are fixed; no classifier is evaluated.
const SENSITIVITY: f64 = 0.92;
const SPECIFICITY: f64 = 0.89;
const TOTAL_TESTS: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    /// Mean seconds per simulated inference
    pub average_inference_time: f64,
    pub fps: f64,
    pub meets_100ms_requirement: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccuracyResults {
    pub sensitivity: f64,
    pub specificity: f64,
    pub total_tests: u32,
}

/// Report written to `data/reports/cv_test_report.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestReport {
    pub timestamp: String,
    pub performance_metrics: PerformanceMetrics,
    pub accuracy_results: AccuracyResults,
    pub test_status: String,
}

impl TestReport {
    pub fn load(path: &Path) -> Result<Self, ComponentError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Overwrite `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ComponentError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Derive the performance record from measured durations
pub fn summarize_timings(times: &[Duration]) -> PerformanceMetrics {
    let average = if times.is_empty() {
        0.0
    } else {
        times.iter().map(Duration::as_secs_f64).sum::<f64>() / times.len() as f64
    };

    PerformanceMetrics {
        average_inference_time: average,
        fps: if average > 0.0 { 1.0 / average } else { 0.0 },
        meets_100ms_requirement: !times.is_empty() && average < LATENCY_REQUIREMENT_SECS,
    }
}

/// Accept an iteration count between 1 and `MAX_ITERATIONS`
pub fn parse_iterations(value: &serde_json::Value) -> Result<usize, String> {
    match value.as_u64() {
        Some(n) if n > 0 && n <= MAX_ITERATIONS as u64 => Ok(n as usize),
        _ => Err(format!(
            "iterations must be an integer between 1 and {}, got {}",
            MAX_ITERATIONS, value
        )),
    }
}

/// Mock defect-detection test harness
#[derive(Debug)]
pub struct DefectTester {
    base: BaseComponent,
    report_path: PathBuf,
    sample_dir: PathBuf,
    iterations: usize,
    last_report: Option<TestReport>,
}

impl DefectTester {
    pub fn new(report_path: PathBuf, sample_dir: PathBuf) -> Self {
        Self {
            base: BaseComponent::new("cv_tester", "DefectTester"),
            report_path,
            sample_dir,
            iterations: DEFAULT_ITERATIONS,
            last_report: None,
        }
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn create_sample_dir(&self) -> Result<&Path, ComponentError> {
        fs::create_dir_all(&self.sample_dir)?;
        debug!("Sample test directory ready: {}", self.sample_dir.display());
        Ok(&self.sample_dir)
    }

    /// Time `iterations` simulated inferences
    pub async fn test_inference_speed(&self, iterations: usize) -> PerformanceMetrics {
        let mut times = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            let start = Instant::now();
            tokio::time::sleep(SIMULATED_INFERENCE).await;
            times.push(start.elapsed());
        }

        let metrics = summarize_timings(&times);
        info!(
            "Inference performance: {:.3}s average, {:.1} FPS",
            metrics.average_inference_time, metrics.fps
        );
        metrics
    }

    /// Run the harness and write the report
    pub async fn generate_test_report(&mut self, iterations: usize) -> Result<TestReport, ComponentError> {
        self.base.ensure_running()?;
        if iterations == 0 || iterations > MAX_ITERATIONS {
            return Err(ComponentError::ValidationError(format!(
                "iterations must be between 1 and {}, got {}",
                MAX_ITERATIONS, iterations
            )));
        }
        let start = Instant::now();

        self.create_sample_dir()?;
        let performance_metrics = self.test_inference_speed(iterations).await;

        let report = TestReport {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            performance_metrics,
            accuracy_results: AccuracyResults {
                sensitivity: SENSITIVITY,
                specificity: SPECIFICITY,
                total_tests: TOTAL_TESTS,
            },
            test_status: "completed".to_string(),
        };

        let saved = report.save(&self.report_path);
        self.base.record_task_processing(saved.is_ok(), start.elapsed().as_secs_f64() * 1000.0);
        if let Err(e) = saved {
            self.base.log_event(EventType::Error, &format!("Failed to save report: {}", e), None).await;
            return Err(e);
        }

        info!("Test report saved to: {}", self.report_path.display());
        self.base.log_event(
            EventType::Info,
            "Test report saved",
            Some(json!({"fps": report.performance_metrics.fps, "iterations": iterations}))
        ).await;
        self.base.set_custom_metric("last_fps", report.performance_metrics.fps);
        self.last_report = Some(report.clone());
        Ok(report)
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

#[async_trait]
impl Component for DefectTester {
    fn id(&self) -> &str {
        &self.base.id
    }

    fn component_type(&self) -> &str {
        &self.base.component_type
    }

    fn status(&self) -> ComponentStatus {
        self.base.status.clone()
    }

    async fn initialize(&mut self, config: ComponentConfig) -> Result<(), ComponentError> {
        info!("Initializing DefectTester with config: {}", config.id);

        if let Some(iterations) = config.parameters.get("iterations") {
            match parse_iterations(iterations) {
                Ok(n) => self.iterations = n,
                Err(msg) => {
                    self.base.status = ComponentStatus::Error(msg.clone());
                    return Err(ComponentError::InitializationError(msg));
                }
            }
        }

        self.base.config = Some(config);
        self.base.status = ComponentStatus::Initialized;
        self.base.log_event(
            EventType::Initialization,
            "DefectTester initialized",
            Some(json!({"iterations": self.iterations, "report_path": self.report_path}))
        ).await;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ComponentError> {
        info!("Starting DefectTester");
        self.base.status = ComponentStatus::Running;
        self.base.log_event(EventType::StateChange, "DefectTester started", None).await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        info!("Shutting down DefectTester");
        self.base.status = ComponentStatus::ShuttingDown;
        self.base.log_event(EventType::StateChange, "DefectTester shutting down", None).await;
        Ok(())
    }

    async fn process_task(&mut self, task: ComponentTask) -> Result<serde_json::Value, ComponentError> {
        debug!("Processing task: {}", task.id);
        let iterations = match task.parameters.get("iterations") {
            Some(value) => parse_iterations(value).map_err(ComponentError::ValidationError)?,
            None => self.iterations,
        };
        let report = self.generate_test_report(iterations).await?;
        Ok(serde_json::to_value(report)?)
    }

    async fn collect_metrics(&self) -> Result<ComponentMetrics, ComponentError> {
        let mut metrics = self.base.get_metrics();
        metrics.custom_metrics = json!({
            "iterations": self.iterations,
            "last_fps": self.base.metrics.custom_metrics.get("last_fps"),
            "last_run": self.last_report.as_ref().map(|r| r.timestamp.clone()),
        });
        Ok(metrics)
    }

    fn get_info(&self) -> serde_json::Value {
        json!({
            "id": self.base.id,
            "type": self.base.component_type,
            "status": self.base.status.to_string(),
            "report_path": self.report_path(),
            "iterations": self.iterations,
        })
    }
}
