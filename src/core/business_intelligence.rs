use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use log::info;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::component::ComponentError;
use crate::core::config::Settings;
use crate::instances::cv_testing::TestReport;

/// Frames per second the line needs
pub const TARGET_FPS: f64 = 100.0;
const EXCELLENT_FPS: f64 = 500.0;
const QUALITY_THRESHOLD: f64 = 0.9;
pub const CHART_FILE_NAME: &str = "performance_chart.svg";
const CHART_SIZE: (u32, u32) = (800, 320);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceKpis {
    pub inference_speed_ms: f64,
    pub fps: f64,
    pub meets_requirements: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityKpis {
    pub sensitivity: f64,
    pub specificity: f64,
    pub total_tests: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemHealth {
    pub last_updated: String,
    pub test_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiDashboard {
    pub performance_metrics: PerformanceKpis,
    pub quality_metrics: QualityKpis,
    pub system_health: SystemHealth,
}

impl From<&TestReport> for KpiDashboard {
    fn from(report: &TestReport) -> Self {
        Self {
            performance_metrics: PerformanceKpis {
                inference_speed_ms: report.performance_metrics.average_inference_time * 1000.0,
                fps: report.performance_metrics.fps,
                meets_requirements: report.performance_metrics.meets_100ms_requirement,
            },
            quality_metrics: QualityKpis {
                sensitivity: report.accuracy_results.sensitivity,
                specificity: report.accuracy_results.specificity,
                total_tests: report.accuracy_results.total_tests,
            },
            system_health: SystemHealth {
                last_updated: report.timestamp.clone(),
                test_status: report.test_status.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemPerformance {
    Operational,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutiveSummary {
    pub system_performance: SystemPerformance,
    /// Mean of sensitivity and specificity, as a percentage with one decimal
    pub quality_score: f64,
    pub processing_speed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReport {
    pub report_date: String,
    pub executive_summary: ExecutiveSummary,
    pub detailed_metrics: KpiDashboard,
    pub recommendations: Vec<String>,
}

/// Rule-based advice for a set of KPIs
pub fn recommendations(kpis: &KpiDashboard) -> Vec<String> {
    let mut recommendations = Vec::new();
    let fps = kpis.performance_metrics.fps;

    if fps < TARGET_FPS {
        recommendations.push("Consider hardware upgrade - FPS below target".to_string());
    } else if fps > EXCELLENT_FPS {
        recommendations.push("Excellent performance - system running optimally".to_string());
    }

    if kpis.quality_metrics.sensitivity < QUALITY_THRESHOLD {
        recommendations.push("Improve defect detection sensitivity - may miss defects".to_string());
    }

    if kpis.quality_metrics.specificity < QUALITY_THRESHOLD {
        recommendations.push("Reduce false positives - too many good tires flagged as defective".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("System performing within acceptable parameters".to_string());
    }

    recommendations
}

/// Build the daily report for `date`
pub fn daily_report(kpis: KpiDashboard, date: NaiveDate) -> DailyReport {
    let quality = (kpis.quality_metrics.sensitivity + kpis.quality_metrics.specificity) / 2.0 * 100.0;

    DailyReport {
        report_date: date.to_string(),
        executive_summary: ExecutiveSummary {
            system_performance: if kpis.performance_metrics.meets_requirements {
                SystemPerformance::Operational
            } else {
                SystemPerformance::Degraded
            },
            quality_score: (quality * 10.0).round() / 10.0,
            processing_speed: format!("{:.1} FPS", kpis.performance_metrics.fps),
        },
        recommendations: recommendations(&kpis),
        detailed_metrics: kpis,
    }
}

fn chart_error<E: std::fmt::Display>(e: E) -> ComponentError {
    ComponentError::PersistenceError(format!("Failed to draw performance chart: {}", e))
}

/// Draw measured FPS as a horizontal gauge over the below-target, on-target
/// and excellent bands, with a marker at the 100 FPS target.
pub fn render_performance_chart(kpis: &KpiDashboard, path: &Path) -> Result<(), ComponentError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let fps = kpis.performance_metrics.fps;
    let x_max = (fps * 1.1).max(EXCELLENT_FPS * 1.2);

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Inference Speed: {:.1} FPS", fps), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .build_cartesian_2d(0f64..x_max, 0f64..1f64)
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc("Frames per second")
        .draw()
        .map_err(chart_error)?;

    let bands = [
        (0.0, TARGET_FPS, RED.mix(0.2), "Below target"),
        (TARGET_FPS, EXCELLENT_FPS, YELLOW.mix(0.3), "On target"),
        (EXCELLENT_FPS, x_max, GREEN.mix(0.2), "Excellent"),
    ];
    for (from, to, color, label) in bands {
        chart
            .draw_series(std::iter::once(Rectangle::new([(from, 0.0), (to, 1.0)], color.filled())))
            .map_err(chart_error)?
            .label(label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    chart
        .draw_series(std::iter::once(Rectangle::new([(0.0, 0.35), (fps, 0.65)], BLUE.filled())))
        .map_err(chart_error)?
        .label("Measured")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], BLUE.filled()));

    chart
        .draw_series(LineSeries::new(
            vec![(TARGET_FPS, 0.0), (TARGET_FPS, 1.0)],
            BLACK.stroke_width(2),
        ))
        .map_err(chart_error)?
        .label("Target (100 FPS)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    Ok(())
}

/// Business intelligence over the latest test report
#[derive(Debug, Clone)]
pub struct BusinessIntelligence {
    report_path: PathBuf,
    reports_dir: PathBuf,
}

impl BusinessIntelligence {
    pub fn new(settings: &Settings) -> Self {
        Self {
            report_path: settings.report_path(),
            reports_dir: settings.reports_dir(),
        }
    }

    pub fn kpi_dashboard(&self) -> Result<KpiDashboard, ComponentError> {
        if !self.report_path.exists() {
            return Err(ComponentError::ProcessingError("No CV test data available".to_string()));
        }
        let report = TestReport::load(&self.report_path)?;
        Ok(KpiDashboard::from(&report))
    }

    /// Build today's report and save it as `daily_report_YYYYMMDD.json`
    pub fn generate_daily_report(&self) -> Result<(DailyReport, PathBuf), ComponentError> {
        let today = Local::now().date_naive();
        let report = daily_report(self.kpi_dashboard()?, today);

        fs::create_dir_all(&self.reports_dir)?;
        let path = self.reports_dir.join(format!("daily_report_{}.json", today.format("%Y%m%d")));
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        info!("Daily report saved to {}", path.display());

        Ok((report, path))
    }

    /// Render the FPS gauge for the latest test report as `performance_chart.svg`
    pub fn generate_performance_chart(&self) -> Result<PathBuf, ComponentError> {
        let kpis = self.kpi_dashboard()?;
        let path = self.reports_dir.join(CHART_FILE_NAME);
        render_performance_chart(&kpis, &path)?;
        info!("Performance chart saved to {}", path.display());
        Ok(path)
    }
}
