use async_trait::async_trait;
use chrono::Utc;
use log::{info, debug};
use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::core::component::{
    Component, ComponentStatus, ComponentTask, ComponentError, ComponentMetrics, ComponentConfig
};
use crate::instances::common::{BaseComponent, EventType, extract_task_param};

/// Confidence attached to the defect branch
pub const DEFECT_CONFIDENCE: f64 = 0.9;
/// Confidence attached to the recommendation branch
pub const RECOMMENDATION_CONFIDENCE: f64 = 0.85;
/// Confidence attached to the fallback branch
pub const GENERAL_CONFIDENCE: f64 = 0.7;

const DEFECT_TRIGGERS: &[&str] = &["defect", "crack"];
const RECOMMENDATION_TRIGGERS: &[&str] = &["recommend", "optimize"];

/// Number of analyses remembered for `get_info`
const HISTORY_LIMIT: usize = 100;

/// Keyword-routed manufacturing reasoner.
///
/// Picks one of three canned analyses by checking the lowercased query for
/// trigger words, defect words first. Nothing is inferred; the confidence is
/// a constant per branch.
#[derive(Debug)]
pub struct ManufacturingReasoner {
    base: BaseComponent,
    knowledge: Vec<DefectProfile>,
    history: Vec<AnalysisRecord>,
}

/// Category chosen for a query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    DefectAnalysis,
    Recommendation,
    General,
    Error,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::DefectAnalysis => "defect_analysis",
            AnalysisType::Recommendation => "recommendation",
            AnalysisType::General => "general",
            AnalysisType::Error => "error",
        }
    }
}

/// Result of analysing one query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub query: String,
    pub analysis_type: AnalysisType,
    pub confidence: f64,
    pub timestamp: String,
    #[serde(default)]
    pub main_response: String,
    /// Seconds spent producing the response
    #[serde(default)]
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// Zero-confidence record carrying the failure text
    pub fn failed(query: &str, error: &ComponentError) -> Self {
        Self {
            query: query.to_string(),
            analysis_type: AnalysisType::Error,
            confidence: 0.0,
            timestamp: Utc::now().to_rfc3339(),
            main_response: String::new(),
            processing_time: 0.0,
            error: Some(error.to_string()),
        }
    }
}

/// Static defect knowledge surfaced through `get_info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefectProfile {
    pub name: String,
    pub causes: Vec<String>,
    pub severity: String,
    pub solutions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnalysisRecord {
    query: String,
    analysis_type: AnalysisType,
    timestamp: String,
}

/// Select the branch for a query. Defect words win over recommendation words.
pub fn classify(query: &str) -> (AnalysisType, f64) {
    let lowered = query.to_lowercase();
    let contains_any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    if contains_any(DEFECT_TRIGGERS) {
        (AnalysisType::DefectAnalysis, DEFECT_CONFIDENCE)
    } else if contains_any(RECOMMENDATION_TRIGGERS) {
        (AnalysisType::Recommendation, RECOMMENDATION_CONFIDENCE)
    } else {
        (AnalysisType::General, GENERAL_CONFIDENCE)
    }
}

fn render_response(analysis_type: AnalysisType, query: &str) -> String {
    match analysis_type {
        AnalysisType::DefectAnalysis => format!(
            r#"
Defect Analysis:

Query: "{query}"

Key Findings:
• Tire defects typically originate from process parameter variations
• Common defect types include cracks, bubbles, and wear patterns
• Root causes often involve temperature, pressure, or material quality issues

Recommended Actions:
1. Implement real-time process monitoring
2. Enhance quality control procedures
3. Optimize curing parameters
4. Improve material inspection protocols
"#
        ),
        AnalysisType::Recommendation => format!(
            r#"
Manufacturing Optimization Recommendations:

Query: "{query}"

Strategic Recommendations:
• Deploy predictive maintenance systems (30-50% downtime reduction)
• Implement AI-powered quality control (95%+ accuracy)
• Optimize production line efficiency
• Establish real-time KPI monitoring

Expected Benefits:
• Reduced defect rates (<2% target)
• Improved OEE (>85% target)
• Enhanced cost efficiency

Implementation Priority: HIGH
Timeline: 3-6 months for full deployment
"#
        ),
        AnalysisType::General | AnalysisType::Error => format!(
            r#"
Manufacturing Intelligence Response:

Query: "{query}"

Manufacturing Context:
• Tire manufacturing requires systematic quality control
• Process optimization drives operational excellence
• Data-driven decisions improve efficiency and quality

Recommendations:
• Continue systematic data collection
• Implement advanced analytics
• Focus on continuous improvement
"#
        ),
    }
}

fn default_knowledge() -> Vec<DefectProfile> {
    let profile = |name: &str, causes: &[&str], severity: &str, solutions: &[&str]| DefectProfile {
        name: name.to_string(),
        causes: causes.iter().map(|s| s.to_string()).collect(),
        severity: severity.to_string(),
        solutions: solutions.iter().map(|s| s.to_string()).collect(),
    };

    vec![
        profile(
            "cracks",
            &["temperature_variation", "pressure_inconsistency", "material_quality"],
            "high",
            &["optimize_curing_temperature", "check_material_quality", "calibrate_equipment"],
        ),
        profile(
            "bubbles",
            &["trapped_air", "moisture", "contamination"],
            "medium",
            &["improve_mixing_process", "control_humidity", "enhance_quality_control"],
        ),
    ]
}

impl ManufacturingReasoner {
    pub fn new() -> Self {
        Self {
            base: BaseComponent::new("reasoner", "ManufacturingReasoner"),
            knowledge: default_knowledge(),
            history: Vec::new(),
        }
    }

    /// Analyse a query. Failures come back as a zero-confidence record, never as `Err`.
    pub async fn analyze_query(&mut self, query: &str) -> QueryResult {
        let start = std::time::Instant::now();

        let result = match self.try_analyze(query) {
            Ok(mut result) => {
                result.processing_time = start.elapsed().as_secs_f64();
                result
            }
            Err(e) => {
                self.base.log_event(EventType::Error, &format!("Analysis failed: {}", e), None).await;
                QueryResult::failed(query, &e)
            }
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.base.record_task_processing(result.error.is_none(), elapsed_ms);
        self.remember(&result);
        result
    }

    fn try_analyze(&self, query: &str) -> Result<QueryResult, ComponentError> {
        self.base.ensure_running()?;

        let (analysis_type, confidence) = classify(query);
        debug!("Query routed to {}", analysis_type.as_str());

        Ok(QueryResult {
            query: query.to_string(),
            analysis_type,
            confidence,
            timestamp: Utc::now().to_rfc3339(),
            main_response: render_response(analysis_type, query),
            processing_time: 0.0,
            error: None,
        })
    }

    fn remember(&mut self, result: &QueryResult) {
        self.history.push(AnalysisRecord {
            query: result.query.clone(),
            analysis_type: result.analysis_type,
            timestamp: result.timestamp.clone(),
        });
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(0..excess);
        }
    }

    pub fn knowledge(&self) -> &[DefectProfile] {
        &self.knowledge
    }
}

#[async_trait]
impl Component for ManufacturingReasoner {
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
        info!("Initializing ManufacturingReasoner with config: {}", config.id);

        if let Some(profiles) = config.parameters.get("defect_profiles") {
            self.knowledge = serde_json::from_value(profiles.clone()).map_err(|e| {
                ComponentError::InitializationError(format!("Invalid defect_profiles: {}", e))
            })?;
        }

        self.base.config = Some(config);
        self.base.status = ComponentStatus::Initialized;
        self.base.log_event(
            EventType::Initialization,
            "ManufacturingReasoner initialized",
            Some(json!({"defect_profiles": self.knowledge.len()}))
        ).await;

        Ok(())
    }

    async fn start(&mut self) -> Result<(), ComponentError> {
        info!("Starting ManufacturingReasoner");
        self.base.status = ComponentStatus::Running;
        self.base.log_event(EventType::StateChange, "ManufacturingReasoner started", None).await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        info!("Shutting down ManufacturingReasoner");
        self.base.status = ComponentStatus::ShuttingDown;
        self.base.log_event(EventType::StateChange, "ManufacturingReasoner shutting down", None).await;
        Ok(())
    }

    async fn process_task(&mut self, task: ComponentTask) -> Result<serde_json::Value, ComponentError> {
        debug!("Processing task: {}", task.id);
        self.base.log_event(
            EventType::TaskProcessing,
            &format!("Processing task {}", task.id),
            Some(json!({"description": task.description}))
        ).await;

        let query = extract_task_param::<String>(&task, "query")?;
        let result = self.analyze_query(&query).await;
        Ok(serde_json::to_value(result)?)
    }

    async fn collect_metrics(&self) -> Result<ComponentMetrics, ComponentError> {
        let mut metrics = self.base.get_metrics();
        let recent = self.base.get_recent_events(50).await;
        let recent_errors = recent.iter().filter(|e| e.event_type == EventType::Error).count();

        let count = |kind: AnalysisType| self.history.iter().filter(|r| r.analysis_type == kind).count();
        metrics.custom_metrics = json!({
            "defect_analyses": count(AnalysisType::DefectAnalysis),
            "recommendations": count(AnalysisType::Recommendation),
            "general_responses": count(AnalysisType::General),
            "recent_errors": recent_errors,
        });

        Ok(metrics)
    }

    fn get_info(&self) -> serde_json::Value {
        json!({
            "id": self.base.id,
            "type": self.base.component_type,
            "status": self.base.status.to_string(),
            "defect_profiles": self.knowledge(),
            "history": self.history,
            "tasks_processed": self.base.metrics.tasks_processed,
        })
    }
}

impl Default for ManufacturingReasoner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn running_reasoner() -> ManufacturingReasoner {
        let mut reasoner = ManufacturingReasoner::new();
        reasoner.initialize(ComponentConfig::new("reasoner", "Reasoner")).await.unwrap();
        reasoner.start().await.unwrap();
        reasoner
    }

    #[test]
    fn defect_words_route_to_defect_analysis() {
        for query in ["Why are DEFECT rates increasing on Line 2?", "sidewall Cracks", "crack"] {
            assert_eq!(classify(query), (AnalysisType::DefectAnalysis, 0.9));
        }
    }

    #[test]
    fn recommendation_words_route_to_recommendation() {
        for query in ["Recommend strategies to reduce costs", "How can we OPTIMIZE curing?"] {
            assert_eq!(classify(query), (AnalysisType::Recommendation, 0.85));
        }
    }

    #[test]
    fn defect_words_take_priority() {
        assert_eq!(classify("recommend a fix for this defect").0, AnalysisType::DefectAnalysis);
    }

    #[test]
    fn anything_else_is_general() {
        assert_eq!(classify("What is our throughput?"), (AnalysisType::General, 0.7));
        assert_eq!(classify(""), (AnalysisType::General, 0.7));
    }

    #[tokio::test]
    async fn analysis_interpolates_query() {
        let mut reasoner = running_reasoner().await;
        let result = reasoner.analyze_query("What causes tire sidewall cracks?").await;

        assert_eq!(result.analysis_type, AnalysisType::DefectAnalysis);
        assert_eq!(result.confidence, DEFECT_CONFIDENCE);
        assert!(result.main_response.contains("Query: \"What causes tire sidewall cracks?\""));
        assert!(result.error.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&result.timestamp).is_ok());
    }

    #[tokio::test]
    async fn stopped_reasoner_returns_zero_confidence_record() {
        let mut reasoner = running_reasoner().await;
        reasoner.shutdown().await.unwrap();

        let result = reasoner.analyze_query("any defect").await;
        assert_eq!(result.analysis_type, AnalysisType::Error);
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.unwrap().contains("not running"));

        let metrics = reasoner.collect_metrics().await.unwrap();
        assert_eq!(metrics.tasks_failed, 1);
        assert_eq!(metrics.custom_metrics["recent_errors"], 1);
    }

    #[tokio::test]
    async fn process_task_requires_query() {
        let mut reasoner = running_reasoner().await;

        let missing = reasoner.process_task(ComponentTask::new("analyze", json!({}))).await;
        assert!(matches!(missing, Err(ComponentError::ValidationError(_))));

        let value = reasoner
            .process_task(ComponentTask::new("analyze", json!({"query": "optimize line 4"})))
            .await
            .unwrap();
        assert_eq!(value["analysis_type"], "recommendation");
        assert_eq!(value["confidence"], 0.85);
    }

    #[tokio::test]
    async fn initialize_accepts_custom_profiles() {
        let mut reasoner = ManufacturingReasoner::new();
        let mut config = ComponentConfig::new("reasoner", "Reasoner");
        config.parameters = json!({"defect_profiles": [
            {"name": "blisters", "causes": ["heat"], "severity": "low", "solutions": ["cool"]}
        ]});

        reasoner.initialize(config).await.unwrap();
        assert_eq!(reasoner.knowledge().len(), 1);
        assert_eq!(reasoner.knowledge()[0].name, "blisters");
    }
}
