use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn, error};
use serde::{Serialize, Deserialize};
use tokio::sync::RwLock;

use crate::core::component::{
    Component, ComponentConfig, ComponentError, ComponentTask
};
use crate::core::config::{Settings, CONFIG_FILES, REQUIRED_DIRECTORIES};
use crate::core::metrics::{MetricsConfig, MetricsManager};
use crate::core::security::{SecurityManager, DEFAULT_MAX_INPUT_LENGTH, DEFAULT_RATE_WINDOW_SECS};
use crate::instances::cv_testing::TestReport;
use crate::instances::{AgenticRagEngine, DefectTester, ManufacturingReasoner};

/// Confidence reported for engines that only answer in demonstration mode
pub const DEMONSTRATION_CONFIDENCE: f64 = 0.85;
/// Error shown when a query arrives with an unknown or expired session token
pub const INVALID_SESSION_ERROR: &str = "Invalid or expired session";
const QUERY_RATE_IDENTIFIER: &str = "process_query";

/// The orchestrator owns every component, the security manager, and the
/// metrics store. It routes queries and runs the system self-test.
#[derive(Debug)]
pub struct Orchestrator {
    settings: Settings,
    /// Every registered component by id
    instances: HashMap<String, Arc<RwLock<dyn Component>>>,
    reasoner: Arc<RwLock<ManufacturingReasoner>>,
    rag_engine: Arc<RwLock<AgenticRagEngine>>,
    tester: Arc<RwLock<DefectTester>>,
    security: SecurityManager,
    metrics: Arc<MetricsManager>,
    status: SystemStatus,
}

/// Overall system status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub state: OrchestratorState,
    pub last_updated: DateTime<Utc>,
    pub active_components: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Initialized,
    Ready,
    ShuttingDown,
    Error,
}

impl OrchestratorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestratorState::Initialized => "initialized",
            OrchestratorState::Ready => "ready",
            OrchestratorState::ShuttingDown => "shutting_down",
            OrchestratorState::Error => "error",
        }
    }
}

/// Processing strategy requested for a query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    #[default]
    #[value(name = "auto")]
    Auto,
    #[value(name = "traditional_rag")]
    TraditionalRag,
    #[value(name = "agentic_rag")]
    AgenticRag,
    #[value(name = "graph_rag")]
    GraphRag,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Auto => "auto",
            QueryType::TraditionalRag => "traditional_rag",
            QueryType::AgenticRag => "agentic_rag",
            QueryType::GraphRag => "graph_rag",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// What the CLI and the dashboard show for one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub query: String,
    pub query_type: QueryType,
    pub method: String,
    pub response: String,
    pub confidence: f64,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Full record from the engine that answered
    #[serde(default)]
    pub details: serde_json::Value,
}

impl QueryOutcome {
    fn failed(query: &str, query_type: QueryType, method: &str, error: String) -> Self {
        Self {
            query: query.to_string(),
            query_type,
            method: method.to_string(),
            response: String::new(),
            confidence: 0.0,
            status: OutcomeStatus::Error,
            error: Some(error),
            details: serde_json::Value::Null,
        }
    }
}

/// Result of the directory and configuration self-test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemTestReport {
    pub version: String,
    pub system_status: OrchestratorState,
    pub required_directories: BTreeMap<String, bool>,
    pub configuration_files: BTreeMap<String, bool>,
    pub status: String,
}

impl SystemTestReport {
    pub fn missing_directories(&self) -> Vec<&str> {
        missing(&self.required_directories)
    }

    pub fn missing_configuration_files(&self) -> Vec<&str> {
        missing(&self.configuration_files)
    }
}

fn missing(entries: &BTreeMap<String, bool>) -> Vec<&str> {
    entries.iter().filter(|(_, exists)| !**exists).map(|(name, _)| name.as_str()).collect()
}

impl Orchestrator {
    /// Build every component from `settings`. Nothing runs until `initialize_system`.
    pub fn new(settings: Settings) -> Self {
        let reasoner = Arc::new(RwLock::new(ManufacturingReasoner::new()));
        let rag_engine = Arc::new(RwLock::new(AgenticRagEngine::new()));
        let tester = Arc::new(RwLock::new(DefectTester::new(
            settings.report_path(),
            settings.sample_images_dir(),
        )));
        let security = SecurityManager::new(settings.security_log_path());

        let mut orchestrator = Self {
            settings,
            instances: HashMap::new(),
            reasoner: reasoner.clone(),
            rag_engine: rag_engine.clone(),
            tester: tester.clone(),
            security,
            metrics: Arc::new(MetricsManager::new(MetricsConfig::default())),
            status: SystemStatus {
                state: OrchestratorState::Initialized,
                last_updated: Utc::now(),
                active_components: 0,
                errors: Vec::new(),
            },
        };

        orchestrator.register_instance("reasoner", reasoner);
        orchestrator.register_instance("rag_engine", rag_engine);
        orchestrator.register_instance("cv_tester", tester);
        orchestrator
    }

    fn register_instance(&mut self, id: &str, instance: Arc<RwLock<dyn Component>>) {
        if self.instances.contains_key(id) {
            warn!("Replacing existing instance with ID: {}", id);
        }
        self.instances.insert(id.to_string(), instance);
        self.status.active_components = self.instances.len();
        info!("Registered component: {}", id);
    }

    /// Initialize and start every component
    pub async fn initialize_system(&mut self) -> Result<(), ComponentError> {
        info!("Initializing system...");

        let mut ids: Vec<&String> = self.instances.keys().collect();
        ids.sort();
        for id in ids {
            let instance = &self.instances[id];
            let mut component = instance.write().await;
            if component.id() != id.as_str() {
                warn!("Component {} is registered under {}", component.id(), id);
            }
            let config = ComponentConfig::new(id, component.component_type());

            let started = match component.initialize(config).await {
                Ok(()) => component.start().await,
                Err(e) => Err(e),
            };
            if let Err(e) = started {
                error!("Failed to start component {}: {}", id, e);
                self.status.errors.push(format!("Failed to start {}: {}", id, e));
                self.status.state = OrchestratorState::Error;
                self.status.last_updated = Utc::now();
                return Err(e);
            }
            info!("Started component: {}", id);
        }

        self.status.state = OrchestratorState::Ready;
        self.status.last_updated = Utc::now();
        Ok(())
    }

    /// Shut every component down
    pub async fn shutdown(&mut self) -> Result<(), ComponentError> {
        info!("Stopping all component instances...");
        self.status.state = OrchestratorState::ShuttingDown;
        self.status.last_updated = Utc::now();

        for (id, instance) in &self.instances {
            if let Err(e) = instance.write().await.shutdown().await {
                error!("Failed to stop component {}: {}", id, e);
                self.status.errors.push(format!("Failed to stop {}: {}", id, e));
                return Err(e);
            }
        }
        Ok(())
    }

    /// Validate and route a query. Never fails; problems become an error outcome.
    pub async fn process_query(&mut self, query: &str, query_type: QueryType) -> QueryOutcome {
        if self.status.state != OrchestratorState::Ready {
            return QueryOutcome::failed(
                query,
                query_type,
                "none",
                "System not ready. Please initialize first.".to_string(),
            );
        }

        if let Err(reason) = self.screen_query(query) {
            return QueryOutcome::failed(query, query_type, "none", reason.to_string());
        }

        info!("Processing query with {}", query_type.as_str());
        match query_type {
            QueryType::Auto => {
                let result = self.reasoner.write().await.analyze_query(query).await;
                let details = serde_json::to_value(&result).unwrap_or_default();
                QueryOutcome {
                    query: result.query,
                    query_type,
                    method: "Manufacturing Reasoner".to_string(),
                    response: result.main_response,
                    confidence: result.confidence,
                    status: if result.error.is_some() { OutcomeStatus::Error } else { OutcomeStatus::Success },
                    error: result.error,
                    details,
                }
            }
            QueryType::AgenticRag => {
                let result = self.rag_engine.write().await.process_complex_query(query).await;
                let details = serde_json::to_value(&result).unwrap_or_default();
                QueryOutcome {
                    query: result.query,
                    query_type,
                    method: result.method,
                    response: result.response,
                    confidence: result.confidence,
                    status: if result.error.is_some() { OutcomeStatus::Error } else { OutcomeStatus::Success },
                    error: result.error,
                    details,
                }
            }
            QueryType::TraditionalRag | QueryType::GraphRag => demonstration_outcome(query, query_type),
        }
    }

    /// Like `process_query`, but only for a live session token
    pub async fn process_session_query(&mut self, token: &str, query: &str, query_type: QueryType) -> QueryOutcome {
        match self.security.validate_session(token) {
            Some(user) => {
                debug!("Query from session user {}", user);
                self.process_query(query, query_type).await
            }
            None => {
                self.security.log_security_event(
                    "invalid_session",
                    serde_json::json!({"query_length": query.len()}),
                );
                QueryOutcome::failed(query, query_type, "none", INVALID_SESSION_ERROR.to_string())
            }
        }
    }

    /// Input validation and rate limiting shared by every query entry point
    fn screen_query(&mut self, query: &str) -> Result<(), &'static str> {
        if !self.security.validate_input(query, DEFAULT_MAX_INPUT_LENGTH) {
            return Err("Invalid input detected");
        }
        if !self.security.rate_limit(
            QUERY_RATE_IDENTIFIER,
            self.settings.max_queries_per_window,
            DEFAULT_RATE_WINDOW_SECS,
        ) {
            return Err("Rate limit exceeded");
        }
        Ok(())
    }

    /// Check the workspace directories and configuration files
    pub fn run_system_tests(&self) -> SystemTestReport {
        let check_paths = |names: &[&str]| -> BTreeMap<String, bool> {
            names
                .iter()
                .map(|name| (name.to_string(), self.settings.path(name).exists()))
                .collect()
        };

        SystemTestReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            system_status: self.status.state,
            required_directories: check_paths(REQUIRED_DIRECTORIES),
            configuration_files: check_paths(CONFIG_FILES),
            status: "passed".to_string(),
        }
    }

    /// Run the performance harness with its configured iteration count
    pub async fn run_cv_tests(&self) -> Result<TestReport, ComponentError> {
        let mut tester = self.tester.write().await;
        let iterations = tester.iterations();
        tester.generate_test_report(iterations).await
    }

    /// Hand a raw task to one component. A string `query` parameter is
    /// screened the same way `process_query` screens its input.
    pub async fn submit_task(&mut self, component_id: &str, task: ComponentTask) -> Result<serde_json::Value, ComponentError> {
        if let Some(query) = task.parameters.get("query").and_then(|q| q.as_str()) {
            if let Err(reason) = self.screen_query(query) {
                warn!("Rejected task {} for {}: {}", task.id, component_id, reason);
                return Err(ComponentError::ValidationError(reason.to_string()));
            }
        }

        match self.instances.get(component_id) {
            Some(instance) => instance.write().await.process_task(task).await,
            None => Err(ComponentError::ProcessingError(format!(
                "Component not found: {}", component_id
            ))),
        }
    }

    /// Snapshot metrics from every component into the metrics store
    pub async fn collect_metrics(&self) {
        self.metrics.collect_once(&self.instances).await;
    }

    pub fn get_status(&self) -> &SystemStatus {
        &self.status
    }

    pub fn get_all_instances(&self) -> &HashMap<String, Arc<RwLock<dyn Component>>> {
        &self.instances
    }

    pub fn metrics(&self) -> Arc<MetricsManager> {
        self.metrics.clone()
    }

    pub fn security(&mut self) -> &mut SecurityManager {
        &mut self.security
    }
}

fn demonstration_outcome(query: &str, query_type: QueryType) -> QueryOutcome {
    let response = format!(
        "Manufacturing Intelligence Analysis for: '{}'\n\n\
         This is a demonstration response. The {} engine is not available in this build.\n\n\
         Query type requested: {}\n\
         Processing approach: Multi-agent analysis\n\
         Confidence: 85%",
        query,
        query_type.as_str(),
        query_type.as_str()
    );

    QueryOutcome {
        query: query.to_string(),
        query_type,
        method: "Demonstration Mode".to_string(),
        response,
        confidence: DEMONSTRATION_CONFIDENCE,
        status: OutcomeStatus::Success,
        error: None,
        details: serde_json::Value::Null,
    }
}
