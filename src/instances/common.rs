use std::sync::Arc;
use tokio::sync::Mutex;
use log::{warn, error, debug};
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::core::component::{
    ComponentStatus, ComponentTask, ComponentError, ComponentMetrics, ComponentConfig
};

/// Maximum number of events kept per component before the oldest half is dropped
const EVENT_LOG_LIMIT: usize = 1000;

/// Base functionality for all component instances
#[derive(Debug)]
pub struct BaseComponent {
    /// Component identifier
    pub id: String,
    /// Component type name
    pub component_type: String,
    /// Current status
    pub status: ComponentStatus,
    /// Configuration
    pub config: Option<ComponentConfig>,
    /// Performance metrics
    pub metrics: PerformanceMetrics,
    /// Log of recent events
    pub event_log: Arc<Mutex<Vec<ComponentEvent>>>,
}

/// Performance metrics tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Number of tasks processed
    pub tasks_processed: u64,
    /// Number of tasks failed
    pub tasks_failed: u64,
    /// Average processing time in ms
    pub avg_processing_time: f64,
    /// Last processing time in ms
    pub last_processing_time: f64,
    /// Custom metrics
    pub custom_metrics: HashMap<String, f64>,
    /// Last updated timestamp
    pub last_updated: DateTime<Utc>,
}

/// Component event for logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event_type: EventType,
    /// Event description
    pub description: String,
    /// Associated data
    pub data: Option<serde_json::Value>,
}

/// Types of component events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EventType {
    Initialization,
    StateChange,
    TaskProcessing,
    Error,
    Warning,
    Info,
}

impl BaseComponent {
    /// Create a new base component
    pub fn new(id: &str, component_type: &str) -> Self {
        Self {
            id: id.to_string(),
            component_type: component_type.to_string(),
            status: ComponentStatus::Initialized,
            config: None,
            metrics: PerformanceMetrics {
                tasks_processed: 0,
                tasks_failed: 0,
                avg_processing_time: 0.0,
                last_processing_time: 0.0,
                custom_metrics: HashMap::new(),
                last_updated: Utc::now(),
            },
            event_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Log a component event
    pub async fn log_event(&self, event_type: EventType, description: &str, data: Option<serde_json::Value>) {
        let event = ComponentEvent {
            timestamp: Utc::now(),
            event_type,
            description: description.to_string(),
            data,
        };

        match event.event_type {
            EventType::Error => error!("{}: {}", self.id, description),
            EventType::Warning => warn!("{}: {}", self.id, description),
            _ => debug!("{}: {}", self.id, description),
        }

        let mut log = self.event_log.lock().await;
        log.push(event);

        if log.len() > EVENT_LOG_LIMIT {
            log.drain(0..EVENT_LOG_LIMIT / 2);
        }
    }

    /// Fail unless the component is accepting work
    pub fn ensure_running(&self) -> Result<(), ComponentError> {
        match &self.status {
            ComponentStatus::Running => Ok(()),
            other => Err(ComponentError::InvalidStateError(format!(
                "{} is not running (status: {})", self.id, other
            ))),
        }
    }

    /// Record task processing time
    pub fn record_task_processing(&mut self, success: bool, processing_time_ms: f64) {
        if success {
            self.metrics.tasks_processed += 1;
        } else {
            self.metrics.tasks_failed += 1;
        }

        // Running mean over every task, failed ones included
        let total_tasks = self.metrics.tasks_processed + self.metrics.tasks_failed;
        if total_tasks > 1 {
            self.metrics.avg_processing_time = (
                self.metrics.avg_processing_time * (total_tasks - 1) as f64 + processing_time_ms
            ) / total_tasks as f64;
        } else {
            self.metrics.avg_processing_time = processing_time_ms;
        }

        self.metrics.last_processing_time = processing_time_ms;
        self.metrics.last_updated = Utc::now();
    }

    /// Set a custom metric value
    pub fn set_custom_metric(&mut self, name: &str, value: f64) {
        self.metrics.custom_metrics.insert(name.to_string(), value);
        self.metrics.last_updated = Utc::now();
    }

    /// Get recent events
    pub async fn get_recent_events(&self, limit: usize) -> Vec<ComponentEvent> {
        let log = self.event_log.lock().await;
        let start = log.len().saturating_sub(limit);
        log[start..].to_vec()
    }

    /// Get component metrics
    pub fn get_metrics(&self) -> ComponentMetrics {
        ComponentMetrics {
            timestamp: Utc::now(),
            tasks_processed: self.metrics.tasks_processed,
            tasks_failed: self.metrics.tasks_failed,
            avg_processing_time: self.metrics.avg_processing_time,
            custom_metrics: serde_json::to_value(&self.metrics.custom_metrics).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Helper function to extract task parameters
pub fn extract_task_param<T: for<'de> Deserialize<'de>>(
    task: &ComponentTask,
    param_name: &str
) -> Result<T, ComponentError> {
    if let Some(value) = task.parameters.get(param_name) {
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ComponentError::ValidationError(format!(
                "Failed to parse parameter '{}': {}", param_name, e
            ))),
        }
    } else {
        Err(ComponentError::ValidationError(format!(
            "Required parameter not found: '{}'", param_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn running_average_includes_failures() {
        let mut base = BaseComponent::new("sample", "Sample");
        base.record_task_processing(true, 10.0);
        base.record_task_processing(false, 20.0);

        assert_eq!(base.metrics.tasks_processed, 1);
        assert_eq!(base.metrics.tasks_failed, 1);
        assert!((base.metrics.avg_processing_time - 15.0).abs() < f64::EPSILON);
        assert!((base.metrics.last_processing_time - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ensure_running_rejects_idle_component() {
        let mut base = BaseComponent::new("sample", "Sample");
        assert!(matches!(base.ensure_running(), Err(ComponentError::InvalidStateError(_))));
        base.status = ComponentStatus::Running;
        assert!(base.ensure_running().is_ok());
    }

    #[test]
    fn extract_param_reports_missing_and_malformed() {
        let task = ComponentTask::new("lookup", json!({"query": "why", "iterations": "many"}));

        assert_eq!(extract_task_param::<String>(&task, "query").unwrap(), "why");
        assert!(extract_task_param::<String>(&task, "missing").is_err());
        assert!(extract_task_param::<usize>(&task, "iterations").is_err());
    }

    #[tokio::test]
    async fn event_log_is_bounded() {
        let base = BaseComponent::new("sample", "Sample");
        for i in 0..(EVENT_LOG_LIMIT + 1) {
            base.log_event(EventType::Info, &format!("event {}", i), None).await;
        }

        let events = base.get_recent_events(usize::MAX).await;
        assert_eq!(events.len(), EVENT_LOG_LIMIT + 1 - EVENT_LOG_LIMIT / 2);
        assert_eq!(events.last().unwrap().description, format!("event {}", EVENT_LOG_LIMIT));
    }
}
