use std::error::Error;
use std::fmt::{Debug, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Represents the current status of a component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ComponentStatus {
    /// Component is initialized but not yet started
    Initialized,
    /// Component is running and accepting work
    Running,
    /// Component is in the process of shutting down
    ShuttingDown,
    /// Component has encountered an error
    Error(String),
}

impl Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentStatus::Initialized => write!(f, "Initialized"),
            ComponentStatus::Running => write!(f, "Running"),
            ComponentStatus::ShuttingDown => write!(f, "Shutting Down"),
            ComponentStatus::Error(err) => write!(f, "Error: {}", err),
        }
    }
}

/// Metric data collected from components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetrics {
    /// Timestamp when metrics were collected
    pub timestamp: DateTime<Utc>,
    /// Number of tasks processed successfully
    pub tasks_processed: u64,
    /// Number of tasks that ended in an error record
    pub tasks_failed: u64,
    /// Average task processing time in milliseconds
    pub avg_processing_time: f64,
    /// Component-specific metrics as key-value pairs
    pub custom_metrics: serde_json::Value,
}

/// Error type for component operations
#[derive(Debug)]
pub enum ComponentError {
    /// Error during initialization
    InitializationError(String),
    /// Error during task processing
    ProcessingError(String),
    /// Error reading or writing files
    PersistenceError(String),
    /// Input or parameter validation error
    ValidationError(String),
    /// Component not in the expected state
    InvalidStateError(String),
    /// Configuration could not be loaded
    ConfigError(String),
}

impl Display for ComponentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentError::InitializationError(msg) => write!(f, "Initialization error: {}", msg),
            ComponentError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            ComponentError::PersistenceError(msg) => write!(f, "Persistence error: {}", msg),
            ComponentError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ComponentError::InvalidStateError(msg) => write!(f, "Invalid state: {}", msg),
            ComponentError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ComponentError {}

impl From<std::io::Error> for ComponentError {
    fn from(err: std::io::Error) -> Self {
        ComponentError::PersistenceError(err.to_string())
    }
}

impl From<serde_json::Error> for ComponentError {
    fn from(err: serde_json::Error) -> Self {
        ComponentError::PersistenceError(err.to_string())
    }
}

/// Task assignment for components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTask {
    /// Unique identifier for the task
    pub id: String,
    /// Description of the task
    pub description: String,
    /// Task parameters as JSON
    pub parameters: serde_json::Value,
    /// Task creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ComponentTask {
    /// Create a task with a fresh id
    pub fn new(description: &str, parameters: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.to_string(),
            parameters,
            created_at: Utc::now(),
        }
    }
}

/// Component configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Component identifier
    pub id: String,
    /// Component display name
    pub name: String,
    /// Configuration parameters as JSON
    pub parameters: serde_json::Value,
}

impl ComponentConfig {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            parameters: serde_json::Value::Null,
        }
    }
}

/// Lifecycle shared by every engine the orchestrator drives
#[async_trait]
pub trait Component: Send + Sync + Debug {
    /// Returns the component identifier
    fn id(&self) -> &str;

    /// Returns the component type name
    fn component_type(&self) -> &str;

    /// Returns the current status of the component
    fn status(&self) -> ComponentStatus;

    /// Initialize the component with the given configuration
    async fn initialize(&mut self, config: ComponentConfig) -> Result<(), ComponentError>;

    /// Start accepting work
    async fn start(&mut self) -> Result<(), ComponentError>;

    /// Shut down the component
    async fn shutdown(&mut self) -> Result<(), ComponentError>;

    /// Process a task described by JSON parameters
    async fn process_task(&mut self, task: ComponentTask) -> Result<serde_json::Value, ComponentError>;

    /// Collect metrics from the component
    async fn collect_metrics(&self) -> Result<ComponentMetrics, ComponentError>;

    /// Get component-specific information
    fn get_info(&self) -> serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_become_persistence_errors() {
        let err: ComponentError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, ComponentError::PersistenceError(_)));
        assert_eq!(err.to_string(), "Persistence error: gone");
    }

    #[test]
    fn status_display() {
        assert_eq!(ComponentStatus::ShuttingDown.to_string(), "Shutting Down");
        assert_eq!(ComponentStatus::Error("boom".into()).to_string(), "Error: boom");
    }
}
