use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, error, debug};
use serde::{Serialize, Deserialize};
use tokio::sync::{Mutex, RwLock};

use crate::core::component::{Component, ComponentMetrics};

/// Manager for collecting and storing metrics from all components
#[derive(Debug)]
pub struct MetricsManager {
    /// Historical metrics data
    metrics_history: Mutex<HashMap<String, Vec<ComponentMetrics>>>,
    /// Most recent metrics for each component
    latest_metrics: RwLock<HashMap<String, ComponentMetrics>>,
    config: MetricsConfig,
}

/// Configuration for metrics collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Collection interval in seconds
    pub collection_interval_secs: u64,
    /// Maximum history to keep per component
    pub max_history_per_component: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            collection_interval_secs: 10,
            max_history_per_component: 1000,
        }
    }
}

/// Summary metrics for the entire system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetricsSummary {
    pub timestamp: DateTime<Utc>,
    /// Mean of the per-component average processing times (ms)
    pub avg_processing_time: f64,
    pub total_tasks_processed: u64,
    pub total_tasks_failed: u64,
    pub component_highlights: HashMap<String, ComponentMetricHighlight>,
}

/// Highlight metrics for a specific component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMetricHighlight {
    pub component_id: String,
    pub tasks_processed: u64,
    pub tasks_failed: u64,
    pub avg_processing_time: f64,
}

type Components = HashMap<String, Arc<RwLock<dyn Component>>>;

impl MetricsManager {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            metrics_history: Mutex::new(HashMap::new()),
            latest_metrics: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Take one snapshot from every component
    pub async fn collect_once(&self, components: &Components) {
        debug!("Collecting metrics from all components");

        for (component_id, component) in components {
            match component.read().await.collect_metrics().await {
                Ok(metrics) => self.record(component_id, metrics).await,
                Err(e) => error!("Failed to collect metrics from {}: {}", component_id, e),
            }
        }
    }

    async fn record(&self, component_id: &str, metrics: ComponentMetrics) {
        self.latest_metrics.write().await.insert(component_id.to_string(), metrics.clone());

        let mut history = self.metrics_history.lock().await;
        let component_history = history.entry(component_id.to_string()).or_default();
        component_history.push(metrics);

        if component_history.len() > self.config.max_history_per_component {
            let excess = component_history.len() - self.config.max_history_per_component;
            component_history.drain(0..excess);
        }
    }

    /// Collect on a fixed interval until the runtime stops
    pub fn start_collection(self: Arc<Self>, components: Components) -> tokio::task::JoinHandle<()> {
        info!(
            "Starting metrics collection every {}s",
            self.config.collection_interval_secs
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.config.collection_interval_secs));
            loop {
                interval.tick().await;
                self.collect_once(&components).await;
            }
        })
    }

    pub async fn get_latest_component_metrics(&self, component_id: &str) -> Option<ComponentMetrics> {
        self.latest_metrics.read().await.get(component_id).cloned()
    }

    /// Most recent `limit` snapshots for a component, oldest first
    pub async fn get_component_history(&self, component_id: &str, limit: Option<usize>) -> Vec<ComponentMetrics> {
        let history = self.metrics_history.lock().await;

        match history.get(component_id) {
            Some(component_history) => {
                let limit = limit.unwrap_or(component_history.len());
                let skip = component_history.len().saturating_sub(limit);
                component_history[skip..].to_vec()
            }
            None => Vec::new(),
        }
    }

    pub async fn get_system_summary(&self) -> SystemMetricsSummary {
        let latest = self.latest_metrics.read().await;

        let mut total_processing_time = 0.0;
        let mut total_tasks = 0;
        let mut total_failed = 0;
        let mut component_highlights = HashMap::new();

        for (id, metrics) in latest.iter() {
            total_processing_time += metrics.avg_processing_time;
            total_tasks += metrics.tasks_processed;
            total_failed += metrics.tasks_failed;

            component_highlights.insert(id.clone(), ComponentMetricHighlight {
                component_id: id.clone(),
                tasks_processed: metrics.tasks_processed,
                tasks_failed: metrics.tasks_failed,
                avg_processing_time: metrics.avg_processing_time,
            });
        }

        SystemMetricsSummary {
            timestamp: Utc::now(),
            avg_processing_time: if latest.is_empty() {
                0.0
            } else {
                total_processing_time / latest.len() as f64
            },
            total_tasks_processed: total_tasks,
            total_tasks_failed: total_failed,
            component_highlights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instances::reasoner::ManufacturingReasoner;

    fn components() -> (Arc<RwLock<ManufacturingReasoner>>, Components) {
        let reasoner = Arc::new(RwLock::new(ManufacturingReasoner::new()));
        let mut map: Components = HashMap::new();
        map.insert("reasoner".to_string(), reasoner.clone());
        (reasoner, map)
    }

    #[tokio::test]
    async fn empty_summary() {
        let manager = MetricsManager::new(MetricsConfig::default());
        let summary = manager.get_system_summary().await;

        assert_eq!(summary.total_tasks_processed, 0);
        assert_eq!(summary.avg_processing_time, 0.0);
        assert!(summary.component_highlights.is_empty());
    }

    #[tokio::test]
    async fn history_is_trimmed() {
        let manager = MetricsManager::new(MetricsConfig {
            collection_interval_secs: 1,
            max_history_per_component: 2,
        });
        let (_, map) = components();

        for _ in 0..3 {
            manager.collect_once(&map).await;
        }

        assert_eq!(manager.get_component_history("reasoner", None).await.len(), 2);
        assert_eq!(manager.get_component_history("reasoner", Some(1)).await.len(), 1);
        assert!(manager.get_component_history("missing", None).await.is_empty());
    }

    #[tokio::test]
    async fn summary_counts_failures() {
        let manager = MetricsManager::new(MetricsConfig::default());
        let (reasoner, map) = components();

        // Never started, so this lands as a failure
        reasoner.write().await.analyze_query("defect").await;
        manager.collect_once(&map).await;

        let summary = manager.get_system_summary().await;
        assert_eq!(summary.total_tasks_failed, 1);
        assert_eq!(summary.component_highlights["reasoner"].tasks_failed, 1);
        assert!(manager.get_latest_component_metrics("reasoner").await.is_some());
    }
}
