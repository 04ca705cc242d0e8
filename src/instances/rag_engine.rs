use async_trait::async_trait;
use chrono::Utc;
use log::{info, debug};
use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::core::component::{
    Component, ComponentStatus, ComponentTask, ComponentError, ComponentMetrics, ComponentConfig
};
use crate::instances::common::{BaseComponent, EventType, extract_task_param};

pub const METHOD: &str = "Agentic RAG";
/// Overall confidence reported with every synthesized answer
pub const SYNTHESIS_CONFIDENCE: f64 = 0.87;
/// Retrieved text is cut to this many characters
const MAX_RETRIEVED_CHARS: usize = 200;

/// Mock retrieval synthesizer over a fixed three-topic knowledge base
#[derive(Debug)]
pub struct AgenticRagEngine {
    base: BaseComponent,
    /// (topic, sentence) in retrieval order
    knowledge_base: Vec<(String, String)>,
}

/// One stage of the synthesized answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasoningStep {
    pub step: u32,
    pub action: String,
    pub result: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagResult {
    pub query: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub reasoning_steps: Vec<ReasoningStep>,
    pub method: String,
    pub confidence: f64,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RagResult {
    pub fn failed(query: &str, error: &ComponentError) -> Self {
        Self {
            query: query.to_string(),
            response: String::new(),
            reasoning_steps: Vec::new(),
            method: METHOD.to_string(),
            confidence: 0.0,
            timestamp: Utc::now().to_rfc3339(),
            error: Some(error.to_string()),
        }
    }
}

fn default_knowledge_base() -> Vec<(String, String)> {
    [
        ("manufacturing", "Tire manufacturing involves curing, building, and quality control processes."),
        ("defects", "Common defects include cracks, bubbles, and wear patterns caused by process variations."),
        ("optimization", "Predictive maintenance and real-time monitoring improve efficiency by 30-50%."),
    ]
    .iter()
    .map(|(topic, text)| (topic.to_string(), text.to_string()))
    .collect()
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl AgenticRagEngine {
    pub fn new() -> Self {
        Self {
            base: BaseComponent::new("rag_engine", "AgenticRagEngine"),
            knowledge_base: default_knowledge_base(),
        }
    }

    /// Sentences containing any query word as a substring, in topic order
    pub fn retrieve(&self, query: &str) -> Vec<&str> {
        let lowered = query.to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        self.knowledge_base
            .iter()
            .filter(|(_, content)| {
                let content = content.to_lowercase();
                words.iter().any(|word| content.contains(word))
            })
            .map(|(_, content)| content.as_str())
            .collect()
    }

    /// Run the three fixed reasoning steps. Failures come back as a zero-confidence record.
    pub async fn process_complex_query(&mut self, query: &str) -> RagResult {
        let start = std::time::Instant::now();

        let result = match self.try_process(query) {
            Ok(result) => {
                if self.retrieve(query).is_empty() {
                    self.base.log_event(EventType::Warning, "No knowledge matched the query", Some(json!({"query": query}))).await;
                }
                result
            }
            Err(e) => {
                self.base.log_event(EventType::Error, &format!("Agentic RAG processing failed: {}", e), None).await;
                RagResult::failed(query, &e)
            }
        };

        self.base.record_task_processing(result.error.is_none(), start.elapsed().as_secs_f64() * 1000.0);
        result
    }

    fn try_process(&self, query: &str) -> Result<RagResult, ComponentError> {
        self.base.ensure_running()?;

        let mut steps = vec![ReasoningStep {
            step: 1,
            action: "query_analysis".to_string(),
            result: format!("Analyzed query: {}", query),
            confidence: 0.85,
        }];

        let relevant = self.retrieve(query);
        debug!("Retrieved {} documents", relevant.len());
        steps.push(ReasoningStep {
            step: 2,
            action: "knowledge_retrieval".to_string(),
            result: format!("Retrieved {} relevant documents", relevant.len()),
            confidence: 0.9,
        });

        let joined = relevant.join(" ");
        let retrieved = truncate_chars(&joined, MAX_RETRIEVED_CHARS);
        let response = format!(
            r#"
Agentic RAG Analysis for: "{query}"

Retrieved Knowledge:
{retrieved}

Multi-Step Reasoning:
1. Query analysis completed
2. Knowledge retrieval from manufacturing domain
3. Multi-agent synthesis and validation

Confidence: 87%
Processing Method: Multi-Agent Agentic RAG
"#
        );
        steps.push(ReasoningStep {
            step: 3,
            action: "synthesis".to_string(),
            result: "Generated comprehensive response".to_string(),
            confidence: SYNTHESIS_CONFIDENCE,
        });

        Ok(RagResult {
            query: query.to_string(),
            response,
            reasoning_steps: steps,
            method: METHOD.to_string(),
            confidence: SYNTHESIS_CONFIDENCE,
            timestamp: Utc::now().to_rfc3339(),
            error: None,
        })
    }
}

#[async_trait]
impl Component for AgenticRagEngine {
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
        info!("Initializing AgenticRagEngine with config: {}", config.id);
        self.base.config = Some(config);
        self.base.status = ComponentStatus::Initialized;
        self.base.log_event(
            EventType::Initialization,
            "AgenticRagEngine initialized",
            Some(json!({"topics": self.knowledge_base.len()}))
        ).await;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), ComponentError> {
        info!("Starting AgenticRagEngine");
        self.base.status = ComponentStatus::Running;
        self.base.log_event(EventType::StateChange, "AgenticRagEngine started", None).await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ComponentError> {
        info!("Shutting down AgenticRagEngine");
        self.base.status = ComponentStatus::ShuttingDown;
        self.base.log_event(EventType::StateChange, "AgenticRagEngine shutting down", None).await;
        Ok(())
    }

    async fn process_task(&mut self, task: ComponentTask) -> Result<serde_json::Value, ComponentError> {
        debug!("Processing task: {}", task.id);
        let query = extract_task_param::<String>(&task, "query")?;
        let result = self.process_complex_query(&query).await;
        Ok(serde_json::to_value(result)?)
    }

    async fn collect_metrics(&self) -> Result<ComponentMetrics, ComponentError> {
        let mut metrics = self.base.get_metrics();
        metrics.custom_metrics = json!({
            "knowledge_topics": self.knowledge_base.len(),
        });
        Ok(metrics)
    }

    fn get_info(&self) -> serde_json::Value {
        let topics: Vec<&str> = self.knowledge_base.iter().map(|(t, _)| t.as_str()).collect();
        json!({
            "id": self.base.id,
            "type": self.base.component_type,
            "status": self.base.status.to_string(),
            "method": METHOD,
            "topics": topics,
        })
    }
}

impl Default for AgenticRagEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn running_engine() -> AgenticRagEngine {
        let mut engine = AgenticRagEngine::new();
        engine.start().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn three_steps_with_fixed_confidences() {
        let mut engine = running_engine().await;
        let result = engine.process_complex_query("reduce manufacturing defects").await;

        let confidences: Vec<f64> = result.reasoning_steps.iter().map(|s| s.confidence).collect();
        assert_eq!(confidences, vec![0.85, 0.9, 0.87]);
        let actions: Vec<&str> = result.reasoning_steps.iter().map(|s| s.action.as_str()).collect();
        assert_eq!(actions, vec!["query_analysis", "knowledge_retrieval", "synthesis"]);
        assert_eq!(result.method, "Agentic RAG");
        assert_eq!(result.confidence, 0.87);
    }

    #[test]
    fn retrieval_matches_query_words_as_substrings() {
        let engine = AgenticRagEngine::new();

        // "manufacturing" hits topic 1, "defects" hits topic 2
        let hits = engine.retrieve("reduce manufacturing defects");
        assert_eq!(hits.len(), 2);
        assert!(hits[0].starts_with("Tire manufacturing"));

        assert!(engine.retrieve("zzz qqq").is_empty());
        assert!(engine.retrieve("").is_empty());
    }

    #[tokio::test]
    async fn retrieved_text_is_capped() {
        let mut engine = running_engine().await;
        // Single letters match every sentence
        let result = engine.process_complex_query("a e i").await;

        assert_eq!(result.reasoning_steps[1].result, "Retrieved 3 relevant documents");
        let section = result.response
            .split("Retrieved Knowledge:\n").nth(1).unwrap()
            .split("\n\nMulti-Step Reasoning").next().unwrap();
        assert_eq!(section.chars().count(), MAX_RETRIEVED_CHARS);
    }

    #[tokio::test]
    async fn idle_engine_reports_failure() {
        let mut engine = AgenticRagEngine::new();
        let result = engine.process_complex_query("defects").await;

        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.method, METHOD);
        assert!(result.error.is_some());
        assert!(result.reasoning_steps.is_empty());
    }
}
