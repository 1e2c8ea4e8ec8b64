//! Optional health advisor backed by an OpenAI-compatible chat endpoint.
//!
//! Requests are one-shot and best effort. A newer request aborts the
//! previous one and results from superseded requests are dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::AdvisoryConfig;
use crate::sim::Simulation;

const SNAPSHOT_PROCESSES: usize = 10;

const SYSTEM_PROMPT: &str = "You are a senior Linux system administrator. \
Given a JSON snapshot of a machine, reply with only a JSON object of the form \
{\"status\": \"healthy\" | \"warning\" | \"critical\", \"summary\": string, \
\"recommendations\": [string]}. Keep the summary under 60 words and give at most \
three recommendations.";

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("advisory service is disabled")]
    Disabled,
    #[error("advisory request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("advisory endpoint returned status {0}")]
    Status(u16),
    #[error("could not parse advisory response: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdvisoryStatus {
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for AdvisoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "HEALTHY"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for AdvisoryStatus {
    type Err = AdvisoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "healthy" | "ok" | "good" => Ok(Self::Healthy),
            "warning" | "degraded" => Ok(Self::Warning),
            "critical" | "error" => Ok(Self::Critical),
            other => Err(AdvisoryError::Parse(format!("unknown status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub status: AdvisoryStatus,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSummary {
    pub pid: u32,
    pub name: String,
    pub state: String,
    pub cpu: f64,
    pub memory_mb: f64,
}

/// What the advisor gets to see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub top_processes: Vec<ProcessSummary>,
    pub cpu_usage: f64,
    pub memory_usage_mb: f64,
    pub memory_total_mb: f64,
}

impl Snapshot {
    pub fn capture(sim: &Simulation) -> Self {
        let stats = &sim.world().stats;
        Self {
            top_processes: sim
                .top_processes(SNAPSHOT_PROCESSES)
                .into_iter()
                .map(|p| ProcessSummary {
                    pid: p.pid,
                    name: p.name,
                    state: p.state.to_string(),
                    cpu: (p.cpu_usage * 10.0).round() / 10.0,
                    memory_mb: p.memory_usage.round(),
                })
                .collect(),
            cpu_usage: (stats.total_cpu_usage * 10.0).round() / 10.0,
            memory_usage_mb: stats.total_memory_usage.round(),
            memory_total_mb: stats.total_memory_available,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn analyze(&self, snapshot: &Snapshot) -> Result<AnalysisResult, AdvisoryError>;
}

/// Advisor that posts chat completions over HTTP.
#[derive(Clone)]
pub struct HttpAdvisor {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
}

impl HttpAdvisor {
    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        if !config.enabled {
            return Err(AdvisoryError::Disabled);
        }
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| AdvisoryError::Parse(format!("invalid endpoint URL: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    messages: [MessagePayload<'a>; 2],
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    role: &'a str,
    content: &'a str,
}

#[async_trait]
impl Advisor for HttpAdvisor {
    async fn analyze(&self, snapshot: &Snapshot) -> Result<AnalysisResult, AdvisoryError> {
        let user = serde_json::to_string(snapshot)
            .map_err(|e| AdvisoryError::Parse(e.to_string()))?;
        let payload = ChatRequest {
            model: &self.model,
            temperature: 0.2,
            stream: false,
            messages: [
                MessagePayload {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                MessagePayload {
                    role: "user",
                    content: &user,
                },
            ],
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(endpoint = %self.endpoint, "requesting analysis");
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(AdvisoryError::Status(resp.status().as_u16()));
        }
        let value: Value = resp.json().await?;
        let content = extract_message(&value)?;
        parse_analysis(&content, Utc::now())
    }
}

fn extract_message(value: &Value) -> Result<String, AdvisoryError> {
    let choices = value
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| AdvisoryError::Parse("completion missing choices array".into()))?;
    let first = choices
        .first()
        .ok_or_else(|| AdvisoryError::Parse("completion choices empty".into()))?;
    let message = first
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| AdvisoryError::Parse("completion missing message content".into()))?;
    Ok(message.trim().to_string())
}

#[derive(Deserialize)]
struct RawAnalysis {
    status: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Parse the model's reply, tolerating markdown fences and chatter around
/// the JSON object.
pub fn parse_analysis(
    content: &str,
    analyzed_at: DateTime<Utc>,
) -> Result<AnalysisResult, AdvisoryError> {
    let start = content
        .find('{')
        .ok_or_else(|| AdvisoryError::Parse("no JSON object in reply".into()))?;
    let end = content
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| AdvisoryError::Parse("unterminated JSON object".into()))?;

    let raw: RawAnalysis = serde_json::from_str(&content[start..=end])
        .map_err(|e| AdvisoryError::Parse(e.to_string()))?;

    Ok(AnalysisResult {
        status: raw.status.parse()?,
        summary: raw.summary.trim().to_string(),
        recommendations: raw
            .recommendations
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect(),
        analyzed_at,
    })
}

/// Tracks the in-flight request so only the newest one reports back.
#[derive(Default)]
pub struct AdvisoryRequests {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl AdvisoryRequests {
    /// Start a request, aborting any still in flight. `on_done` receives the
    /// generation it was started with.
    pub fn start<F>(
        &mut self,
        advisor: Arc<dyn Advisor>,
        snapshot: Snapshot,
        on_done: F,
    ) -> u64
    where
        F: FnOnce(u64, Result<AnalysisResult, AdvisoryError>) + Send + 'static,
    {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
        let generation = self.generation;

        self.handle = Some(tokio::spawn(async move {
            let result = advisor.analyze(&snapshot).await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, generation, "analysis failed");
            }
            on_done(generation, result);
        }));
        generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            status: AdvisoryStatus::Warning,
            summary: "Memory pressure rising".to_string(),
            recommendations: vec!["Restart java".to_string()],
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn parses_plain_json() {
        let now = Utc::now();
        let result = parse_analysis(
            r#"{"status":"healthy","summary":"All good.","recommendations":[]}"#,
            now,
        )
        .unwrap();
        assert_eq!(result.status, AdvisoryStatus::Healthy);
        assert_eq!(result.summary, "All good.");
        assert!(result.recommendations.is_empty());
        assert_eq!(result.analyzed_at, now);
    }

    #[test]
    fn parses_fenced_json() {
        let reply = "Here you go:\n```json\n{\n  \"status\": \"CRITICAL\",\n  \"summary\": \"CPU pegged\",\n  \"recommendations\": [\"kill node\", \" \"]\n}\n```";
        let result = parse_analysis(reply, Utc::now()).unwrap();
        assert_eq!(result.status, AdvisoryStatus::Critical);
        assert_eq!(result.recommendations, vec!["kill node".to_string()]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_analysis("no idea", Utc::now()),
            Err(AdvisoryError::Parse(_))
        ));
        assert!(matches!(
            parse_analysis(r#"{"status":"sleepy"}"#, Utc::now()),
            Err(AdvisoryError::Parse(_))
        ));
    }

    #[test]
    fn extracts_first_choice() {
        let value = json!({"choices": [{"message": {"content": "  {\"status\":\"ok\"} "}}]});
        assert_eq!(extract_message(&value).unwrap(), "{\"status\":\"ok\"}");
        assert!(extract_message(&json!({"choices": []})).is_err());
    }

    #[test]
    fn disabled_config_yields_no_client() {
        let config = AdvisoryConfig::default();
        assert!(matches!(
            HttpAdvisor::from_config(&config),
            Err(AdvisoryError::Disabled)
        ));

        let enabled = AdvisoryConfig {
            enabled: true,
            ..AdvisoryConfig::default()
        };
        assert!(HttpAdvisor::from_config(&enabled).is_ok());
    }

    #[test]
    fn snapshot_lists_busiest_processes() {
        let sim = Simulation::new(Config::default(), Some(2));
        let snapshot = Snapshot::capture(&sim);
        assert_eq!(snapshot.top_processes.len(), SNAPSHOT_PROCESSES);
        assert!(snapshot
            .top_processes
            .windows(2)
            .all(|w| w[0].cpu >= w[1].cpu));
        assert_eq!(snapshot.memory_total_mb, sim.world().stats.total_memory_available);
    }

    #[tokio::test]
    async fn newest_request_wins() {
        let mut first = MockAdvisor::new();
        first.expect_analyze().returning(|_| Ok(sample()));
        let mut second = MockAdvisor::new();
        second.expect_analyze().returning(|_| Err(AdvisoryError::Status(503)));

        let sim = Simulation::new(Config::default(), Some(9));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut requests = AdvisoryRequests::default();

        let tx1 = tx.clone();
        let g1 = requests.start(Arc::new(first), Snapshot::capture(&sim), move |g, r| {
            let _ = tx1.send((g, r.is_ok()));
        });
        let g2 = requests.start(Arc::new(second), Snapshot::capture(&sim), move |g, r| {
            let _ = tx.send((g, r.is_ok()));
        });

        assert!(g2 > g1);
        assert!(!requests.is_current(g1));
        assert!(requests.is_current(g2));

        // Only results tagged with the current generation count.
        let mut current = Vec::new();
        while let Some((generation, ok)) = rx.recv().await {
            if requests.is_current(generation) {
                current.push(ok);
            }
        }
        assert_eq!(current, vec![false]);
    }
}
