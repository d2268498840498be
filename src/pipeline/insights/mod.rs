//! Optional prose enrichment from a chat-completion LLM.
//!
//! Every call is best-effort: failures are logged and surface as `None`,
//! so reports are always complete without the network.

pub mod flatten;
pub mod groq;
pub mod prompt;
pub mod types;

pub use flatten::*;
pub use groq::*;
pub use prompt::*;
pub use types::*;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::LlmConfig;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("GROQ_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("LLM API returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("LLM reply is not a JSON object")]
    NotAnObject,
}

/// Front door for all LLM enrichment.
pub struct Insights {
    client: Option<Box<dyn LlmClient>>,
}

impl Insights {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// No client: every request returns `None`.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    /// Groq-backed insights, or disabled when unconfigured.
    pub fn from_config(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            info!("LLM enrichment disabled");
            return Self::disabled();
        };
        match GroqClient::new(config) {
            Ok(client) => Self::new(Box::new(client)),
            Err(e) => {
                warn!(error = %e, "LLM enrichment unavailable");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Pathologist-style insights for a leaf or trunk finding.
    pub fn leaf(&self, request: &LeafInsightRequest) -> Option<Map<String, Value>> {
        info!(disease = %request.disease_name, "Requesting detailed analysis");
        self.ask("leaf", &leaf_prompt(request))
    }

    /// Technologist-style insights for a latex sample.
    pub fn latex(&self, request: &LatexInsightRequest) -> Option<Map<String, Value>> {
        info!(latex_type = %request.latex_type, "Requesting latex analysis");
        self.ask("latex", &latex_prompt(request))
    }

    fn ask(&self, topic: &str, prompt: &str) -> Option<Map<String, Value>> {
        let client = self.client.as_ref()?;
        match client.complete_json(prompt) {
            Ok(map) => Some(map),
            Err(e) => {
                warn!(topic, error = %e, "LLM analysis failed");
                None
            }
        }
    }
}

/// Insight object returned by `ai_suggestions` when the LLM gives nothing.
pub fn fallback_leaf_insights(disease_name: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(
        "diagnosis".into(),
        format!("Detected {disease_name}. Detailed AI diagnosis unavailable.").into(),
    );
    map.insert("treatment".into(), "Standard fungicide application recommended.".into());
    map.insert("prevention".into(), "Monitor regularly.".into());
    map.insert("severity_reasoning".into(), "Based on visual detection.".into());
    map.insert("tappability_advice".into(), "Proceed with caution.".into());
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LeafInsightRequest {
        LeafInsightRequest {
            disease_name: "Leaf Spot".into(),
            confidence: 91.0,
            spot_count: 12,
            color_name: "Green".into(),
        }
    }

    #[test]
    fn disabled_returns_none() {
        let insights = Insights::disabled();
        assert!(!insights.is_enabled());
        assert!(insights.leaf(&request()).is_none());
    }

    #[test]
    fn client_reply_is_returned() {
        let insights = Insights::new(Box::new(MockLlmClient::new(r#"{"diagnosis": "fungal"}"#)));
        let map = insights.leaf(&request()).unwrap();
        assert_eq!(map["diagnosis"], "fungal");
    }

    #[test]
    fn client_failure_becomes_none() {
        let insights = Insights::new(Box::new(MockLlmClient::failing()));
        assert!(insights.leaf(&request()).is_none());
    }

    #[test]
    fn missing_api_key_disables() {
        let insights = Insights::from_config(Some(&LlmConfig::default()));
        assert!(!insights.is_enabled());
        assert!(!Insights::from_config(None).is_enabled());
    }

    #[test]
    fn fallback_names_the_disease() {
        let map = fallback_leaf_insights("Powdery Mildew");
        assert_eq!(
            map["diagnosis"],
            "Detected Powdery Mildew. Detailed AI diagnosis unavailable."
        );
        assert_eq!(map.len(), 5);
    }
}
