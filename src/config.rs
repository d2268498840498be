use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "RubberSense";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent when fetching remote images.
pub const USER_AGENT: &str = "RubberSense-AI/1.0";

/// Default OpenAI-compatible chat completion endpoint (Groq).
pub const DEFAULT_LLM_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default LLM used for agronomy insights.
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

/// Default LLM request timeout.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 15;

/// Weights live under this path relative to the install directory.
const MODELS_SUBDIR: &str = "models/rubber_tree_model/weights";

/// Annotated images are written here relative to the install directory.
const OUTPUT_SUBDIR: &str = "temp_output";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "rubbersense=info,rubbersense_lib=info,warn"
}

/// Directory containing the running executable, falling back to the CWD.
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Per-user data directory, used when the install directory has no weights.
/// ~/.local/share/RubberSense on Linux, platform equivalent elsewhere.
pub fn user_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}

/// Resolve the default model directory.
///
/// Priority:
/// 1. `<install_dir>/models/rubber_tree_model/weights` if it exists
/// 2. `<user_data_dir>/models` if it exists
/// 3. `<install_dir>/models/rubber_tree_model/weights` (absent; models report unavailable)
pub fn default_models_dir() -> PathBuf {
    let beside_exe = install_dir().join(MODELS_SUBDIR);
    if beside_exe.is_dir() {
        return beside_exe;
    }
    if let Some(user) = user_data_dir().map(|d| d.join("models")) {
        if user.is_dir() {
            return user;
        }
    }
    beside_exe
}

/// Default directory for annotated output images.
pub fn default_output_dir() -> PathBuf {
    install_dir().join(OUTPUT_SUBDIR)
}

// ═══════════════════════════════════════════════════════════
// Runtime configuration
// ═══════════════════════════════════════════════════════════

/// Credentials and endpoint for the chat-completion API.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_LLM_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

/// Everything a single analysis run needs to know about its environment.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Directory holding `Leaf.onnx`, `Trunks.onnx`, `Latex.onnx`, `yolo11n-cls.onnx`.
    pub models_dir: PathBuf,
    /// Directory for annotated leaf images.
    pub output_dir: PathBuf,
    /// `None` disables LLM enrichment entirely.
    pub llm: Option<LlmConfig>,
    /// Attach the `aiInsights` digest to the result.
    pub summary: bool,
}

impl AnalyzerConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup (testable).
    ///
    /// Recognised keys: `RUBBERSENSE_MODELS_DIR`, `RUBBERSENSE_OUTPUT_DIR`,
    /// `GROQ_API_KEY`, `RUBBERSENSE_LLM_URL`, `RUBBERSENSE_LLM_MODEL`,
    /// `RUBBERSENSE_LLM_TIMEOUT_SECS`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let models_dir = non_empty("RUBBERSENSE_MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_models_dir);
        let output_dir = non_empty("RUBBERSENSE_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_output_dir);

        let timeout_secs = non_empty("RUBBERSENSE_LLM_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

        let llm = LlmConfig {
            api_key: non_empty("GROQ_API_KEY"),
            url: non_empty("RUBBERSENSE_LLM_URL").unwrap_or_else(|| DEFAULT_LLM_URL.to_string()),
            model: non_empty("RUBBERSENSE_LLM_MODEL")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Self {
            models_dir,
            output_dir,
            llm: Some(llm),
            summary: false,
        }
    }

    /// Disable LLM enrichment (all insights fall back to defaults).
    pub fn without_llm(mut self) -> Self {
        self.llm = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_name_is_rubbersense() {
        assert_eq!(APP_NAME, "RubberSense");
    }

    #[test]
    fn user_agent_identifies_analyzer() {
        assert_eq!(USER_AGENT, "RubberSense-AI/1.0");
    }

    #[test]
    fn defaults_when_environment_empty() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[]));
        let llm = config.llm.unwrap();
        assert!(llm.api_key.is_none());
        assert_eq!(llm.url, DEFAULT_LLM_URL);
        assert_eq!(llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(llm.timeout, Duration::from_secs(15));
        assert!(config.output_dir.ends_with("temp_output"));
        assert!(!config.summary);
    }

    #[test]
    fn environment_overrides_paths_and_llm() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[
            ("RUBBERSENSE_MODELS_DIR", "/opt/weights"),
            ("RUBBERSENSE_OUTPUT_DIR", "/tmp/out"),
            ("GROQ_API_KEY", "gsk_test"),
            ("RUBBERSENSE_LLM_MODEL", "llama-3.1-8b-instant"),
            ("RUBBERSENSE_LLM_TIMEOUT_SECS", "30"),
        ]));
        assert_eq!(config.models_dir, PathBuf::from("/opt/weights"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        let llm = config.llm.unwrap();
        assert_eq!(llm.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(llm.model, "llama-3.1-8b-instant");
        assert_eq!(llm.timeout, Duration::from_secs(30));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "   "),
            ("RUBBERSENSE_LLM_TIMEOUT_SECS", "zero"),
        ]));
        let llm = config.llm.unwrap();
        assert!(llm.api_key.is_none());
        assert_eq!(llm.timeout, Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS));
    }

    #[test]
    fn without_llm_clears_client_config() {
        let config = AnalyzerConfig::from_lookup(lookup_from(&[])).without_llm();
        assert!(config.llm.is_none());
    }

    #[test]
    fn default_models_dir_points_at_weights() {
        let dir = default_models_dir();
        assert!(dir.ends_with("weights") || dir.ends_with("models"));
    }
}
