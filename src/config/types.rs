use serde::Deserialize;

/// Public relay templates tried when no `routes` are configured
pub const DEFAULT_ROUTES: &[&str] = &[
    "https://api.allorigins.win/raw?url=",
    "https://corsproxy.io/?",
    "https://cors.eu.org/",
    "https://api.codetabs.com/v1/proxy?quest=",
    "https://thingproxy.freeboard.io/fetch/",
    "https://cors-proxy.htmldriven.com/?url=",
    "https://cors.zme.ink/",
    "https://cors-proxy.fringe.zone/",
    "https://cors-anywhere.herokuapp.com/",
];

/// Substring that marks a relay's own error page rather than origin content
pub const DEFAULT_ERROR_MARKER: &str = "The page is temporarily unavailable";

/// Main configuration structure for MCQ Harvest
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Pagination loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    /// Pause between consecutive pages (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: 2000,
        }
    }
}

/// Page retrieval through the relay pool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Timeout for a single route attempt (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout for a single route attempt (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// User agent sent to the relays
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Substring identifying a relay error page
    #[serde(rename = "error-marker")]
    pub error_marker: String,

    /// Relay templates (prefix, or containing `{url}`)
    pub routes: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("mcq-harvest/{}", env!("CARGO_PKG_VERSION")),
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
            routes: DEFAULT_ROUTES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Extraction service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Base URL of the generative language API
    pub endpoint: String,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Upper bound on generated tokens per page
    #[serde(rename = "max-output-tokens")]
    pub max_output_tokens: u32,

    /// Token budget for model reasoning
    #[serde(rename = "thinking-budget")]
    pub thinking_budget: u32,

    /// Per-call limit for extraction requests, independent of `[fetch]`
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "API_KEY".to_string(),
            max_output_tokens: 8192,
            thinking_budget: 2048,
            request_timeout_secs: 600,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database holding the last results
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path of the JSON export
    #[serde(rename = "export-path")]
    pub export_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./mcq-harvest.db".to_string(),
            export_path: "./scraped-mcqs.json".to_string(),
        }
    }
}
