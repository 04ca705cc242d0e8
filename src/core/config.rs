use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::component::ComponentError;

/// Written by `setup` when no `.env.template` is present
pub const DEFAULT_ENV_CONTENT: &str = "# Tire Manufacturing Intelligence Configuration

# LLM Configuration
OLLAMA_BASE_URL=http://localhost:11434
OLLAMA_MODEL=llama3.1:8b

# System Configuration
LOG_LEVEL=INFO
DEBUG_MODE=false

# Manufacturing Configuration
TARGET_DEFECT_RATE=0.02
TARGET_OEE=0.85

# Dashboard and limits
DASHBOARD_PORT=8080
MAX_QUERIES_PER_WINDOW=60
";

/// Directories created by `setup`
pub const WORKSPACE_DIRECTORIES: &[&str] = &[
    "data/raw",
    "data/processed",
    "data/models",
    "data/reports",
    "data/logs",
    "testing/sample_images/defective",
    "testing/sample_images/good",
    "knowledge/tire_manufacturing",
    "knowledge/security_frameworks",
    "knowledge/architecture_patterns",
    "config",
    "docs",
];

/// Directories the system self-test expects to find
pub const REQUIRED_DIRECTORIES: &[&str] = &[
    "data",
    "data/logs",
    "data/models",
    "data/reports",
    "testing",
    "testing/sample_images",
    "testing/sample_images/defective",
    "testing/sample_images/good",
    "config",
    "knowledge",
    "docs",
];

/// Configuration files the system self-test expects to find
pub const CONFIG_FILES: &[&str] = &[".env", ".env.template", ".gitignore", "README.md"];

/// Runtime settings, loaded once per invocation and passed down explicitly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Workspace root every relative path hangs off
    pub root: PathBuf,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub log_level: String,
    pub debug_mode: bool,
    pub target_defect_rate: f64,
    pub target_oee: f64,
    pub dashboard_port: u16,
    /// Queries accepted per five-minute window before the caller is blocked
    pub max_queries_per_window: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.1:8b".to_string(),
            log_level: "INFO".to_string(),
            debug_mode: false,
            target_defect_rate: 0.02,
            target_oee: 0.85,
            dashboard_port: 8080,
            max_queries_per_window: 60,
        }
    }
}

impl Settings {
    /// Defaults rooted at `root`, without reading any file
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load `<root>/.env` over the defaults. A missing file is not an error.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, ComponentError> {
        let mut settings = Self::with_root(root);
        let env_path = settings.env_file();

        if !env_path.exists() {
            debug!("No .env at {}, using defaults", env_path.display());
            return Ok(settings);
        }

        let entries = dotenvy::from_path_iter(&env_path).map_err(|e| {
            ComponentError::ConfigError(format!("{}: {}", env_path.display(), e))
        })?;

        for entry in entries {
            let (key, value) = entry.map_err(|e| {
                ComponentError::ConfigError(format!("{}: {}", env_path.display(), e))
            })?;
            settings.apply(&key, &value);
        }

        Ok(settings)
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "OLLAMA_BASE_URL" => self.ollama_base_url = value.to_string(),
            "OLLAMA_MODEL" => self.ollama_model = value.to_string(),
            "LOG_LEVEL" => self.log_level = value.to_string(),
            "DEBUG_MODE" => parse_into(key, value, &mut self.debug_mode),
            "TARGET_DEFECT_RATE" => parse_into(key, value, &mut self.target_defect_rate),
            "TARGET_OEE" => parse_into(key, value, &mut self.target_oee),
            "DASHBOARD_PORT" => parse_into(key, value, &mut self.dashboard_port),
            "MAX_QUERIES_PER_WINDOW" => parse_into(key, value, &mut self.max_queries_per_window),
            _ => debug!("Ignoring unknown setting {}", key),
        }
    }

    /// Filter string for env_logger, e.g. `INFO` -> `info`
    pub fn log_filter(&self) -> String {
        if self.debug_mode {
            "debug".to_string()
        } else {
            self.log_level.to_lowercase()
        }
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn env_file(&self) -> PathBuf {
        self.path(".env")
    }

    pub fn env_template(&self) -> PathBuf {
        self.path(".env.template")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.path("data/reports")
    }

    pub fn report_path(&self) -> PathBuf {
        self.reports_dir().join("cv_test_report.json")
    }

    pub fn security_log_path(&self) -> PathBuf {
        self.path("data/logs/security.json")
    }

    pub fn sample_images_dir(&self) -> PathBuf {
        self.path("testing/sample_images")
    }
}

fn parse_into<T: std::str::FromStr>(key: &str, value: &str, slot: &mut T) {
    match value.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!("Invalid value for {}: '{}', keeping default", key, value),
    }
}
