use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::tools::Surface;

/// Default backend base URL (the `/api` prefix is added per request)
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8787";

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_ADMIN_PORT: u16 = 8001;
pub const DEFAULT_MCP_PATH: &str = "/mcp";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub backend: BackendConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

impl BackendConfig {
    /// Both access credentials, if both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            None
        } else {
            Some((&self.client_id, &self.client_secret))
        }
    }
}

/// How the MCP server talks to agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

impl std::str::FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(format!("Unknown transport '{}' (expected stdio or http)", other)),
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Bind settings for the HTTP transport. The user surface listens on `port`,
/// the admin surface on `admin_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub admin_port: u16,
    pub path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            path: DEFAULT_MCP_PATH.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn port_for(&self, surface: Surface) -> u16 {
        match surface {
            Surface::Admin => self.admin_port,
            Surface::User | Surface::All => self.port,
        }
    }

    /// Endpoint path with exactly one leading slash
    pub fn mount_path(&self) -> String {
        format!("/{}", self.path.trim().trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub surface: Surface,
    pub transport: Transport,
    pub name: Option<String>,
    pub session_id: Option<String>,
    pub http: HttpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            surface: Surface::User,
            transport: Transport::Stdio,
            name: None,
            session_id: None,
            http: HttpConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            backend: BackendConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Outcome of a config load. Logging is not up yet while loading, so the
/// caller logs `source` and `warnings` once it is.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
        let mut loaded = Self::load_file(config_path)?;
        loaded.config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(loaded)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            let config =
                Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))?;
            return Ok(LoadedConfig {
                config,
                source: Some(path.clone()),
                warnings: Vec::new(),
            });
        }

        let project_name = env!("CARGO_PKG_NAME");
        let mut candidates = Vec::new();
        // Primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(project_name).join(format!("{}.yml", project_name)));
        }
        // Fallback location: ./<project>.yml
        candidates.push(PathBuf::from(format!("{}.yml", project_name)));

        Ok(Self::load_first(&candidates))
    }

    /// First candidate that exists and parses; broken files are skipped with a warning
    fn load_first(candidates: &[PathBuf]) -> LoadedConfig {
        let mut warnings = Vec::new();
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: Some(path.clone()),
                        warnings,
                    };
                }
                Err(e) => warnings.push(format!("Failed to load config from {}: {:#}", path.display(), e)),
            }
        }

        LoadedConfig {
            config: Self::default(),
            source: None,
            warnings,
        }
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let port = |key: &str, value: String| {
            value
                .trim()
                .parse::<u16>()
                .map_err(|e| eyre::eyre!("Invalid {} '{}': {}", key, value, e))
        };

        if let Some(url) = lookup("MEMORY_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Some(id) = lookup("CF_ACCESS_CLIENT_ID") {
            self.backend.client_id = id;
        }
        if let Some(secret) = lookup("CF_ACCESS_CLIENT_SECRET") {
            self.backend.client_secret = secret;
        }
        if let Some(session_id) = lookup("MEMORY_SESSION_ID") {
            self.server.session_id = Some(session_id);
        }
        if let Some(surface) = lookup("MEMORY_GATEWAY_SURFACE") {
            self.server.surface = surface
                .parse()
                .map_err(|e| eyre::eyre!("Invalid MEMORY_GATEWAY_SURFACE: {}", e))?;
        }
        if let Some(transport) = lookup("MEMORY_GATEWAY_TRANSPORT") {
            self.server.transport = transport
                .parse()
                .map_err(|e| eyre::eyre!("Invalid MEMORY_GATEWAY_TRANSPORT: {}", e))?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.http.host = host;
        }
        if let Some(value) = lookup("PORT") {
            self.server.http.port = port("PORT", value)?;
        }
        if let Some(value) = lookup("ADMIN_PORT") {
            self.server.http.admin_port = port("ADMIN_PORT", value)?;
        }
        if let Some(path) = lookup("MCP_PATH") {
            self.server.http.path = path;
        }
        Ok(())
    }
}
