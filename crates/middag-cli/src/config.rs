//! Configuration file management for middag.
//!
//! Provides a TOML-based config file at `~/.config/middag/config.toml` and
//! a per-field resolution chain: `MIDDAG_*` env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use middag_kassalapp::{KassalappConfig, Location};
use middag_llm::OpenAiConfig;

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub kassalapp: KassalappSection,
    pub generator: GeneratorSection,
    pub server: ServerSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KassalappSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tool_rounds: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            port: DEFAULT_PORT,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the middag config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/middag` or `~/.config/middag`.
/// We intentionally ignore the platform-specific `dirs::config_dir()`
/// (which returns `~/Library/Application Support` on macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("middag");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("middag")
}

/// Return the path to the middag config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Commented template written by `middag init`.
pub const CONFIG_TEMPLATE: &str = r#"# middag configuration

[kassalapp]
# API key for https://kassal.app (required)
api_key = ""
# base_url = "https://kassal.app/api/v1"

# Restrict deal searches to stores near you. Omit to search everywhere.
# [kassalapp.location]
# latitude = 59.9139
# longitude = 10.7522
# radius_km = 5.0

[generator]
# API key for an OpenAI-compatible chat-completions backend (required)
api_key = ""
# base_url = "https://api.openai.com/v1"
# model = "gpt-4o-mini"
# temperature = 0.2
# max_tool_rounds = 8

[server]
bind = "127.0.0.1"
port = 8787
"#;

/// Write `contents` to the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(contents: &str) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // Set permissions to 0600 (owner read/write only) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct MiddagConfig {
    pub kassalapp: KassalappConfig,
    pub generator: OpenAiConfig,
    pub server: ServerSection,
}

/// Read a `MIDDAG_*` env var, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl MiddagConfig {
    /// Resolve configuration per field: `MIDDAG_*` env var > config file >
    /// default. The two API keys have no default; a missing one is an error.
    pub fn resolve() -> Result<Self> {
        let file = load_config().ok();

        let kassalapp_section = file.as_ref().map(|f| &f.kassalapp);
        let generator_section = file.as_ref().map(|f| &f.generator);

        let Some(kassalapp_key) = env_var("MIDDAG_KASSALAPP_API_KEY")
            .or_else(|| kassalapp_section.and_then(|s| s.api_key.clone()))
            .filter(|k| !k.is_empty())
        else {
            bail!(
                "kassalapp API key not found; set MIDDAG_KASSALAPP_API_KEY or run `middag init` and fill in [kassalapp] api_key"
            );
        };
        let mut kassalapp = KassalappConfig::new(kassalapp_key);
        if let Some(url) = env_var("MIDDAG_KASSALAPP_BASE_URL")
            .or_else(|| kassalapp_section.and_then(|s| s.base_url.clone()))
        {
            kassalapp.base_url = url;
        }
        kassalapp.location = kassalapp_section.and_then(|s| s.location.clone());

        let Some(generator_key) = env_var("MIDDAG_GENERATOR_API_KEY")
            .or_else(|| generator_section.and_then(|s| s.api_key.clone()))
            .filter(|k| !k.is_empty())
        else {
            bail!(
                "generator API key not found; set MIDDAG_GENERATOR_API_KEY or run `middag init` and fill in [generator] api_key"
            );
        };
        let mut generator = OpenAiConfig::new(generator_key);
        if let Some(url) = env_var("MIDDAG_GENERATOR_BASE_URL")
            .or_else(|| generator_section.and_then(|s| s.base_url.clone()))
        {
            generator.base_url = url;
        }
        if let Some(model) = env_var("MIDDAG_GENERATOR_MODEL")
            .or_else(|| generator_section.and_then(|s| s.model.clone()))
        {
            generator.model = model;
        }
        if let Some(temperature) = generator_section.and_then(|s| s.temperature) {
            generator.temperature = temperature;
        }
        if let Some(rounds) = generator_section.and_then(|s| s.max_tool_rounds) {
            generator.max_tool_rounds = rounds;
        }

        let mut server = file.map(|f| f.server).unwrap_or_default();
        if let Some(bind) = env_var("MIDDAG_BIND") {
            server.bind = bind;
        }
        if let Some(port) = env_var("MIDDAG_PORT") {
            server.port = port
                .parse()
                .context("MIDDAG_PORT is not a valid port number")?;
        }

        Ok(Self {
            kassalapp,
            generator,
            server,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
