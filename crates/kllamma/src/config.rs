//! Service configuration.
//!
//! Settings come from three layers, highest priority first: command-line
//! flags (and their environment variables), the optional `kllamma.toml`
//! file, then built-in defaults.

use anyhow::{bail, Context, Result};
use kllamma_core::{MissingReferencePolicy, ServiceSettings};
use kllamma_refiner::{RefinerConfig, RefinerSettings, RefinerType};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "kllamma.toml";

/// Environment variable holding the OpenAI API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

/// Contents of `kllamma.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Database connection string
    pub database_url: Option<String>,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub refiner: RefinerSection,
    #[serde(default)]
    pub validation: ValidationSection,
    #[serde(default)]
    pub feedback: FeedbackSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RefinerSection {
    /// `openai` or `template`
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ValidationSection {
    pub max_prompt_chars: Option<usize>,
    pub rating_min: Option<i64>,
    pub rating_max: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FeedbackSection {
    pub missing_reference: Option<MissingReferencePolicy>,
}

impl FileConfig {
    /// Load configuration from a file.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }

    /// Find the config file when none was given explicitly.
    ///
    /// Looks in the working directory first, then in the user config dir.
    pub fn discover(working_dir: &Path) -> Option<PathBuf> {
        let local = working_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("kllamma").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub refiner: Option<RefinerType>,
    pub model: Option<String>,
    pub missing_reference: Option<MissingReferencePolicy>,
    pub api_key: Option<String>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub refiner_type: RefinerType,
    pub refiner_settings: RefinerSettings,
    pub service: ServiceSettings,
}

impl AppConfig {
    /// Merge overrides over the file config.
    ///
    /// A database URL is mandatory. Without an explicit provider the refiner is
    /// `openai` when an API key is present and `template` otherwise.
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self> {
        let database_url = overrides
            .database_url
            .or(file.database_url)
            .filter(|url| !url.trim().is_empty())
            .with_context(|| {
                format!(
                    "No database URL configured. Pass --database-url, set DATABASE_URL or add database_url to {}",
                    CONFIG_FILE_NAME
                )
            })?;

        let host = overrides
            .host
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT);

        let refiner_type = match overrides.refiner {
            Some(t) => t,
            None => match file.refiner.provider.as_deref() {
                Some(provider) => provider
                    .parse::<RefinerType>()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid [refiner].provider")?,
                None if overrides.api_key.is_some() => RefinerType::OpenAi,
                None => RefinerType::Template,
            },
        };

        let defaults = ServiceSettings::default();

        let mut refiner_config = RefinerConfig::default();
        if let Some(secs) = file.refiner.timeout_secs {
            if secs == 0 {
                bail!("[refiner].timeout_secs must be greater than zero");
            }
            refiner_config = refiner_config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(max_tokens) = file.refiner.max_tokens {
            refiner_config = refiner_config.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = file.refiner.temperature {
            refiner_config = refiner_config.with_temperature(temperature);
        }

        let rating_min = file
            .validation
            .rating_min
            .unwrap_or(*defaults.rating_range.start());
        let rating_max = file
            .validation
            .rating_max
            .unwrap_or(*defaults.rating_range.end());
        if rating_min > rating_max {
            bail!(
                "[validation].rating_min ({}) is greater than rating_max ({})",
                rating_min,
                rating_max
            );
        }

        let max_prompt_chars = file
            .validation
            .max_prompt_chars
            .unwrap_or(defaults.max_prompt_chars);
        if max_prompt_chars == 0 {
            bail!("[validation].max_prompt_chars must be greater than zero");
        }

        let missing_reference = overrides
            .missing_reference
            .or(file.feedback.missing_reference)
            .unwrap_or(defaults.missing_reference);

        Ok(Self {
            database_url,
            bind_addr: bind_address(&host, port),
            refiner_type,
            refiner_settings: RefinerSettings {
                api_key: overrides.api_key,
                model: overrides.model.or(file.refiner.model),
                base_url: file.refiner.base_url,
            },
            service: ServiceSettings {
                max_prompt_chars,
                rating_range: rating_min..=rating_max,
                missing_reference,
                refiner: refiner_config,
            },
        })
    }
}

/// `host:port`, with IP literals formatted so IPv6 hosts get brackets.
fn bind_address(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{}:{}", host, port),
    }
}
