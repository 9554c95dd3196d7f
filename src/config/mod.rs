use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transcribe::timedtext::DEFAULT_TIMED_TEXT_URL;
use crate::transport::{TransportOptions, DEFAULT_PROXY_CHECK_URL, DEFAULT_PROXY_URL};

const CONFIG_DIR_NAME: &str = "transcript-scraper";
const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scraper settings
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Root of the project tree
    pub output_root: PathBuf,

    /// Transcript language code
    pub language: String,

    /// Netscape cookie jar, loaded when present
    pub cookie_file: Option<PathBuf>,

    /// Route requests through the SOCKS proxy
    pub use_proxy: bool,

    pub proxy_url: String,

    /// Page used to confirm the proxy is a Tor exit
    pub proxy_check_url: String,

    pub proxy_check_timeout_secs: u64,

    /// Legacy timed-text endpoint used as the last fallback
    pub timed_text_url: String,

    pub timed_text_timeout_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            language: "id".to_string(),
            cookie_file: Some(PathBuf::from("cookies.txt")),
            use_proxy: true,
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            proxy_check_url: DEFAULT_PROXY_CHECK_URL.to_string(),
            proxy_check_timeout_secs: 5,
            timed_text_url: DEFAULT_TIMED_TEXT_URL.to_string(),
            timed_text_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default location), writing
    /// defaults there when the file does not exist yet
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs_err::read_to_string(config_path).context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            tracing::debug!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Save configuration to `config_path`
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let scraper = &self.scraper;

        if scraper.language.trim().is_empty() {
            anyhow::bail!("Transcript language must not be empty");
        }

        if scraper.output_root.as_os_str().is_empty() {
            anyhow::bail!("Output root must be configured");
        }

        if scraper.proxy_check_timeout_secs == 0 || scraper.timed_text_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be at least one second");
        }

        url::Url::parse(&scraper.timed_text_url)
            .with_context(|| format!("Invalid timed-text URL: {}", scraper.timed_text_url))?;

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        let scraper = &self.scraper;
        println!("Current Configuration:");
        println!("  Output Root: {}", scraper.output_root.display());
        println!("  Language: {}", scraper.language);
        match &scraper.cookie_file {
            Some(path) => println!("  Cookie File: {}", path.display()),
            None => println!("  Cookie File: (none)"),
        }
        println!("  Use Proxy: {}", scraper.use_proxy);
        if scraper.use_proxy {
            println!("  Proxy URL: {}", scraper.proxy_url);
        }
        println!("  Timed-text URL: {}", scraper.timed_text_url);
    }

    /// Transport settings derived from this configuration
    pub fn transport_options(&self) -> TransportOptions {
        let scraper = &self.scraper;
        TransportOptions {
            cookie_file: scraper.cookie_file.clone(),
            use_proxy: scraper.use_proxy,
            proxy_url: scraper.proxy_url.clone(),
            proxy_check_url: scraper.proxy_check_url.clone(),
            proxy_check_timeout: Duration::from_secs(scraper.proxy_check_timeout_secs),
        }
    }
}
