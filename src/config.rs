use crate::environment::Credential;
use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MOCK_ENV: &str = "NLSH_USE_MOCK";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub use_mock: bool,
    /// Speech-to-text command for voice input; its stdout is the transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcriber_command: Option<String>,
}

impl Config {
    /// Reads the config at `path`, or defaults when the file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Environment variables override the config file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = lookup(API_KEY_ENV) {
            self.gemini_api_key = Some(api_key);
        }
        if lookup(MOCK_ENV).is_some() {
            self.use_mock = true;
        }
    }

    /// The configured key, if it is non-blank.
    pub fn credential(&self) -> Option<Credential> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(Credential::new)
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".nlp-shell").join("config.json"))
    }
}

/// Where the service credential is persisted.
pub trait ConfigProvider {
    fn load_credential(&self) -> Result<Option<Credential>>;
    fn save_credential(&self, credential: &str) -> Result<()>;
}

/// Config stored as JSON in the user's home directory.
pub struct FileConfigProvider {
    path: PathBuf,
    env_overrides: bool,
}

impl FileConfigProvider {
    /// Provider for `~/.nlp-shell/config.json` with environment overrides.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: Config::default_path()?,
            env_overrides: true,
        })
    }

    /// Provider for an explicit file; the environment is ignored.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_overrides: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config> {
        let mut config = Config::load_from_path(&self.path)?;
        if self.env_overrides {
            config.apply_env_overrides(|name| std::env::var(name).ok());
        }
        Ok(config)
    }

    pub fn show_config_info(&self) -> Result<()> {
        println!("Configuration file: {}", self.path.display());

        if self.path.exists() {
            println!("Status: Found");
        } else {
            println!("Status: Not found (using defaults)");
        }
        let config = self.load()?;
        println!("API Key: {}", if config.credential().is_some() { "Set" } else { "Not set" });
        println!("Mock mode: {}", config.use_mock);
        println!(
            "Transcriber: {}",
            config.transcriber_command.as_deref().unwrap_or("(typed input)")
        );

        println!("\nTo set API key:");
        println!("  nlsh --setup");
        println!("\nOr set environment variable:");
        println!("  export {}=<your-key>", API_KEY_ENV);

        Ok(())
    }
}

impl ConfigProvider for FileConfigProvider {
    fn load_credential(&self) -> Result<Option<Credential>> {
        Ok(self.load()?.credential())
    }

    fn save_credential(&self, credential: &str) -> Result<()> {
        // Environment values are never written back to disk.
        let mut config = Config::load_from_path(&self.path)?;
        config.gemini_api_key = Some(credential.to_string());
        config.save_to_path(&self.path)
    }
}

/// Interactive first-run setup: asks for a key and saves it.
///
/// Returns `None` when the user enters nothing; nothing is written then.
pub fn run_setup_with_io<R: BufRead, W: Write>(
    provider: &dyn ConfigProvider,
    input: &mut R,
    output: &mut W,
) -> Result<Option<Credential>> {
    writeln!(output, "First time setup - please provide your Google Gemini API key.")?;
    writeln!(output, "Get your API key from: https://makersuite.google.com/app/apikey")?;
    write!(output, "Enter your Gemini API key: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let key = line.trim();

    if key.is_empty() {
        warn!("Setup finished without an API key");
        writeln!(output)?;
        return Ok(None);
    }

    provider.save_credential(key)?;
    writeln!(output, "Configuration saved.")?;
    Ok(Some(Credential::new(key)))
}

/// Runs [`run_setup_with_io`] on stdin/stdout.
pub fn run_setup(provider: &dyn ConfigProvider) -> Result<Option<Credential>> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    run_setup_with_io(provider, &mut input, &mut output)
}

/// The stored credential, or the one entered during first-run setup.
pub fn credential_or_setup_with_io<R: BufRead, W: Write>(
    provider: &dyn ConfigProvider,
    input: &mut R,
    output: &mut W,
) -> Result<Option<Credential>> {
    match provider.load_credential()? {
        Some(credential) => Ok(Some(credential)),
        None => run_setup_with_io(provider, input, output),
    }
}

pub fn credential_or_setup(provider: &dyn ConfigProvider) -> Result<Option<Credential>> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    credential_or_setup_with_io(provider, &mut input, &mut output)
}
