use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::provider::Provider;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Gemini.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_model(model: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.default_model = Some(model.to_string());
        config.save()
    }

    pub fn save_provider(provider: Provider) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.provider = Some(provider.as_str().to_string());
        config.save()
    }

    pub fn save_api_key(provider: Provider, key: &str) -> Result<()> {
        let mut config = Self::load().unwrap_or_else(|_| Self::new());
        config.set_api_key(provider, key);
        config.save()
    }

    pub fn set_api_key(&mut self, provider: Provider, key: &str) {
        let key = Some(key.trim().to_string());
        match provider {
            Provider::Gemini => self.gemini_api_key = key,
            Provider::Claude => self.claude_api_key = key,
            Provider::OpenAI => self.openai_api_key = key,
            Provider::Ollama => {}
        }
    }

    /// Configured provider, falling back to Gemini.
    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Gemini)
    }

    /// Stored model when it was saved for `provider`'s family, otherwise the
    /// provider default.
    pub fn model_for(&self, provider: Provider) -> String {
        match &self.default_model {
            Some(model) if self.provider() == provider => model.clone(),
            _ => provider.default_model().to_string(),
        }
    }

    fn stored_key(&self, provider: Provider) -> Option<&String> {
        match provider {
            Provider::Gemini => self.gemini_api_key.as_ref(),
            Provider::Claude => self.claude_api_key.as_ref(),
            Provider::OpenAI => self.openai_api_key.as_ref(),
            Provider::Ollama => None,
        }
    }

    fn env_key(provider: Provider, env: &impl Fn(&str) -> Option<String>) -> Option<String> {
        let from_env = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        match provider {
            Provider::Gemini => from_env("GEMINI_API_KEY").or_else(|| from_env("GOOGLE_API_KEY")),
            other => other.key_env_var().and_then(from_env),
        }
    }

    /// API key for `provider`: environment first, then the config file.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        self.api_key_with(provider, &process_env)
    }

    fn api_key_with(&self, provider: Provider, env: &impl Fn(&str) -> Option<String>) -> Option<String> {
        Self::env_key(provider, env).or_else(|| {
            self.stored_key(provider)
                .filter(|k| !k.trim().is_empty())
                .cloned()
        })
    }

    /// Returns the source of the API key for a provider: "env", "config", "local", or None
    pub fn key_source(&self, provider: Provider) -> Option<&'static str> {
        self.key_source_with(provider, &process_env)
    }

    fn key_source_with(
        &self,
        provider: Provider,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Option<&'static str> {
        if !provider.needs_key() {
            Some("local")
        } else if Self::env_key(provider, env).is_some() {
            Some("env")
        } else if self.stored_key(provider).is_some_and(|k| !k.trim().is_empty()) {
            Some("config")
        } else {
            None
        }
    }

    pub fn ollama_url(&self) -> String {
        self.ollama_url_with(&process_env)
    }

    fn ollama_url_with(&self, env: &impl Fn(&str) -> Option<String>) -> String {
        env("OLLAMA_HOST")
            .filter(|v| !v.trim().is_empty())
            .map(|host| {
                if host.starts_with("http") {
                    host
                } else {
                    format!("http://{}", host)
                }
            })
            .or_else(|| self.ollama_url.clone())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("readmesmith"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
