use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input, Password};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use vulncheck_client_core::ClientConfig;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub default_format: String,
    pub color_enabled: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            color_enabled: true,
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    #[allow(dead_code)]
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Get the default XDG-compliant configuration path
    fn default_config_path() -> PathBuf {
        // Check for XDG_CONFIG_HOME override first (Linux/macOS)
        #[cfg(not(target_os = "windows"))]
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg_config).join("vulncheck/config.toml");
        }

        #[cfg(target_os = "linux")]
        {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config/vulncheck/config.toml")
        }

        #[cfg(target_os = "macos")]
        {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Library/Application Support/vulncheck/config.toml")
        }

        #[cfg(target_os = "windows")]
        {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vulncheck\\config.toml")
        }
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed("VULNCHECK_").split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let parts: Vec<&str> = key.split('.').collect();
        let mut current = &value;

        for part in parts {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Float(f) => Ok(f.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.validate_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        if parts.is_empty() {
            anyhow::bail!("Empty key");
        }

        let mut current = &mut config;
        for (i, part) in parts.iter().enumerate() {
            if i == parts.len() - 1 {
                if let toml::Value::Table(table) = current {
                    let parsed_value = self.parse_config_value(key, value)?;
                    table.insert(part.to_string(), parsed_value);
                } else {
                    anyhow::bail!("Cannot set value on non-table");
                }
            } else {
                if let toml::Value::Table(table) = current {
                    if !table.contains_key(*part) {
                        table.insert(part.to_string(), toml::Value::Table(toml::map::Map::new()));
                    }
                    current = table.get_mut(*part).unwrap();
                } else {
                    anyhow::bail!("Invalid key path: expected table at '{}'", part);
                }
            }
        }

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(&self.config_path, toml_string)?;

        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    /// Recursively collect all key-value pairs from TOML
    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Float(f) => items.push((prefix, f.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            _ => {}
        }
    }

    /// Validate a configuration value
    fn validate_config_value(&self, key: &str, value: &str) -> Result<()> {
        match key {
            "client.base_url" => {
                if value.trim().is_empty() {
                    anyhow::bail!("base_url must not be empty");
                }
            }
            "client.max_concurrent_lookups" => {
                let limit: usize = value
                    .parse()
                    .context("max_concurrent_lookups must be a positive integer")?;
                if limit == 0 {
                    anyhow::bail!("max_concurrent_lookups must be at least 1");
                }
            }
            "client.request_timeout_secs" => {
                let timeout: u64 = value
                    .parse()
                    .context("request_timeout_secs must be a positive integer")?;
                if timeout == 0 {
                    anyhow::bail!("request_timeout_secs must be greater than 0");
                }
            }
            "client.premium_api" | "output.color_enabled" => {
                let _: bool = value.parse().context("Value must be 'true' or 'false'")?;
            }
            "output.default_format" => {
                if !matches!(value, "text" | "json") {
                    anyhow::bail!("default_format must be 'text' or 'json'");
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Parse a value to the appropriate TOML type
    fn parse_config_value(&self, key: &str, value: &str) -> Result<toml::Value> {
        match key {
            k if k.ends_with("_secs") || k.ends_with("_lookups") => {
                let num: i64 = value.parse().context("Expected integer value")?;
                Ok(toml::Value::Integer(num))
            }
            k if k.ends_with("_enabled") || k.ends_with("premium_api") => {
                let bool_val: bool = value
                    .parse()
                    .context("Expected boolean value (true/false)")?;
                Ok(toml::Value::Boolean(bool_val))
            }
            // Secrets and URLs stay strings even when they look numeric
            k if k == "client.api_key" || k == "client.base_url" => {
                Ok(toml::Value::String(value.to_string()))
            }
            _ => {
                if let Ok(b) = value.parse::<bool>() {
                    Ok(toml::Value::Boolean(b))
                } else if let Ok(i) = value.parse::<i64>() {
                    Ok(toml::Value::Integer(i))
                } else if let Ok(f) = value.parse::<f64>() {
                    Ok(toml::Value::Float(f))
                } else {
                    Ok(toml::Value::String(value.to_string()))
                }
            }
        }
    }
}

/// Get the layered configuration
pub fn get_config() -> Result<AppConfig, Box<figment::Error>> {
    ConfigManager::new()
        .load()
        .map_err(|e| Box::new(figment::Error::from(e.to_string())))
}

/// Interactive setup wizard for the API credential and subscription tier
pub async fn interactive_init(force: bool) -> Result<()> {
    println!("{}", "VulnCheck CLI Setup".bold());
    println!("{}", "===================".bold());
    println!();

    let mut config_mgr = ConfigManager::new();
    let current = config_mgr.load().ok();

    let already_configured = current
        .as_ref()
        .map(|c| !c.client.api_key.trim().is_empty())
        .unwrap_or(false);

    if !force && already_configured {
        let reconfigure = Confirm::new()
            .with_prompt("Configuration already exists. Reconfigure?")
            .default(false)
            .interact()
            .context("Failed to read input")?;

        if !reconfigure {
            println!("Setup cancelled.");
            return Ok(());
        }
    }

    println!("This tool requires:");
    println!("  • A VulnCheck account (create at https://vulncheck.com)");
    println!("  • An API token (generate at https://vulncheck.com/token)");
    println!();

    let default_base = current
        .as_ref()
        .map(|c| c.client.base_url.clone())
        .unwrap_or_else(|| vulncheck_client_core::DEFAULT_BASE_URL.to_string());

    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(default_base)
        .interact_text()
        .context("Failed to read base URL")?;

    let api_key = Password::new()
        .with_prompt("API key")
        .interact()
        .context("Failed to read API key")?;

    let premium = Confirm::new()
        .with_prompt("Do you have a premium subscription?")
        .default(false)
        .interact()
        .context("Failed to read subscription tier")?;

    config_mgr.set("client.base_url", &base_url)?;
    config_mgr.set("client.api_key", &api_key)?;
    config_mgr.set("client.premium_api", if premium { "true" } else { "false" })?;

    println!();
    println!("{}", "✓ Configuration saved".green());
    println!();
    println!("You can now use:");
    println!("  vulncheck lookup <value>...  - Look up indicators");
    println!("  vulncheck details <cve>      - Show an NVD record");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_in(dir: &TempDir) -> ConfigManager {
        ConfigManager::with_path(dir.path().join("config.toml"))
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_in(&dir);

        manager.set("client.max_concurrent_lookups", "5").unwrap();
        assert_eq!(manager.get("client.max_concurrent_lookups").unwrap(), "5");
    }

    #[test]
    fn test_api_key_stays_a_string() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_in(&dir);

        manager.set("client.api_key", "12345").unwrap();
        let written = fs::read_to_string(manager.get_config_path()).unwrap();
        assert!(written.contains("api_key = \"12345\""));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_in(&dir);

        assert!(manager.set("client.max_concurrent_lookups", "0").is_err());
    }

    #[test]
    fn test_bad_boolean_rejected() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager_in(&dir);

        assert!(manager.set("client.premium_api", "maybe").is_err());
    }

    #[test]
    fn test_list_includes_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir);

        let items = manager.list().unwrap();
        assert!(
            items
                .iter()
                .any(|(key, _)| key == "client.max_concurrent_lookups")
        );
        assert!(items.iter().any(|(key, _)| key == "output.default_format"));
    }

    #[test]
    fn test_unknown_key_errors_on_get() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir);

        assert!(manager.get("client.no_such_key").is_err());
    }
}
