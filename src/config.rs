use crate::cli::Cli;
use crate::error::{ConfigError, ConfigResult as Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub validation: ValidationConfig,
    pub output: OutputConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
    /// Used when the sender header carries no user agent
    pub user_agent: String,
}

/// Pre-flight validation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Directory holding `cXML.dtd` and `InvoiceDetail.dtd`
    pub dtd_dir: PathBuf,
    /// DTD-validate orders as well as invoices
    pub validate_orders: bool,
    /// Parsed DTDs kept in memory
    pub max_cached_dtds: u64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (errors only)
    pub quiet: bool,
    /// Indent rendered documents
    pub pretty: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: format!("cxml-outbound/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            dtd_dir: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("cxml-outbound")
                .join("dtds"),
            validate_orders: false,
            max_cached_dtds: 16,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            quiet: false,
            pretty: true,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in the current directory, then the user config directory
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "cxml-outbound.toml",
            "cxml-outbound.json",
            ".cxml-outbound.toml",
            ".cxml-outbound.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("cxml-outbound");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        if let Some(timeout) = env.get("CXML_TIMEOUT") {
            config.network.timeout_seconds = parse_env("CXML_TIMEOUT", &timeout)?;
        }

        if let Some(user_agent) = env.get("CXML_USER_AGENT") {
            config.network.user_agent = user_agent;
        }

        if let Some(dtd_dir) = env.get("CXML_DTD_DIR") {
            config.validation.dtd_dir = PathBuf::from(dtd_dir);
        }

        if let Some(validate_orders) = env.get("CXML_VALIDATE_ORDERS") {
            config.validation.validate_orders = parse_env("CXML_VALIDATE_ORDERS", &validate_orders)?;
        }

        if let Some(verbose) = env.get("CXML_VERBOSE") {
            config.output.verbose = parse_env("CXML_VERBOSE", &verbose)?;
        }

        if let Some(quiet) = env.get("CXML_QUIET") {
            config.output.quiet = parse_env("CXML_QUIET", &quiet)?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(timeout) = cli.timeout {
            config.network.timeout_seconds = timeout;
        }

        if let Some(dtd_dir) = &cli.dtd_dir {
            config.validation.dtd_dir = dtd_dir.clone();
        }
        if cli.validate_orders {
            config.validation.validate_orders = true;
        }

        if cli.verbose || cli.quiet {
            config.output.verbose = cli.verbose;
            config.output.quiet = cli.quiet;
        }

        config
    }

    /// Merge two configurations (second takes precedence)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        base.network.timeout_seconds = override_config.network.timeout_seconds;
        if !override_config.network.user_agent.is_empty() {
            base.network.user_agent = override_config.network.user_agent;
        }

        base.validation.dtd_dir = override_config.validation.dtd_dir;
        base.validation.validate_orders = override_config.validation.validate_orders;
        base.validation.max_cached_dtds = override_config.validation.max_cached_dtds;

        base.output = override_config.output;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "User agent must not be blank".to_string(),
            ));
        }

        if config.validation.max_cached_dtds == 0 {
            return Err(ConfigError::Validation(
                "DTD cache size must be greater than 0".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }

    /// Convert configuration to Duration for network timeout
    pub fn get_timeout_duration(config: &Config) -> Duration {
        Duration::from_secs(config.network.timeout_seconds)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.network.timeout_seconds, 30);
        assert!(config.network.user_agent.starts_with("cxml-outbound/"));
        assert!(config.validation.dtd_dir.ends_with("cxml-outbound/dtds"));
        assert!(!config.validation.validate_orders);
        assert_eq!(config.validation.max_cached_dtds, 16);
        assert!(config.output.pretty);
        assert!(!config.output.verbose);
        assert!(!config.output.quiet);
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("cxml-outbound.toml");

        let toml_content = r#"
[network]
timeout_seconds = 60
user_agent = "Acme Procurement 2.1"

[validation]
dtd_dir = "/opt/cxml/dtds"
validate_orders = true
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.network.timeout_seconds, 60);
        assert_eq!(config.network.user_agent, "Acme Procurement 2.1");
        assert_eq!(config.validation.dtd_dir, PathBuf::from("/opt/cxml/dtds"));
        assert!(config.validation.validate_orders);
        // omitted keys keep their defaults
        assert_eq!(config.validation.max_cached_dtds, 16);
        assert!(config.output.pretty);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("cxml-outbound.json");

        fs::write(
            &config_path,
            r#"{ "network": { "timeout_seconds": 5 }, "output": { "pretty": false } }"#,
        )
        .unwrap();

        let config = ConfigManager::load_from_file(&config_path).await.unwrap();
        assert_eq!(config.network.timeout_seconds, 5);
        assert!(!config.output.pretty);
    }

    #[tokio::test]
    async fn test_unsupported_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "network: {}").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result.unwrap_err(), ConfigError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[network\ntimeout_seconds = ").unwrap();

        let result = ConfigManager::load_from_file(&config_path).await;
        assert!(matches!(result.unwrap_err(), ConfigError::TomlParsing(_)));
    }

    #[test]
    fn test_environment_overrides() {
        let mut mock_env = MockEnvProvider::default();
        mock_env.set("CXML_TIMEOUT", "120");
        mock_env.set("CXML_USER_AGENT", "env-agent");
        mock_env.set("CXML_DTD_DIR", "/env/dtds");
        mock_env.set("CXML_VALIDATE_ORDERS", "true");
        mock_env.set("CXML_VERBOSE", "true");

        let config =
            ConfigManager::apply_environment_overrides_with(&mock_env, Config::default()).unwrap();

        assert_eq!(config.network.timeout_seconds, 120);
        assert_eq!(config.network.user_agent, "env-agent");
        assert_eq!(config.validation.dtd_dir, PathBuf::from("/env/dtds"));
        assert!(config.validation.validate_orders);
        assert!(config.output.verbose);
    }

    #[test]
    fn test_invalid_environment_values() {
        let mut mock_env = MockEnvProvider::default();
        mock_env.set("CXML_TIMEOUT", "soon");

        let result = ConfigManager::apply_environment_overrides_with(&mock_env, Config::default());
        assert!(matches!(result.unwrap_err(), ConfigError::Environment(_)));
    }

    #[test]
    fn test_merge_with_cli() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "cxml-outbound",
            "submit",
            "order.json",
            "--url",
            "%%TEST%%",
            "--timeout",
            "90",
            "--dtd-dir",
            "/cli/dtds",
            "--validate-orders",
            "--quiet",
        ])
        .unwrap();

        let mut base = Config::default();
        base.output.verbose = true;
        let config = ConfigManager::merge_with_cli(base, &cli);

        assert_eq!(config.network.timeout_seconds, 90);
        assert_eq!(config.validation.dtd_dir, PathBuf::from("/cli/dtds"));
        assert!(config.validation.validate_orders);
        assert!(config.output.quiet);
        assert!(!config.output.verbose);
    }

    #[test]
    fn test_cli_without_overrides_keeps_file_values() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["cxml-outbound", "render", "order.json"]).unwrap();
        let mut base = Config::default();
        base.network.timeout_seconds = 12;
        base.output.verbose = true;

        let config = ConfigManager::merge_with_cli(base, &cli);
        assert_eq!(config.network.timeout_seconds, 12);
        assert!(config.output.verbose);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        config.network.timeout_seconds = 0;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.output.verbose = true;
        config.output.quiet = true;
        assert!(ConfigManager::validate_config(&config).is_err());

        let mut config = Config::default();
        config.validation.max_cached_dtds = 0;
        assert!(ConfigManager::validate_config(&config).is_err());
    }

    #[test]
    fn test_timeout_duration() {
        let config = Config::default();
        assert_eq!(
            ConfigManager::get_timeout_duration(&config),
            Duration::from_secs(30)
        );
    }
}
