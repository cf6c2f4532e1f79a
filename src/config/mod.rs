use std::fs;
use std::path::{Path, PathBuf};

use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::security::default_allowed_commands;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Bearer token remote callers must present. Compared in constant time
    /// by the gateway; never logged.
    pub auth_token: Option<String>,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Executable basenames a caller may run.
    #[serde(default = "default_allowed_commands")]
    pub allowed_commands: Vec<String>,
    /// Absolute directories a caller may read from or use as a working
    /// directory. Empty means the service refuses to start.
    #[serde(default)]
    pub allowed_paths: Vec<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            allowed_commands: default_allowed_commands(),
            allowed_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8190
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            auth_token: None,
            sandbox: SandboxConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl Config {
    /// Load `~/.guardpost/config.toml`, writing a commented default on first
    /// run. Environment overrides are applied afterwards by the caller.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .ok_or_else(|| ConfigError::Load("could not find home directory".into()))?;
        let guardpost_dir = home.join(".guardpost");
        let config_path = guardpost_dir.join("config.toml");

        if !guardpost_dir.exists() {
            fs::create_dir_all(&guardpost_dir)?;
        }

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self {
                config_path: config_path.clone(),
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&contents).map_err(|err| ConfigError::Load(err.to_string()))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let toml_str =
            toml::to_string_pretty(self).map_err(|err| ConfigError::Load(err.to_string()))?;
        fs::write(&self.config_path, toml_str)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("GUARDPOST_AUTH_TOKEN")
            && !token.is_empty()
        {
            self.auth_token = Some(token);
        }

        if let Ok(paths) = std::env::var("GUARDPOST_ALLOWED_PATHS")
            && !paths.is_empty()
        {
            self.sandbox.allowed_paths = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        if let Ok(host) = std::env::var("GUARDPOST_HOST")
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(port_str) = std::env::var("GUARDPOST_PORT")
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }
    }

    /// Startup validation for the serving path. A missing token or an empty
    /// path allow-list means the service must not come up at all — silently
    /// running with zero sandboxing is the one unacceptable failure mode.
    pub fn validate_for_serve(&self) -> Result<(), ConfigError> {
        match &self.auth_token {
            Some(token) if !token.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::Validation(
                    "auth_token is not set; set it in config.toml or GUARDPOST_AUTH_TOKEN".into(),
                ));
            }
        }
        if self.sandbox.allowed_paths.is_empty() {
            return Err(ConfigError::Validation(
                "sandbox.allowed_paths is empty; set it in config.toml or GUARDPOST_ALLOWED_PATHS"
                    .into(),
            ));
        }
        if let Some(path) = self
            .sandbox
            .allowed_paths
            .iter()
            .find(|p| !p.is_absolute())
        {
            return Err(ConfigError::Validation(format!(
                "sandbox.allowed_paths entries must be absolute, got '{}'",
                path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serveable() -> Config {
        Config {
            auth_token: Some("tok-123".into()),
            sandbox: SandboxConfig {
                allowed_commands: default_allowed_commands(),
                allowed_paths: vec![PathBuf::from("/data")],
            },
            ..Config::default()
        }
    }

    #[test]
    fn default_config_has_whitelist_but_no_paths() {
        let config = Config::default();
        assert!(config.sandbox.allowed_commands.contains(&"ls".to_string()));
        assert!(config.sandbox.allowed_paths.is_empty());
    }

    #[test]
    fn serve_validation_requires_token_and_paths() {
        assert!(Config::default().validate_for_serve().is_err());

        let mut config = serveable();
        assert!(config.validate_for_serve().is_ok());

        config.auth_token = Some("   ".into());
        assert!(config.validate_for_serve().is_err());

        let mut config = serveable();
        config.sandbox.allowed_paths.clear();
        assert!(config.validate_for_serve().is_err());
    }

    #[test]
    fn relative_allowed_paths_are_rejected() {
        let mut config = serveable();
        config.sandbox.allowed_paths.push(PathBuf::from("data"));
        let err = config.validate_for_serve().unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = serveable();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.auth_token.as_deref(), Some("tok-123"));
        assert_eq!(parsed.sandbox.allowed_paths, vec![PathBuf::from("/data")]);
    }

    #[test]
    fn comma_separated_paths_parse_like_env_override() {
        // Mirrors the GUARDPOST_ALLOWED_PATHS split without touching
        // process-global env in tests.
        let paths: Vec<PathBuf> = "/data, /var/log ,,"
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        assert_eq!(paths, vec![PathBuf::from("/data"), PathBuf::from("/var/log")]);
    }

    #[test]
    fn load_from_reads_partial_files_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "auth_token = \"t\"\n[sandbox]\nallowed_paths = [\"/data\"]\n")
            .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.auth_token.as_deref(), Some("t"));
        assert_eq!(config.gateway.port, default_port());
        assert!(config.sandbox.allowed_commands.contains(&"df".to_string()));
    }
}
