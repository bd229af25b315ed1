use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// CLI-level defaults stored as TOML in the platform config directory.
/// Command-line flags override anything set here.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    pub server_url: Option<String>,
    pub default_model: Option<String>,
    pub temperature: Option<f64>,
    /// Streamed delivery is the default; `stream = false` switches the
    /// chat loop to buffered turns.
    pub stream: Option<bool>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        Self::load_from_path(&Self::config_path()?)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to_path(&Self::config_path()?)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(config_path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let proj_dirs = ProjectDirs::from("org", "palaver", "palaver")
            .ok_or("could not determine a config directory for this platform")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let config = Config::load_from_path(&path).expect("load");
        assert!(config.server_url.is_none());
        assert!(config.default_model.is_none());
        assert!(config.temperature.is_none());
        assert!(config.stream.is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let config = Config {
            server_url: Some("http://10.0.0.5:8000".to_string()),
            default_model: Some("test-model".to_string()),
            temperature: Some(0.4),
            stream: Some(false),
        };
        config.save_to_path(&path).expect("save");

        let restored = Config::load_from_path(&path).expect("load");
        assert_eq!(restored.server_url.as_deref(), Some("http://10.0.0.5:8000"));
        assert_eq!(restored.default_model.as_deref(), Some("test-model"));
        assert_eq!(restored.temperature, Some(0.4));
        assert_eq!(restored.stream, Some(false));
    }
}
