use super::Settings;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// Embed the default config at compile time
pub const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const ENV_PREFIX: &str = "BULKPRESS_";

pub struct BulkpressConfig {
    figment: Figment,
}

impl BulkpressConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        // User config, then repository config
        if let Some(user) = Self::user_config_dir() {
            figment = figment
                .merge(Toml::file(user.join("config.toml")))
                .merge(Json::file(user.join("config.json")))
                .merge(Yaml::file(user.join("config.yaml")))
                .merge(Yaml::file(user.join("config.yml")));
        }
        figment = figment
            .merge(Toml::file("bulkpress.toml"))
            .merge(Json::file("bulkpress.json"))
            .merge(Yaml::file("bulkpress.yaml"))
            .merge(Yaml::file("bulkpress.yml"));

        if let Some(custom_path) = custom_config {
            if !custom_path.is_file() {
                anyhow::bail!("config file not found: {}", custom_path.display());
            }
            figment = match custom_path.extension().and_then(|e| e.to_str()) {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        }

        // Environment variables sit above every file
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        tracing::trace!("Configuration layers: {:?}", figment.metadata().collect::<Vec<_>>());
        Ok(BulkpressConfig { figment })
    }

    /// Layer a command-line value on top, e.g. `("scheduler.max_workers", 2)`
    pub fn with_override<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.figment = self.figment.merge(Serialized::default(key, value));
        self
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract::<Settings>()
            .context("invalid bulkpress configuration")
    }

    fn user_config_dir() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("bulkpress"))
    }
}
