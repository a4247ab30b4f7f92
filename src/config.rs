// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Configuration file loading.
//!
//! Search order:
//! 1. explicit `--config` path
//! 2. `tessera/config.toml` in the working directory
//! 3. the platform config directory
//! 4. built-in defaults
//!
//! `TESSERA_SERVICE_URL` overrides `service.base_url` whichever file was used.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::HISTORY_LIMIT;
use crate::ops::{LabelPolicy, DEFAULT_LABEL_MAX_LEN};
use crate::service::DetailLevel;

pub const SERVICE_URL_ENV: &str = "TESSERA_SERVICE_URL";
const LOCAL_CONFIG_PATH: &str = "tessera/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration file: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse TOML configuration: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub model: Option<String>,
    pub detail_level: DetailLevel,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_owned(),
            model: None,
            detail_level: DetailLevel::default(),
            timeout_secs: 120,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub label_max_len: usize,
    pub debounce_ms: u64,
    pub auto_sync: bool,
    pub plan_first: bool,
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            label_max_len: DEFAULT_LABEL_MAX_LEN,
            debounce_ms: 500,
            auto_sync: true,
            plan_first: false,
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl EditorConfig {
    pub fn label_policy(&self) -> LabelPolicy {
        LabelPolicy { max_len: self.label_max_len }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for persisted chat logs and preferences. Defaults to the platform data dir.
    pub dir: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        self.dir.clone().or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub editor: EditorConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("service.base_url must not be empty".to_owned()));
        }
        if self.editor.label_max_len == 0 {
            return Err(ConfigError::Validation("editor.label_max_len must be positive".to_owned()));
        }
        if self.editor.history_limit == 0 {
            return Err(ConfigError::Validation("editor.history_limit must be positive".to_owned()));
        }
        Ok(())
    }

    /// Apply `TESSERA_SERVICE_URL` when `value` is set and non-blank.
    pub fn apply_service_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.map(|url| url.trim().to_owned()).filter(|url| !url.is_empty()) {
            tracing::debug!(%url, "service url overridden from environment");
            self.service.base_url = url;
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tessera", "tessera")
}

/// Find and load the configuration, then apply the environment override.
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = find_config(explicit_path)?;
    config.apply_service_url_override(std::env::var(SERVICE_URL_ENV).ok());
    Ok(config)
}

fn find_config(explicit_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    if let Some(path) = explicit_path {
        tracing::info!(path = %path.display(), "loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new(LOCAL_CONFIG_PATH);
    if local_config.exists() {
        tracing::info!(path = %local_config.display(), "loading configuration from local path");
        return load_config_file(local_config);
    }

    match project_dirs() {
        Some(dirs) => {
            let system_config = dirs.config_dir().join("config.toml");
            if system_config.exists() {
                tracing::info!(path = %system_config.display(), "loading configuration from system path");
                return load_config_file(&system_config);
            }
            tracing::debug!(path = %system_config.display(), "system configuration file not found");
        }
        None => tracing::debug!("could not determine platform-specific config directory"),
    }

    tracing::debug!("no configuration file found, using defaults");
    Ok(AppConfig::default())
}

fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    AppConfig::from_toml(&content)
}
