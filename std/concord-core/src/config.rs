//!
//! Configuration
//!
//! Parses `concord.toml`. Every section and field is optional; missing
//! values fall back to the defaults below.
//!
//! ## Example concord.toml
//!
//! ```toml
//! [diagnostics]
//! enabled = true
//! monitor = false
//!
//! [mailbox]
//! capacity = 10
//! priority = "medium"
//!
//! [threads]
//! registry_capacity = 64
//!
//! [generator]
//! min_delay_ms = 1000
//! max_delay_ms = 3000
//! seed = 836939
//! seed_increment = 3691
//! ```
//!

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::diagnostics::{self, Category, TracingSink};
use crate::errors::ConfigError;

pub const CONFIG_FILE_NAME: &str = "concord.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub diagnostics: DiagnosticsConfig,
    pub mailbox: MailboxConfig,
    pub threads: ThreadConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub thread: bool,
    pub monitor: bool,
    pub condition: bool,
    pub mailbox: bool,
    pub linda: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            thread: true,
            monitor: true,
            condition: true,
            mailbox: true,
            linda: true,
        }
    }
}

impl DiagnosticsConfig {
    pub fn category_enabled(&self, category: Category) -> bool {
        match category {
            Category::Thread => self.thread,
            Category::Monitor => self.monitor,
            Category::Condition => self.condition,
            Category::Mailbox => self.mailbox,
            Category::Linda => self.linda,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MailboxConfig {
    pub capacity: usize,
    /// Default put priority by name: very_high, high, medium, low, very_low
    pub priority: String,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            priority: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ThreadConfig {
    pub registry_capacity: usize,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self { registry_capacity: 64 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub seed: u64,
    pub seed_increment: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            seed: 836939,
            seed_increment: 3691,
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox.capacity == 0 {
            return Err(ConfigError::Invalid(
                "mailbox.capacity must be at least 1".to_string(),
            ));
        }
        if self.threads.registry_capacity == 0 {
            return Err(ConfigError::Invalid(
                "threads.registry_capacity must be at least 1".to_string(),
            ));
        }
        if self.generator.min_delay_ms > self.generator.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "generator.min_delay_ms ({}) exceeds generator.max_delay_ms ({})",
                self.generator.min_delay_ms, self.generator.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Install or remove the tracing sink and set the per-category switches
    pub fn apply_diagnostics(&self) {
        if !self.diagnostics.enabled {
            diagnostics::uninstall();
            return;
        }
        for category in Category::ALL {
            diagnostics::set_enabled(category, self.diagnostics.category_enabled(category));
        }
        diagnostics::install(Arc::new(TracingSink));
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Walk up from `start` looking for a `concord.toml`
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }

        current = current.parent()?;
    }
}
