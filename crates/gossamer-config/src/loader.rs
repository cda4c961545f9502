//! Configuration loader with multi-source merging

use std::env;
use std::path::{Path, PathBuf};

use crate::{ConfigError, GossamerConfig};

/// Project config, git-tracked.
pub const PROJECT_CONFIG_FILE: &str = "gossamer.toml";

/// Local overrides, gitignored.
pub const LOCAL_CONFIG_FILE: &str = "gossamer.local.toml";

/// Prefix of the environment variables read by the loader.
const ENV_PREFIX: &str = "GOSSAMER";

/// Legacy debug switch read as an integer.
const LEGACY_DEBUG_VAR: &str = "DEBUG";

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env: Option<config::Map<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: None,
        }
    }

    /// Set the project directory
    #[must_use]
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Read variables from `vars` instead of the process environment
    #[must_use]
    pub fn with_env(mut self, vars: config::Map<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<GossamerConfig, ConfigError> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = GossamerConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Project config, then 3. local overrides
        for file in [PROJECT_CONFIG_FILE, LOCAL_CONFIG_FILE] {
            let path = self.project_dir.join(file);
            if path.exists() {
                builder = builder.add_source(
                    config::File::from(path)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 4. Environment variables (GOSSAMER_GOSSIP__INTERVAL_MS=250)
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env.clone()),
        );

        let mut gossamer_config: GossamerConfig = builder.build()?.try_deserialize()?;

        if self.legacy_debug() {
            gossamer_config.log.debug = true;
        }

        gossamer_config.validate()?;
        Ok(gossamer_config)
    }

    fn legacy_debug(&self) -> bool {
        let value = match &self.env {
            Some(vars) => vars.get(LEGACY_DEBUG_VAR).cloned(),
            None => env::var(LEGACY_DEBUG_VAR).ok(),
        };
        value.as_deref().is_some_and(parse_debug_flag)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Interprets a `DEBUG` value: any non-zero integer enables debug logging,
/// zero or anything unparsable leaves it off.
pub fn parse_debug_flag(value: &str) -> bool {
    value.trim().parse::<i64>().is_ok_and(|n| n != 0)
}
