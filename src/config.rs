//! User configuration.
//!
//! Read from `<config dir>/treewatch/config.toml`, overridable per key with
//! `TREEWATCH_<KEY>` environment variables (`TREEWATCH_MAX_CONCURRENT=4`).
//! Every key is optional.
//!
//! ```toml
//! max-concurrent = 8
//! freshness-secs = 5
//! command-timeout-secs = 10
//! refresh-policy = "blocking"   # or "stale-while-revalidate"
//! git-program = "git"
//! roots-file = "/home/me/.config/treewatch/roots.toml"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Case, Config, ConfigError, Environment, File, FileFormat, Map};
use etcetera::base_strategy::{BaseStrategy, choose_base_strategy};
use serde::{Deserialize, Serialize};

use crate::status::{DEFAULT_MAX_CONCURRENT, RefreshPolicy};

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "treewatch";
pub const CONFIG_FILE: &str = "config.toml";
pub const ROOTS_FILE: &str = "roots.toml";
/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "TREEWATCH_CONFIG_PATH";
const ENV_PREFIX: &str = "TREEWATCH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Roots resolved concurrently during a refresh.
    pub max_concurrent: usize,
    /// How long a cached status counts as fresh.
    pub freshness_secs: u64,
    /// Per git invocation.
    pub command_timeout_secs: u64,
    pub refresh_policy: RefreshPolicy,
    pub git_program: String,
    /// Defaults to `roots.toml` next to the config file.
    pub roots_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            freshness_secs: 5,
            command_timeout_secs: 10,
            refresh_policy: RefreshPolicy::default(),
            git_program: "git".to_string(),
            roots_file: None,
        }
    }
}

impl EngineConfig {
    /// Load from `path` (or the default location) and the environment.
    ///
    /// A missing file is not an error; an unparsable one is.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// [`load`](Self::load) reading `TREEWATCH_*` overrides from `env`
    /// instead of the process environment when given.
    fn load_with_env(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        let mut builder = Config::builder();
        if let Some(path) = &path {
            log::debug!("loading config from {}", path.display());
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .convert_case(Case::Kebab)
                .try_parsing(true)
                .source(env),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        if config.roots_file.is_none() {
            config.roots_file = path
                .as_deref()
                .and_then(Path::parent)
                .map(|dir| dir.join(ROOTS_FILE));
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "command-timeout-secs must be at least 1".into(),
            ));
        }
        if self.git_program.trim().is_empty() {
            return Err(ConfigError::Message("git-program must not be empty".into()));
        }
        Ok(())
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Where tracked roots are persisted, if a location could be determined.
    pub fn roots_file_path(&self) -> Option<PathBuf> {
        self.roots_file
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join(ROOTS_FILE)))
    }
}

/// `$TREEWATCH_CONFIG_PATH`, else `<config dir>/treewatch/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

fn config_dir() -> Option<PathBuf> {
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join(APP_DIR))
}
