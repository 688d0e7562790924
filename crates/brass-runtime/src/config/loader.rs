//! Assembles a [`BrassConfig`] from layered figment sources.
//!
//! Later sources win:
//!
//! 1. [`BrassConfig::default`]
//! 2. `brass.<profile>.toml` (or `config.<profile>.toml`)
//! 3. `brass.toml` (or `config.toml`)
//! 4. `BRASS_*` environment variables
//! 5. whatever was passed to [`ConfigLoader::merge`]
//!
//! Without an explicit [`ConfigLoader::file`] the working directory is tried
//! first and then the per-user directory (`~/.config/brass` on Linux); the
//! first directory holding a base file ends the lookup. An explicit file
//! replaces that lookup and is an error when missing.
//!
//! Nested keys are reached with a double underscore, so
//! `BRASS_LINKS__COOLDOWN_SECS=600` sets `links.cooldown_secs` and
//! `BRASS_DATABASE__PATH=:memory:` sets `database.path`. `BRASS_PROFILE`,
//! `BRASS_CONFIG` and `BRASS_PASSWORD` belong to the command line and are
//! never read as settings.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("prod")
//!     .file("/etc/brass/brass.toml")
//!     .load_validated()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BrassConfig;
use super::validation::validate_config;

pub const ENV_PREFIX: &str = "BRASS_";

/// Keys under [`ENV_PREFIX`] that are not settings.
const ENV_RESERVED: [&str; 3] = ["profile", "config", "password"];

/// File stems tried in each search directory, in order.
#[cfg(feature = "toml-config")]
const FILE_STEMS: [&str; 2] = ["brass", "config"];

/// Selects the `brass.<profile>.toml` overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    /// Any other name, kept lowercase.
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Case-insensitive; `dev` and `prod` are shorthands.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    fn from_env() -> Self {
        std::env::var("BRASS_PROFILE")
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder over the configuration sources; consumed by [`ConfigLoader::load`].
pub struct ConfigLoader {
    profile: Profile,
    explicit_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    read_env: bool,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Profile from `BRASS_PROFILE`, default search paths, environment on.
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            explicit_file: None,
            search_paths: Vec::new(),
            read_env: true,
            overrides: Figment::new(),
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to look in. Any explicit directory replaces the
    /// default pair.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layers a whole configuration over every other source.
    pub fn merge(mut self, config: BrassConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Extracts the merged configuration. Cross-field rules are not checked;
    /// see [`ConfigLoader::load_validated`].
    pub fn load(self) -> ConfigResult<BrassConfig> {
        let profile = self.profile.clone();
        let config: BrassConfig = self.figment()?.extract()?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            transports = config.transports.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn load_validated(self) -> ConfigResult<BrassConfig> {
        let config = self.load()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn figment(self) -> ConfigResult<Figment> {
        let defaults = Figment::from(Serialized::defaults(BrassConfig::default()));

        let mut figment = match &self.explicit_file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => {
                info!(path = %path.display(), "Reading configuration file");
                merge_file(defaults, path)?
            }
            None => self.merge_found_files(defaults),
        };

        if self.read_env {
            trace!(prefix = ENV_PREFIX, "Reading environment overrides");
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&ENV_RESERVED)
                    .split("__"),
            );
        }

        Ok(figment.merge(self.overrides))
    }

    fn directories(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("brass")))
            .collect()
    }

    #[cfg(feature = "toml-config")]
    fn merge_found_files(&self, mut figment: Figment) -> Figment {
        for dir in self.directories() {
            for stem in FILE_STEMS {
                let overlay = dir.join(format!("{stem}.{}.toml", self.profile));
                if overlay.exists() {
                    debug!(path = %overlay.display(), "Reading profile overlay");
                    figment = figment.merge(Toml::file(&overlay));
                }

                let base = dir.join(format!("{stem}.toml"));
                if base.exists() {
                    info!(path = %base.display(), "Reading configuration file");
                    return figment.merge(Toml::file(&base));
                }
            }
        }

        warn!("No brass.toml found, running on defaults");
        figment
    }

    #[cfg(not(feature = "toml-config"))]
    fn merge_found_files(&self, figment: Figment) -> Figment {
        warn!(
            paths = ?self.directories(),
            "Built without a config file format, running on defaults"
        );
        figment
    }
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}
