//! Layered configuration for the APOD image cache.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults (the platform cache directory, `image_cache.db`),
//! 2. a config file: `apod.toml`, `apod.yaml` or `apod.json` in the platform
//!    config directory, or one given explicitly,
//! 3. `APOD_`-prefixed environment variables (`APOD_CACHE_DIR`,
//!    `APOD_DATABASE_FILE`),
//! 4. command-line overrides.

pub mod error;

use crate::error::{ErrorKind, Result};
use apod_cache::DEFAULT_DATABASE_FILE;
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

const APPLICATION: &str = "apod";
const ENV_PREFIX: &str = "APOD_";

/// Where the image cache lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the cached images and the metadata store. Must be
    /// absolute.
    pub cache_dir: PathBuf,
    /// File name of the metadata store inside `cache_dir`.
    pub database_file: String,
}

/// Values given on the command line, which beat every other source.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// Read this config file instead of looking in the platform config
    /// directory. It must exist.
    pub config_file: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Load and validate the configuration from every source.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let dirs = ProjectDirs::from("", "", APPLICATION).ok_or_raise(|| ErrorKind::NoHomeDirectory)?;
        let defaults = Self {
            cache_dir: dirs.cache_dir().join("images"),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
        };
        Self::layered(defaults, dirs.config_dir(), overrides)
    }

    fn layered(defaults: Self, config_dir: &Path, overrides: &Overrides) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(defaults));
        figment = match &overrides.config_file {
            Some(path) => merge_file(figment, path)?,
            // Missing files are skipped silently by figment.
            None => figment
                .merge(Toml::file(config_dir.join("apod.toml")))
                .merge(Yaml::file(config_dir.join("apod.yaml")))
                .merge(Json::file(config_dir.join("apod.json"))),
        };
        figment = figment.merge(Env::prefixed(ENV_PREFIX));
        if let Some(cache_dir) = &overrides.cache_dir {
            figment = figment.merge(Serialized::default("cache_dir", cache_dir));
        }
        let config: Self = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        tracing::debug!(cache_dir = %config.cache_dir.display(), database_file = %config.database_file, "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.cache_dir.is_absolute() {
            exn::bail!(ErrorKind::Invalid("cache_dir must be an absolute path"));
        }
        let mut components = Path::new(&self.database_file).components();
        if !matches!((components.next(), components.next()), (Some(Component::Normal(_)), None)) {
            exn::bail!(ErrorKind::Invalid("database_file must be a plain file name"));
        }
        Ok(())
    }

    /// Absolute path of the metadata store.
    pub fn database_path(&self) -> PathBuf {
        self.cache_dir.join(&self.database_file)
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
