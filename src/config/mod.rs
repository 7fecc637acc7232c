use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_NOTES_KEY;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "PreachingNotes";
const APP_NAME: &str = "pnotes";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Reads the config file, writing the defaults first if there is none.
    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if self.paths.config_file.exists() {
            return self.load();
        }
        let mut cfg = AppConfig::default();
        self.write_default_config(&cfg)?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let rendered = toml::to_string_pretty(cfg).context("serializing default config")?;
        fs::write(&self.paths.config_file, rendered).with_context(|| {
            format!("writing default config {}", self.paths.config_file.display())
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("PNOTES_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("PNOTES_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        Ok(Self::rooted(config_dir, config_file, data_dir))
    }

    pub fn rooted(config_dir: PathBuf, config_file: PathBuf, data_dir: PathBuf) -> Self {
        let database_path = data_dir.join("notes.db");
        Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageOptions,
    pub list: ListOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        self.storage.resolve(paths);
        if self.storage.key.trim().is_empty() {
            tracing::warn!("empty storage key in config, falling back to '{DEFAULT_NOTES_KEY}'");
            self.storage.key = DEFAULT_NOTES_KEY.to_string();
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    pub backend: StorageBackend,
    /// Storage key holding the serialized note array.
    pub key: String,
    /// SQLite file. Relative paths sit under the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            key: DEFAULT_NOTES_KEY.to_string(),
            database_path: None,
            wal_autocheckpoint: 1000,
        }
    }
}

impl StorageOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        self.database_path = match self.database_path.take() {
            Some(path) if path.as_os_str().is_empty() => None,
            Some(path) if path.is_relative() => Some(paths.data_dir.join(path)),
            other => other,
        };
    }

    /// The file the SQLite backend opens.
    pub fn database_path<'a>(&'a self, paths: &'a ConfigPaths) -> &'a Path {
        self.database_path
            .as_deref()
            .unwrap_or(&paths.database_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    /// Characters of plain-text content shown under each title (0 hides it).
    pub preview_chars: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self { preview_chars: 80 }
    }
}
