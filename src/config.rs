//! Credentials, settings and the working copy the workflows operate on.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;

pub const API_KEY: &str = "NEON_API_KEY";
pub const PROJECT_ID: &str = "NEON_PROJECT_ID";
pub const API_URL: &str = "NEON_API_URL";
pub const DATABASE_NAME: &str = "NEON_DATABASE_NAME";
pub const ROLE_NAME: &str = "NEON_ROLE_NAME";
pub const READY_TIMEOUT: &str = "NEONSYNC_READY_TIMEOUT_SECS";
pub const READY_INTERVAL: &str = "NEONSYNC_READY_INTERVAL_MS";

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const PRODUCTION_DATABASE_URL: &str = "PRODUCTION_DATABASE_URL";
pub const DEVELOPMENT_DATABASE_URL: &str = "DEVELOPMENT_DATABASE_URL";
pub const ORIGINAL_DATABASE_URL: &str = "ORIGINAL_DATABASE_URL";

pub const DEFAULT_API_URL: &str = "https://console.neon.tech/api/v2";
pub const DEFAULT_DATABASE: &str = "neondb";
pub const DEFAULT_ROLE: &str = "neondb_owner";
pub const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not set\n  {hint}")]
    Missing { key: &'static str, hint: &'static str },
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to read {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
}

/// How aggressively workflows rewrite `DATABASE_URL` once the remote side is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvUpdate {
    /// Write the new connection string into the env file
    #[default]
    Auto,
    /// Only print instructions, never touch the env file
    Manual,
}

impl FromStr for EnvUpdate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("Invalid env update mode: {s}")),
        }
    }
}

impl fmt::Display for EnvUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// The git working copy and its env file, passed explicitly to every workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub env_file: PathBuf,
}

impl Workspace {
    /// A relative `env_file` is resolved against `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, env_file: Option<&Path>) -> Self {
        let root = root.into();
        let env_file = match env_file {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => root.join(path),
            None => root.join(DEFAULT_ENV_FILE),
        };
        Self { root, env_file }
    }
}

/// Key lookup over the process environment and the working copy's env file.
///
/// The env file is parsed with `dotenvy` but never injected into the process
/// environment. Process variables take precedence, like `dotenvy::dotenv`.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    process: HashMap<String, String>,
    file: HashMap<String, String>,
}

impl Lookup {
    /// Capture the process environment and parse `env_file` if it exists
    ///
    /// # Errors
    ///
    /// Returns an error if the env file exists but cannot be parsed
    pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
        let process = std::env::vars().collect();
        let mut file = HashMap::new();

        match dotenvy::from_path_iter(env_file) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: env_file.to_path_buf(),
                        source,
                    })?;
                    file.insert(key, value);
                }
            }
            Err(e) if e.not_found() => {}
            Err(source) => {
                return Err(ConfigError::EnvFile {
                    path: env_file.to_path_buf(),
                    source,
                });
            }
        }

        Ok(Self { process, file })
    }

    /// Build a lookup from explicit pairs, used where the process
    /// environment must not leak in
    #[must_use]
    pub fn from_pairs<K, V>(
        process: impl IntoIterator<Item = (K, V)>,
        file: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            process: process
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            file: file.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Process environment first, then the env file. Empty values count as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        non_empty(self.process.get(key)).or_else(|| non_empty(self.file.get(key)))
    }

    /// Env file first, then the process environment
    #[must_use]
    pub fn get_file_first(&self, key: &str) -> Option<&str> {
        non_empty(self.file.get(key)).or_else(|| non_empty(self.process.get(key)))
    }

    fn require(&self, key: &'static str, hint: &'static str) -> Result<String, ConfigError> {
        self.get(key)
            .map(ToString::to_string)
            .ok_or(ConfigError::Missing { key, hint })
    }

    fn parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        self.get(key).map_or(Ok(default), |value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                key,
                value: value.to_string(),
            })
        })
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// Neon API credentials
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub project_id: String,
}

impl Credentials {
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first missing variable
    pub fn resolve(lookup: &Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: lookup.require(
                API_KEY,
                "create an API key at https://console.neon.tech/app/settings/api-keys and add it to your .env file",
            )?,
            project_id: lookup.require(
                PROJECT_ID,
                "copy the project id from Project settings in the Neon console and add it to your .env file",
            )?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"****")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Non secret knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub database: String,
    pub role: String,
    pub env_update: EnvUpdate,
    pub ready_timeout: Duration,
    pub ready_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            role: DEFAULT_ROLE.to_string(),
            env_update: EnvUpdate::default(),
            ready_timeout: Duration::from_secs(60),
            ready_interval: Duration::from_millis(2000),
        }
    }
}

impl Settings {
    /// # Errors
    ///
    /// Returns an error if a numeric setting cannot be parsed
    pub fn from_lookup(lookup: &Lookup, env_update: EnvUpdate) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            api_url: lookup.get(API_URL).unwrap_or(DEFAULT_API_URL).to_string(),
            database: lookup
                .get(DATABASE_NAME)
                .unwrap_or(DEFAULT_DATABASE)
                .to_string(),
            role: lookup.get(ROLE_NAME).unwrap_or(DEFAULT_ROLE).to_string(),
            env_update,
            ready_timeout: Duration::from_secs(
                lookup.parse_or(READY_TIMEOUT, defaults.ready_timeout.as_secs())?,
            ),
            ready_interval: Duration::from_millis(lookup.parse_or(
                READY_INTERVAL,
                u64::try_from(defaults.ready_interval.as_millis()).unwrap_or(2000),
            )?),
        })
    }
}

/// The connection string `restore-prod` switches back to
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] if `PRODUCTION_DATABASE_URL` is not set
pub fn production_database_url(lookup: &Lookup) -> Result<String, ConfigError> {
    lookup.require(
        PRODUCTION_DATABASE_URL,
        "add the production connection string to your .env file as PRODUCTION_DATABASE_URL=\"postgresql://...\"",
    )
}
