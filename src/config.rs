use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Argon2 cost parameters used for new password hashes.
///
/// Existing hashes carry their own parameters, so changing these only
/// affects passwords set afterwards.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Argon2Config {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// Lifetime of issued tokens; tokens never expire when unset
    pub token_ttl_hours: Option<u64>,
    /// Minimum password length accepted by the public endpoints
    pub min_password_length: usize,
    /// Password hashing cost
    pub argon2: Argon2Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("recipebox")
                .join("recipebox.db"),
            token_ttl_hours: None,
            min_password_length: 5,
            argon2: Argon2Config::default(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        if let Ok(port) = std::env::var("RECIPEBOX_PORT") {
            config.port = parse_env("RECIPEBOX_PORT", &port)?;
        }
        if let Ok(db_path) = std::env::var("RECIPEBOX_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(ttl) = std::env::var("RECIPEBOX_TOKEN_TTL_HOURS") {
            config.token_ttl_hours = Some(parse_env("RECIPEBOX_TOKEN_TTL_HOURS", &ttl)?);
        }
        if let Ok(min) = std::env::var("RECIPEBOX_MIN_PASSWORD_LENGTH") {
            config.min_password_length = parse_env("RECIPEBOX_MIN_PASSWORD_LENGTH", &min)?;
        }

        Ok(config)
    }

    /// Default config file path: <config_dir>/recipebox/config.yaml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recipebox")
            .join("config.yaml")
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv(name.to_string(), value.to_string()))
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value '{}' for {}", value, name)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError(_, e) => Some(e),
            ConfigError::ParseError(_, e) => Some(e),
            ConfigError::InvalidEnv(_, _) => None,
        }
    }
}
