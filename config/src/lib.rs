//! VeilVault Configuration
//!
//! Shared configuration crate for the reconstruction engine and the CLI.
//!
//! Handles loading configuration from:
//! 1. VV_CONFIG env var (explicit path)
//! 2. ./veilvault.toml (current directory)
//! 3. ~/.veilvault/veilvault.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<VaultConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "veilvault.toml";
const CONFIG_DIR_NAME: &str = ".veilvault";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_CACHE_PATH: &str = "./veilvault-cache";
const DEFAULT_CHAIN_ID: u64 = 1;
const DEFAULT_MAX_PARALLEL: usize = 4;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub reconstruction: ReconstructionConfig,
}

/// Where decrypted notes are cached between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_cache_path")]
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: DEFAULT_CACHE_PATH.into(),
        }
    }
}

fn default_cache_path() -> String {
    DEFAULT_CACHE_PATH.into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Nothing survives the process
    Memory,
    #[default]
    Rocksdb,
}

impl std::str::FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" | "rocks" => Ok(Self::Rocksdb),
            other => anyhow::bail!("unknown cache backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

/// Ledger source configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON dump of ledger records keyed by nonce commitment
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Upper bound on accounts replayed at once
    #[serde(default = "default_max_parallel")]
    pub max_parallel_accounts: usize,
    /// Attach membership witnesses when a local tree mirror is available
    #[serde(default = "default_true")]
    pub attach_membership: bool,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            max_parallel_accounts: DEFAULT_MAX_PARALLEL,
            attach_membership: true,
        }
    }
}

fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {key}={v}"),
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl VaultConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("VV_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        env_string("VV_CACHE_PATH", &mut self.cache.path);
        env_parse("VV_CACHE_BACKEND", &mut self.cache.backend);
        env_parse("VV_CHAIN_ID", &mut self.chain.chain_id);
        env_option_string("VV_LEDGER_PATH", &mut self.ledger.path);
        env_parse(
            "VV_MAX_PARALLEL",
            &mut self.reconstruction.max_parallel_accounts,
        );
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.ledger.path = Some("./ledger.json".into());
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static VaultConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Install `config` as the global instance before anything reads it.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: VaultConfig) -> Result<(), VaultConfig> {
        GLOBAL_CONFIG.set(config)
    }
}
