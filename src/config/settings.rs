use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::KdfParams;
use crate::errors::{CoreError, Result};
use crate::session::chain::Chain;

/// Core configuration, loaded from `keycell.toml` by the embedding app.
///
/// Every field has a sensible default so the core works out-of-the-box
/// without any config file at all. Cost and policy numbers live here —
/// never as constants in the modules that consume them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Argon2id cost profiles ───────────────────────────────────────
    //
    // Two named profiles: `unlock` is tuned for the frequent app-unlock
    // path, `vault` is the heavier profile for vault text and
    // custom-phrase root derivation. Which one applies is chosen per
    // call site, not globally.
    /// Unlock-profile memory cost in KiB (default: 19 456 = 19 MiB).
    #[serde(default = "default_unlock_memory_kib")]
    pub unlock_memory_kib: u32,

    /// Unlock-profile iteration count (default: 2).
    #[serde(default = "default_unlock_iterations")]
    pub unlock_iterations: u32,

    /// Unlock-profile parallelism lanes (default: 1).
    #[serde(default = "default_unlock_parallelism")]
    pub unlock_parallelism: u32,

    /// Vault-profile memory cost in KiB (default: 65 536 = 64 MiB).
    #[serde(default = "default_vault_memory_kib")]
    pub vault_memory_kib: u32,

    /// Vault-profile iteration count (default: 3).
    #[serde(default = "default_vault_iterations")]
    pub vault_iterations: u32,

    /// Vault-profile parallelism lanes (default: 4).
    #[serde(default = "default_vault_parallelism")]
    pub vault_parallelism: u32,

    // ── Master key lifetime ──────────────────────────────────────────
    /// Seconds a derived master key handle stays valid. `None` means
    /// the key lives until explicit disposal or app lock.
    #[serde(default)]
    pub master_key_ttl_secs: Option<u64>,

    // ── Custom-phrase validation policy ──────────────────────────────
    /// Minimum phrase length in characters (default: 12).
    #[serde(default = "default_phrase_min_len")]
    pub phrase_min_len: usize,

    /// Longest allowed run of consecutive digits (default: 3).
    #[serde(default = "default_phrase_max_numeric_run")]
    pub phrase_max_numeric_run: usize,

    /// Minimum number of distinct character categories
    /// (lower/upper/digit/symbol) the phrase must mix (default: 3).
    #[serde(default = "default_phrase_min_categories")]
    pub phrase_min_categories: usize,

    /// Minimum entropy estimate in bits (default: 60).
    #[serde(default = "default_phrase_min_entropy_bits")]
    pub phrase_min_entropy_bits: f64,

    /// Regex patterns a phrase must not match (case handled per pattern).
    #[serde(default = "default_phrase_blocklist")]
    pub phrase_blocklist: Vec<String>,

    // ── Lockout / destruction policy ─────────────────────────────────
    /// Failures tolerated before any cooldown applies (default: 3).
    #[serde(default = "default_lockout_free_attempts")]
    pub lockout_free_attempts: u32,

    /// First cooldown delay in seconds; doubles per further failure
    /// (default: 30).
    #[serde(default = "default_lockout_base_delay_secs")]
    pub lockout_base_delay_secs: u64,

    /// Cooldown delay ceiling in seconds (default: 3600).
    #[serde(default = "default_lockout_max_delay_secs")]
    pub lockout_max_delay_secs: u64,

    /// Consecutive failures that trigger irreversible destruction
    /// (default: 10).
    #[serde(default = "default_destroy_threshold")]
    pub destroy_threshold: u32,

    // ── Session derivation ───────────────────────────────────────────
    /// Chains a new session derives addresses for.
    #[serde(default = "default_session_chains")]
    pub session_chains: Vec<Chain>,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_unlock_memory_kib() -> u32 {
    19_456 // 19 MiB
}

fn default_unlock_iterations() -> u32 {
    2
}

fn default_unlock_parallelism() -> u32 {
    1
}

fn default_vault_memory_kib() -> u32 {
    65_536 // 64 MiB
}

fn default_vault_iterations() -> u32 {
    3
}

fn default_vault_parallelism() -> u32 {
    4
}

fn default_phrase_min_len() -> usize {
    12
}

fn default_phrase_max_numeric_run() -> usize {
    3
}

fn default_phrase_min_categories() -> usize {
    3
}

fn default_phrase_min_entropy_bits() -> f64 {
    60.0
}

fn default_phrase_blocklist() -> Vec<String> {
    [
        "(?i)password",
        "(?i)qwerty",
        "(?i)letmein",
        "(?i)abc123",
        "(?i)iloveyou",
        "12345678",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_lockout_free_attempts() -> u32 {
    3
}

fn default_lockout_base_delay_secs() -> u64 {
    30
}

fn default_lockout_max_delay_secs() -> u64 {
    3_600
}

fn default_destroy_threshold() -> u32 {
    10
}

fn default_session_chains() -> Vec<Chain> {
    vec![Chain::Ethereum, Chain::Solana]
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            unlock_memory_kib: default_unlock_memory_kib(),
            unlock_iterations: default_unlock_iterations(),
            unlock_parallelism: default_unlock_parallelism(),
            vault_memory_kib: default_vault_memory_kib(),
            vault_iterations: default_vault_iterations(),
            vault_parallelism: default_vault_parallelism(),
            master_key_ttl_secs: None,
            phrase_min_len: default_phrase_min_len(),
            phrase_max_numeric_run: default_phrase_max_numeric_run(),
            phrase_min_categories: default_phrase_min_categories(),
            phrase_min_entropy_bits: default_phrase_min_entropy_bits(),
            phrase_blocklist: default_phrase_blocklist(),
            lockout_free_attempts: default_lockout_free_attempts(),
            lockout_base_delay_secs: default_lockout_base_delay_secs(),
            lockout_max_delay_secs: default_lockout_max_delay_secs(),
            destroy_threshold: default_destroy_threshold(),
            session_chains: default_session_chains(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the app's data directory.
    const FILE_NAME: &'static str = "keycell.toml";

    /// Load settings from `<config_dir>/keycell.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| CoreError::ConfigError(format!("{}: {e}", config_path.display())))?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CoreError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// KDF parameters for the frequent unlock path.
    pub fn unlock_kdf_params(&self) -> KdfParams {
        KdfParams {
            memory_kib: self.unlock_memory_kib,
            iterations: self.unlock_iterations,
            parallelism: self.unlock_parallelism,
        }
    }

    /// KDF parameters for vault text and custom-phrase root derivation.
    pub fn vault_kdf_params(&self) -> KdfParams {
        KdfParams {
            memory_kib: self.vault_memory_kib,
            iterations: self.vault_iterations,
            parallelism: self.vault_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
