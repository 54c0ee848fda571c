use chrono::{DateTime, Utc};
use thiserror::Error;

/// All errors that can cross the core boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    // --- Recoverable, user retries ---
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthFailure),

    // --- Non-recoverable for the affected record ---
    #[error("Payload format error: {0}")]
    Format(#[from] FormatError),

    // --- Boundary/programming bugs, always surfaced ---
    #[error("Handle error: {0}")]
    Handle(#[from] HandleError),

    // --- Terminal, never offered a retry ---
    #[error("Profile destroyed — all wallet data for this profile has been erased")]
    DestructionTriggered,

    // --- Crypto errors ---
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Protected-store errors ---
    #[error("Protected store error: {0}")]
    StoreError(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Malformed or low-quality secret input. Recoverable — the user can
/// correct the input and retry; nothing was retained on failure.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("secret input is empty")]
    Empty,

    #[error("phrase too short: {got} characters, minimum is {min}")]
    TooShort { min: usize, got: usize },

    #[error("numeric run of {got} digits exceeds the maximum of {max}")]
    NumericRunTooLong { max: usize, got: usize },

    #[error("phrase matches a blocked pattern")]
    Blocklisted,

    #[error("only {got} character categories used, minimum is {min}")]
    LowDiversity { min: usize, got: usize },

    #[error("entropy estimate {got_bits:.0} bits below the minimum of {min_bits:.0}")]
    LowEntropy { min_bits: f64, got_bits: f64 },

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("raw secret must be {min}..={max} bytes, got {got}")]
    BadRawLength { min: usize, max: usize, got: usize },

    #[error("secret is not valid UTF-8")]
    NotUtf8,
}

/// Wrong password, PIN, or key. Recoverable — feeds the lockout guard.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("wrong password or PIN")]
    BadCredentials,

    #[error("integrity check failed — wrong key or corrupted ciphertext")]
    IntegrityCheckFailed,

    #[error("too many failed attempts — locked out until {until}")]
    CoolingDown { until: DateTime<Utc> },
}

/// Corrupt or unrecognized payload. Non-recoverable for that record and
/// never silently defaulted: an unknown tag or version fails closed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown payload tag '{0}'")]
    UnknownTag(String),

    #[error("payload truncated: expected {expected} fields, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("unsupported {family} payload version {version}")]
    VersionUnsupported { family: char, version: u32 },

    #[error("malformed payload field: {0}")]
    Malformed(String),
}

/// Stale, unknown, or mismatched handle. A boundary bug, not a user
/// error — always surfaced, never swallowed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("handle does not resolve to a live record")]
    NotFound,

    #[error("handle generation is stale (record was disposed or consumed)")]
    Stale,

    #[error("handle kind mismatch: expected {expected}, got {got}")]
    WrongKind { expected: &'static str, got: &'static str },

    #[error("master key handle has expired")]
    Expired,

    #[error("session root key was already cleared")]
    Sealed,
}

/// Convenience type alias for core results.
pub type Result<T> = std::result::Result<T, CoreError>;
