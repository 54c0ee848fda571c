//! Versioned, self-describing encrypted payload formats.
//!
//! Two colon-delimited text formats cross the persistence boundary:
//!
//! - **Wallet-secret** (`wallet`): tag `W1`, authenticated-encrypted
//!   under the active master key.
//! - **Vault** (`vault`): tag `V<version>`, keyed directly by a
//!   password-derived key, carrying its own KDF cost parameters so the
//!   costs can be retuned without breaking old payloads.
//!
//! The tag strictly determines the parsing rules. An unknown tag or an
//! unsupported version fails closed — there is no default scheme.

pub mod vault;
pub mod wallet;

pub use vault::VaultPayload;
pub use wallet::WalletPayload;

use crate::errors::{FormatError, Result};

/// A decoded payload of either format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Wallet(WalletPayload),
    Vault(VaultPayload),
}

/// Decode a serialized payload of either format.
///
/// Dispatches on the leading tag. `W` and `V` families are recognized;
/// within a family, only the versions this build implements parse —
/// anything else is `FormatError::VersionUnsupported`, and any other
/// tag is `FormatError::UnknownTag`.
pub fn decode(input: &str) -> Result<Payload> {
    let fields: Vec<&str> = input.split(':').collect();
    let tag = fields[0];

    let mut chars = tag.chars();
    let family = chars
        .next()
        .ok_or_else(|| FormatError::UnknownTag(String::new()))?;
    let version: u32 = chars
        .as_str()
        .parse()
        .map_err(|_| FormatError::UnknownTag(tag.to_string()))?;

    match family {
        'W' if version == u32::from(wallet::WALLET_VERSION) => {
            Ok(Payload::Wallet(wallet::from_fields(&fields[1..])?))
        }
        'W' => Err(FormatError::VersionUnsupported {
            family: 'W',
            version,
        }
        .into()),
        'V' if version == u32::from(vault::VAULT_VERSION) => {
            Ok(Payload::Vault(vault::from_fields(&fields[1..])?))
        }
        'V' => Err(FormatError::VersionUnsupported {
            family: 'V',
            version,
        }
        .into()),
        _ => Err(FormatError::UnknownTag(tag.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// Field parsing helpers shared by both formats
// ---------------------------------------------------------------------------

use crate::crypto::encryption::NONCE_LEN;

pub(crate) fn require_fields<'a>(fields: &[&'a str], expected: usize) -> Result<Vec<&'a str>> {
    // `expected` counts the fields after the tag.
    if fields.len() < expected {
        return Err(FormatError::Truncated {
            expected: expected + 1,
            got: fields.len() + 1,
        }
        .into());
    }
    if fields.len() > expected {
        return Err(FormatError::Malformed(format!(
            "unexpected trailing field after {} fields",
            expected + 1
        ))
        .into());
    }
    Ok(fields.to_vec())
}

pub(crate) fn hex_field(name: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| FormatError::Malformed(format!("{name}: {e}")).into())
}

pub(crate) fn b64_field(name: &str, value: &str) -> Result<Vec<u8>> {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    BASE64
        .decode(value)
        .map_err(|e| FormatError::Malformed(format!("{name}: {e}")).into())
}

pub(crate) fn nonce_field(value: &str) -> Result<[u8; NONCE_LEN]> {
    let bytes = hex_field("nonce", value)?;
    bytes
        .try_into()
        .map_err(|_| FormatError::Malformed(format!("nonce must be {NONCE_LEN} bytes")).into())
}

pub(crate) fn u32_field(name: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|e| FormatError::Malformed(format!("{name}: {e}")).into())
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields in persisted records
// ---------------------------------------------------------------------------

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::Deserialize;
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
