//! Configuration types and loading for the ledger indexer.
//!
//! Configuration is loaded hierarchically from a `configuration/` directory
//! (base file plus environment-specific overrides) and `APP_`-prefixed
//! environment variables.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

pub mod environment;
pub mod load;
pub mod shared;

/// A secret string that can be deserialized from configuration files.
///
/// Wraps [`SecretString`] so that passwords read from configuration are
/// redacted in debug output while still being deserializable with serde.
#[derive(Clone)]
pub struct SerializableSecretString(SecretString);

impl SerializableSecretString {
    /// Returns the wrapped secret value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SerializableSecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SerializableSecretString([REDACTED])")
    }
}

impl From<String> for SerializableSecretString {
    fn from(value: String) -> Self {
        Self(SecretString::new(value))
    }
}

impl<'de> Deserialize<'de> for SerializableSecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from(value))
    }
}
