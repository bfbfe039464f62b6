//! Secure credential handling using the secrecy crate
//!
//! The PostgreSQL connection string carries a password, so it is held in a
//! `Secret` that zeroes memory on drop and redacts itself in `Debug` output.
//!
//! # Example
//!
//! ```rust
//! use clinguard::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let dsn = secret_string("postgresql://guard:pw@localhost/guard".to_string());
//! assert!(dsn.expose_secret().starts_with("postgresql://"));
//! assert!(!format!("{dsn:?}").contains("pw@"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the secret value starts with a prefix
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Host/database part of a connection string, with credentials stripped
    pub fn redacted_location(&self) -> String {
        match self.0.rsplit_once('@') {
            Some((_, location)) => format!("postgresql://***@{location}"),
            None => "postgresql://***".to_string(),
        }
    }

    /// Parse the secret value into another type
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Type alias for a secret string
pub type SecretString = Secret<SecretValue>;

/// Helper function to create a SecretString from a String
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("postgresql://guard:hunter2@db/guard".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("hunter2"));
    }

    #[test]
    fn test_redacted_location() {
        let secret = secret_string("postgresql://guard:hunter2@db:5432/guard".to_string());
        let location = secret.expose_secret().redacted_location();
        assert_eq!(location, "postgresql://***@db:5432/guard");
        assert!(!location.contains("hunter2"));
    }

    #[test]
    fn test_secret_deserializes_from_toml() {
        #[derive(serde::Deserialize)]
        struct Holder {
            dsn: SecretString,
        }

        let holder: Holder = toml::from_str("dsn = \"postgres://localhost/guard\"").unwrap();
        assert!(holder.dsn.expose_secret().starts_with("postgres://"));
    }
}
