//! Canonical application names

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{GatewayError, GatewayResult};

/// Case-insensitive application identifier.
///
/// Holds the trimmed, lower-cased form of whatever the caller typed, so two
/// names that differ only in case compare, hash and print identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ApplicationName(String);

impl ApplicationName {
    /// Normalize a raw name. Blank input is rejected.
    pub fn parse(raw: &str) -> GatewayResult<Self> {
        let canonical = raw.trim().to_lowercase();
        if canonical.is_empty() {
            return Err(GatewayError::Validation("name is required".to_string()));
        }
        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ApplicationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ApplicationName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercases_and_trims() {
        let name = ApplicationName::parse("  AppForTest ").unwrap();
        assert_eq!(name.as_str(), "appfortest");
    }

    #[test]
    fn test_case_variants_are_equal() {
        assert_eq!(
            ApplicationName::parse("Unique Name").unwrap(),
            ApplicationName::parse("unique NAME").unwrap()
        );
    }

    #[test]
    fn test_blank_is_rejected() {
        assert_eq!(
            ApplicationName::parse("   "),
            Err(GatewayError::Validation("name is required".to_string()))
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let name = ApplicationName::parse("App Name").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"app name\"");
    }
}
