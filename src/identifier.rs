//! Server identifier parsing.

use std::fmt;
use std::str::FromStr;

use crate::error::InstallerError;

/// A server identifier that may include a version.
/// Format: "name" or "name@version"
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Identifier {
    pub name: String,
    pub version: Option<String>,
}

impl Identifier {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for Identifier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| InstallerError::InvalidIdentifier {
            raw: s.to_string(),
            reason: reason.to_string(),
        };

        let (name, version) = match s.split_once('@') {
            Some((name, ver)) => {
                if ver.is_empty() {
                    return Err(invalid("version after @ cannot be empty").into());
                }
                (name, Some(ver.to_string()))
            }
            None => (s, None),
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("server name cannot be empty").into());
        }

        Ok(Identifier::new(name, version))
    }
}
