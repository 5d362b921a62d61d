use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One remote endpoint: the SSH login user and the host to reach.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub user: String,
    pub host: String,
}

impl Target {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }

    /// Parses a `user@host` token.
    ///
    /// Neither half may be empty, contain whitespace or a second `@`, or start
    /// with `-` (ssh would read it as an option).
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let malformed = |reason: &str| FleetError::MalformedTarget {
            token: token.to_string(),
            reason: reason.to_string(),
        };

        let (user, host) = token
            .split_once('@')
            .ok_or_else(|| malformed("expected user@host"))?;

        if user.is_empty() {
            return Err(malformed("missing user before '@'"));
        }
        if host.is_empty() {
            return Err(malformed("missing host after '@'"));
        }
        if host.contains('@') {
            return Err(malformed("more than one '@'"));
        }
        if token.chars().any(char::is_whitespace) {
            return Err(malformed("contains whitespace"));
        }
        if user.starts_with('-') || host.starts_with('-') {
            return Err(malformed("user and host may not start with '-'"));
        }

        Ok(Self::new(user, host))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.host)
    }
}

impl FromStr for Target {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
