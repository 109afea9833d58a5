//! Endpoint Registry
//!
//! Holds the cluster addresses the current handles were opened against.

use std::fmt;

use parking_lot::RwLock;

use crate::error::{ConsoleError, Result};

/// A validated `host:port` address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (host, port) = raw
            .rsplit_once(':')
            .ok_or_else(|| ConsoleError::Validation(format!("invalid endpoint: {}", raw)))?;
        if host.is_empty() {
            return Err(ConsoleError::Validation(format!(
                "invalid endpoint: {} (missing host)",
                raw
            )));
        }
        port.parse::<u16>().map_err(|_| {
            ConsoleError::Validation(format!("invalid endpoint: {} (bad port)", raw))
        })?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a comma separated endpoint list.
///
/// Entries are trimmed and empty entries skipped; the result must be non-empty.
pub fn parse_endpoints(csv: &str) -> Result<Vec<Endpoint>> {
    let endpoints = csv
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Endpoint::parse)
        .collect::<Result<Vec<_>>>()?;
    if endpoints.is_empty() {
        return Err(ConsoleError::Validation("endpoints cannot be empty".to_string()));
    }
    Ok(endpoints)
}

/// Validate an already split endpoint list
pub fn validate_endpoints<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Endpoint>> {
    let endpoints = raw
        .iter()
        .map(|s| Endpoint::parse(s.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    if endpoints.is_empty() {
        return Err(ConsoleError::Validation("endpoints cannot be empty".to_string()));
    }
    Ok(endpoints)
}

/// Current endpoint set. Changed only by a successful reconfiguration.
pub struct EndpointRegistry {
    current: RwLock<Vec<Endpoint>>,
}

impl EndpointRegistry {
    pub fn new(initial: Vec<Endpoint>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn get(&self) -> Vec<Endpoint> {
        self.current.read().clone()
    }

    pub fn replace(&self, endpoints: Vec<Endpoint>) {
        *self.current.write() = endpoints;
    }

    /// Endpoints as plain strings, verbatim
    pub fn to_strings(&self) -> Vec<String> {
        self.current.read().iter().map(|e| e.0.clone()).collect()
    }
}
