//! Endpoint parsing.
//!
//! Endpoints have the form `<scheme>://<address>`. The scheme names the
//! transport used to dial or listen; the address is handed to that transport
//! untouched, so host names (`tcp://localhost:5555`) are resolved by the
//! transport rather than here.

use std::fmt;
use std::str::FromStr;

const SCHEME_DELIMITER: &str = "://";

/// Transport named by an endpoint scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// `tcp://host:port`
    Tcp,
}

impl Transport {
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
        }
    }
}

/// A parsed `scheme://address` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    transport: Transport,
    address: String,
}

impl Endpoint {
    /// Parse an endpoint from a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice_core::endpoint::{Endpoint, Transport};
    ///
    /// let endpoint = Endpoint::parse("tcp://127.0.0.1:5555").unwrap();
    /// assert_eq!(endpoint.transport(), Transport::Tcp);
    /// assert_eq!(endpoint.address(), "127.0.0.1:5555");
    /// ```
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        s.parse()
    }

    pub const fn transport(&self) -> Transport {
        self.transport
    }

    /// Transport-level address (everything after the scheme delimiter).
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, address) = s
            .split_once(SCHEME_DELIMITER)
            .ok_or_else(|| EndpointError::MissingScheme(s.to_string()))?;

        let transport = match scheme {
            "tcp" => Transport::Tcp,
            other => return Err(EndpointError::UnsupportedTransport(other.to_string())),
        };

        if address.is_empty() {
            return Err(EndpointError::EmptyAddress(s.to_string()));
        }

        Ok(Self {
            transport,
            address: address.to_string(),
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.transport.scheme(), SCHEME_DELIMITER, self.address)
    }
}

/// Errors that can occur when parsing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("Endpoint {0:?} is missing a scheme (expected <scheme>://<address>)")]
    MissingScheme(String),

    #[error("Unsupported transport {0:?} (expected tcp)")]
    UnsupportedTransport(String),

    #[error("Endpoint {0:?} has an empty address")]
    EmptyAddress(String),
}
