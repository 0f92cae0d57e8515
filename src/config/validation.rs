//! Configuration validation.
//!
//! # Responsibilities
//! - Parse the `<fromPort>:<toPort>` mapping
//! - Validate value ranges (ports 1-65535, limit >= 1)
//!
//! # Design Decisions
//! - Format errors and range errors are distinct variants
//! - Runs before any socket is bound

use std::num::ParseIntError;

use thiserror::Error;

/// Which side of the port mapping a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSide {
    From,
    To,
}

impl std::fmt::Display for PortSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortSide::From => write!(f, "fromPort"),
            PortSide::To => write!(f, "toPort"),
        }
    }
}

/// Fatal startup configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port format, expected 'from:to', got '{0}'")]
    PortFormat(String),

    #[error("invalid {side} '{value}': {source}")]
    PortParse {
        side: PortSide,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid {side}: port must be between 1 and 65535, got {port}")]
    PortOutOfRange { side: PortSide, port: i64 },

    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(i64),

    #[error(transparent)]
    Usage(#[from] clap::Error),
}

impl ConfigError {
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::PortFormat(_) => "port_format",
            ConfigError::PortParse { .. } => "port_parse",
            ConfigError::PortOutOfRange { .. } => "port_range",
            ConfigError::InvalidLimit(_) => "invalid_limit",
            ConfigError::Usage(_) => "usage",
        }
    }
}

/// Split `"from:to"` into two integers. Range is checked separately.
pub fn parse_port_pair(input: &str) -> Result<(i64, i64), ConfigError> {
    let mut parts = input.split(':');
    let (Some(from), Some(to), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ConfigError::PortFormat(input.to_string()));
    };

    Ok((parse_port(PortSide::From, from)?, parse_port(PortSide::To, to)?))
}

fn parse_port(side: PortSide, value: &str) -> Result<i64, ConfigError> {
    value.parse().map_err(|source| ConfigError::PortParse {
        side,
        value: value.to_string(),
        source,
    })
}

/// Check a port is within 1-65535.
pub fn validate_port(side: PortSide, port: i64) -> Result<u16, ConfigError> {
    match u16::try_from(port) {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(ConfigError::PortOutOfRange { side, port }),
    }
}

/// Check the concurrency limit is positive.
pub fn validate_limit(limit: i64) -> Result<usize, ConfigError> {
    match usize::try_from(limit) {
        Ok(limit) if limit >= 1 => Ok(limit),
        _ => Err(ConfigError::InvalidLimit(limit)),
    }
}
