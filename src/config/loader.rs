//! Configuration loading from the command line.
//!
//! ```text
//! flproxy [--limit <N>] <fromPort>:<toPort>
//! ```
//!
//! The single-dash long form (`-limit=5`) is accepted as well.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::config::schema::{ProxyConfig, DEFAULT_LIMIT, DEFAULT_MAX_BODY_BYTES};
use crate::config::validation::{parse_port_pair, ConfigError};

/// Long flags that may also be spelled with a single dash.
const LONG_FLAGS: [&str; 5] = [
    "limit",
    "drain-timeout",
    "connect-timeout",
    "max-body-bytes",
    "metrics-address",
];

#[derive(Debug, Parser)]
#[command(name = "flproxy", version)]
#[command(about = "Forward HTTP traffic from one local port to another with bounded concurrency and retries", long_about = None)]
pub struct Cli {
    /// Port mapping, e.g. 8080:3000
    #[arg(value_name = "FROM_PORT:TO_PORT")]
    pub ports: String,

    /// Concurrent transfer limit
    #[arg(long, default_value_t = DEFAULT_LIMIT, allow_negative_numbers = true)]
    pub limit: i64,

    /// Seconds to wait for in-flight requests on shutdown
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub drain_timeout: u64,

    /// Upstream connect timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub connect_timeout: u64,

    /// Largest request body forwarded, in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Serve Prometheus metrics on this address
    #[arg(long, value_name = "ADDR")]
    pub metrics_address: Option<SocketAddr>,
}

impl Cli {
    /// Validate parsed arguments into a [`ProxyConfig`].
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let (from, to) = parse_port_pair(&self.ports)?;

        let mut config = ProxyConfig::new(from, to, self.limit)?;
        config.timeouts.drain = Duration::from_secs(self.drain_timeout);
        config.timeouts.connect = Duration::from_secs(self.connect_timeout);
        config.max_body_bytes = self.max_body_bytes;
        config.observability.metrics_address = self.metrics_address;
        Ok(config)
    }
}

/// Parse `args` (including the program name) into a validated config.
pub fn load_from_args<I, T>(args: I) -> Result<ProxyConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args = args.into_iter().map(|arg| normalize_flag(arg.into()));
    Cli::try_parse_from(args)?.into_config()
}

/// Rewrite `-limit=5` / `-limit` into `--limit=5` / `--limit`.
fn normalize_flag(arg: OsString) -> OsString {
    let Some(text) = arg.to_str() else {
        return arg;
    };
    let Some(rest) = text.strip_prefix('-') else {
        return arg;
    };
    if rest.starts_with('-') {
        return arg;
    }

    let name = rest.split('=').next().unwrap_or(rest);
    if LONG_FLAGS.contains(&name) {
        OsString::from(format!("-{}", text))
    } else {
        arg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(args: &[&str]) -> Result<ProxyConfig, ConfigError> {
        load_from_args(std::iter::once("flproxy").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let config = load(&["8080:9090"]).unwrap();
        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.target_port, 9090);
        assert_eq!(config.max_concurrency, 10);
    }

    #[test]
    fn limit_in_every_spelling() {
        for args in [
            &["-limit=5", "8080:9090"][..],
            &["--limit=5", "8080:9090"][..],
            &["--limit", "5", "8080:9090"][..],
            &["-limit", "5", "8080:9090"][..],
            &["8080:9090", "--limit", "5"][..],
        ] {
            assert_eq!(load(args).unwrap().max_concurrency, 5, "args {:?}", args);
        }
    }

    #[test]
    fn supplementary_flags() {
        let config = load(&[
            "--drain-timeout",
            "3",
            "--connect-timeout=2",
            "-max-body-bytes=1024",
            "--metrics-address",
            "127.0.0.1:9100",
            "80:3000",
        ])
        .unwrap();

        assert_eq!(config.timeouts.drain, Duration::from_secs(3));
        assert_eq!(config.timeouts.connect, Duration::from_secs(2));
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.observability.metrics_address, Some("127.0.0.1:9100".parse().unwrap()));
    }

    #[test]
    fn missing_colon_is_format_error() {
        let err = load(&["8080"]).unwrap_err();
        assert!(matches!(err, ConfigError::PortFormat(ref s) if s == "8080"));
    }

    #[test]
    fn out_of_range_ports() {
        assert_eq!(load(&["0:8080"]).unwrap_err().as_label(), "port_range");
        assert_eq!(load(&["8080:70000"]).unwrap_err().as_label(), "port_range");
    }

    #[test]
    fn bad_limit() {
        assert_eq!(load(&["-limit=0", "8080:9090"]).unwrap_err().as_label(), "invalid_limit");
        assert_eq!(load(&["--limit=-3", "8080:9090"]).unwrap_err().as_label(), "invalid_limit");
        assert_eq!(load(&["--limit=many", "8080:9090"]).unwrap_err().as_label(), "usage");
    }

    #[test]
    fn positional_count_is_enforced() {
        assert_eq!(load(&[]).unwrap_err().as_label(), "usage");
        assert_eq!(load(&["8080:9090", "9000:9001"]).unwrap_err().as_label(), "usage");
    }

    #[test]
    fn unknown_single_dash_flags_untouched() {
        assert_eq!(normalize_flag("-x".into()), OsString::from("-x"));
        assert_eq!(normalize_flag("--limit=1".into()), OsString::from("--limit=1"));
        assert_eq!(normalize_flag("8080:9090".into()), OsString::from("8080:9090"));
        assert_eq!(normalize_flag("-limit=1".into()), OsString::from("--limit=1"));
    }
}
