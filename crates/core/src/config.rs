use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OtellError, Result};

/// Which `KvBackend` implementation the binary wires up. Not part of the
/// distilled spec's persistence contract (that's backend-agnostic); this
/// toggle exists so the service can run with zero external dependencies in
/// tests and demos, per SPEC_FULL's "zero-dependency standalone mode" note.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub backend_kind: BackendKind,
    pub backend_host: String,
    pub backend_port: u16,
    pub retention_ttl: Duration,
    pub max_metric_cardinality: usize,
    pub listen_addr: SocketAddr,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_kind: BackendKind::default(),
            backend_host: "localhost".to_string(),
            backend_port: 6379,
            retention_ttl: Duration::from_secs(1800),
            max_metric_cardinality: 1000,
            listen_addr: "0.0.0.0:5003".parse().expect("valid default listen addr"),
            rust_log: "collector=info,tower_http=info".to_string(),
        }
    }
}

impl Config {
    /// Builds a `Config` by overlaying environment values onto the
    /// documented defaults. Every malformed value gets a dedicated parse
    /// error naming the offending variable rather than panicking.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(v) = env::var("BACKEND_HOST") {
            cfg.backend_host = v;
        }
        if let Ok(v) = env::var("BACKEND_PORT") {
            cfg.backend_port = v
                .parse()
                .map_err(|e| OtellError::Config(format!("bad BACKEND_PORT={v}: {e}")))?;
        }
        if let Ok(v) = env::var("RETENTION_TTL") {
            let secs: u64 = v
                .parse()
                .map_err(|e| OtellError::Config(format!("bad RETENTION_TTL={v}: {e}")))?;
            cfg.retention_ttl = Duration::from_secs(secs);
        }
        if let Ok(v) = env::var("MAX_METRIC_CARDINALITY") {
            cfg.max_metric_cardinality = v
                .parse()
                .map_err(|e| OtellError::Config(format!("bad MAX_METRIC_CARDINALITY={v}: {e}")))?;
        }
        if let Ok(v) = env::var("LISTEN_ADDR") {
            cfg.listen_addr = v
                .parse()
                .map_err(|e| OtellError::Config(format!("bad LISTEN_ADDR={v}: {e}")))?;
        }
        if let Ok(v) = env::var("RUST_LOG") {
            cfg.rust_log = v;
        }
        if let Ok(v) = env::var("OTELL_BACKEND") {
            cfg.backend_kind = match v.to_ascii_lowercase().as_str() {
                "redis" => BackendKind::Redis,
                "memory" => BackendKind::Memory,
                other => {
                    return Err(OtellError::Config(format!(
                        "bad OTELL_BACKEND={other}: expected \"redis\" or \"memory\""
                    )));
                }
            };
        }

        Ok(cfg)
    }
}
