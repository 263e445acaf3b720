use crate::core::Result;

use super::{parse_or, Lookup};

/// Server configuration for HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            host,
            port,
            workers: cores * 2, // I/O-bound: most time is spent waiting on MySQL and peers
        }
    }

    pub(crate) fn from_lookup(get: &Lookup<'_>) -> Result<Self> {
        let host = get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(get, "SERVER_PORT", 8080)?;
        Ok(Self::new(host, port))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
