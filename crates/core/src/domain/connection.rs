// Broker Connection Settings

use std::time::Duration;

/// Default broker address
pub const DEFAULT_ADDR: &str = "127.0.0.1:6379";

/// Connection parameters handed verbatim to the broker adapter
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// `host:port`
    pub addr: String,
    pub password: Option<String>,
    /// Logical database index
    pub db: i64,
    pub max_retries: u32,
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub pool_size: usize,
    pub pool_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            password: None,
            db: 0,
            max_retries: 0,
            dial_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(3),
            pool_size: 10,
            pool_timeout: Duration::from_secs(4),
            idle_timeout: None,
        }
    }
}

impl ConnectionOptions {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Split `addr` into host and port
    pub fn host_port(&self) -> crate::Result<(String, u16)> {
        let (host, port) = self.addr.rsplit_once(':').ok_or_else(|| {
            crate::GoqError::Config(format!("address must be host:port, got {}", self.addr))
        })?;
        let port = port
            .parse::<u16>()
            .map_err(|e| crate::GoqError::Config(format!("invalid port in {}: {}", self.addr, e)))?;
        if host.is_empty() {
            return Err(crate::GoqError::Config(format!(
                "missing host in {}",
                self.addr
            )));
        }
        Ok((host.to_string(), port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_port() {
        let opts = ConnectionOptions::new("redis.internal:6380");
        assert_eq!(
            opts.host_port().unwrap(),
            ("redis.internal".to_string(), 6380)
        );
    }

    #[test]
    fn test_host_port_rejects_garbage() {
        assert!(ConnectionOptions::new("localhost").host_port().is_err());
        assert!(ConnectionOptions::new("localhost:http").host_port().is_err());
        assert!(ConnectionOptions::new(":6379").host_port().is_err());
    }
}
