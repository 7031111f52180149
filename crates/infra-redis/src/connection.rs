// Redis Connection Setup

use goq_core::port::BrokerError;
use goq_core::{ConnectionOptions, Result};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError};

/// Translate goq connection options into redis connection info
pub fn connection_info(options: &ConnectionOptions) -> Result<ConnectionInfo> {
    let (host, port) = options.host_port()?;
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo {
            db: options.db,
            password: options.password.clone().filter(|p| !p.is_empty()),
            ..Default::default()
        },
    })
}

/// Helper to convert redis errors into the broker taxonomy
pub fn map_redis_error(err: RedisError) -> BrokerError {
    if err.is_timeout() {
        BrokerError::Timeout(err.to_string())
    } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        BrokerError::Connection(err.to_string())
    } else {
        BrokerError::Command(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goq_core::GoqError;
    use redis::ErrorKind;

    #[test]
    fn test_connection_info_from_options() {
        let options = ConnectionOptions {
            password: Some("s3cret".to_string()),
            db: 3,
            ..ConnectionOptions::new("cache.local:6380")
        };
        let info = connection_info(&options).unwrap();

        assert_eq!(
            info.addr,
            ConnectionAddr::Tcp("cache.local".to_string(), 6380)
        );
        assert_eq!(info.redis.db, 3);
        assert_eq!(info.redis.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_empty_password_is_none() {
        let options = ConnectionOptions {
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(connection_info(&options).unwrap().redis.password.is_none());
    }

    #[test]
    fn test_bad_addr_is_config_error() {
        let result = connection_info(&ConnectionOptions::new("no-port"));
        assert!(matches!(result, Err(GoqError::Config(_))));
    }

    #[test]
    fn test_map_io_error_to_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let mapped = map_redis_error(RedisError::from(io));
        assert!(matches!(mapped, BrokerError::Connection(_)));
    }

    #[test]
    fn test_map_type_error_to_command() {
        let err = RedisError::from((ErrorKind::TypeError, "wrong type"));
        assert!(matches!(map_redis_error(err), BrokerError::Command(_)));
    }
}
