// goq Infrastructure - Redis Adapter
// Implements: Broker (lists for the queue, string keys for status records)

mod broker;
mod connection;

pub use broker::RedisBroker;
pub use connection::{connection_info, map_redis_error};
