//! Environment variable names used by this crate for convenient
//! configuration of the Couchbase sink from services.
//!
//! These are purely helpers; the sink types remain decoupled from
//! environment access.

/// Comma or semicolon separated server URIs, e.g.
/// `couchbase://10.0.0.1,couchbase://10.0.0.2`.
pub const LOG_SINK_COUCHBASE_SERVERS_ENV: &str = "LOG_SINK_COUCHBASE_SERVERS";

/// Target bucket name.
pub const LOG_SINK_COUCHBASE_BUCKET_ENV: &str = "LOG_SINK_COUCHBASE_BUCKET";

/// Optional user name.
pub const LOG_SINK_COUCHBASE_USER_ENV: &str = "LOG_SINK_COUCHBASE_USER";

/// Optional password.
pub const LOG_SINK_COUCHBASE_PASSWORD_ENV: &str = "LOG_SINK_COUCHBASE_PASSWORD";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional environment variable, treating an empty value as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
