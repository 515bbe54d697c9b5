use crate::env::{
    env_opt, LOG_SINK_COUCHBASE_BUCKET_ENV, LOG_SINK_COUCHBASE_PASSWORD_ENV,
    LOG_SINK_COUCHBASE_SERVERS_ENV, LOG_SINK_COUCHBASE_USER_ENV,
};
use crate::event::LogEvent;
use crate::sink::{BatchSink, SinkError};
use crate::store::{ClusterConnector, Credentials, DocumentStore, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

const SUPPORTED_SCHEMES: [&str; 4] = ["couchbase://", "couchbases://", "http://", "https://"];

/// Error type returned when building a [`CouchbaseConfig`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("server list is empty")]
    EmptyServerList,

    #[error("unknown or unsupported server URI scheme: {0}")]
    UnknownScheme(String),

    #[error("environment variable {0} is not set")]
    MissingVariable(&'static str),
}

/// Parse a list of server URIs separated by `,` or `;`.
///
/// Examples:
/// - "couchbase://10.0.0.1,couchbase://10.0.0.2"
/// - "http://127.0.0.1:8091; http://127.0.0.2:8091"
pub fn parse_server_list(list: &str) -> Result<Vec<String>, ConfigError> {
    let servers: Vec<String> = list
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if servers.is_empty() {
        return Err(ConfigError::EmptyServerList);
    }

    for server in &servers {
        let lower = server.to_ascii_lowercase();
        if !SUPPORTED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
            return Err(ConfigError::UnknownScheme(server.clone()));
        }
    }

    Ok(servers)
}

/// Connection settings for [`CouchbaseSink`].
#[derive(Clone, Debug)]
pub struct CouchbaseConfig {
    /// Server URIs the connection is bootstrapped from.
    pub servers: Vec<String>,
    /// Bucket events are stored in. Must already exist.
    pub bucket: String,
    pub credentials: Option<Credentials>,
}

impl CouchbaseConfig {
    pub fn new(servers: &str, bucket: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(CouchbaseConfig {
            servers: parse_server_list(servers)?,
            bucket: bucket.into(),
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Build a config from the `LOG_SINK_COUCHBASE_*` environment variables.
    ///
    /// Servers and bucket are required. Credentials are used only when the
    /// user name is set; a missing password then defaults to empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let servers = env_opt(LOG_SINK_COUCHBASE_SERVERS_ENV)
            .ok_or(ConfigError::MissingVariable(LOG_SINK_COUCHBASE_SERVERS_ENV))?;
        let bucket = env_opt(LOG_SINK_COUCHBASE_BUCKET_ENV)
            .ok_or(ConfigError::MissingVariable(LOG_SINK_COUCHBASE_BUCKET_ENV))?;

        let config = CouchbaseConfig::new(&servers, bucket)?;
        Ok(match env_opt(LOG_SINK_COUCHBASE_USER_ENV) {
            Some(user) => {
                let password = env_opt(LOG_SINK_COUCHBASE_PASSWORD_ENV).unwrap_or_default();
                config.with_credentials(user, password)
            }
            None => config,
        })
    }
}

/// Batch sink that stores each event as a JSON document in a Couchbase
/// bucket, keyed by a fresh UUID.
///
/// Failures to store individual events are logged and counted, never
/// returned: one bad document must not cost the rest of its batch.
#[derive(Clone)]
pub struct CouchbaseSink {
    bucket_name: String,
    bucket: Arc<dyn DocumentStore>,
    /// Documents stored successfully.
    pub stored_documents: Arc<AtomicU64>,
    /// Events that could not be serialized or stored.
    pub failed_documents: Arc<AtomicU64>,
}

impl CouchbaseSink {
    /// Wrap an already opened bucket.
    pub fn new(bucket_name: impl Into<String>, bucket: Arc<dyn DocumentStore>) -> Self {
        CouchbaseSink {
            bucket_name: bucket_name.into(),
            bucket,
            stored_documents: Arc::new(AtomicU64::new(0)),
            failed_documents: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Connect to the cluster described by `config` and open its bucket.
    ///
    /// **Returns**
    /// - `Err(StoreError::BucketNotFound)` if the bucket does not exist.
    /// - Any connection error reported by `connector`.
    pub async fn connect(
        config: &CouchbaseConfig,
        connector: &dyn ClusterConnector,
    ) -> Result<Self, StoreError> {
        debug!(servers = ?config.servers, bucket = %config.bucket, "connecting to couchbase");
        let cluster = connector
            .connect(&config.servers, config.credentials.as_ref())
            .await?;

        if !cluster.bucket_exists(&config.bucket).await? {
            return Err(StoreError::BucketNotFound(config.bucket.clone()));
        }

        let bucket = cluster.open_bucket(&config.bucket).await?;
        Ok(CouchbaseSink::new(config.bucket.clone(), bucket))
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    async fn store_event(&self, event: &LogEvent) -> Result<String, StoreError> {
        let key = Uuid::new_v4().to_string();
        let document = serde_json::to_value(event)?;
        self.bucket.store(&key, document).await?;
        Ok(key)
    }
}

#[async_trait]
impl BatchSink for CouchbaseSink {
    async fn emit_batch(&self, events: Vec<LogEvent>) -> Result<(), SinkError> {
        for event in &events {
            match self.store_event(event).await {
                Ok(_) => {
                    self.stored_documents.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.failed_documents.fetch_add(1, Ordering::Relaxed);
                    error!(bucket = %self.bucket_name, error = %e, "failed to store log event");
                }
            }
        }
        Ok(())
    }
}
