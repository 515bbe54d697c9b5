use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Error type for the document store boundary.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to connect to cluster: {0}")]
    Connection(String),

    #[error("bucket {0:?} does not exist")]
    BucketNotFound(String),

    #[error("failed to store document {key:?}: {reason}")]
    Store { key: String, reason: String },

    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// User name and password passed to the cluster on connect.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A bucket that persists JSON documents under string keys.
///
/// Implemented on top of the vendor client; this crate never speaks the
/// wire protocol itself.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store `document` under `key`.
    async fn store(&self, key: &str, document: serde_json::Value) -> Result<(), StoreError>;
}

/// An open connection to a cluster.
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    async fn open_bucket(&self, bucket: &str) -> Result<Arc<dyn DocumentStore>, StoreError>;
}

/// Opens cluster connections from a list of server URIs.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(
        &self,
        servers: &[String],
        credentials: Option<&Credentials>,
    ) -> Result<Arc<dyn Cluster>, StoreError>;
}

/// In-process cluster keeping documents in memory.
///
/// Acts as its own connector. Useful for tests and demos, and for
/// measuring pipeline overhead without a server.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    buckets: Arc<Mutex<BTreeMap<String, Arc<MemoryBucket>>>>,
    /// Server lists seen by `connect`, in call order.
    connections: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or return the existing) bucket named `name`.
    pub async fn create_bucket(&self, name: &str) -> Arc<MemoryBucket> {
        let mut buckets = self.buckets.lock().await;
        Arc::clone(buckets.entry(name.to_string()).or_default())
    }

    pub async fn bucket(&self, name: &str) -> Option<Arc<MemoryBucket>> {
        self.buckets.lock().await.get(name).cloned()
    }

    pub async fn connections(&self) -> Vec<Vec<String>> {
        self.connections.lock().await.clone()
    }
}

#[async_trait]
impl ClusterConnector for MemoryCluster {
    async fn connect(
        &self,
        servers: &[String],
        _credentials: Option<&Credentials>,
    ) -> Result<Arc<dyn Cluster>, StoreError> {
        if servers.is_empty() {
            return Err(StoreError::Connection("no servers given".to_string()));
        }
        self.connections.lock().await.push(servers.to_vec());
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Cluster for MemoryCluster {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        Ok(self.buckets.lock().await.contains_key(bucket))
    }

    async fn open_bucket(&self, bucket: &str) -> Result<Arc<dyn DocumentStore>, StoreError> {
        match self.bucket(bucket).await {
            Some(b) => Ok(b as Arc<dyn DocumentStore>),
            None => Err(StoreError::BucketNotFound(bucket.to_string())),
        }
    }
}

/// Bucket of [`MemoryCluster`].
#[derive(Default)]
pub struct MemoryBucket {
    documents: Mutex<BTreeMap<String, serde_json::Value>>,
    attempts: AtomicUsize,
    failing_attempts: Mutex<BTreeSet<usize>>,
    reject_all: AtomicBool,
}

impl MemoryBucket {
    /// Make every subsequent `store` fail (or succeed again).
    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Make the store attempt with the given zero-based index fail.
    pub async fn fail_attempt(&self, attempt: usize) {
        self.failing_attempts.lock().await.insert(attempt);
    }

    /// Number of `store` calls so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn documents(&self) -> BTreeMap<String, serde_json::Value> {
        self.documents.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryBucket {
    async fn store(&self, key: &str, document: serde_json::Value) -> Result<(), StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_all.load(Ordering::SeqCst)
            || self.failing_attempts.lock().await.contains(&attempt)
        {
            return Err(StoreError::Store {
                key: key.to_string(),
                reason: "rejected by bucket".to_string(),
            });
        }
        self.documents.lock().await.insert(key.to_string(), document);
        Ok(())
    }
}
