//! Backend traits describing the external stores the site talks to.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::application::contact::ContactSubmission;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("command rejected: {0}")]
    Command(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RepoError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Read-only view of a Redis-compatible key-value store.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Members of a sorted set, lowest score first unless `rev` is set.
    async fn zrange(&self, key: &str, rev: bool) -> Result<Vec<String>, RepoError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, RepoError>;

    /// A JSON document stored with RedisJSON; `None` when the key is absent.
    async fn json_get(&self, key: &str) -> Result<Option<Value>, RepoError>;

    async fn get(&self, key: &str) -> Result<Option<String>, RepoError>;

    async fn ping(&self) -> Result<(), RepoError>;
}

/// Downstream CRM receiving contact form leads.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    async fn submit_contact(&self, submission: &ContactSubmission) -> Result<(), RepoError>;
}
