//! Upstash REST adapter for the KV snapshot store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::application::repos::{KvBackend, RepoError};
use crate::infra::error::InfraError;

/// Speaks the Upstash REST protocol: every command is a JSON array posted to
/// the database URL, answered with `{"result": ...}` or `{"error": "..."}`.
#[derive(Clone, Debug)]
pub struct UpstashClient {
    client: Client,
    url: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl UpstashClient {
    pub fn new(url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, InfraError> {
        let url = Url::parse(url)
            .map_err(|err| InfraError::configuration("kv url", format!("`{url}`: {err}")))?;
        let client = Client::builder()
            .user_agent(concat!("cmsfront/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client("kv", err))?;

        Ok(Self {
            client,
            url,
            token: token.into(),
        })
    }

    async fn command(&self, args: Value) -> Result<Value, RepoError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&args)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport)?;
        let reply: Option<Reply> = serde_json::from_slice(&bytes).ok();

        match reply {
            Some(Reply {
                error: Some(message),
                ..
            }) => {
                if status.is_success() {
                    Err(RepoError::Command(message))
                } else {
                    Err(RepoError::Status {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
            Some(reply) if status.is_success() => Ok(reply.result),
            Some(_) | None if !status.is_success() => Err(RepoError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            }),
            _ => Err(RepoError::decode("reply is neither a result nor an error")),
        }
    }
}

fn map_transport(err: reqwest::Error) -> RepoError {
    if err.is_timeout() {
        RepoError::Timeout
    } else {
        RepoError::transport(err)
    }
}

fn string_list(value: Value) -> Result<Vec<String>, RepoError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                other => Err(RepoError::decode(format!("expected string member, got {other}"))),
            })
            .collect(),
        other => Err(RepoError::decode(format!("expected array, got {other}"))),
    }
}

/// `JSON.GET` answers with the serialized document; some proxies hand back
/// the parsed value instead, so both shapes are accepted.
fn json_document(value: Value) -> Result<Option<Value>, RepoError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(RepoError::decode),
        other => Ok(Some(other)),
    }
}

#[async_trait]
impl KvBackend for UpstashClient {
    async fn zrange(&self, key: &str, rev: bool) -> Result<Vec<String>, RepoError> {
        let args = if rev {
            json!(["ZRANGE", key, 0, -1, "REV"])
        } else {
            json!(["ZRANGE", key, 0, -1])
        };
        string_list(self.command(args).await?)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, RepoError> {
        string_list(self.command(json!(["SMEMBERS", key])).await?)
    }

    async fn json_get(&self, key: &str) -> Result<Option<Value>, RepoError> {
        json_document(self.command(json!(["JSON.GET", key])).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, RepoError> {
        match self.command(json!(["GET", key])).await? {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(text)),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn ping(&self) -> Result<(), RepoError> {
        match self.command(json!(["PING"])).await? {
            Value::String(reply) if reply.eq_ignore_ascii_case("pong") => Ok(()),
            other => Err(RepoError::decode(format!("unexpected ping reply {other}"))),
        }
    }
}
