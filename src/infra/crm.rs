//! Attio adapter receiving contact form leads.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url, header::AUTHORIZATION};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::application::contact::ContactSubmission;
use crate::application::repos::{CrmGateway, RepoError};
use crate::infra::error::InfraError;

pub const DEFAULT_API_URL: &str = "https://api.attio.com/v2";
pub const DEFAULT_LIST: &str = "iv_cms_site";

#[derive(Clone, Debug)]
pub struct AttioClient {
    client: Client,
    base: Url,
    api_key: String,
    list: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PersonRecord {
    id: RecordId,
}

#[derive(Debug, Deserialize)]
struct RecordId {
    record_id: String,
}

impl AttioClient {
    pub fn new(
        api_url: &str,
        api_key: impl Into<String>,
        list: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let base = Url::parse(&format!("{}/", api_url.trim_end_matches('/'))).map_err(|err| {
            InfraError::configuration("crm api url", format!("`{api_url}`: {err}"))
        })?;
        let client = Client::builder()
            .user_agent(concat!("cmsfront/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client("crm", err))?;

        Ok(Self {
            client,
            base,
            api_key: api_key.into(),
            list: list.into(),
        })
    }

    /// Finds the person by email or creates them; returns the record id.
    async fn assert_person(&self, submission: &ContactSubmission) -> Result<String, RepoError> {
        let body = json!({
            "data": {
                "values": {
                    "name": [{
                        "first_name": submission.first_name,
                        "last_name": submission.last_name,
                        "full_name": submission.full_name(),
                    }],
                    "email_addresses": [{ "email_address": submission.email }],
                }
            }
        });
        let person: Envelope<PersonRecord> = self
            .send(
                Method::PUT,
                "objects/people/records?matching_attribute=email_addresses",
                &body,
            )
            .await?;
        Ok(person.data.id.record_id)
    }

    async fn add_list_entry(
        &self,
        record_id: &str,
        submission: &ContactSubmission,
    ) -> Result<(), RepoError> {
        let body = json!({
            "data": {
                "parent_record_id": record_id,
                "parent_object": "people",
                "entry_values": entry_values(submission),
            }
        });
        let path = format!("lists/{}/entries", self.list);
        let _: Value = self.send(Method::POST, &path, &body).await?;
        Ok(())
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<T, RepoError> {
        let url = self.base.join(path).map_err(RepoError::transport)?;
        debug!(%method, url = %url, "crm request");

        let response = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport)?;
        if !status.is_success() {
            return Err(RepoError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        serde_json::from_slice(&bytes).map_err(RepoError::decode)
    }
}

fn map_transport(err: reqwest::Error) -> RepoError {
    if err.is_timeout() {
        RepoError::Timeout
    } else {
        RepoError::transport(err)
    }
}

fn entry_values(submission: &ContactSubmission) -> Map<String, Value> {
    let mut values = Map::new();
    values.insert("interest_type".into(), json!(submission.interest_type));
    values.insert("message".into(), json!(submission.message));
    values.insert(
        "submitted_at".into(),
        json!(submission.submitted_at.format(&Rfc3339).unwrap_or_default()),
    );

    let optional = [
        ("company", &submission.company),
        ("company_size", &submission.company_size),
        ("use_case", &submission.use_case),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            values.insert(key.into(), json!(value));
        }
    }
    values
}

#[async_trait]
impl CrmGateway for AttioClient {
    async fn submit_contact(&self, submission: &ContactSubmission) -> Result<(), RepoError> {
        let record_id = self.assert_person(submission).await?;
        self.add_list_entry(&record_id, submission).await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use time::macros::datetime;

    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            company: Some("Analytical Engines".into()),
            company_size: None,
            interest_type: "General Inquiry".into(),
            use_case: None,
            message: "Please show us the product.".into(),
            submitted_at: datetime!(2024-03-01 12:00 UTC),
        }
    }

    #[test]
    fn entry_values_skip_absent_fields() {
        let values = entry_values(&submission());
        assert_eq!(values["company"], "Analytical Engines");
        assert_eq!(values["submitted_at"], "2024-03-01T12:00:00Z");
        assert!(!values.contains_key("company_size"));
        assert!(!values.contains_key("use_case"));
    }

    #[tokio::test]
    async fn upserts_person_then_adds_list_entry() {
        let server = MockServer::start_async().await;
        let person = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/v2/objects/people/records")
                    .query_param("matching_attribute", "email_addresses")
                    .header("authorization", "Bearer attio-key");
                then.status(200)
                    .json_body(json!({"data": {"id": {"record_id": "rec-42"}}}));
            })
            .await;
        let entry = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/lists/leads/entries")
                    .json_body_includes(r#"{"data": {"parent_record_id": "rec-42", "parent_object": "people"}}"#);
                then.status(200).json_body(json!({"data": {}}));
            })
            .await;

        let client = AttioClient::new(
            &server.url("/v2"),
            "attio-key",
            "leads",
            Duration::from_secs(2),
        )
        .expect("client");
        client.submit_contact(&submission()).await.expect("submitted");

        person.assert_async().await;
        entry.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_upsert_surfaces_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT);
                then.status(403).body("forbidden");
            })
            .await;

        let client =
            AttioClient::new(&server.base_url(), "k", DEFAULT_LIST, Duration::from_secs(2))
                .expect("client");
        let err = client
            .submit_contact(&submission())
            .await
            .expect_err("rejected");
        assert!(matches!(err, RepoError::Status { status: 403, .. }));
    }
}
