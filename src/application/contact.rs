//! Contact form intake with best-effort CRM sync.

use std::sync::Arc;

use cmsfront_types::{ContactRequest, FieldIssue};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::repos::CrmGateway;

pub const DEFAULT_INTEREST: &str = "General Inquiry";
pub const SUCCESS_MESSAGE: &str =
    "Thank you for your interest! We'll get back to you within 24 hours.";
const MIN_MESSAGE_CHARS: usize = 10;

/// A contact request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: Option<String>,
    pub company_size: Option<String>,
    pub interest_type: String,
    pub use_case: Option<String>,
    pub message: String,
    pub submitted_at: OffsetDateTime,
}

impl ContactSubmission {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

pub fn validate(request: ContactRequest) -> Result<ContactSubmission, Vec<FieldIssue>> {
    let mut issues = Vec::new();

    let first_name = request.first_name.trim().to_string();
    if first_name.is_empty() {
        issues.push(issue("firstName", "First name is required"));
    }

    let email = request.email.trim().to_string();
    if !looks_like_email(&email) {
        issues.push(issue("email", "Invalid email address"));
    }

    if request.message.trim().chars().count() < MIN_MESSAGE_CHARS {
        issues.push(issue(
            "message",
            "Please provide more details about your inquiry",
        ));
    }

    if !issues.is_empty() {
        return Err(issues);
    }

    Ok(ContactSubmission {
        first_name,
        last_name: request.last_name.trim().to_string(),
        email,
        company: optional(request.company),
        company_size: optional(request.company_size),
        interest_type: optional(request.interest_type)
            .unwrap_or_else(|| DEFAULT_INTEREST.to_string()),
        use_case: optional(request.use_case),
        message: request.message,
        submitted_at: OffsetDateTime::now_utc(),
    })
}

fn issue(path: &str, message: &str) -> FieldIssue {
    FieldIssue {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub struct ContactService {
    crm: Option<Arc<dyn CrmGateway>>,
}

/// Outcome of an accepted submission. The CRM sync runs detached; the handle
/// is only exposed so callers that care can wait for it.
pub struct ContactReceipt {
    pub crm_sync: Option<JoinHandle<()>>,
}

impl ContactService {
    pub fn new(crm: Option<Arc<dyn CrmGateway>>) -> Self {
        Self { crm }
    }

    pub fn submit(&self, request: ContactRequest) -> Result<ContactReceipt, Vec<FieldIssue>> {
        let submission = validate(request)?;

        info!(
            name = %submission.full_name(),
            email = %submission.email,
            company = submission.company.as_deref().unwrap_or("(not provided)"),
            interest_type = %submission.interest_type,
            "contact form submission received"
        );

        let crm_sync = match self.crm.clone() {
            Some(crm) => Some(tokio::spawn(async move {
                if let Err(err) = crm.submit_contact(&submission).await {
                    warn!(error = %err, email = %submission.email, "crm sync failed");
                }
            })),
            None => {
                warn!("crm is not configured; skipping contact sync");
                None
            }
        };

        Ok(ContactReceipt { crm_sync })
    }
}
