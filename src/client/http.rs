//! Blocking JSON client for the contact service.

use std::time::Duration;

use crate::{
    contact::{ContactDraft, ContactRecord},
    types::ContactId,
};

use super::{ClientError, ContactApi};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation of [`ContactApi`] over a pooled [`ureq::Agent`].
pub struct DirectoryClient {
    agent: ureq::Agent,
    base_url: String,
}

impl DirectoryClient {
    /// Creates a client for `base_url`, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client with explicit connect and read/write timeouts.
    pub fn with_timeouts(base_url: impl Into<String>, connect: Duration, request: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect)
            .timeout_read(request)
            .timeout_write(request)
            .build();
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { agent, base_url }
    }

    fn contacts_url(&self) -> String {
        format!("{}/contacts", self.base_url)
    }

    fn contact_url(&self, id: ContactId) -> String {
        format!("{}/contacts/{id}", self.base_url)
    }

    fn send_draft(
        &self,
        req: ureq::Request,
        draft: &ContactDraft,
    ) -> Result<ContactRecord, ClientError> {
        let payload = serde_json::to_string(draft)
            .map_err(|e| ClientError::Transport(format!("request encode failed: {e}")))?;
        let resp = req
            .set("content-type", "application/json")
            .send_string(&payload)
            .map_err(map_ureq_err)?;
        decode_body(resp)
    }
}

impl ContactApi for DirectoryClient {
    fn list_contacts(&self) -> Result<Vec<ContactRecord>, ClientError> {
        let resp = self
            .agent
            .get(&self.contacts_url())
            .call()
            .map_err(map_ureq_err)?;
        decode_body(resp)
    }

    fn create_contact(&self, draft: &ContactDraft) -> Result<ContactRecord, ClientError> {
        self.send_draft(self.agent.post(&self.contacts_url()), draft)
    }

    fn update_contact(
        &self,
        id: ContactId,
        draft: &ContactDraft,
    ) -> Result<ContactRecord, ClientError> {
        self.send_draft(self.agent.put(&self.contact_url(id)), draft)
    }

    fn delete_contact(&self, id: ContactId) -> Result<(), ClientError> {
        self.agent
            .delete(&self.contact_url(id))
            .call()
            .map_err(map_ureq_err)?;
        Ok(())
    }
}

fn map_ureq_err(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, resp) => ClientError::Rejected {
            status,
            message: rejection_message(resp),
        },
        ureq::Error::Transport(err) => ClientError::Transport(err.to_string()),
    }
}

fn rejection_message(resp: ureq::Response) -> String {
    let fallback = resp.status_text().to_string();
    resp.into_string()
        .ok()
        .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(fallback)
}

fn decode_body<T: serde::de::DeserializeOwned>(resp: ureq::Response) -> Result<T, ClientError> {
    let body = resp
        .into_string()
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}
