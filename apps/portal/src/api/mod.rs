#![allow(dead_code)]

/// API Client — the single point of entry for all portal backend calls.
///
/// ARCHITECTURAL RULE: No other module may issue HTTP requests directly.
/// All backend interactions MUST go through this module, so the bearer
/// token and the request timeout are applied in exactly one place.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::PortalError;
use crate::models::{ApplicationHistory, Job, JobId, ProfileRecord};

/// Result of a history fetch. A transport failure is NOT the same thing as
/// "no applications yet": callers keep their cached state and flag it stale
/// instead of conflating the two.
#[derive(Debug)]
pub enum HistoryFetch {
    Loaded(ApplicationHistory),
    Failed,
}

#[derive(Debug, Serialize)]
struct BatchApplyRequest<'a> {
    profile_id: &'a str,
    job_ids: &'a [JobId],
}

/// Response body of `POST apply/`. `applied_count` may be less than the
/// requested count when some ids were already recorded server-side; it is
/// surfaced to the user verbatim, never explained by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchApplyResponse {
    pub applied_count: u64,
    #[serde(default)]
    pub job_ids: Vec<JobId>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailApplyRequest {
    pub profile_id: String,
    pub job_id: JobId,
    pub company_email: String,
    pub job_title: String,
    pub company_name: String,
}

/// Response body of `POST apply/email`. Only an explicit `success: true`
/// advances the job to applied.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailApplyResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: String,
}

/// The network seam of the portal core. `ApiClient` is the production
/// implementation; tests inject scripted doubles.
#[async_trait]
pub trait JobsApi: Send + Sync {
    async fn fetch_profile(&self) -> Result<ProfileRecord, PortalError>;

    /// Jobs come back in server-supplied order; no client-side sorting or
    /// filtering is applied.
    async fn fetch_matched_jobs(&self, profile_id: &str) -> Result<Vec<Job>, PortalError>;

    async fn fetch_history(&self) -> HistoryFetch;

    async fn submit_batch_apply(
        &self,
        profile_id: &str,
        job_ids: &[JobId],
    ) -> Result<BatchApplyResponse, PortalError>;

    async fn submit_email_apply(
        &self,
        request: &EmailApplyRequest,
    ) -> Result<EmailApplyResponse, PortalError>;
}

/// HTTP client for the portal backend. One shared connection pool, one
/// construction-time timeout, bearer auth on every request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: String, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PortalError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PortalError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PortalError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = parse_error_detail(&body).unwrap_or(body);
            return Err(PortalError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl JobsApi for ApiClient {
    async fn fetch_profile(&self) -> Result<ProfileRecord, PortalError> {
        self.get_json("profile/me").await
    }

    async fn fetch_matched_jobs(&self, profile_id: &str) -> Result<Vec<Job>, PortalError> {
        let jobs: Vec<Job> = self.get_json(&format!("jobs/matched/{profile_id}")).await?;
        debug!("fetched {} matched jobs", jobs.len());
        Ok(jobs)
    }

    async fn fetch_history(&self) -> HistoryFetch {
        match self.get_json::<ApplicationHistory>("apply/status").await {
            Ok(history) => HistoryFetch::Loaded(history),
            Err(e) => {
                // A new user with no applications and a dropped connection look
                // the same on the wire; the caller keeps its cache and flags it.
                warn!("application history fetch failed: {e}");
                HistoryFetch::Failed
            }
        }
    }

    async fn submit_batch_apply(
        &self,
        profile_id: &str,
        job_ids: &[JobId],
    ) -> Result<BatchApplyResponse, PortalError> {
        let request = BatchApplyRequest {
            profile_id,
            job_ids,
        };
        self.post_json("apply/", &request).await
    }

    async fn submit_email_apply(
        &self,
        request: &EmailApplyRequest,
    ) -> Result<EmailApplyResponse, PortalError> {
        self.post_json("apply/email", request).await
    }
}

/// Extracts the `detail` field from a backend error body, if it has one.
fn parse_error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.detail)
        .ok()
}
