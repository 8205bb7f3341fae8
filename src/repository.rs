use crate::config::ApiSettings;
use crate::errors::{AppError, AppResult};
use crate::models::{
    LoginRequest, LoginResponse, SessionCredentials, Submission, SubmissionQuery, SubmissionsResponse,
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Request, Url};
use std::time::Duration;
use tracing::{debug, info};

pub const API_KEY_HEADER: &str = "X-API-Key";

// ==============================================================================
// Repository Boundary
// ==============================================================================

/// Backend operations the dashboard and login flow depend on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Authenticates a user for a specific tenant.
    async fn login(&self, tenant: &str, api_key: &str, request: &LoginRequest) -> AppResult<LoginResponse>;

    /// Retrieves the form submissions visible to the session's tenant.
    async fn fetch_submissions(
        &self,
        credentials: &SessionCredentials,
        query: &SubmissionQuery,
    ) -> AppResult<Vec<Submission>>;
}

// ==============================================================================
// HTTP Implementation
// ==============================================================================

pub struct HttpSubmissionRepository {
    client: Client,
    base_url: Url,
}

impl HttpSubmissionRepository {
    pub fn new(settings: &ApiSettings) -> AppResult<Self> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| AppError::Config(format!("Invalid API base URL {}: {}", settings.base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config(format!("API base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn login_request(&self, tenant: &str, api_key: &str, body: &LoginRequest) -> AppResult<Request> {
        let url = self.endpoint(&["api", tenant, "users", "login"])?;
        Ok(self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .build()?)
    }

    pub(crate) fn submissions_request(
        &self,
        credentials: &SessionCredentials,
        query: &SubmissionQuery,
    ) -> AppResult<Request> {
        let url = self.endpoint(&["api", &credentials.tenant, "forms"])?;
        Ok(self
            .client
            .get(url)
            .header(API_KEY_HEADER, &credentials.api_key)
            .header(AUTHORIZATION, credentials.authorization_header())
            .query(query)
            .build()?)
    }
}

#[async_trait]
impl SubmissionRepository for HttpSubmissionRepository {
    async fn login(&self, tenant: &str, api_key: &str, request: &LoginRequest) -> AppResult<LoginResponse> {
        let http_request = self.login_request(tenant, api_key, request)?;
        debug!(url = %http_request.url(), "Sending login request");

        let response: LoginResponse = self
            .client
            .execute(http_request)
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(user_id = response.user.id, tenant = %response.user.tenant, "Login accepted");
        Ok(response)
    }

    async fn fetch_submissions(
        &self,
        credentials: &SessionCredentials,
        query: &SubmissionQuery,
    ) -> AppResult<Vec<Submission>> {
        let http_request = self.submissions_request(credentials, query)?;
        debug!(url = %http_request.url(), "Fetching submissions");

        let response: SubmissionsResponse = self
            .client
            .execute(http_request)
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(count = response.data.len(), tenant = %credentials.tenant, "Submissions fetched");
        Ok(response.data)
    }
}
