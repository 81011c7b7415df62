// REST transport for the grading and auth endpoints

use algolab_common::config::ClientConfig;
use algolab_common::routes;
use algolab_common::types::{
    CreateJobRequest, CreateJobResponse, ErrorBody, JobId, JobKind, JobStatusResponse,
    LoginRequest, LoginResponse, MfaRequest, MfaResponse, ProblemSummary,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ApiError;

/// The two calls the job poller needs from a grading backend.
///
/// `HttpApi` is the production implementation; tests script their own.
#[async_trait]
pub trait JobApi: Send + Sync + 'static {
    async fn create_job(
        &self,
        kind: JobKind,
        problem: &str,
        request: &CreateJobRequest,
    ) -> Result<JobId, ApiError>;

    async fn fetch_status(&self, kind: JobKind, job_id: &JobId)
        -> Result<JobStatusResponse, ApiError>;
}

#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            access_token: None,
        })
    }

    pub fn with_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        routes::join(&self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match &self.access_token {
            Some(token) => {
                let mut headers = HeaderMap::new();
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ApiError::Decode(format!("invalid access token: {}", e)))?;
                headers.insert(AUTHORIZATION, value);
                Ok(builder.headers(headers))
            }
            None => Ok(builder),
        }
    }

    /// POST /auth/login
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .client
            .post(self.url(routes::LOGIN))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    /// POST /auth/login/mfa
    pub async fn verify_mfa(&self, mfa_token: &str, code: &str) -> Result<MfaResponse, ApiError> {
        let body = MfaRequest {
            mfa_token: mfa_token.to_string(),
            code: code.to_string(),
        };
        let response = self
            .client
            .post(self.url(routes::LOGIN_MFA))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    /// POST /auth/logout. Best effort: the local session is cleared regardless.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = self.authorized(self.client.post(self.url(routes::LOGOUT)))?;
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from(response).await)
        }
    }

    /// GET /problems
    pub async fn list_problems(&self) -> Result<Vec<ProblemSummary>, ApiError> {
        let request = self.authorized(self.client.get(self.url(routes::PROBLEMS)))?;
        let response = request.send().await?;
        decode(response).await
    }
}

#[async_trait]
impl JobApi for HttpApi {
    async fn create_job(
        &self,
        kind: JobKind,
        problem: &str,
        request: &CreateJobRequest,
    ) -> Result<JobId, ApiError> {
        let url = self.url(&routes::create_job_path(kind, problem));
        debug!(kind = %kind, problem, url = %url, "Creating job");

        let builder = self.authorized(self.client.post(url).json(request))?;
        let response = builder.send().await?;
        let created: CreateJobResponse = decode(response).await?;
        Ok(created.id)
    }

    async fn fetch_status(
        &self,
        kind: JobKind,
        job_id: &JobId,
    ) -> Result<JobStatusResponse, ApiError> {
        let url = self.url(&routes::job_status_path(kind, job_id));
        let builder = self.authorized(self.client.get(url))?;
        let response = builder.send().await?;
        decode(response).await
    }
}

/// Decode a 2xx body as `T`, or turn the response into `ApiError::Server`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn error_from(response: Response) -> ApiError {
    let status = response.status();
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    };

    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| fallback()),
        Err(e) => {
            warn!(status = %status, error = %e, "Failed to read error body");
            fallback()
        }
    };

    ApiError::Server { status, message }
}
