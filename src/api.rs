use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::monitor::types::ActivitySample;

/// The original clients waited on the backend without a deadline; every
/// request here carries a bounded timeout instead.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("unexpected response from backend")]
    InvalidResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub rol: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    user: Option<AuthenticatedUser>,
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityRequest<'a> {
    machine_id: &'a str,
    user_id: i64,
    activities: &'a [ActivitySample],
}

#[derive(Deserialize)]
struct AdviceResponse {
    consejos: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    mensaje: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    respuesta: Option<String>,
    error: Option<String>,
}

/// Typed client for the SARA backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /api/login/`. A 401 maps to invalid credentials; other non-2xx
    /// responses surface the backend's `error` string when present.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, ApiError> {
        let response = self
            .http
            .post(self.url("/login/"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::InvalidCredentials);
        }
        if !status.is_success() {
            let message = response
                .json::<LoginResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| "authentication failed".to_string());
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let body: LoginResponse = response.json().await.map_err(|_| ApiError::InvalidResponse)?;
        body.user.ok_or(ApiError::InvalidResponse)
    }

    /// `POST /api/activity/` with the accumulated batch. Any 2xx is success.
    pub async fn send_activity(
        &self,
        machine_id: &str,
        user_id: i64,
        activities: &[ActivitySample],
    ) -> Result<(), ApiError> {
        debug!(
            "delivering {} activity samples for user {}",
            activities.len(),
            user_id
        );

        self.http
            .post(self.url("/activity/"))
            .json(&ActivityRequest {
                machine_id,
                user_id,
                activities,
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// `GET /api/consejos-proactivos/`. An empty advice string is treated the
    /// same as no advice at all.
    pub async fn proactive_advice(&self, auth_token: &str) -> Result<Option<String>, ApiError> {
        let body: AdviceResponse = self
            .http
            .get(self.url("/consejos-proactivos/"))
            .header("Authorization", auth_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.consejos.filter(|advice| !advice.trim().is_empty()))
    }

    /// `POST /api/asistente/chat/` relaying one user message to the assistant.
    pub async fn chat(&self, auth_token: &str, message: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/asistente/chat/"))
            .header("Authorization", auth_token)
            .json(&ChatRequest { mensaje: message })
            .send()
            .await?;

        let status = response.status();
        let body: ChatResponse = response.json().await.map_err(|_| ApiError::InvalidResponse)?;

        if let Some(error) = body.error {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: error,
            });
        }

        body.respuesta.ok_or(ApiError::InvalidResponse)
    }
}
