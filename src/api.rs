//! HTTP clients for the external identity and report services
//!
//! Both are one-shot request/response surfaces: an auth failure
//! redirects the user away (no retry), and a report failure surfaces
//! exactly once to the caller (no automatic retry).

use reqwest::StatusCode;

use crate::error::{AuthError, ReportError};
use crate::protocol::{Role, StudentReport, UserProfile};

/// Client for the identity service (`GET /me`)
#[derive(Clone)]
pub struct IdentityClient {
    base_url: String,
    http: reqwest::Client,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the current user's profile
    pub async fn me(&self) -> Result<UserProfile, AuthError> {
        let url = format!("{}/me", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::Unauthorized),
            status if status.is_success() => response
                .json::<UserProfile>()
                .await
                .map_err(|e| AuthError::RequestFailed(e.to_string())),
            status => Err(AuthError::RequestFailed(format!(
                "identity service returned {}",
                status
            ))),
        }
    }

    /// Fetch the profile and require a specific role; wrong-role users
    /// are turned away
    pub async fn require_role(&self, expected: Role) -> Result<UserProfile, AuthError> {
        let profile = self.me().await?;
        if profile.role != expected {
            return Err(AuthError::WrongRole {
                expected: expected.to_string(),
                actual: profile.role.to_string(),
            });
        }
        Ok(profile)
    }
}

/// Client for the report service (`GET /report/student/{id}`)
#[derive(Clone)]
pub struct ReportClient {
    base_url: String,
    http: reqwest::Client,
}

impl ReportClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the accumulated report for one student.
    ///
    /// Requested only on an explicit stop-session action; callers
    /// surface a failure once and do not retry.
    pub async fn student_report(&self, student_id: &str) -> Result<StudentReport, ReportError> {
        let url = format!(
            "{}/report/student/{}",
            self.base_url.trim_end_matches('/'),
            student_id
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ReportError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ReportError::StudentNotFound(student_id.to_string())),
            status if status.is_success() => response
                .json::<StudentReport>()
                .await
                .map_err(|e| ReportError::RequestFailed(e.to_string())),
            status => Err(ReportError::BadStatus(status.as_u16())),
        }
    }
}
