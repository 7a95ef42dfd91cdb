//! Code execution collaborator.
//!
//! The duel server never compiles or runs code itself. It forwards submissions to a judge
//! service and consumes the structured verdict.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::JudgeConfig;
use crate::protocol::{ErrorCode, QuestionRef};

/// Raw judge output, before the server stamps elapsed time and score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub success: bool,
    #[serde(default)]
    pub total_passed: u32,
    #[serde(default)]
    pub total_failed: u32,
    #[serde(default)]
    pub complexity: Option<String>,
    /// Compile error, runtime error or other detail for the submitter.
    #[serde(default)]
    pub error: Option<String>,
}

/// One code run request.
#[derive(Debug, Clone, Serialize)]
pub struct JudgeRequest {
    pub question: String,
    pub language: String,
    pub code: String,
}

impl JudgeRequest {
    pub fn new(question: &QuestionRef, language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            question: question.slug.clone(),
            language: language.into(),
            code: code.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("no judge service is configured")]
    Unavailable,
    #[error("judge request timed out")]
    Timeout,
    #[error("judge returned HTTP {0}")]
    Status(u16),
    #[error("judge transport error: {0}")]
    Transport(String),
    #[error("judge returned an unreadable verdict: {0}")]
    InvalidResponse(String),
}

impl JudgeError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Unavailable => ErrorCode::JudgeUnavailable,
            _ => ErrorCode::InternalError,
        }
    }
}

#[async_trait]
pub trait Judge: Send + Sync {
    /// Run the question's sample tests only.
    async fn run_sample(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError>;

    /// Run the full test suite.
    async fn run_all(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError>;
}

/// Judge reached over HTTP: `POST {base}/run-sample` and `POST {base}/run-all`.
pub struct HttpJudge {
    client: reqwest::Client,
    run_sample_url: Url,
    run_all_url: Url,
}

impl HttpJudge {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            run_sample_url: base.join("run-sample")?,
            run_all_url: base.join("run-all")?,
        })
    }

    async fn post(&self, url: &Url, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        let response = self
            .client
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(JudgeError::Status(status.as_u16()));
        }
        response
            .json::<JudgeVerdict>()
            .await
            .map_err(|err| JudgeError::InvalidResponse(err.to_string()))
    }
}

fn classify(err: reqwest::Error) -> JudgeError {
    if err.is_timeout() {
        JudgeError::Timeout
    } else {
        JudgeError::Transport(err.to_string())
    }
}

#[async_trait]
impl Judge for HttpJudge {
    async fn run_sample(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        self.post(&self.run_sample_url, request).await
    }

    async fn run_all(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        self.post(&self.run_all_url, request).await
    }
}

/// Stand-in used when no judge is configured; every run fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableJudge;

#[async_trait]
impl Judge for UnavailableJudge {
    async fn run_sample(&self, _request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        Err(JudgeError::Unavailable)
    }

    async fn run_all(&self, _request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        Err(JudgeError::Unavailable)
    }
}

pub fn from_config(config: &JudgeConfig) -> anyhow::Result<Arc<dyn Judge>> {
    match config.base_url.as_deref() {
        Some(base_url) => {
            tracing::info!(%base_url, "Using HTTP judge");
            Ok(Arc::new(HttpJudge::new(
                base_url,
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        None => {
            tracing::warn!("No judge.base_url configured; submissions will fail");
            Ok(Arc::new(UnavailableJudge))
        }
    }
}
