//! Bridge to the remote summarization service.
//!
//! A salesperson's concatenated call rationales are posted to the service,
//! which answers with a short prose verdict. The call is best effort: every
//! failure is turned into a fixed, user-displayable message.

use crate::config::EvaluatorConfig;
use crate::types::Salesperson;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const PROMPT_PREFIX: &str = "请整合以下一或多段录音评价理由，列出1234但不要加粗或变为标题格式，保留一些录音中的例子，不要出现评分数据，不要改变内容和例子或创造新的数据，字数150字以内：";

pub const MSG_TIMEOUT: &str = "评价生成超时，请稍后重试";
pub const MSG_NO_RESPONSE: &str = "评价生成失败：无法连接到服务器";
pub const MSG_MALFORMED: &str = "评价生成失败：API 返回格式异常";
pub const MSG_GENERIC: &str = "评价生成失败，请稍后重试";

#[derive(Debug, Serialize)]
struct EvaluationRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct EvaluationResponse {
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("evaluation request timed out")]
    Timeout,
    #[error("evaluation service answered {status} {reason}")]
    Status { status: u16, reason: String },
    #[error("evaluation service unreachable: {0}")]
    NoResponse(String),
    #[error("evaluation response had no result")]
    Malformed,
    #[error("evaluation failed: {0}")]
    Other(String),
}

impl EvaluationError {
    /// Fixed message shown to the user in place of a verdict.
    pub fn user_message(&self) -> String {
        match self {
            EvaluationError::Timeout => MSG_TIMEOUT.to_string(),
            EvaluationError::Status { status, reason } => {
                format!("评价生成失败：{status} - {reason}")
            }
            EvaluationError::NoResponse(_) => MSG_NO_RESPONSE.to_string(),
            EvaluationError::Malformed => MSG_MALFORMED.to_string(),
            EvaluationError::Other(_) => MSG_GENERIC.to_string(),
        }
    }
}

impl From<reqwest::Error> for EvaluationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EvaluationError::Timeout
        } else if err.is_connect() || (err.is_request() && err.status().is_none()) {
            // Sent but never answered counts the same as never connected.
            EvaluationError::NoResponse(err.to_string())
        } else if err.is_decode() {
            EvaluationError::Malformed
        } else {
            EvaluationError::Other(err.to_string())
        }
    }
}

/// The message sent for one salesperson.
pub fn evaluation_prompt(rationale: &str) -> String {
    format!("{PROMPT_PREFIX}\n{rationale}")
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    http: reqwest::Client,
    url: String,
}

impl Evaluator {
    pub fn new(config: &EvaluatorConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }

    /// Post a message and return the service's verdict.
    pub async fn request(&self, message: &str) -> Result<String, EvaluationError> {
        let response = self
            .http
            .post(&self.url)
            .json(&EvaluationRequest { message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvaluationError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body: EvaluationResponse = response.json().await?;
        match body.result {
            Some(result) if !result.trim().is_empty() => Ok(result),
            _ => Err(EvaluationError::Malformed),
        }
    }

    /// Verdict for a salesperson, or the user-facing failure message.
    pub async fn evaluate(&self, person: &Salesperson) -> String {
        debug!(salesperson = %person.name, calls = person.call_count, "requesting evaluation");
        match self.request(&evaluation_prompt(&person.rationale)).await {
            Ok(result) => result,
            Err(err) => {
                warn!(salesperson = %person.name, error = %err, "evaluation failed");
                err.user_message()
            }
        }
    }
}
