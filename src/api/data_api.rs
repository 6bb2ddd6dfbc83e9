//! Authorization over HTTP against the data API.

use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::StorageError;
use crate::http::{self, HttpOptions};

use super::{Action, Authorizer};

#[derive(Debug, Deserialize)]
struct Answer {
    code: u32,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<AnswerData>,
}

#[derive(Debug, Deserialize)]
struct AnswerData {
    url: String,
}

/// Token-authenticated client for the authorization endpoint.
#[derive(Debug, Clone)]
pub struct DataApi {
    token: Option<String>,
    api_url: String,
    token_header: String,
    http: HttpOptions,
}

impl DataApi {
    pub fn new(token: Option<String>, cfg: &ClientConfig) -> Self {
        Self {
            token,
            api_url: cfg.api_url.clone(),
            token_header: cfg.token_header.clone(),
            http: HttpOptions::from_config(cfg),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn endpoint(&self, action: Action, bucket: &str, object: &str) -> Result<String, StorageError> {
        let raw = self
            .api_url
            .replace("{action}", action.as_str())
            .replace("{bucket}", bucket)
            .replace("{object}", object);
        url::Url::parse(&raw).map_err(|source| StorageError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        Ok(raw)
    }
}

impl Authorizer for DataApi {
    fn authorize(
        &self,
        action: Action,
        bucket: &str,
        object: &str,
        headers: &[(String, String)],
    ) -> Result<String, StorageError> {
        let token = self.token.as_deref().ok_or_else(|| {
            StorageError::InvalidArgument(format!(
                "{} on '{}' requires a token; create the client with one",
                action, object
            ))
        })?;
        let endpoint = self.endpoint(action, bucket, object)?;
        let mut request_headers = vec![(self.token_header.clone(), token.to_string())];
        request_headers.extend(headers.iter().cloned());

        tracing::debug!(%action, bucket, object, "requesting signed URL");
        let (status, body) = http::get(&endpoint, &request_headers, &self.http)?;
        parse_answer(status, &body)
    }

    fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

/// Turn the authorization response into a signed URL.
fn parse_answer(status: u32, body: &[u8]) -> Result<String, StorageError> {
    if status != 200 {
        return Err(StorageError::Api {
            status,
            message: String::from_utf8_lossy(body).into_owned(),
        });
    }
    let answer: Answer = serde_json::from_slice(body).map_err(|e| StorageError::Api {
        status,
        message: format!("malformed answer: {}", e),
    })?;
    if answer.code != 200 {
        return Err(StorageError::Api {
            status: answer.code,
            message: answer.message.unwrap_or_default(),
        });
    }
    answer
        .data
        .map(|d| d.url)
        .ok_or_else(|| StorageError::Api {
            status: answer.code,
            message: "answer carries no signed URL".to_string(),
        })
}
