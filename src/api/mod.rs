//! Authorization interface for turning (action, bucket, object) into a signed URL.
//!
//! Storage only depends on the `Authorizer` trait; `DataApi` is the default
//! implementation talking to the data API over HTTP.

mod data_api;

pub use data_api::DataApi;

use std::fmt;

use crate::error::StorageError;

/// Storage action a signed URL is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    HeadObject,
    GetObject,
    PutObject,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::HeadObject => "head_object",
            Action::GetObject => "get_object",
            Action::PutObject => "put_object",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hands out short-lived signed URLs for one action on one object.
pub trait Authorizer: Send + Sync {
    /// Request a signed URL. `headers` are extra headers the signed request
    /// will carry (e.g. object metadata on uploads) and must be part of the
    /// signature.
    fn authorize(
        &self,
        action: Action,
        bucket: &str,
        object: &str,
        headers: &[(String, String)],
    ) -> Result<String, StorageError>;

    /// Whether a token is available for privileged actions.
    fn has_token(&self) -> bool;
}
