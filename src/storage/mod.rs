//! Bucket storage: object probing, multipart discovery, download and upload.
//!
//! Every request goes to a signed URL. Objects in the public bucket are read
//! through the public URL template; everything else is authorized per
//! request by the `Authorizer`.

mod builder;
mod download;
mod parts;
mod upload;
mod writer;

pub use builder::StorageWriterBuilder;
pub use parts::{destination_name, part_name};
pub use upload::{SeekRead, UploadSource};
pub use writer::StorageWriter;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{Action, Authorizer};
use crate::config::{ClientConfig, PUBLIC_BUCKET};
use crate::error::StorageError;
use crate::http::{self, HttpOptions, ResponseHeaders};

/// Metadata header carried by every part of a multipart object.
pub const NUMBER_OF_PARTS_HEADER: &str = "x-amz-meta-number-of-parts";

/// Parts are suffixed with a 3-digit index, so at most 1000 are addressable.
pub const MAX_PARTS: usize = 1000;

/// Temp file suffix used before the atomic rename into place.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Result of a HEAD on one object.
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub object: String,
    /// Final HTTP status (never 404, which is reported as `NotFound`).
    pub status: u32,
    pub headers: ResponseHeaders,
}

impl ObjectHead {
    pub fn is_success(&self) -> bool {
        http::is_success(self.status)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers.content_length()
    }

    /// Value of the `number-of-parts` metadata; 1 when absent.
    pub fn number_of_parts(&self) -> Result<usize, StorageError> {
        match self.headers.get(NUMBER_OF_PARTS_HEADER) {
            None => Ok(1),
            Some(v) => match v.trim().parse::<usize>() {
                Ok(n) if (1..=MAX_PARTS).contains(&n) => Ok(n),
                _ => Err(StorageError::Metadata {
                    object: self.object.clone(),
                    value: v.to_string(),
                }),
            },
        }
    }

    /// Error for a probe that neither succeeded nor returned 404.
    fn failure(&self) -> StorageError {
        StorageError::Transfer {
            status: self.status,
            body: format!("HEAD '{}' failed", self.object),
        }
    }
}

/// One bucket, addressed by its short name (e.g. `user`, `public`).
#[derive(Clone)]
pub struct Storage {
    name: String,
    full_name: String,
    api: Arc<dyn Authorizer>,
    config: Arc<ClientConfig>,
    http: HttpOptions,
}

impl Storage {
    pub fn new(api: Arc<dyn Authorizer>, name: &str, config: Arc<ClientConfig>) -> Self {
        Self {
            name: name.to_string(),
            full_name: config.full_bucket_name(name),
            http: HttpOptions::from_config(&config),
            api,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn is_public(&self) -> bool {
        self.name == PUBLIC_BUCKET
    }

    /// Fails with `InvalidArgument` when a privileged call has no token.
    fn check_token(&self, resource: &str) -> Result<(), StorageError> {
        if self.api.has_token() {
            return Ok(());
        }
        Err(StorageError::InvalidArgument(format!(
            "Storage[{}].{} requires a valid token; create the client with a token",
            self.name, resource
        )))
    }

    /// Signed URL for `action` on `object`. Reads from the public bucket
    /// bypass authorization.
    fn signed_url(
        &self,
        action: Action,
        object: &str,
        headers: &[(String, String)],
    ) -> Result<String, StorageError> {
        if self.is_public() && action != Action::PutObject {
            let url = self
                .config
                .public_storage_url
                .replace("{bucket}", &self.name)
                .replace("{object}", object);
            url::Url::parse(&url).map_err(|source| StorageError::InvalidUrl {
                url: url.clone(),
                source,
            })?;
            return Ok(url);
        }
        self.check_token(action.as_str())?;
        self.api.authorize(action, &self.full_name, object, headers)
    }

    /// HEAD one object. 404 is `NotFound`; other statuses are returned for
    /// inspection.
    pub fn head(&self, object: &str) -> Result<ObjectHead, StorageError> {
        let url = self.signed_url(Action::HeadObject, object, &[])?;
        let (status, headers) = http::head(&url, &self.http)?;
        if status == 404 {
            return Err(StorageError::NotFound(object.to_string()));
        }
        Ok(ObjectHead {
            object: object.to_string(),
            status,
            headers,
        })
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("name", &self.name)
            .field("full_name", &self.full_name)
            .finish()
    }
}
