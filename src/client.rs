//! Entry point: one authorization client shared by every bucket handle.

use std::sync::Arc;

use crate::api::DataApi;
use crate::config::ClientConfig;
use crate::storage::Storage;

/// Client for the data API.
///
/// Without a token only the public bucket can be read; uploads and any access
/// to private buckets fail with `InvalidArgument`.
#[derive(Debug, Clone)]
pub struct DataClient {
    api: Arc<DataApi>,
    config: Arc<ClientConfig>,
}

impl DataClient {
    pub fn new(token: Option<String>, config: ClientConfig) -> Self {
        let api = Arc::new(DataApi::new(token, &config));
        Self {
            api,
            config: Arc::new(config),
        }
    }

    /// Client with the default configuration.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Some(token.into()), ClientConfig::default())
    }

    /// Anonymous client; can only read from the public bucket.
    pub fn anonymous() -> Self {
        Self::new(None, ClientConfig::default())
    }

    pub fn api(&self) -> &DataApi {
        &self.api
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Handle on the bucket with short name `name` (e.g. `user`, `public`).
    pub fn storage(&self, name: &str) -> Storage {
        Storage::new(self.api.clone(), name, Arc::clone(&self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Authorizer;
    use crate::error::StorageError;

    #[test]
    fn storage_uses_bucket_template() {
        let client = DataClient::with_token("tok");
        assert!(client.api().has_token());
        let storage = client.storage("user");
        assert_eq!(storage.name(), "user");
        assert_eq!(storage.full_name(), "duckietown-user-storage");
        assert!(!storage.is_public());
        assert!(client.storage("public").is_public());
    }

    #[test]
    fn anonymous_client_cannot_upload() {
        let client = DataClient::anonymous();
        assert_eq!(client.api().token(), None);
        let err = client
            .storage("public")
            .upload(b"payload".to_vec(), "a.bin")
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn custom_bucket_template() {
        let mut config = ClientConfig::default();
        config.bucket_name = "lab-{name}".to_string();
        let client = DataClient::new(None, config);
        assert_eq!(client.storage("maps").full_name(), "lab-maps");
        assert_eq!(client.config().bucket_name, "lab-{name}");
    }
}
