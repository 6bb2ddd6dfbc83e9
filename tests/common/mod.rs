#![allow(dead_code)]

pub mod object_server;

use dt_data_api::config::ClientConfig;
use dt_data_api::DataClient;

use object_server::{ObjectServer, TOKEN_HEADER};

/// Config pointing every template at `server`, with small parts and buffers.
pub fn config_for(server: &ObjectServer, part_size: u64, buf_size: usize) -> ClientConfig {
    let mut cfg = ClientConfig::default();
    cfg.api_url = server.api_url();
    cfg.public_storage_url = server.public_url();
    cfg.bucket_name = "{name}-bucket".to_string();
    cfg.token_header = TOKEN_HEADER.to_string();
    cfg.part_size_bytes = part_size;
    cfg.transfer_buf_bytes = buf_size;
    cfg.connect_timeout_secs = 5;
    cfg
}

pub fn client_for(server: &ObjectServer, part_size: u64, buf_size: usize) -> DataClient {
    DataClient::new(
        Some(server.token().to_string()),
        config_for(server, part_size, buf_size),
    )
}

/// Deterministic test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0u8..251).cycle().take(len).collect()
}
