//! HTTP plumbing on top of the curl crate (libcurl).
//!
//! Everything here is blocking and runs on the calling thread: HEAD probes
//! and authorization calls on the caller's thread, streaming GET/PUT on the
//! transfer worker thread.

mod get;
mod head;
mod parse;
mod put;

pub(crate) use get::{get, get_streaming, GetStream, SinkControl};
pub(crate) use head::head;
pub use parse::ResponseHeaders;
pub(crate) use put::{put_streaming, PutResponse};

use std::time::Duration;

use crate::config::ClientConfig;

/// Connection and buffering knobs shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Receive buffer size; bounds the chunk size handed to download sinks.
    pub buffer_size: usize,
}

impl HttpOptions {
    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: cfg.low_speed_time(),
            buffer_size: cfg.transfer_buf_bytes,
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

/// Easy handle with the options every request shares.
fn new_easy(url: &str, opts: &HttpOptions) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(opts.connect_timeout)?;
    // Abort if throughput drops below the limit for the configured window,
    // instead of a wall-clock timeout that would kill large parts on slow links.
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    Ok(easy)
}

/// Header list in curl's "Name: value" form.
fn header_list(headers: &[(String, String)]) -> Result<curl::easy::List, curl::Error> {
    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    Ok(list)
}

pub(crate) fn is_success(status: u32) -> bool {
    (200..300).contains(&status)
}
