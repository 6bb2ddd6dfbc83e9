//! Streaming HTTP PUT with a known content length.

use std::io;

use curl::easy::ReadError;

use crate::error::StorageError;
use crate::transfer::MonitorError;

use super::{header_list, new_easy, HttpOptions};

#[derive(Debug)]
pub(crate) struct PutResponse {
    pub status: u32,
    pub body: Vec<u8>,
    /// True when the body source reported `MonitorError::Aborted`.
    pub aborted: bool,
}

/// PUT `url` with a body pulled chunk by chunk from `next_chunk`.
///
/// `Content-Length` is always `content_length`; chunked transfer encoding and
/// `Expect: 100-continue` are suppressed. An aborted body source is not an
/// error: the response comes back with `aborted` set.
pub(crate) fn put_streaming<F>(
    url: &str,
    headers: &[(String, String)],
    content_length: u64,
    opts: &HttpOptions,
    mut next_chunk: F,
) -> Result<PutResponse, StorageError>
where
    F: FnMut() -> Option<Result<Vec<u8>, MonitorError>>,
{
    let mut pending: Vec<u8> = Vec::new();
    let mut pos = 0usize;
    let mut aborted = false;
    let mut read_error: Option<io::Error> = None;
    let mut body = Vec::new();

    let mut easy = new_easy(url, opts)?;
    easy.upload(true)?;
    easy.in_filesize(content_length)?;

    let mut all_headers: Vec<(String, String)> = headers.to_vec();
    all_headers.push(("Transfer-Encoding".to_string(), String::new()));
    all_headers.push(("Expect".to_string(), String::new()));
    easy.http_headers(header_list(&all_headers)?)?;

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer.read_function(|buf| {
            while pos >= pending.len() {
                match next_chunk() {
                    None => return Ok(0),
                    Some(Ok(chunk)) => {
                        pending = chunk;
                        pos = 0;
                    }
                    Some(Err(MonitorError::Aborted)) => {
                        aborted = true;
                        return Err(ReadError::Abort);
                    }
                    Some(Err(MonitorError::Io(e))) => {
                        read_error = Some(e);
                        return Err(ReadError::Abort);
                    }
                }
            }
            let n = (pending.len() - pos).min(buf.len());
            buf[..n].copy_from_slice(&pending[pos..pos + n]);
            pos += n;
            Ok(n)
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()
    };

    if aborted {
        return Ok(PutResponse {
            status: 0,
            body,
            aborted,
        });
    }
    if let Some(e) = read_error {
        return Err(StorageError::Io(e));
    }
    perform_result?;

    let status = easy.response_code()?;
    Ok(PutResponse {
        status,
        body,
        aborted,
    })
}
