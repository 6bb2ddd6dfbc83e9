//! HTTP GET: buffered (small JSON answers) and streaming (object bodies).

use std::cell::Cell;
use std::io;
use std::str;

use crate::error::StorageError;

use super::parse::parse_status_line;
use super::{header_list, is_success, new_easy, HttpOptions};

/// Returned by a download sink after each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SinkControl {
    Continue,
    Stop,
}

/// Result of a streaming GET.
#[derive(Debug)]
pub(crate) struct GetStream {
    pub status: u32,
    /// True when the sink asked to stop before the body ended.
    pub stopped: bool,
    /// Body of a non-2xx response (never handed to the sink).
    pub error_body: Vec<u8>,
}

/// GET `url` with extra request headers and return `(status, body)`.
pub(crate) fn get(
    url: &str,
    headers: &[(String, String)],
    opts: &HttpOptions,
) -> Result<(u32, Vec<u8>), StorageError> {
    let mut body = Vec::new();
    let mut easy = new_easy(url, opts)?;
    if !headers.is_empty() {
        easy.http_headers(header_list(headers)?)?;
    }
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;
    Ok((code, body))
}

/// GET `url`, handing each received chunk of a 2xx body to `sink`.
///
/// Chunks are at most `opts.buffer_size` bytes. When the sink returns
/// `SinkControl::Stop` the transfer is cut short and `stopped` is set; a
/// sink I/O error is returned as `StorageError::Io`.
pub(crate) fn get_streaming<F>(
    url: &str,
    opts: &HttpOptions,
    mut sink: F,
) -> Result<GetStream, StorageError>
where
    F: FnMut(&[u8]) -> io::Result<SinkControl>,
{
    let status = Cell::new(0u32);
    let mut stopped = false;
    let mut error_body = Vec::new();
    let mut sink_error: Option<io::Error> = None;

    let mut easy = new_easy(url, opts)?;
    if opts.buffer_size > 0 {
        easy.buffer_size(opts.buffer_size)?;
    }

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(line) = str::from_utf8(data) {
                if let Some(code) = parse_status_line(line.trim_end()) {
                    status.set(code);
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            if !is_success(status.get()) {
                error_body.extend_from_slice(data);
                return Ok(data.len());
            }
            match sink(data) {
                Ok(SinkControl::Continue) => Ok(data.len()),
                Ok(SinkControl::Stop) => {
                    stopped = true;
                    Ok(0) // abort transfer
                }
                Err(e) => {
                    sink_error = Some(e);
                    Ok(0)
                }
            }
        })?;
        transfer.perform()
    };

    if let Some(e) = sink_error {
        return Err(StorageError::Io(e));
    }
    if stopped {
        return Ok(GetStream {
            status: status.get(),
            stopped,
            error_body,
        });
    }
    perform_result?;

    let code = easy.response_code()?;
    Ok(GetStream {
        status: code,
        stopped,
        error_body,
    })
}
