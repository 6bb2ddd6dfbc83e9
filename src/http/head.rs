//! HTTP HEAD probe.

use std::str;

use crate::error::StorageError;

use super::parse::{parse_headers, ResponseHeaders};
use super::{new_easy, HttpOptions};

/// Performs a HEAD request and returns the final status and headers.
///
/// Any status is returned as-is; only network failures are errors.
pub(crate) fn head(url: &str, opts: &HttpOptions) -> Result<(u32, ResponseHeaders), StorageError> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = new_easy(url, opts)?;
    easy.nobody(true)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    let (status, headers) = parse_headers(&lines);
    Ok((status.unwrap_or(code), headers))
}
