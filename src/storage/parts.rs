//! Part naming and multipart discovery.

use crate::error::StorageError;

use super::Storage;

/// Name of part `index` of `object`: `<object>.<NNN>`.
pub fn part_name(object: &str, index: usize) -> String {
    format!("{}.{:03}", object, index)
}

/// Remote name of part `index` of an upload to `destination`. Leading `/` are
/// stripped; the numeric suffix is only added when there is more than one part.
pub fn destination_name(destination: &str, index: usize, num_parts: usize) -> String {
    let destination = destination.trim_start_matches('/');
    if num_parts > 1 {
        part_name(destination, index)
    } else {
        destination.to_string()
    }
}

impl Storage {
    /// Remote objects making up `object`, in order.
    ///
    /// Probes `object` itself first, then `object.000`; the first probe that
    /// exists decides between a single object and a multipart one, whose
    /// `number-of-parts` metadata gives the part count.
    pub fn parts(&self, object: &str) -> Result<Vec<String>, StorageError> {
        let probes = [(false, object.to_string()), (true, part_name(object, 0))];
        for (multipart, probe) in probes {
            let head = match self.head(&probe) {
                Ok(head) => head,
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if !head.is_success() {
                return Err(head.failure());
            }
            if !multipart {
                return Ok(vec![object.to_string()]);
            }
            let count = head.number_of_parts()?;
            tracing::debug!(object, parts = count, "multipart object");
            return Ok((0..count).map(|i| part_name(object, i)).collect());
        }
        Err(StorageError::NotFound(object.to_string()))
    }
}
