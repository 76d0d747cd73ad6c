//! Forcing `Content-Disposition: attachment` on a response.

use super::classify::starts_with_attachment;
use super::{HeaderSet, CONTENT_DISPOSITION};

const ATTACHMENT: &str = "attachment";

/// Returns a copy of `headers` with an `attachment` disposition, or `None` when
/// the response already downloads and must be left untouched.
///
/// An existing disposition keeps its parameters: `inline; filename=x.pdf`
/// becomes `attachment; filename=x.pdf`.
pub fn ensure_attachment_disposition(headers: &HeaderSet) -> Option<HeaderSet> {
    let mut headers = headers.clone();
    match headers.find_mut(CONTENT_DISPOSITION) {
        None => {
            headers.push("Content-Disposition", ATTACHMENT);
            Some(headers)
        }
        Some(header) if starts_with_attachment(&header.value) => None,
        Some(header) => {
            header.value = match header.value.find(';') {
                Some(index) => format!("{ATTACHMENT}{}", &header.value[index..]),
                None => ATTACHMENT.to_string(),
            };
            Some(headers)
        }
    }
}
