//! PDF and forced-download classification.

use crate::model::{RequestDetails, ResourceType};

use super::{find_header, HeaderSet, CONTENT_DISPOSITION, CONTENT_TYPE};

const PDF_MIME: &str = "application/pdf";
const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// True if the URL path (not query or fragment) ends in `.pdf`, ignoring case.
pub fn has_pdf_extension(url: &str) -> bool {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// True when the response is a PDF document.
///
/// `application/pdf` always qualifies; `application/octet-stream` only when the
/// URL path carries a `.pdf` suffix. Without a `content-type` header the answer
/// is false.
pub fn is_pdf_resource(request: &RequestDetails, response_headers: &HeaderSet) -> bool {
    let Some(header) = find_header(response_headers, CONTENT_TYPE) else {
        return false;
    };
    let mime = header
        .value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == PDF_MIME || (mime == OCTET_STREAM_MIME && has_pdf_extension(&request.url))
}

/// True when the user asked for a download instead of the viewer.
///
/// The URL marker always wins. Otherwise an `attachment` disposition forces a
/// download, except for top-level loads: the viewer is shown there regardless
/// of `Content-Disposition`.
pub fn is_download_requested(
    request: &RequestDetails,
    response_headers: Option<&HeaderSet>,
    download_marker: &str,
) -> bool {
    if !download_marker.is_empty() && request.url.contains(download_marker) {
        return true;
    }
    if request.resource_type == ResourceType::MainFrame {
        return false;
    }
    response_headers
        .and_then(|headers| find_header(headers, CONTENT_DISPOSITION))
        .is_some_and(|header| starts_with_attachment(&header.value))
}

pub(super) fn starts_with_attachment(value: &str) -> bool {
    value
        .trim_start()
        .get(..10)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("attachment"))
}
