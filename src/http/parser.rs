//! Classification of single lines from a reconstructed stream.
//!
//! Lines arrive without their trailing CRLF. Nothing here fails: a line that
//! is not understood is `LineKind::Other` and the caller ignores it.

use crate::http::request::{Method, RequestStart};
use crate::http::response::ResponseStart;

const VERSION_PREFIX: &str = "HTTP/";
const CONTENT_LENGTH: &str = "Content-Length:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    RequestLine(RequestStart),
    StatusLine(ResponseStart),
    /// `None` when the header value is not a decimal length.
    ContentLength(Option<usize>),
    Blank,
    Other,
}

pub fn classify_line(line: &[u8]) -> LineKind {
    if line.is_empty() {
        return LineKind::Blank;
    }

    let Ok(text) = std::str::from_utf8(line) else {
        return LineKind::Other;
    };

    if let Some(len) = parse_content_length(text) {
        return LineKind::ContentLength(len);
    }

    if let Some(resp) = parse_status_line(text) {
        return LineKind::StatusLine(resp);
    }

    if let Some(req) = parse_request_line(text) {
        return LineKind::RequestLine(req);
    }

    LineKind::Other
}

/// `METHOD SP TARGET SP VERSION`.
///
/// Extra spaces inside the target are tolerated; the target is whatever lies
/// between the method and the version.
pub fn parse_request_line(line: &str) -> Option<RequestStart> {
    let line = line.trim();
    let (method, rest) = line.split_once(|c: char| c.is_ascii_whitespace())?;
    let (target, version) = rest.trim_start().rsplit_once(|c: char| c.is_ascii_whitespace())?;
    let target = target.trim();

    if method.starts_with(VERSION_PREFIX) || !version.starts_with(VERSION_PREFIX) || target.is_empty() {
        return None;
    }

    let method = Method::from_token(method)?;
    Some(RequestStart::new(method, target, version))
}

/// `VERSION SP STATUS-TEXT`.
pub fn parse_status_line(line: &str) -> Option<ResponseStart> {
    let (version, status) = line.trim().split_once(|c: char| c.is_ascii_whitespace())?;
    let status = status.trim();

    if !version.starts_with(VERSION_PREFIX) || status.is_empty() {
        return None;
    }

    Some(ResponseStart::new(version, status))
}

/// Returns `Some(len)` for a `Content-Length` header line, where `len` is
/// `None` if the value is malformed. The header name is matched exactly.
pub fn parse_content_length(line: &str) -> Option<Option<usize>> {
    let value = line.strip_prefix(CONTENT_LENGTH)?.trim();

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Some(None);
    }

    Some(value.parse().ok())
}
