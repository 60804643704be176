/// The status line of a response seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStart {
    /// HTTP version (typically "HTTP/1.1")
    pub version: String,
    /// Everything after the version, e.g. "200 OK"
    pub status: String,
}

impl ResponseStart {
    pub fn new(version: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            status: status.into(),
        }
    }

    /// Numeric status code, if the status text starts with three digits.
    ///
    /// # Example
    ///
    /// ```
    /// # use httptap::http::response::ResponseStart;
    /// assert_eq!(ResponseStart::new("HTTP/1.1", "404 Not Found").status_code(), Some(404));
    /// assert_eq!(ResponseStart::new("HTTP/1.1", "OK").status_code(), None);
    /// ```
    pub fn status_code(&self) -> Option<u16> {
        let code = self.status.split_ascii_whitespace().next()?;
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        code.parse().ok()
    }

    /// Reason phrase following the status code, if any.
    pub fn reason_phrase(&self) -> Option<&str> {
        self.status_code()?;
        self.status
            .split_once(' ')
            .map(|(_, reason)| reason.trim())
            .filter(|reason| !reason.is_empty())
    }
}
