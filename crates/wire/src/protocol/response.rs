//! HTTP response head.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};

use crate::protocol::message::wants_close;
use crate::protocol::{Content, Cookie, CookieJar, TransferCoding};

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    version: Version,
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    cookies: CookieJar,
    content: Option<Content>,
    transfer_coding: TransferCoding,
}

impl ResponseHead {
    /// Creates an HTTP/1.1 response without headers or body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: Version::HTTP_11,
            status,
            reason: None,
            headers: HeaderMap::new(),
            cookies: CookieJar::new(),
            content: None,
            transfer_coding: TransferCoding::Identity,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.insert(cookie);
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_transfer_coding(mut self, coding: TransferCoding) -> Self {
        self.transfer_coding = coding;
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase as received, `None` when the status line had none.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_reason(&mut self, reason: Option<String>) {
        self.reason = reason;
    }

    /// The reason phrase to write: the explicit one, else the canonical one.
    pub fn reason_or_canonical(&self) -> &str {
        self.reason.as_deref().or_else(|| self.status.canonical_reason()).unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn set_content(&mut self, content: Option<Content>) {
        self.content = content;
    }

    pub fn take_content(&mut self) -> Option<Content> {
        self.content.take()
    }

    pub fn transfer_coding(&self) -> TransferCoding {
        self.transfer_coding
    }

    pub fn set_transfer_coding(&mut self, coding: TransferCoding) {
        self.transfer_coding = coding;
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.transfer_coding.is_chunked()
    }

    #[inline]
    pub fn is_gzipped(&self) -> bool {
        self.transfer_coding.is_gzipped()
    }

    pub fn is_complete(&self) -> bool {
        self.content.as_ref().is_none_or(Content::is_complete)
    }

    pub fn wants_close(&self) -> bool {
        wants_close(self.version, &self.headers)
    }

    /// Statuses that never carry a body: `1xx`, `204 No Content` and `304 Not Modified`.
    pub fn is_bodiless_status(&self) -> bool {
        self.status.is_informational() || self.status == StatusCode::NO_CONTENT || self.status == StatusCode::NOT_MODIFIED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_defaults_to_canonical() {
        let head = ResponseHead::new(StatusCode::NOT_FOUND);
        assert_eq!(head.reason(), None);
        assert_eq!(head.reason_or_canonical(), "Not Found");

        let head = head.with_reason("Nope");
        assert_eq!(head.reason_or_canonical(), "Nope");
    }

    #[test]
    fn bodiless_statuses() {
        assert!(ResponseHead::new(StatusCode::CONTINUE).is_bodiless_status());
        assert!(ResponseHead::new(StatusCode::SWITCHING_PROTOCOLS).is_bodiless_status());
        assert!(ResponseHead::new(StatusCode::NO_CONTENT).is_bodiless_status());
        assert!(ResponseHead::new(StatusCode::NOT_MODIFIED).is_bodiless_status());
        assert!(!ResponseHead::new(StatusCode::OK).is_bodiless_status());
    }

    #[test]
    fn http10_response_wants_close() {
        let head = ResponseHead::new(StatusCode::OK).with_version(Version::HTTP_10);
        assert!(head.wants_close());
        assert!(!ResponseHead::new(StatusCode::OK).wants_close());
    }
}
