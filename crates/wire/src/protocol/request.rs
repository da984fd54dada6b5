//! HTTP request head.
//!
//! A [`RequestHead`] is what the decoder emits for a request line plus its
//! header block, and what the encoder renders back. Cookies are kept apart
//! from the header map in a [`CookieJar`].

use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};

use crate::protocol::message::wants_close;
use crate::protocol::{Content, Cookie, CookieJar, TransferCoding};

#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    cookies: CookieJar,
    secure: bool,
    content: Option<Content>,
    transfer_coding: TransferCoding,
}

impl RequestHead {
    /// Creates an HTTP/1.1 request without headers or body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            cookies: CookieJar::new(),
            secure: false,
            content: None,
            transfer_coding: TransferCoding::Identity,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Appends a header value, keeping previous values of the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.insert(cookie);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
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

    /// Returns a reference to the request's HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns a reference to the request's URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request's HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns a reference to the request's headers.
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

    /// Whether the request arrived over a secure transport.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    /// The body carried with the head.
    ///
    /// `None` means the request has no body. An incomplete content means the
    /// rest of the body follows as separate [`Content`] messages.
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

    /// Whether the request carries no body or all of it.
    pub fn is_complete(&self) -> bool {
        self.content.as_ref().is_none_or(Content::is_complete)
    }

    /// Whether the connection should close once this exchange is over.
    pub fn wants_close(&self) -> bool {
        wants_close(self.version, &self.headers)
    }

    /// The target as written on the request line.
    ///
    /// `CONNECT` uses the authority form, every other method the URI as parsed.
    pub fn request_target(&self) -> String {
        match (&self.method, self.uri.authority()) {
            (&Method::CONNECT, Some(authority)) => authority.to_string(),
            _ => self.uri.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::header;

    use super::*;

    #[test]
    fn builder_and_accessors() {
        let head = RequestHead::new(Method::POST, Uri::from_static("/submit"))
            .with_version(Version::HTTP_10)
            .with_header(header::HOST, HeaderValue::from_static("example.com"))
            .with_cookie(Cookie::new("sid", "1"))
            .with_secure(true)
            .with_content(Content::complete("body"));

        assert_eq!(head.method(), &Method::POST);
        assert_eq!(head.uri().path(), "/submit");
        assert_eq!(head.version(), Version::HTTP_10);
        assert_eq!(head.headers().get(header::HOST).unwrap(), "example.com");
        assert_eq!(head.cookies().get("sid").unwrap().value(), "1");
        assert!(head.is_secure());
        assert_eq!(head.content().unwrap().as_bytes(), b"body");
        assert!(head.is_complete());
        assert!(!head.is_chunked());
        assert!(head.wants_close());
    }

    #[test]
    fn streaming_body_is_not_complete() {
        let head = RequestHead::new(Method::PUT, Uri::from_static("/upload")).with_content(Content::incomplete(""));
        assert!(!head.is_complete());
    }

    #[test]
    fn connect_target_is_the_authority() {
        let head = RequestHead::new(Method::CONNECT, Uri::from_static("example.com:443"));
        assert_eq!(head.request_target(), "example.com:443");

        let head = RequestHead::new(Method::GET, Uri::from_static("/a?b=c"));
        assert_eq!(head.request_target(), "/a?b=c");
    }
}
