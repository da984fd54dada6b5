//! Cookie parsing and serialization.
//!
//! Requests carry cookies in the classic attribute grammar
//! (`$Version=1; name=value; $Path=/; $Domain=example.com`), responses carry
//! one attributed `Set-Cookie` line per cookie. Both end up in a
//! [`CookieJar`], a set keyed by name, domain and path.

use std::fmt::Write;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    comment: Option<String>,
    max_age: Option<i64>,
    secure: bool,
    http_only: bool,
    version: u32,
}

impl Cookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self { name: name.into(), value: value.into(), ..Default::default() }
    }

    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    fn same_key(&self, other: &Cookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + self.value.len() + 32);
        out.push_str(&self.name);
        out.push('=');
        push_value(&mut out, &self.value);

        if let Some(comment) = &self.comment {
            out.push_str("; Comment=");
            push_value(&mut out, comment);
        }
        if let Some(domain) = &self.domain {
            let _ = write!(out, "; Domain={domain}");
        }
        if let Some(max_age) = self.max_age {
            let _ = write!(out, "; Max-Age={max_age}");
        }
        if let Some(path) = &self.path {
            let _ = write!(out, "; Path={path}");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.version > 0 {
            let _ = write!(out, "; Version={}", self.version);
        }
        out
    }
}

/// A set of cookies keyed by name, domain and path.
///
/// Inserting a cookie with an existing key replaces the previous one in place,
/// so iteration keeps first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `cookie`, returning the cookie it replaced if any.
    pub fn insert(&mut self, cookie: Cookie) -> Option<Cookie> {
        match self.cookies.iter_mut().find(|existing| existing.same_key(&cookie)) {
            Some(existing) => Some(std::mem::replace(existing, cookie)),
            None => {
                self.cookies.push(cookie);
                None
            }
        }
    }

    /// The first cookie called `name`, whatever its domain and path.
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|cookie| cookie.name == name)
    }

    pub fn remove(&mut self, name: &str, domain: Option<&str>, path: Option<&str>) -> Option<Cookie> {
        let index = self
            .cookies
            .iter()
            .position(|cookie| cookie.name == name && cookie.domain.as_deref() == domain && cookie.path.as_deref() == path)?;
        Some(self.cookies.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cookie> {
        self.cookies.iter()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Parses a request `Cookie` header value into the jar.
    ///
    /// `$Version` applies to every cookie after it, `$Path` and `$Domain`
    /// apply to the cookie right before them. Pairs without `=` are skipped.
    pub fn parse_request_header(&mut self, header: &str) {
        let mut version = 0;
        let mut parsed: Vec<Cookie> = Vec::new();

        for pair in split_unquoted(header, &[b';', b',']) {
            let Some((name, value)) = pair.split_once('=') else {
                debug!(pair, "skip cookie pair without value");
                continue;
            };
            let name = name.trim();
            let value = unquote(value.trim());

            if let Some(attribute) = name.strip_prefix('$') {
                if attribute.eq_ignore_ascii_case("version") {
                    version = value.parse().unwrap_or(0);
                } else if attribute.eq_ignore_ascii_case("path") {
                    if let Some(last) = parsed.last_mut() {
                        last.path = Some(value.to_string());
                    }
                } else if attribute.eq_ignore_ascii_case("domain") {
                    if let Some(last) = parsed.last_mut() {
                        last.domain = Some(value.to_string());
                    }
                }
                continue;
            }

            if name.is_empty() {
                continue;
            }
            parsed.push(Cookie::new(name, value).with_version(version));
        }

        for cookie in parsed {
            self.insert(cookie);
        }
    }

    /// Renders the jar as a request `Cookie` header value, `None` when empty.
    pub fn to_request_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        let mut out = String::new();
        if let Some(version) = self.cookies.iter().map(Cookie::version).find(|v| *v > 0) {
            let _ = write!(out, "$Version={version}; ");
        }

        for (index, cookie) in self.cookies.iter().enumerate() {
            if index > 0 {
                out.push_str("; ");
            }
            out.push_str(&cookie.name);
            out.push('=');
            push_value(&mut out, &cookie.value);
            if let Some(path) = &cookie.path {
                out.push_str("; $Path=");
                push_value(&mut out, path);
            }
            if let Some(domain) = &cookie.domain {
                out.push_str("; $Domain=");
                push_value(&mut out, domain);
            }
        }
        Some(out)
    }
}

impl PartialEq for CookieJar {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.cookies.iter().all(|cookie| other.cookies.contains(cookie))
    }
}

impl Eq for CookieJar {}

impl<'a> IntoIterator for &'a CookieJar {
    type Item = &'a Cookie;
    type IntoIter = std::slice::Iter<'a, Cookie>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Cookie> for CookieJar {
    fn from_iter<T: IntoIterator<Item = Cookie>>(iter: T) -> Self {
        let mut jar = CookieJar::new();
        for cookie in iter {
            jar.insert(cookie);
        }
        jar
    }
}

/// Parses one `Set-Cookie` header value.
///
/// Attribute names are matched case-insensitively, unknown attributes and
/// unparsable `Max-Age`/`Version` values are ignored. Returns `None` when
/// the leading `name=value` pair is missing.
pub fn parse_set_cookie(header: &str) -> Option<Cookie> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = Cookie::new(name, unquote(value.trim()));
    for attribute in parts {
        let (key, value) = match attribute.split_once('=') {
            Some((key, value)) => (key.trim(), unquote(value.trim())),
            None => (attribute.trim(), ""),
        };

        if key.eq_ignore_ascii_case("comment") {
            cookie.comment = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("domain") {
            cookie.domain = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("max-age") {
            match value.parse() {
                Ok(max_age) => cookie.max_age = Some(max_age),
                Err(_) => debug!(value, "ignore invalid cookie max-age"),
            }
        } else if key.eq_ignore_ascii_case("path") {
            cookie.path = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("secure") {
            cookie.secure = true;
        } else if key.eq_ignore_ascii_case("httponly") {
            cookie.http_only = true;
        } else if key.eq_ignore_ascii_case("version") {
            cookie.version = value.parse().unwrap_or(0);
        }
    }
    Some(cookie)
}

/// Splits on any of `separators`, ignoring separators inside double quotes.
fn split_unquoted<'a>(input: &'a str, separators: &'a [u8]) -> impl Iterator<Item = &'a str> + 'a {
    let mut start = 0;
    let mut quoted = false;
    let mut pieces = Vec::new();
    for (index, b) in input.bytes().enumerate() {
        match b {
            b'"' => quoted = !quoted,
            b if !quoted && separators.contains(&b) => {
                pieces.push(&input[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    pieces.push(&input[start..]);
    pieces.into_iter().map(str::trim).filter(|piece| !piece.is_empty())
}

fn unquote(value: &str) -> &str {
    value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)
}

fn push_value(out: &mut String, value: &str) {
    if value.bytes().any(|b| matches!(b, b';' | b',' | b' ' | b'\t' | b'"')) {
        out.push('"');
        out.push_str(&value.replace('"', ""));
        out.push('"');
    } else {
        out.push_str(value);
    }
}
