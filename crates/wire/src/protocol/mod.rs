//! Protocol types shared by the decoder and the encoder.
//!
//! - [`HttpMessage`]: the artifact stream, start messages and [`Content`] fragments
//! - [`RequestHead`] / [`ResponseHead`]: start lines, headers, cookies and the
//!   [`TransferCoding`] decision
//! - [`CookieJar`]: cookies keyed by name, domain and path
//! - [`header`]: comma-separated header rules and canonicalization
//! - [`HttpError`], [`ParseError`], [`SendError`]: faults and the status they map to

mod message;
pub use message::Content;
pub use message::HttpMessage;
pub use message::TransferCoding;

mod request;
pub use request::RequestHead;

mod response;
pub use response::ResponseHead;

mod cookie;
pub use cookie::Cookie;
pub use cookie::CookieJar;
pub use cookie::parse_set_cookie;

pub mod header;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
