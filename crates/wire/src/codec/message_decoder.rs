//! HTTP message decoder.
//!
//! [`MessageDecoder`] turns the byte stream of one connection direction into
//! [`HttpMessage`]s. It is a state graph whose nodes run child machines for
//! the start line, the header block and streamed bodies; when a child
//! finishes, its artifacts are folded into the head and the body framing is
//! chosen. After each message the graph starts over, so pipelined messages
//! decode back to back.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use gateway_wire::codec::MessageDecoder;
//! use gateway_wire::protocol::HttpMessage;
//!
//! let mut decoder = MessageDecoder::request();
//! let mut buffer = BytesMut::from("GET /a//b HTTP/1.1\r\nHost: x\r\n\r\n");
//!
//! let mut messages = Vec::new();
//! decoder.decode_into(&mut buffer, |message| messages.push(message)).unwrap();
//!
//! let HttpMessage::Request(head) = &messages[0] else { panic!("expected a request") };
//! assert_eq!(head.uri().path(), "/a/b");
//! assert!(head.content().is_none());
//! ```

use std::collections::VecDeque;
use std::mem;
use std::task::Poll;

use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::buffer::Region;
use crate::codec::body::{Framing, PayloadDecoder, request_framing, response_framing};
use crate::codec::config::DecoderConfig;
use crate::codec::header::{
    CookieKind, HeaderState, RequestLineState, StatusLineState, check_host, finish_headers, finish_request_line,
    finish_status_line,
};
use crate::codec::machine::{DecodingState, StateMachine, Step};
use crate::ensure;
use crate::protocol::{Content, HttpMessage, ParseError, RequestHead, ResponseHead, TransferCoding};

/// Which start line a [`MessageDecoder`] expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Decode requests, the server side of a connection
    Request,
    /// Decode responses, the client side of a connection
    Response,
}

/// Per-direction state shared by every node of the graph.
#[derive(Debug)]
pub(crate) struct Session {
    config: DecoderConfig,
    role: Role,
    /// Methods of the requests whose responses are still expected
    outstanding: VecDeque<Method>,
}

impl Session {
    /// The method of the request a response with `status` answers.
    ///
    /// Interim responses leave the request outstanding.
    fn answered_method(&mut self, status: http::StatusCode) -> Option<Method> {
        if status.is_informational() && status != http::StatusCode::SWITCHING_PROTOCOLS {
            return self.outstanding.front().cloned();
        }
        self.outstanding.pop_front()
    }
}

#[derive(Debug)]
pub(crate) enum Head {
    Request(RequestHead),
    Response(ResponseHead),
}

impl Head {
    fn set_content(&mut self, content: Option<Content>) {
        match self {
            Head::Request(head) => head.set_content(content),
            Head::Response(head) => head.set_content(content),
        }
    }

    fn set_transfer_coding(&mut self, coding: TransferCoding) {
        match self {
            Head::Request(head) => head.set_transfer_coding(coding),
            Head::Response(head) => head.set_transfer_coding(coding),
        }
    }
}

impl From<Head> for HttpMessage {
    fn from(head: Head) -> Self {
        match head {
            Head::Request(head) => HttpMessage::Request(head),
            Head::Response(head) => HttpMessage::Response(head),
        }
    }
}

#[derive(Debug)]
pub(crate) enum MessageState {
    RequestLine(StateMachine<RequestLineState>),
    StatusLine(StateMachine<StatusLineState>),
    RequestHeaders { head: RequestHead, machine: StateMachine<HeaderState> },
    ResponseHeaders { head: ResponseHead, machine: StateMachine<HeaderState> },
    /// Wait for a short body to arrive in full
    Buffered { head: Head, length: usize },
    Payload(PayloadDecoder),
    /// The direction switched protocol, forward bytes verbatim
    Passthrough,
}

impl MessageState {
    fn initial(role: Role) -> Self {
        match role {
            Role::Request => MessageState::RequestLine(StateMachine::new(RequestLineState::Start)),
            Role::Response => MessageState::StatusLine(StateMachine::new(StatusLineState::Version)),
        }
    }

    /// Whether nothing of a next message has been read yet.
    fn is_idle(&self) -> bool {
        match self {
            MessageState::RequestLine(machine) => machine.state() == Some(&RequestLineState::Start) && machine.artifacts().is_empty(),
            MessageState::StatusLine(machine) => machine.state() == Some(&StatusLineState::Version) && machine.artifacts().is_empty(),
            _ => false,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MessageState::RequestLine(_) => "request line",
            MessageState::StatusLine(_) => "status line",
            MessageState::RequestHeaders { .. } | MessageState::ResponseHeaders { .. } => "header block",
            MessageState::Buffered { .. } | MessageState::Payload(_) => "message body",
            MessageState::Passthrough => "passthrough",
        }
    }
}

impl DecodingState for MessageState {
    type Artifact = HttpMessage;
    type Context = Session;

    fn step(self, src: &mut BytesMut, session: &mut Session, out: &mut Vec<HttpMessage>) -> Result<Step<Self>, ParseError> {
        match self {
            MessageState::RequestLine(mut machine) => match machine.run(src, &mut session.config)? {
                Poll::Pending => Ok(Step::Pending(MessageState::RequestLine(machine))),
                Poll::Ready(tokens) => {
                    let (method, uri, version) = finish_request_line(tokens)?;
                    trace!(%method, %uri, ?version, "parsed request line");
                    let head = RequestHead::new(method, uri).with_version(version).with_secure(session.config.secure());
                    Ok(Step::Next(MessageState::RequestHeaders { head, machine: StateMachine::new(HeaderState::new()) }))
                }
            },

            MessageState::StatusLine(mut machine) => match machine.run(src, &mut session.config)? {
                Poll::Pending => Ok(Step::Pending(MessageState::StatusLine(machine))),
                Poll::Ready(tokens) => {
                    let (version, status, reason) = finish_status_line(tokens)?;
                    trace!(%status, ?version, "parsed status line");
                    let mut head = ResponseHead::new(status).with_version(version);
                    head.set_reason(reason);
                    Ok(Step::Next(MessageState::ResponseHeaders { head, machine: StateMachine::new(HeaderState::new()) }))
                }
            },

            MessageState::RequestHeaders { mut head, mut machine } => match machine.run(src, &mut session.config)? {
                Poll::Pending => Ok(Step::Pending(MessageState::RequestHeaders { head, machine })),
                Poll::Ready(fields) => {
                    let (headers, cookies) = finish_headers(fields, CookieKind::Request)?;
                    check_host(head.uri(), head.version(), &headers)?;
                    *head.headers_mut() = headers;
                    *head.cookies_mut() = cookies;

                    let framing = request_framing(&head)?;
                    Ok(dispatch(Head::Request(head), framing, session, out))
                }
            },

            MessageState::ResponseHeaders { mut head, mut machine } => match machine.run(src, &mut session.config)? {
                Poll::Pending => Ok(Step::Pending(MessageState::ResponseHeaders { head, machine })),
                Poll::Ready(fields) => {
                    let (headers, cookies) = finish_headers(fields, CookieKind::Response)?;
                    *head.headers_mut() = headers;
                    *head.cookies_mut() = cookies;

                    let request_method = session.answered_method(head.status());
                    let framing = response_framing(&head, request_method.as_ref())?;
                    Ok(dispatch(Head::Response(head), framing, session, out))
                }
            },

            MessageState::Buffered { mut head, length } => {
                if src.len() < length {
                    return Ok(Step::Pending(MessageState::Buffered { head, length }));
                }
                let body = src.split_to(length).freeze();
                head.set_content(Some(Content::complete(body)));
                out.push(head.into());
                Ok(Step::Next(MessageState::initial(session.role)))
            }

            MessageState::Payload(mut decoder) => {
                let mut contents = Vec::new();
                let result = decoder.decode(src, &mut session.config, &mut contents);
                out.extend(contents.into_iter().map(HttpMessage::Content));
                match result? {
                    Poll::Pending => Ok(Step::Pending(MessageState::Payload(decoder))),
                    Poll::Ready(()) => Ok(Step::Next(MessageState::initial(session.role))),
                }
            }

            MessageState::Passthrough => {
                if !src.is_empty() {
                    out.push(HttpMessage::Content(Content::incomplete(src.split().freeze())));
                }
                Ok(Step::Pending(MessageState::Passthrough))
            }
        }
    }
}

/// Emits the head as soon as its body framing allows and picks the next state.
fn dispatch(mut head: Head, framing: Framing, session: &Session, out: &mut Vec<HttpMessage>) -> Step<MessageState> {
    trace!(?framing, "selected body framing");
    let next = match framing {
        Framing::None => {
            head.set_content(None);
            MessageState::initial(session.role)
        }
        Framing::Empty => {
            head.set_content(Some(Content::end()));
            MessageState::initial(session.role)
        }
        Framing::Length(length) if length < session.config.streaming_threshold() as u64 => {
            return Step::Next(MessageState::Buffered { head, length: length as usize });
        }
        Framing::Length(length) => {
            head.set_content(Some(Content::incomplete(Region::empty())));
            MessageState::Payload(PayloadDecoder::fix_length(length))
        }
        Framing::Chunked => {
            head.set_transfer_coding(TransferCoding::Chunked);
            head.set_content(Some(Content::incomplete(Region::empty())));
            MessageState::Payload(PayloadDecoder::chunked())
        }
        Framing::UntilClose => {
            head.set_content(Some(Content::incomplete(Region::empty())));
            MessageState::Payload(PayloadDecoder::until_close())
        }
        Framing::Upgrade => {
            head.set_content(None);
            debug!("switching to passthrough after protocol upgrade");
            MessageState::Passthrough
        }
    };
    out.push(head.into());
    Step::Next(next)
}

/// Incremental decoder for one connection direction.
///
/// Feed it every byte delivery with [`MessageDecoder::decode_into`] and call
/// [`MessageDecoder::finish_decode`] once the stream ends. It also implements
/// [`Decoder`] so it can drive a [`FramedRead`](tokio_util::codec::FramedRead).
///
/// A decode fault is final: the decoder reports [`ParseError::Poisoned`] for
/// every later call.
#[derive(Debug)]
pub struct MessageDecoder {
    machine: StateMachine<MessageState>,
    session: Session,
    poisoned: bool,
    queue: VecDeque<HttpMessage>,
    failure: Option<ParseError>,
}

impl MessageDecoder {
    /// A decoder for the request direction with the default configuration.
    pub fn request() -> Self {
        Self::with_config(Role::Request, DecoderConfig::default())
    }

    /// A decoder for the response direction with the default configuration.
    pub fn response() -> Self {
        Self::with_config(Role::Response, DecoderConfig::default())
    }

    pub fn with_config(role: Role, config: DecoderConfig) -> Self {
        Self {
            machine: StateMachine::new(MessageState::initial(role)),
            session: Session { config, role, outstanding: VecDeque::new() },
            poisoned: false,
            queue: VecDeque::new(),
            failure: None,
        }
    }

    pub fn role(&self) -> Role {
        self.session.role
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.session.config
    }

    /// Records that a request with `method` was sent, so the response
    /// answering it is framed accordingly (`HEAD` has no body, a successful
    /// `CONNECT` switches to passthrough).
    pub fn expect_response_to(&mut self, method: Method) {
        self.session.outstanding.push_back(method);
    }

    /// Switches this direction to passthrough: every later byte is
    /// forwarded as incomplete content and nothing is parsed again.
    pub fn upgrade(&mut self) {
        debug!(role = ?self.session.role, "switching to passthrough on request");
        self.machine = StateMachine::new(MessageState::Passthrough);
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self.machine.state(), Some(MessageState::Passthrough))
    }

    /// Whether the decoder sits between messages.
    pub fn is_idle(&self) -> bool {
        self.machine.state().is_some_and(MessageState::is_idle)
    }

    /// Decodes everything `src` allows, handing each message to `emit` in order.
    ///
    /// Consumed bytes are removed from `src`; a partial element stays there
    /// (or in the decoder) until more bytes arrive. Messages produced before a
    /// fault are still emitted.
    pub fn decode_into<F>(&mut self, src: &mut BytesMut, mut emit: F) -> Result<(), ParseError>
    where
        F: FnMut(HttpMessage),
    {
        ensure!(!self.poisoned, ParseError::Poisoned);

        let result = self.machine.run(src, &mut self.session);
        for message in self.machine.drain() {
            emit(message);
        }

        if let Err(e) = result {
            debug!(cause = %e, state = self.machine.state().map_or("failed", MessageState::name), "decode failed");
            self.poisoned = true;
            return Err(e);
        }
        Ok(())
    }

    /// Handles the end of the stream.
    ///
    /// Decodes what is left in `src`, then completes a close-delimited body
    /// with an empty complete content. A passthrough direction ends silently.
    /// Ending anywhere else than between messages is
    /// [`ParseError::UnexpectedEof`].
    pub fn finish_decode<F>(&mut self, src: &mut BytesMut, mut emit: F) -> Result<(), ParseError>
    where
        F: FnMut(HttpMessage),
    {
        self.decode_into(src, &mut emit)?;

        let Some(state) = self.machine.state() else {
            return Err(ParseError::Poisoned);
        };
        if state.is_idle() && src.is_empty() {
            return Ok(());
        }

        match state {
            MessageState::Passthrough => Ok(()),
            MessageState::Payload(decoder) if decoder.is_until_close() => {
                trace!("close-delimited body finished by end of stream");
                emit(HttpMessage::Content(Content::end()));
                self.machine = StateMachine::new(MessageState::initial(self.session.role));
                Ok(())
            }
            state => {
                let state = state.name();
                debug!(state, "stream ended in the middle of a message");
                self.poisoned = true;
                Err(ParseError::UnexpectedEof { state })
            }
        }
    }

    /// Runs `decode` on the internal queue, keeping a fault until the
    /// messages produced before it have been handed out.
    fn pump<D>(&mut self, src: &mut BytesMut, decode: D) -> Result<Option<HttpMessage>, ParseError>
    where
        D: FnOnce(&mut Self, &mut BytesMut, &mut VecDeque<HttpMessage>) -> Result<(), ParseError>,
    {
        if self.queue.is_empty() && self.failure.is_none() {
            let mut queue = mem::take(&mut self.queue);
            if let Err(e) = decode(self, src, &mut queue) {
                self.failure = Some(e);
            }
            self.queue = queue;
        }

        match self.queue.pop_front() {
            Some(message) => Ok(Some(message)),
            None => self.failure.take().map_or(Ok(None), Err),
        }
    }
}

impl Decoder for MessageDecoder {
    type Item = HttpMessage;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.pump(src, |decoder, src, queue| decoder.decode_into(src, |message| queue.push_back(message)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.pump(src, |decoder, src, queue| decoder.finish_decode(src, |message| queue.push_back(message)))
    }
}
