use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, info};

use crate::codec::MessageDecoder;
use crate::protocol::{HttpMessage, ParseError};

/// Initial read buffer size
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Pumps one direction of a connection through a [`MessageDecoder`].
#[derive(Debug)]
pub struct MessageReader<R> {
    framed: FramedRead<R, MessageDecoder>,
}

impl<R> MessageReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, decoder: MessageDecoder) -> Self {
        Self::with_capacity(reader, decoder, READ_BUFFER_SIZE)
    }

    pub fn with_capacity(reader: R, decoder: MessageDecoder, buffer_size: usize) -> Self {
        Self { framed: FramedRead::with_capacity(reader, decoder, buffer_size) }
    }

    /// The decoder, e.g. to announce outstanding requests or switch to passthrough.
    #[inline]
    pub fn decoder_mut(&mut self) -> &mut MessageDecoder {
        self.framed.decoder_mut()
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut R {
        self.framed.get_mut()
    }

    /// The next decoded message, `None` once the stream ended cleanly.
    ///
    /// After a fault the reader yields `None`: the direction can't be
    /// resynchronized.
    pub async fn next_message(&mut self) -> Option<Result<HttpMessage, ParseError>> {
        self.framed.next().await
    }

    /// Hands every message to `sink` until the stream ends.
    pub async fn pump<F>(&mut self, mut sink: F) -> Result<(), ParseError>
    where
        F: FnMut(HttpMessage),
    {
        while let Some(result) = self.next_message().await {
            match result {
                Ok(message) => sink(message),
                Err(e) => {
                    debug!(cause = %e, "stop reading after decode fault");
                    return Err(e);
                }
            }
        }
        info!("stream ended, no more messages");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use indoc::indoc;

    use super::*;
    use crate::protocol::Content;

    #[tokio::test]
    async fn pumps_messages_from_stream() {
        let input = indoc! {"
        GET /chat HTTP/1.1
        Host: gateway.local
        Upgrade: websocket

        "}
        .replace('\n', "\r\n");

        let mut reader = MessageReader::new(input.as_bytes(), MessageDecoder::request());
        let mut messages = Vec::new();
        reader.pump(|message| messages.push(message)).await.unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].as_request().unwrap().method(), &Method::GET);
    }

    #[tokio::test]
    async fn close_delimited_body_ends_with_stream() {
        let input: &[u8] = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nall of it";
        let mut reader = MessageReader::new(input, MessageDecoder::response());

        let head = reader.next_message().await.unwrap().unwrap();
        assert_eq!(head.as_response().unwrap().status(), StatusCode::OK);

        let mut body = Vec::new();
        while let Some(message) = reader.next_message().await {
            let content = message.unwrap().into_content().unwrap();
            body.extend_from_slice(content.as_bytes());
            if content.is_complete() {
                break;
            }
        }
        assert_eq!(body, b"all of it");
        assert!(reader.next_message().await.is_none());
    }

    #[tokio::test]
    async fn truncated_stream_is_reported() {
        let input: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
        let mut reader = MessageReader::new(input, MessageDecoder::response());
        let result = reader.pump(|_| {}).await;
        assert!(matches!(result, Err(ParseError::UnexpectedEof { .. })));
    }

    #[tokio::test]
    async fn upgraded_direction_forwards_bytes() {
        let input: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n\x81\x02hi";
        let mut reader = MessageReader::new(input, MessageDecoder::response());
        let mut messages = Vec::new();
        reader.pump(|message| messages.push(message)).await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], HttpMessage::Content(Content::incomplete(b"\x81\x02hi".to_vec())));
        assert!(reader.decoder_mut().is_passthrough());
    }
}
