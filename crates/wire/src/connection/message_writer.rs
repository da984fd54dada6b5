use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::codec::MessageEncoder;
use crate::protocol::{HttpMessage, SendError};

/// Writes encoded messages to one direction of a connection.
///
/// [`MessageWriter::write`] only encodes, the frames reach the transport on
/// [`MessageWriter::flush`]. Content regions are written as they were framed,
/// without being copied into an intermediate buffer.
#[derive(Debug)]
pub struct MessageWriter<W> {
    writer: W,
    frames: Vec<Bytes>,
    encoder: MessageEncoder,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { writer, frames: Vec::new(), encoder: MessageEncoder::new() }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    #[inline]
    pub fn encoder(&self) -> &MessageEncoder {
        &self.encoder
    }

    /// Number of frames waiting for [`MessageWriter::flush`].
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn write(&mut self, item: HttpMessage) -> Result<(), SendError> {
        self.encoder.encode_frames(item, &mut self.frames)
    }

    pub async fn flush(&mut self) -> Result<(), SendError> {
        if self.frames.is_empty() {
            return Ok(());
        }

        for frame in self.frames.drain(..) {
            self.writer.write_all(&frame).await?;
        }
        Ok(self.writer.flush().await?)
    }

    /// Encodes `item` and flushes it with everything written before.
    pub async fn send(&mut self, item: HttpMessage) -> Result<(), SendError> {
        self.write(item)?;
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, Method, StatusCode, header};

    use super::*;
    use crate::codec::MessageDecoder;
    use crate::connection::MessageReader;
    use crate::protocol::{Content, RequestHead, ResponseHead, TransferCoding};

    #[tokio::test]
    async fn frames_reach_the_transport_on_flush() {
        let mut writer = MessageWriter::new(Vec::new());
        let head = ResponseHead::new(StatusCode::OK)
            .with_transfer_coding(TransferCoding::Chunked)
            .with_content(Content::incomplete("abc"));

        writer.write(head.into()).unwrap();
        writer.write(Content::end().into()).unwrap();
        assert_eq!(writer.pending_frames(), 3);
        assert!(writer.get_mut().is_empty());

        writer.flush().await.unwrap();
        assert_eq!(writer.pending_frames(), 0);
        assert!(writer.encoder().is_idle());
        assert_eq!(
            writer.into_inner(),
            b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n".to_vec()
        );
    }

    #[tokio::test]
    async fn rejected_item_writes_nothing() {
        let mut writer = MessageWriter::new(Vec::new());
        assert!(writer.send(Content::complete("stray").into()).await.is_err());
        assert!(writer.into_inner().is_empty());
    }

    #[tokio::test]
    async fn duplex_round_trip() {
        let (client, server) = tokio::io::duplex(64);

        let send = tokio::spawn(async move {
            let mut writer = MessageWriter::new(client);
            let head = RequestHead::new(Method::POST, "/echo".parse().unwrap())
                .with_header(header::HOST, HeaderValue::from_static("gateway.local"))
                .with_content(Content::complete(vec![b'z'; 300]));
            writer.send(head.into()).await.unwrap();
        });

        let mut reader = MessageReader::new(server, MessageDecoder::request());
        let mut messages = Vec::new();
        reader.pump(|message| messages.push(message)).await.unwrap();
        send.await.unwrap();

        assert_eq!(messages.len(), 1);
        let head = messages[0].as_request().unwrap();
        assert_eq!(head.uri().path(), "/echo");
        assert_eq!(head.content().unwrap().as_bytes(), &[b'z'; 300][..]);
    }
}
