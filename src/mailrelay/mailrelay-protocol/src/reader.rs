/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::Error;
use tokio::io::AsyncReadExt;

fn find(bytes: &[u8], search: &[u8]) -> Option<usize> {
    bytes
        .windows(search.len())
        .position(|window| window == search)
}

/// Stream for reading `\r\n` terminated lines from the client.
///
/// Bytes received after a line are kept for the next read.
pub struct Reader<R: tokio::io::AsyncRead + Unpin + Send> {
    inner: R,
    buffer: bytes::BytesMut,
    additional_reserve: usize,
}

impl<R: tokio::io::AsyncRead + Unpin + Send> Reader<R> {
    /// Create a new stream.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: bytes::BytesMut::with_capacity(80),
            additional_reserve: 1024,
        }
    }

    /// Next line, `\r\n` included. `None` when the client closed the connection.
    ///
    /// # Errors
    ///
    /// * [`Error::BufferTooLong`] if no `\r\n` is found within `max_length` bytes
    /// * [`Error::Io`] produced by the underlying reader
    pub async fn next_line(&mut self, max_length: usize) -> Result<Option<Vec<u8>>, Error> {
        loop {
            if let Some(pos) = find(&self.buffer, b"\r\n") {
                return Ok(Some(self.buffer.split_to(pos + 2).to_vec()));
            }

            if self.buffer.len() > max_length {
                return Err(Error::BufferTooLong {
                    expected: max_length,
                    got: self.buffer.len(),
                });
            }

            self.buffer.reserve(self.additional_reserve);
            if self.inner.read_buf(&mut self.buffer).await? == 0 {
                if !self.buffer.is_empty() {
                    tracing::warn!(
                        remaining = ?String::from_utf8_lossy(&self.buffer),
                        "Connection closed in the middle of a line."
                    );
                    self.buffer.clear();
                }
                return Ok(None);
            }
        }
    }

    /// Produce the lines of a message, dot-unstuffed, until the `.` line.
    ///
    /// Each line waits at most `timeout`. The stream yields an error and ends
    /// once the message exceeds `size_limit` bytes, or if the connection is
    /// closed before the `.` line.
    pub fn as_message_stream(
        &mut self,
        size_limit: usize,
        timeout: std::time::Duration,
    ) -> impl tokio_stream::Stream<Item = Result<Vec<u8>, Error>> + '_ {
        async_stream::stream! {
            let mut size = 0;

            loop {
                let line = match tokio::time::timeout(timeout, self.next_line(size_limit)).await {
                    Ok(Ok(Some(line))) => line,
                    Ok(Ok(None)) => {
                        yield Err(Error::Io(std::io::ErrorKind::UnexpectedEof.into()));
                        return;
                    }
                    Ok(Err(error)) => {
                        yield Err(error);
                        return;
                    }
                    Err(_elapsed) => {
                        yield Err(Error::Timeout { duration: timeout });
                        return;
                    }
                };

                if line == b".\r\n" {
                    return;
                }

                let line = if line.starts_with(b"..") {
                    line[1..].to_vec()
                } else {
                    line
                };

                size += line.len();
                if size > size_limit {
                    yield Err(Error::BufferTooLong { expected: size_limit, got: size });
                    return;
                }

                yield Ok(line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Reader;
    use crate::Error;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn lines_across_reads() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = Reader::new(server);

        tokio::io::AsyncWriteExt::write_all(&mut client, b"EHLO a\r\nMAIL")
            .await
            .unwrap();
        assert_eq!(
            reader.next_line(512).await.unwrap().as_deref(),
            Some(b"EHLO a\r\n".as_slice())
        );

        tokio::io::AsyncWriteExt::write_all(&mut client, b" FROM:<>\r\npartial")
            .await
            .unwrap();
        drop(client);

        assert_eq!(
            reader.next_line(512).await.unwrap().as_deref(),
            Some(b"MAIL FROM:<>\r\n".as_slice())
        );
        assert_eq!(reader.next_line(512).await.unwrap(), None);
    }

    #[tokio::test]
    async fn line_too_long() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = Reader::new(server);

        tokio::io::AsyncWriteExt::write_all(&mut client, &[b'a'; 32])
            .await
            .unwrap();
        assert!(matches!(
            reader.next_line(16).await,
            Err(Error::BufferTooLong { expected: 16, .. })
        ));
    }

    #[tokio::test]
    async fn message_unstuffed() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut reader = Reader::new(server);

        tokio::io::AsyncWriteExt::write_all(
            &mut client,
            b"Subject: a\r\n\r\n..leading dot\r\n.\r\nQUIT\r\n",
        )
        .await
        .unwrap();

        let lines = reader
            .as_message_stream(1024, std::time::Duration::from_secs(1))
            .collect::<Result<Vec<_>, _>>()
            .await
            .unwrap();
        assert_eq!(
            lines.concat(),
            b"Subject: a\r\n\r\n.leading dot\r\n".to_vec()
        );

        assert_eq!(
            reader.next_line(512).await.unwrap().as_deref(),
            Some(b"QUIT\r\n".as_slice())
        );
    }

    #[tokio::test]
    async fn message_too_big() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut reader = Reader::new(server);

        tokio::io::AsyncWriteExt::write_all(&mut client, b"0123456789\r\n0123456789\r\n.\r\n")
            .await
            .unwrap();

        let lines = reader
            .as_message_stream(16, std::time::Duration::from_secs(1))
            .collect::<Vec<_>>()
            .await;
        assert_eq!(lines.len(), 2);
        assert!(matches!(
            lines[1],
            Err(Error::BufferTooLong { expected: 16, got: 24 })
        ));
    }

    #[tokio::test]
    async fn message_timeout() {
        let (_client, server) = tokio::io::duplex(256);
        let mut reader = Reader::new(server);

        let lines = reader
            .as_message_stream(16, std::time::Duration::from_millis(50))
            .collect::<Vec<_>>()
            .await;
        assert!(matches!(lines[..], [Err(Error::Timeout { .. })]));
    }
}
