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
use crate::{
    reply::{self, ServerName},
    Error, Reader, Verb, Writer,
};
use tokio_stream::StreamExt;

const COMMAND_LINE_MAX: usize = 4096;

/// Receives the messages of a session.
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one complete message.
    ///
    /// The returned text is sent after `250 2.6.0`, an error is reported to
    /// the client as a failure without details.
    async fn on_message(&self, raw: String) -> anyhow::Result<String>;
}

/// Parameters of a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name put in the greeting, `EHLO` and `QUIT` replies.
    pub server_name: ServerName,
    /// Maximum wait for a command.
    pub command_timeout: std::time::Duration,
    /// Maximum wait for each line of a message.
    pub data_timeout: std::time::Duration,
    /// Maximum size of a message, in bytes.
    pub message_size_limit: usize,
}

/// One SMTP connection, in command mode or in data mode.
///
/// After each message, accepted or not, the session goes back to command
/// mode and the client may send another one.
pub struct Session<R, W>
where
    R: tokio::io::AsyncRead + Unpin + Send,
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    reader: Reader<R>,
    writer: Writer<W>,
    config: SessionConfig,
}

impl<R, W> Session<R, W>
where
    R: tokio::io::AsyncRead + Unpin + Send,
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    ///
    #[must_use]
    pub fn new(read: R, write: W, config: SessionConfig) -> Self {
        Self {
            reader: Reader::new(read),
            writer: Writer::new(write),
            config,
        }
    }

    /// Run the session until the client quits, sends an unknown command or
    /// closes the connection.
    ///
    /// # Errors
    ///
    /// * [`Error::Timeout`] if the client is idle for too long
    /// * [`Error::BufferTooLong`] if a command or the message is too long
    /// * [`Error::Io`] on the underlying connection
    pub async fn run<H>(mut self, handler: &H) -> Result<(), Error>
    where
        H: MessageHandler + ?Sized,
    {
        self.writer
            .send_reply(&self.config.server_name.ready())
            .await?;

        loop {
            let Some(line) = self.read_command().await? else {
                tracing::info!("Connection closed by the client.");
                return Ok(());
            };

            tracing::trace!("<< {:?}", String::from_utf8_lossy(&line));

            match Verb::parse_line(&line).0 {
                Verb::Helo | Verb::Ehlo => {
                    self.writer
                        .send_reply(&self.config.server_name.hello())
                        .await?;
                }
                Verb::MailFrom => self.writer.send_reply(reply::SENDER_OK).await?,
                Verb::RcptTo => self.writer.send_reply(reply::RECIPIENT_OK).await?,
                Verb::Data => {
                    self.writer.send_reply(reply::START_DATA).await?;
                    self.receive_message(handler).await?;
                }
                Verb::Quit => {
                    self.writer
                        .send_reply(&self.config.server_name.closing())
                        .await?;
                    return Ok(());
                }
                Verb::Unknown => {
                    tracing::warn!(
                        line = %String::from_utf8_lossy(&line).trim_end(),
                        "Unrecognized command from client."
                    );
                    self.writer.send_reply(reply::UNRECOGNIZED).await?;
                    return Ok(());
                }
            }
        }
    }

    async fn read_command(&mut self) -> Result<Option<Vec<u8>>, Error> {
        let timeout = self.config.command_timeout;

        match tokio::time::timeout(timeout, self.reader.next_line(COMMAND_LINE_MAX)).await {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(error @ Error::BufferTooLong { .. })) => {
                self.writer.send_reply(reply::LINE_TOO_LONG).await?;
                Err(error)
            }
            Ok(Err(error)) => Err(error),
            Err(_elapsed) => {
                self.writer
                    .send_reply(&self.config.server_name.timeout())
                    .await?;
                Err(Error::Timeout { duration: timeout })
            }
        }
    }

    async fn receive_message<H>(&mut self, handler: &H) -> Result<(), Error>
    where
        H: MessageHandler + ?Sized,
    {
        let mut raw = Vec::new();

        {
            let stream = self
                .reader
                .as_message_stream(self.config.message_size_limit, self.config.data_timeout);
            tokio::pin!(stream);

            while let Some(line) = stream.next().await {
                match line {
                    Ok(line) => raw.extend_from_slice(&line),
                    Err(error @ Error::BufferTooLong { .. }) => {
                        self.writer.send_reply(reply::MESSAGE_TOO_BIG).await?;
                        return Err(error);
                    }
                    Err(error @ Error::Timeout { .. }) => {
                        self.writer
                            .send_reply(&self.config.server_name.timeout())
                            .await?;
                        return Err(error);
                    }
                    Err(error) => return Err(error),
                }
            }
        }

        let raw = String::from_utf8_lossy(&raw).into_owned();
        tracing::info!(size = raw.len(), "Mail data received, begin to relay.");

        let reply = match handler.on_message(raw).await {
            Ok(message) => {
                tracing::info!("Relay succeeded.");
                reply::delivered(&message)
            }
            Err(error) => {
                tracing::error!(error = %format!("{error:#}"), "Relay failed.");
                reply::DELIVERY_FAILED.to_owned()
            }
        };

        self.writer.send_reply(&reply).await.map_err(Error::from)
    }
}
