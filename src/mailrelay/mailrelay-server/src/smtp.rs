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
use anyhow::Context;
use mailrelay_delivery::Deliverer;
use mailrelay_protocol::{MessageHandler, Session, SessionConfig};

/// Create a `TCPListener` ready to be listened to
///
/// # Errors
///
/// * failed to bind to the socket address
/// * failed to set the listener to non blocking
pub fn socket_bind_anyhow<A: std::net::ToSocketAddrs + std::fmt::Debug>(
    addr: A,
) -> anyhow::Result<std::net::TcpListener> {
    let socket = std::net::TcpListener::bind(&addr)
        .with_context(|| format!("Failed to bind socket on addr: '{addr:?}'"))?;

    socket
        .set_nonblocking(true)
        .with_context(|| format!("Failed to set non-blocking socket on addr: '{addr:?}'"))?;

    Ok(socket)
}

const ACCEPT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(100);

type ListenerStreamItem = std::io::Result<(tokio::net::TcpStream, std::net::SocketAddr)>;

fn listener_to_stream(
    listener: &tokio::net::TcpListener,
) -> impl tokio_stream::Stream<Item = ListenerStreamItem> + '_ {
    async_stream::stream! {
        loop {
            yield listener.accept().await;
        }
    }
}

/// Hands the messages of the SMTP sessions to a [`Deliverer`].
#[derive(Debug, Clone)]
pub struct DelivererHandler(pub std::sync::Arc<Deliverer>);

#[async_trait::async_trait]
impl MessageHandler for DelivererHandler {
    async fn on_message(&self, raw: String) -> anyhow::Result<String> {
        let result = self.0.deliver_raw(raw).await?;
        Ok(result.smtp_message())
    }
}

/// The SMTP listener, one task per client.
#[derive(Debug, Clone)]
pub struct SmtpServer {
    handler: DelivererHandler,
    command_timeout: std::time::Duration,
    data_timeout: std::time::Duration,
    message_size_limit: usize,
}

impl SmtpServer {
    ///
    #[must_use]
    pub fn new(deliverer: std::sync::Arc<Deliverer>, smtp: &mailrelay_config::field::FieldServerSMTP) -> Self {
        Self {
            handler: DelivererHandler(deliverer),
            command_timeout: smtp.command_timeout,
            data_timeout: smtp.data_timeout,
            message_size_limit: smtp.message_size_limit,
        }
    }

    #[tracing::instrument(
        name = "handle-client",
        skip_all,
        fields(client = %client_addr, server = %server_addr, uuid = %uuid::Uuid::new_v4())
    )]
    async fn handle_client(
        handler: DelivererHandler,
        config: SessionConfig,
        stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        server_addr: std::net::SocketAddr,
    ) {
        tracing::info!("Connection accepted.");

        let (read, write) = stream.into_split();
        match Session::new(read, write, config).run(&handler).await {
            Ok(()) => tracing::info!("Connection closed."),
            Err(error) => tracing::warn!(%error, "Session ended with an error."),
        }
    }

    /// Spawn a session for every accepted client. A failed `accept()` is
    /// logged and the loop goes on.
    async fn serve_clients(
        &self,
        accept: impl tokio_stream::Stream<Item = ListenerStreamItem>,
        config: SessionConfig,
        server_addr: std::net::SocketAddr,
    ) {
        tokio::pin!(accept);

        while let Some(client) = tokio_stream::StreamExt::next(&mut accept).await {
            let (stream, client_addr) = match client {
                Ok(client) => client,
                Err(error) => {
                    tracing::error!(%error, "Failed to accept a client.");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            tokio::spawn(Self::handle_client(
                self.handler.clone(),
                config.clone(),
                stream,
                client_addr,
                server_addr,
            ));
        }
    }

    /// Main loop of the SMTP listener.
    ///
    /// # Errors
    ///
    /// * failed to convert the socket to a [`tokio::net::TcpListener`]
    #[tracing::instrument(name = "serve-smtp", skip_all)]
    pub async fn listen_and_serve(self, socket: std::net::TcpListener) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::from_std(socket)?;
        let server_addr = listener.local_addr()?;

        tracing::info!(interface = %server_addr, "Listening for SMTP clients.");

        let config = SessionConfig {
            server_name: server_addr.into(),
            command_timeout: self.command_timeout,
            data_timeout: self.data_timeout,
            message_size_limit: self.message_size_limit,
        };

        self.serve_clients(listener_to_stream(&listener), config, server_addr)
            .await;
        Ok(())
    }
}
