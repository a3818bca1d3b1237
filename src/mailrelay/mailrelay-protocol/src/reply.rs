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
//! Replies of the session.

pub const SENDER_OK: &str = "250 2.1.0 Sender OK";
pub const RECIPIENT_OK: &str = "250 2.1.5 Recipient OK";
pub const START_DATA: &str = "354 Start mail input; end with <CRLF>.<CRLF>";
pub const UNRECOGNIZED: &str = "500 5.5.1 Error: command not recognized";
pub const LINE_TOO_LONG: &str = "500 5.5.2 Error: line too long";
pub const DELIVERY_FAILED: &str = "554 5.3.0 Error: check server log";
pub const MESSAGE_TOO_BIG: &str = "552 5.3.4 Error: message size exceeds fixed maximum message size";

/// Name announced by the server, `[host]:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerName(String);

impl ServerName {
    ///
    #[must_use]
    pub fn new(host: impl std::fmt::Display, port: u16) -> Self {
        Self(format!("[{host}]:{port}"))
    }

    pub(crate) fn ready(&self) -> String {
        format!("220 {self} SMTP Ready")
    }

    pub(crate) fn hello(&self) -> String {
        format!("250 {self}")
    }

    pub(crate) fn closing(&self) -> String {
        format!("211 2.0.0 {self} closing connection")
    }

    pub(crate) fn timeout(&self) -> String {
        format!("421 4.4.2 {self} Error: timeout exceeded")
    }
}

impl From<std::net::SocketAddr> for ServerName {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl std::fmt::Display for ServerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn delivered(message: &str) -> String {
    format!("250 2.6.0 {message}")
}
