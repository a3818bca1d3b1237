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
//! The services of the mail relay: the SMTP listener, the HTTP endpoints and
//! the fetcher of the mails stored by the cloud provider.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]

mod fetcher;
mod services;
mod smtp;
mod storage;

/// Axum routes.
pub mod http;

#[cfg(test)]
mod testing;

pub use fetcher::{Consumed, Fetcher};
pub use services::{inbound, live_fetcher, outbound, Services};
pub use smtp::{socket_bind_anyhow, DelivererHandler, SmtpServer};
pub use storage::{archive_key, MailStorage, S3Storage, ARCHIVE_PREFIX, LIVE_PREFIX, SETUP_NOTIFICATION};
