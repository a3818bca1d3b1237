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
//! The few SMTP commands needed to receive mails from a local client.
//!
//! `EHLO`/`HELO`, `MAIL FROM:` and `RCPT TO:` are acknowledged without
//! looking at their arguments, `DATA` collects a message and hands it to a
//! [`MessageHandler`], `QUIT` closes. Anything else closes the connection.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]

mod command;
mod error;
mod reader;
mod reply;
mod session;
mod writer;

pub use command::Verb;
pub use error::Error;
pub use reader::Reader;
pub use reply::ServerName;
pub use session::{MessageHandler, Session, SessionConfig};
pub use writer::Writer;
