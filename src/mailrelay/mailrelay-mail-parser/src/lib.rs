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

//! Raw mail parsing used by the relay.
//!
//! The parser is deliberately shallow: it splits the header block from the
//! body, unfolds header fields and extracts mailbox addresses. The body is
//! never decoded.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]

mod address;
mod error;

mod message {
    pub mod headers;
    pub mod mail;
    pub mod sections;
}

pub use address::parse_address_list;
pub use error::{ParserError, ParserResult};
pub use message::headers::{MailHeaders, RecipientsOptions, DEFAULT_RECIPIENT_HEADERS};
pub use message::mail::Mail;
pub use message::sections::{LineEnding, MailSections};
