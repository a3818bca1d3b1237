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
//! Types shared by the delivery pipeline: the per-delivery context, the
//! recipient outcomes and the collaborator traits.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::missing_const_for_fn)] // see https://github.com/rust-lang/rust-clippy/issues/9271

/// Outcome key used by transports which do not address recipients one by one.
pub const WHOLE_MESSAGE: &str = "*";

mod context;
mod outcome;
mod result;
mod store;

pub use context::DeliverContext;
pub use outcome::{OutcomeKind, RecipientOutcome};
pub use result::DeliverResult;
pub use store::MessageIdStore;

#[cfg(any(test, feature = "testing"))]
pub use store::MemoryStore;

pub use mailrelay_mail_parser as mail_parser;
