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
use mailrelay_common::DeliverResult;

/// Why a `deliver()` call did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The mail cannot be parsed, no hook and no transport has been run.
    #[error("invalid mail: {0}")]
    Parse(#[from] mailrelay_mail_parser::ParserError),
    /// A hook failed, the remaining steps have not been run.
    #[error("hook '{name}' failed: {source:#}")]
    Hook {
        /// [`crate::hook::Hook::name`]
        name: &'static str,
        ///
        #[source]
        source: anyhow::Error,
    },
    /// The transport did not record any outcome, for example because no
    /// recipient was resolved.
    #[error("no delivery attempted: {}", .result.message.as_deref().unwrap_or("no outcome recorded"))]
    NoOutcome {
        ///
        result: Box<DeliverResult>,
    },
    /// At least one outcome is not a success.
    #[error("mail failed to deliver")]
    Failed {
        ///
        result: Box<DeliverResult>,
    },
}

impl DeliveryError {
    /// The result of the transport, if it has been reached.
    #[must_use]
    pub fn result(&self) -> Option<&DeliverResult> {
        match self {
            Self::Parse(_) | Self::Hook { .. } => None,
            Self::NoOutcome { result } | Self::Failed { result } => Some(&**result),
        }
    }
}
