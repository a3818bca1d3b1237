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
//! Delivery of a mail: the hook chain run around a transport, the local
//! delivery agent transport and the cloud api transport.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]

mod deliverer;
mod error;

pub use deliverer::{Deliverer, DelivererBuilder};
pub use error::DeliveryError;

/// Steps run before and after the transport.
pub mod hook {
    mod alias;
    mod fallback;
    mod headers;
    mod message_id;
    mod sent;

    pub use alias::{read_alias_file, AliasRecipient};
    pub use fallback::FallbackRecipient;
    pub use headers::RecipientFromHeaders;
    pub use message_id::{MessageIdRewrite, MessageIdSave};
    pub use sent::SaveSent;

    use mailrelay_common::DeliverContext;

    /// One normalization or side-effect step of a delivery.
    ///
    /// An error aborts the delivery.
    #[async_trait::async_trait]
    pub trait Hook: Send + Sync {
        /// Used in the logs and errors.
        fn name(&self) -> &'static str;

        ///
        async fn call(&self, ctx: &mut DeliverContext) -> anyhow::Result<()>;
    }
}

/// The systems handing the mail over.
pub mod transport {
    mod lda;

    /// Cloud email sending api.
    pub mod cloud {
        mod client;
        mod ses;

        pub use client::{Cloud, CloudMailClient};
        pub use ses::SesClient;
    }

    pub use lda::Lda;

    use mailrelay_common::DeliverContext;

    /// Hand the mail of the context over.
    ///
    /// Implementations record an outcome per recipient (or one under
    /// [`mailrelay_common::WHOLE_MESSAGE`]) in `ctx.result`, leaving it
    /// empty means the delivery failed.
    #[async_trait::async_trait]
    pub trait Transport: Send + Sync {
        ///
        async fn deliver(&self, ctx: &mut DeliverContext);
    }
}
