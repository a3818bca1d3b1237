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
use super::Hook;
use anyhow::Context;
use mailrelay_common::DeliverContext;
use mailrelay_mail_parser::RecipientsOptions;

/// Fill an empty recipient set with the addresses of the mail headers which
/// belong to the local domain.
#[derive(Debug, Clone)]
pub struct RecipientFromHeaders {
    domain: String,
}

impl RecipientFromHeaders {
    ///
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

#[async_trait::async_trait]
impl Hook for RecipientFromHeaders {
    fn name(&self) -> &'static str {
        "recipient-from-headers"
    }

    async fn call(&self, ctx: &mut DeliverContext) -> anyhow::Result<()> {
        if !ctx.recipients.is_empty() {
            tracing::warn!("Recipients are already filled, headers are not read.");
            return Ok(());
        }

        let found = ctx
            .mail
            .recipients(&RecipientsOptions::with_domain(self.domain.as_str()))
            .context("cannot read the recipients of the mail headers")?;

        tracing::info!(recipients = ?found, "Recipients found in the mail headers.");
        ctx.recipients.extend(found);

        Ok(())
    }
}
