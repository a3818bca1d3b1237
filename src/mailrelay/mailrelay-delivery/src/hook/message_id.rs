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
use mailrelay_common::{DeliverContext, MessageIdStore};

/// Replace, everywhere in the mail, the addresses for which a translated id
/// has been recorded.
///
/// Replies quote the `Message-ID` of the mail they answer, possibly in the
/// body. This rewrites them to the id the provider knows.
#[derive(Clone)]
pub struct MessageIdRewrite {
    store: std::sync::Arc<dyn MessageIdStore>,
}

impl MessageIdRewrite {
    ///
    #[must_use]
    pub fn new(store: std::sync::Arc<dyn MessageIdStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Hook for MessageIdRewrite {
    fn name(&self) -> &'static str {
        "message-id-rewrite"
    }

    async fn call(&self, ctx: &mut DeliverContext) -> anyhow::Result<()> {
        let mut addresses = ctx.mail.simple_find_all_addresses();
        let mut seen = std::collections::HashSet::new();
        addresses.retain(|a| seen.insert(a.clone()));

        tracing::debug!(?addresses, "Addresses found in the mail.");

        for address in addresses {
            let translated = self
                .store
                .translated(&address)
                .await
                .with_context(|| format!("cannot look up the translated id of '{address}'"))?;

            if let Some(translated) = translated.filter(|t| !t.is_empty()) {
                tracing::info!(%address, %translated, "Rewriting message id.");
                ctx.mail.replace_all(&address, &translated);
            }
        }

        Ok(())
    }
}

/// Record the pair `Message-ID` / provider id once the provider accepted the
/// mail, and rewrite the id in the mail.
#[derive(Clone)]
pub struct MessageIdSave {
    store: std::sync::Arc<dyn MessageIdStore>,
}

impl MessageIdSave {
    ///
    #[must_use]
    pub fn new(store: std::sync::Arc<dyn MessageIdStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Hook for MessageIdSave {
    fn name(&self) -> &'static str {
        "message-id-save"
    }

    async fn call(&self, ctx: &mut DeliverContext) -> anyhow::Result<()> {
        let Some(message_id) = ctx
            .mail
            .message_id()
            .context("cannot read the message id of the mail")?
        else {
            tracing::warn!("Mail without message id, nothing to save.");
            return Ok(());
        };

        let Some(provider_id) = ctx.result.provider_message_id.clone() else {
            tracing::debug!("No provider message id, nothing to save.");
            return Ok(());
        };

        tracing::info!(%message_id, %provider_id, "Saving message id.");
        ctx.mail.replace_all(&message_id, &provider_id);
        self.store
            .record(&message_id, &provider_id)
            .await
            .with_context(|| format!("cannot record '{message_id}' => '{provider_id}'"))
    }
}
