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
use crate::storage::MailStorage;
use mailrelay_delivery::Deliverer;
use mailrelay_mail_parser::Mail;

/// What happened to a live mail handed to [`Fetcher::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Consumed {
    /// Delivered then archived.
    Delivered,
    /// No live mail has this key.
    NotFound,
}

/// Delivers the mails the cloud provider received to the local mailboxes.
pub struct Fetcher {
    storage: std::sync::Arc<dyn MailStorage>,
    deliverer: std::sync::Arc<Deliverer>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("deliverer", &self.deliverer.name())
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    ///
    #[must_use]
    pub fn new(
        storage: std::sync::Arc<dyn MailStorage>,
        deliverer: std::sync::Arc<Deliverer>,
    ) -> Self {
        Self { storage, deliverer }
    }

    /// Keys of the mails waiting in the storage.
    ///
    /// # Errors
    ///
    /// * the storage failed
    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        self.storage.list_live().await
    }

    /// Fetch the live mail `key`, deliver it and archive it.
    ///
    /// The mail stays live if the delivery fails.
    ///
    /// # Errors
    ///
    /// * the storage failed
    /// * the delivery failed
    #[tracing::instrument(name = "consume", skip(self, recipients))]
    pub async fn consume(
        &self,
        key: &str,
        recipients: Option<Vec<String>>,
    ) -> anyhow::Result<Consumed> {
        let Some(raw) = self.storage.fetch_live(key).await? else {
            tracing::warn!("Live mail not found.");
            return Ok(Consumed::NotFound);
        };

        let mail = Mail::new(raw);
        let date = mail.date().ok().flatten();

        self.deliverer.deliver(mail, recipients).await?;
        self.storage.archive(key, date).await?;

        Ok(Consumed::Delivered)
    }

    /// Consume every live mail, returns the number of mails delivered.
    ///
    /// A mail failing to deliver does not stop the others.
    ///
    /// # Errors
    ///
    /// * the live mails cannot be listed
    #[tracing::instrument(name = "recycle", skip(self))]
    pub async fn recycle(&self) -> anyhow::Result<usize> {
        let keys = self.list().await?;
        tracing::info!(count = keys.len(), "Recycling live mails.");

        let mut delivered = 0;
        for key in keys {
            match self.consume(&key, None).await {
                Ok(Consumed::Delivered) => delivered += 1,
                Ok(Consumed::NotFound) => {}
                Err(error) => {
                    tracing::error!(%key, error = %format!("{error:#}"), "Live mail not recycled.");
                }
            }
        }

        tracing::info!(delivered, "Live mails recycled.");
        Ok(delivered)
    }

    /// Recycle now, then every `interval`, forever.
    pub async fn recycle_every(self: std::sync::Arc<Self>, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(error) = self.recycle().await {
                tracing::error!(error = %format!("{error:#}"), "Recycling failed.");
            }
        }
    }
}
