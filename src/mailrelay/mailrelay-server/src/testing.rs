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
use crate::storage::{archive_key, MailStorage};
use mailrelay_common::{DeliverContext, RecipientOutcome};
use mailrelay_delivery::{hook::RecipientFromHeaders, transport::Transport, Deliverer};

type Shared<T> = std::sync::Arc<tokio::sync::Mutex<T>>;

/// Live mails in memory.
#[derive(Default)]
pub struct MemoryStorage {
    live: tokio::sync::Mutex<std::collections::BTreeMap<String, String>>,
    archived: tokio::sync::Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn with_live(mails: &[(&str, &str)]) -> Self {
        Self {
            live: tokio::sync::Mutex::new(
                mails
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
            ),
            archived: tokio::sync::Mutex::default(),
        }
    }

    pub async fn live(&self) -> Vec<String> {
        self.live.lock().await.keys().cloned().collect()
    }

    pub async fn archived(&self) -> Vec<String> {
        self.archived.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl MailStorage for MemoryStorage {
    async fn list_live(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.live().await)
    }

    async fn fetch_live(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.live.lock().await.get(key).cloned())
    }

    async fn archive(&self, key: &str, date: Option<time::OffsetDateTime>) -> anyhow::Result<()> {
        anyhow::ensure!(self.live.lock().await.remove(key).is_some(), "no such key");
        self.archived.lock().await.push(archive_key(key, date));
        Ok(())
    }
}

/// Records the recipients of each delivery, `fail@` addresses fail.
pub struct Accept {
    delivered: Shared<Vec<Vec<String>>>,
}

#[async_trait::async_trait]
impl Transport for Accept {
    async fn deliver(&self, ctx: &mut DeliverContext) {
        for rcpt in &ctx.recipients {
            let outcome = if rcpt.starts_with("fail@") {
                RecipientOutcome::failure("rejected")
            } else {
                RecipientOutcome::success("accepted")
            };
            ctx.result.set(rcpt.clone(), outcome);
        }
        ctx.result.provider_message_id = Some("id-1@test".to_owned());
        self.delivered
            .lock()
            .await
            .push(ctx.recipients.iter().cloned().collect());
    }
}

/// A deliverer resolving the `x.com` recipients of the headers.
pub fn accepting() -> (std::sync::Arc<Deliverer>, Shared<Vec<Vec<String>>>) {
    let delivered = Shared::default();
    let deliverer = Deliverer::builder(
        "accept",
        Accept {
            delivered: delivered.clone(),
        },
    )
    .pre_hook(RecipientFromHeaders::new("x.com"))
    .build();

    (std::sync::Arc::new(deliverer), delivered)
}
