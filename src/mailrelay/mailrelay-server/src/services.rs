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
use crate::{
    fetcher::Fetcher,
    http::{self, AppState, LiveEndpoint},
    smtp::{socket_bind_anyhow, SmtpServer},
    storage::S3Storage,
};
use anyhow::Context;
use mailrelay_common::MessageIdStore;
use mailrelay_config::{
    field::{FieldCloud, FieldInbound},
    Config,
};
use mailrelay_delivery::{
    hook::{
        AliasRecipient, FallbackRecipient, MessageIdRewrite, MessageIdSave, RecipientFromHeaders,
        SaveSent,
    },
    transport::{
        cloud::{Cloud, SesClient},
        Lda,
    },
    Deliverer,
};
use mailrelay_store::SqliteStore;

/// Deliverer to the local mailboxes: headers, fallback then aliases resolve
/// the recipients, the local delivery agent is run for each of them.
#[must_use]
pub fn inbound(config: &Config) -> Deliverer {
    Deliverer::builder(
        "lda",
        Lda::new(
            &config.inbound.lda_path,
            Some(config.lda_logs()),
            config.inbound.lda_timeout,
        ),
    )
    .pre_hook(RecipientFromHeaders::new(config.server.mail_domain.as_str()))
    .pre_hook(FallbackRecipient::new(config.inbound.fallback.clone()))
    .pre_hook(AliasRecipient::new(config.alias_file()))
    .build()
}

/// Deliverer to the cloud provider, one mail at a time, keeping the thread
/// headers consistent with the ids the provider assigns. A copy of each sent
/// mail goes to the sender's `Sent` mailbox if `inbound.save_sent` is set.
#[must_use]
pub fn outbound(
    cloud: &FieldCloud,
    inbound: &FieldInbound,
    store: std::sync::Arc<dyn MessageIdStore>,
) -> Deliverer {
    let builder = Deliverer::builder(
        "cloud",
        Cloud::new(
            SesClient::new(&cloud.region, &cloud.access_key_id, &cloud.secret_access_key),
            cloud.region.as_str(),
            cloud.provider_domain.as_str(),
            cloud.timeout,
        ),
    )
    .pre_hook(MessageIdRewrite::new(store.clone()))
    .post_hook(MessageIdSave::new(store.clone()))
    .serialized(true);

    if inbound.save_sent {
        builder
            .post_hook(SaveSent::new(
                &inbound.doveadm_path,
                inbound.lda_timeout,
                store,
            ))
            .build()
    } else {
        builder.build()
    }
}

/// [`Fetcher`] of the provider's bucket.
#[must_use]
pub fn live_fetcher(cloud: &FieldCloud, inbound: std::sync::Arc<Deliverer>) -> Fetcher {
    Fetcher::new(
        std::sync::Arc::new(S3Storage::new(
            &cloud.region,
            &cloud.access_key_id,
            &cloud.secret_access_key,
            &cloud.mail_bucket,
        )),
        inbound,
    )
}

/// Every running part of the relay.
#[derive(Debug)]
pub struct Services {
    config: std::sync::Arc<Config>,
    inbound: std::sync::Arc<Deliverer>,
    outbound: Option<std::sync::Arc<Deliverer>>,
    fetcher: Option<std::sync::Arc<Fetcher>>,
}

impl Services {
    /// Build the deliverers and open the message id database.
    ///
    /// # Errors
    ///
    /// * the data directory cannot be created
    /// * the database cannot be opened
    pub fn new(config: std::sync::Arc<Config>) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
            format!("cannot create data directory {:?}", config.server.data_dir)
        })?;

        let inbound = std::sync::Arc::new(inbound(&config));

        let (outbound, fetcher) = match &config.cloud {
            Some(cloud) => {
                let store = SqliteStore::open(
                    &config.store_path(),
                    config.store.connections,
                    config.store.timeout,
                )?;
                (
                    Some(std::sync::Arc::new(outbound(
                        cloud,
                        &config.inbound,
                        std::sync::Arc::new(store),
                    ))),
                    Some(std::sync::Arc::new(live_fetcher(cloud, inbound.clone()))),
                )
            }
            None => {
                tracing::warn!("No cloud configured, outbound delivery and live mails are disabled.");
                (None, None)
            }
        };

        Ok(Self {
            config,
            inbound,
            outbound,
            fetcher,
        })
    }

    /// Run the SMTP listener and the HTTP server, and the recycling of the
    /// live mails if `recycle` is set, until one of them fails.
    ///
    /// # Errors
    ///
    /// * a socket cannot be bound
    /// * a server failed
    pub async fn serve(self, recycle: bool) -> anyhow::Result<()> {
        let interfaces = &self.config.server.interfaces;
        let smtp_socket = socket_bind_anyhow(interfaces.smtp)?;
        let http_socket = socket_bind_anyhow(interfaces.http)?;

        let smtp = SmtpServer::new(
            self.outbound.clone().unwrap_or_else(|| self.inbound.clone()),
            &self.config.server.smtp,
        );

        let live = self
            .config
            .cloud
            .as_ref()
            .zip(self.fetcher.clone())
            .and_then(|(cloud, fetcher)| {
                Some(LiveEndpoint {
                    path: cloud.inbound_path.clone()?,
                    key: cloud.inbound_key.clone()?,
                    fetcher,
                })
            });

        let router = http::router(AppState {
            inbound: self.inbound.clone(),
            outbound: self.outbound.clone(),
            live,
        });

        let recycler = match (&self.fetcher, &self.config.cloud) {
            (Some(fetcher), Some(cloud)) if recycle => {
                Some(tokio::spawn(fetcher.clone().recycle_every(cloud.recycle_interval)))
            }
            _ => None,
        };

        let result = tokio::select! {
            result = smtp.listen_and_serve(smtp_socket) => result.context("SMTP listener failed"),
            result = http::serve(http_socket, router) => result.context("HTTP server failed"),
        };

        if let Some(recycler) = recycler {
            recycler.abort();
        }
        result
    }

    /// The live mail fetcher.
    ///
    /// # Errors
    ///
    /// * no cloud is configured
    pub fn fetcher(&self) -> anyhow::Result<&Fetcher> {
        self.fetcher
            .as_deref()
            .context("the [cloud] section of the configuration is required")
    }
}
