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
use super::CloudMailClient;
use anyhow::Context;

/// [`CloudMailClient`] on AWS SESv2, with static credentials.
#[derive(Debug, Clone)]
pub struct SesClient {
    client: aws_sdk_sesv2::Client,
}

impl SesClient {
    ///
    #[must_use]
    pub fn new(region: &str, access_key_id: &str, secret_access_key: &str) -> Self {
        let config = aws_sdk_sesv2::Config::builder()
            .behavior_version(aws_sdk_sesv2::config::BehaviorVersion::latest())
            .region(aws_sdk_sesv2::config::Region::new(region.to_owned()))
            .credentials_provider(aws_sdk_sesv2::config::Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "mailrelay",
            ))
            .build();

        Self {
            client: aws_sdk_sesv2::Client::from_conf(config),
        }
    }
}

#[async_trait::async_trait]
impl CloudMailClient for SesClient {
    async fn send_raw(&self, raw: Vec<u8>) -> anyhow::Result<Option<String>> {
        let raw = aws_sdk_sesv2::types::RawMessage::builder()
            .data(aws_sdk_sesv2::primitives::Blob::new(raw))
            .build()
            .context("cannot build the raw message")?;

        let output = self
            .client
            .send_email()
            .content(
                aws_sdk_sesv2::types::EmailContent::builder()
                    .raw(raw)
                    .build(),
            )
            .send()
            .await
            .map_err(|error| {
                anyhow::anyhow!("{}", aws_sdk_sesv2::error::DisplayErrorContext(error))
            })
            .context("SESv2 send-email failed")?;

        Ok(output.message_id().map(str::to_owned))
    }
}
