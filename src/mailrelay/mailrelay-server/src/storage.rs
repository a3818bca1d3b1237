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
use anyhow::Context;

/// Prefix of the mails waiting to be delivered.
pub const LIVE_PREFIX: &str = "mail/live/";
/// Prefix of the mails already delivered, followed by the day of the mail.
pub const ARCHIVE_PREFIX: &str = "mail/archive/";
/// Object written by the provider when the rule is set up, not a mail.
pub const SETUP_NOTIFICATION: &str = "AMAZON_SES_SETUP_NOTIFICATION";

/// Bucket where the cloud provider drops the received mails.
///
/// Keys are relative to [`LIVE_PREFIX`].
#[async_trait::async_trait]
pub trait MailStorage: Send + Sync {
    /// Keys of every mail not archived yet.
    async fn list_live(&self) -> anyhow::Result<Vec<String>>;

    /// Content of the live mail `key`, `None` if there is no such mail.
    async fn fetch_live(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Move the live mail `key` to the archive of the day `date`.
    async fn archive(&self, key: &str, date: Option<time::OffsetDateTime>) -> anyhow::Result<()>;
}

/// Archive key of the live mail `key`: `mail/archive/<YYYYMMDD>/<key>`,
/// or `mail/archive/invalid-date/<key>` without a date.
#[must_use]
pub fn archive_key(key: &str, date: Option<time::OffsetDateTime>) -> String {
    let day = date
        .and_then(|date| {
            date.format(time::macros::format_description!("[year][month][day]"))
                .ok()
        })
        .unwrap_or_else(|| "invalid-date".to_string());

    format!("{ARCHIVE_PREFIX}{day}/{key}")
}

/// [`MailStorage`] on an AWS S3 bucket.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

fn sdk_error<E>(error: aws_sdk_s3::error::SdkError<E>) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    anyhow::anyhow!("{}", aws_sdk_s3::error::DisplayErrorContext(error))
}

impl S3Storage {
    ///
    #[must_use]
    pub fn new(region: &str, access_key_id: &str, secret_access_key: &str, bucket: &str) -> Self {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region.to_owned()))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "mailrelay",
            ))
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(config),
            bucket: bucket.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl MailStorage for S3Storage {
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_live(&self) -> anyhow::Result<Vec<String>> {
        let mut keys = vec![];
        let mut continuation_token = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(LIVE_PREFIX)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(sdk_error)
                .context("S3 list-objects failed")?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key()?.strip_prefix(LIVE_PREFIX))
                    .filter(|key| !key.is_empty() && !key.ends_with(SETUP_NOTIFICATION))
                    .map(str::to_owned),
            );

            match output.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_owned()),
                None => break,
            }
        }

        tracing::debug!(count = keys.len(), "Live mails listed.");
        Ok(keys)
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn fetch_live(&self, key: &str) -> anyhow::Result<Option<String>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(format!("{LIVE_PREFIX}{key}"))
            .send()
            .await
        {
            Ok(output) => output,
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(aws_sdk_s3::operation::get_object::GetObjectError::is_no_such_key) =>
            {
                return Ok(None);
            }
            Err(error) => return Err(sdk_error(error).context("S3 get-object failed")),
        };

        let body = output
            .body
            .collect()
            .await
            .context("cannot read the S3 object")?
            .into_bytes();

        Ok(Some(String::from_utf8_lossy(&body).into_owned()))
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn archive(&self, key: &str, date: Option<time::OffsetDateTime>) -> anyhow::Result<()> {
        let archive = archive_key(key, date);

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{LIVE_PREFIX}{key}", self.bucket))
            .key(&archive)
            .send()
            .await
            .map_err(sdk_error)
            .context("S3 copy-object failed")?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(format!("{LIVE_PREFIX}{key}"))
            .send()
            .await
            .map_err(sdk_error)
            .context("S3 delete-object failed")?;

        tracing::info!(%archive, "Live mail archived.");
        Ok(())
    }
}
