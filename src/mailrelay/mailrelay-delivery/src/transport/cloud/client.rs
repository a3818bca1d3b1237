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
use crate::transport::Transport;
use mailrelay_common::{DeliverContext, RecipientOutcome, WHOLE_MESSAGE};

/// Transactional email api of a cloud provider.
#[async_trait::async_trait]
pub trait CloudMailClient: Send + Sync {
    /// Send `raw` as is, the provider reads the envelope from the headers.
    ///
    /// Returns the identifier the provider assigned to the mail.
    async fn send_raw(&self, raw: Vec<u8>) -> anyhow::Result<Option<String>>;
}

/// Delivery through a [`CloudMailClient`], one call per mail.
///
/// The outcome is recorded under [`WHOLE_MESSAGE`], the provider id as
/// `<id>@<region>.<provider_domain>`.
pub struct Cloud {
    client: Box<dyn CloudMailClient>,
    region: String,
    provider_domain: String,
    timeout: std::time::Duration,
}

impl std::fmt::Debug for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cloud")
            .field("region", &self.region)
            .field("provider_domain", &self.provider_domain)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Cloud {
    ///
    #[must_use]
    pub fn new(
        client: impl CloudMailClient + 'static,
        region: impl Into<String>,
        provider_domain: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            client: Box::new(client),
            region: region.into(),
            provider_domain: provider_domain.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Transport for Cloud {
    async fn deliver(&self, ctx: &mut DeliverContext) {
        tracing::info!("Calling the cloud send api.");

        let raw = ctx.mail.as_bytes().to_vec();
        let sent = tokio::time::timeout(self.timeout, self.client.send_raw(raw)).await;

        let outcome = match sent {
            Ok(Ok(id)) => {
                match id {
                    Some(id) => {
                        ctx.result.smtp_message = Some(format!("Cloud Message ID: {id}"));
                        ctx.result.provider_message_id =
                            Some(format!("{id}@{}.{}", self.region, self.provider_domain));
                    }
                    None => tracing::warn!("The cloud send api returned no message id."),
                }
                RecipientOutcome::success(format!(
                    "Successfully called the cloud send api, message id {}.",
                    ctx.result.provider_message_id.as_deref().unwrap_or("unknown")
                ))
            }
            Ok(Err(error)) => {
                tracing::warn!(error = %format!("{error:#}"), "Cloud send api failed.");
                RecipientOutcome::failure("An error was thrown when calling the cloud send api.")
                    .with_cause(format!("{error:#}"))
            }
            Err(_elapsed) => RecipientOutcome::failure(format!(
                "The cloud send api did not answer within {}.",
                humantime::format_duration(self.timeout)
            )),
        };

        ctx.result.set(WHOLE_MESSAGE, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cloud, CloudMailClient};
    use crate::transport::Transport;
    use mailrelay_common::{DeliverContext, OutcomeKind, WHOLE_MESSAGE};
    use mailrelay_mail_parser::Mail;
    use pretty_assertions::assert_eq;

    enum Mock {
        Id(Option<&'static str>),
        Error,
        Hang,
    }

    #[async_trait::async_trait]
    impl CloudMailClient for Mock {
        async fn send_raw(&self, raw: Vec<u8>) -> anyhow::Result<Option<String>> {
            assert_eq!(raw, b"To: a@y.com\n\nhi".to_vec());
            match self {
                Self::Id(id) => Ok(id.map(str::to_owned)),
                Self::Error => anyhow::bail!("throttled"),
                Self::Hang => {
                    tokio::time::sleep(std::time::Duration::from_secs(10)).await;
                    Ok(None)
                }
            }
        }
    }

    async fn deliver(mock: Mock) -> DeliverContext {
        let cloud = Cloud::new(
            mock,
            "us-east-1",
            "amazonses.com",
            std::time::Duration::from_millis(200),
        );
        let mut ctx = DeliverContext::new(Mail::new("To: a@y.com\n\nhi"), None);
        cloud.deliver(&mut ctx).await;
        ctx
    }

    #[test_log::test(tokio::test)]
    async fn provider_id() {
        let ctx = deliver(Mock::Id(Some("0100abc"))).await;

        assert_eq!(
            ctx.result.provider_message_id.as_deref(),
            Some("0100abc@us-east-1.amazonses.com")
        );
        assert_eq!(ctx.result.smtp_message(), "Cloud Message ID: 0100abc");
        assert_eq!(ctx.result.recipients.len(), 1);
        assert_eq!(ctx.result.recipients[WHOLE_MESSAGE].kind, OutcomeKind::Success);
    }

    #[test_log::test(tokio::test)]
    async fn no_provider_id_is_still_a_success() {
        let ctx = deliver(Mock::Id(None)).await;

        assert_eq!(ctx.result.provider_message_id, None);
        assert_eq!(ctx.result.smtp_message(), "OK Message accepted for delivery");
        assert!(!ctx.result.has_failure());
    }

    #[test_log::test(tokio::test)]
    async fn api_error() {
        let ctx = deliver(Mock::Error).await;

        let outcome = &ctx.result.recipients[WHOLE_MESSAGE];
        assert_eq!(outcome.kind, OutcomeKind::Failure);
        assert_eq!(outcome.cause.as_deref(), Some("throttled"));
    }

    #[test_log::test(tokio::test)]
    async fn api_timeout() {
        let ctx = deliver(Mock::Hang).await;

        assert_eq!(ctx.result.recipients[WHOLE_MESSAGE].kind, OutcomeKind::Failure);
        assert_eq!(ctx.result.provider_message_id, None);
    }
}
