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
use mailrelay_mail_parser::RecipientsOptions;
use tokio::io::AsyncWriteExt;

const SENT: &str = "Sent";

/// Put a copy of each mail accepted by the provider in the `Sent` mailbox of
/// its sender, through `doveadm`.
///
/// The client already stored the mail with its original `Message-ID`; that
/// copy is expunged a few times later, once the client is likely to have
/// uploaded it.
#[derive(Clone)]
pub struct SaveSent {
    path: std::path::PathBuf,
    timeout: std::time::Duration,
    store: std::sync::Arc<dyn MessageIdStore>,
    expunge_after: Vec<std::time::Duration>,
}

impl SaveSent {
    /// Expunge the old copy 15, 30 then 60 seconds after the save.
    #[must_use]
    pub fn new(
        path: impl Into<std::path::PathBuf>,
        timeout: std::time::Duration,
        store: std::sync::Arc<dyn MessageIdStore>,
    ) -> Self {
        Self {
            path: path.into(),
            timeout,
            store,
            expunge_after: [15, 30, 60]
                .into_iter()
                .map(std::time::Duration::from_secs)
                .collect(),
        }
    }

    /// Delays, from the save, of the expunge attempts.
    #[must_use]
    pub fn with_expunge_after(mut self, delays: Vec<std::time::Duration>) -> Self {
        self.expunge_after = delays;
        self
    }

    async fn doveadm(&self, args: &[&str], stdin: Option<&[u8]>) -> anyhow::Result<()> {
        let mut child = tokio::process::Command::new(&self.path)
            .args(args)
            .stdin(if stdin.is_some() {
                std::process::Stdio::piped()
            } else {
                std::process::Stdio::null()
            })
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("cannot spawn {:?}", self.path))?;

        let stdin_pipe = child.stdin.take();
        let run = async move {
            if let (Some(mut pipe), Some(bytes)) = (stdin_pipe, stdin) {
                if let Err(error) = pipe.write_all(bytes).await {
                    tracing::warn!(%error, "Cannot write the whole mail to doveadm.");
                }
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .with_context(|| format!("doveadm {} did not exit in time", args[0]))?
            .with_context(|| format!("cannot run doveadm {}", args[0]))?;

        anyhow::ensure!(
            output.status.success(),
            "doveadm {} failed with {}: {}",
            args[0],
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
        Ok(())
    }

    /// Save `mail` in the `Sent` mailbox of `user`, mark it as seen when it
    /// has a `Message-ID`, then expunge the copy carrying `old_message_id`
    /// at each of the configured delays.
    ///
    /// Expunge failures are logged, the old copy may already be gone.
    ///
    /// # Errors
    ///
    /// * the mail cannot be saved
    /// * the saved mail cannot be flagged
    #[tracing::instrument(name = "save-sent", skip_all, fields(%user))]
    pub async fn save(
        &self,
        user: &str,
        mail: &[u8],
        message_id: Option<&str>,
        old_message_id: Option<&str>,
    ) -> anyhow::Result<()> {
        let start = tokio::time::Instant::now();

        tracing::info!("Save the mail in {SENT}.");
        self.doveadm(&["save", "-u", user, "-m", SENT], Some(mail)).await?;

        if let Some(message_id) = message_id {
            let query = format!("<{message_id}>");
            self.doveadm(
                &[
                    "flags", "add", "-u", user, "\\Seen", "mailbox", SENT, "header", "Message-ID",
                    &query,
                ],
                None,
            )
            .await?;
        } else {
            tracing::warn!("Saved mail without message id, not marked as seen.");
        }

        let Some(old) = old_message_id else {
            return Ok(());
        };
        let query = format!("<{old}>");

        for delay in &self.expunge_after {
            tokio::time::sleep_until(start + *delay).await;
            tracing::info!(old, ?delay, "Expunge the copy with the old message id.");

            if let Err(error) = self
                .doveadm(
                    &["expunge", "-u", user, "mailbox", SENT, "header", "Message-ID", &query],
                    None,
                )
                .await
            {
                tracing::debug!(%error, "Expunge failed, the copy may already be gone.");
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Hook for SaveSent {
    fn name(&self) -> &'static str {
        "save-sent"
    }

    async fn call(&self, ctx: &mut DeliverContext) -> anyhow::Result<()> {
        let Some(provider_id) = ctx.result.provider_message_id.clone() else {
            tracing::debug!("Not accepted by the provider, nothing to save.");
            return Ok(());
        };

        let headers = ctx
            .mail
            .headers()
            .context("cannot read the headers of the mail")?;

        let Some(sender) = headers.sender() else {
            tracing::warn!("No sender in the mail headers, not saved in {SENT}.");
            return Ok(());
        };

        if headers
            .recipients(&RecipientsOptions::default())
            .contains(&sender)
        {
            tracing::info!(%sender, "The sender is a recipient, the mail lands in its inbox.");
            return Ok(());
        }

        let old_message_id = self
            .store
            .original(&provider_id)
            .await
            .with_context(|| format!("cannot look up the original id of '{provider_id}'"))?;

        let this = self.clone();
        let mail = ctx.mail.as_bytes().to_vec();
        let message_id = headers.message_id();
        tokio::spawn(async move {
            if let Err(error) = this
                .save(&sender, &mail, message_id.as_deref(), old_message_id.as_deref())
                .await
            {
                tracing::error!(%error, "Failed to save the mail in {SENT}.");
            }
        });

        Ok(())
    }
}
