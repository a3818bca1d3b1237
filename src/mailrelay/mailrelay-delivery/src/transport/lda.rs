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
use super::Transport;
use anyhow::Context;
use mailrelay_common::{DeliverContext, RecipientOutcome};
use tokio::io::AsyncWriteExt;

const LOG_TIMESTAMP: &[time::format_description::FormatItem<'_>] =
    time::macros::format_description!("[year][month][day]T[hour][minute][second]");

/// Local delivery through an agent executable (such as `dovecot-lda`), run
/// once per recipient as `<path> -d <recipient>` with the mail on its
/// standard input.
///
/// Exit codes follow `sysexits.h`: 67 is an unknown user, 75 a temporary
/// error.
#[derive(Debug, Clone)]
pub struct Lda {
    path: std::path::PathBuf,
    logs: Option<std::path::PathBuf>,
    timeout: std::time::Duration,
}

impl Lda {
    /// `logs` receives the output of every run, inherited streams are used
    /// when `None`.
    #[must_use]
    pub fn new(
        path: impl Into<std::path::PathBuf>,
        logs: Option<std::path::PathBuf>,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            path: path.into(),
            logs,
            timeout,
        }
    }

    fn program(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }

    /// Run the agent for `recipient`, `None` if it has been killed after the timeout.
    async fn run(
        &self,
        program: &str,
        recipient: &str,
        mail: &[u8],
    ) -> anyhow::Result<Option<std::process::ExitStatus>> {
        let mut command = tokio::process::Command::new(&self.path);
        command
            .args(["-d", recipient])
            .stdin(std::process::Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.logs {
            let (stdout, stderr) = open_log_files(dir, program, recipient).await?;
            command.stdout(stdout).stderr(stderr);
        } else {
            command
                .stdout(std::process::Stdio::inherit())
                .stderr(std::process::Stdio::inherit());
        }

        tracing::info!("Run {program} -d {recipient}.");

        let mut child = command
            .spawn()
            .with_context(|| format!("cannot spawn {:?}", self.path))?;
        let mut stdin = child.stdin.take().context("stdin of the agent is not piped")?;

        let write_and_wait = async {
            if let Err(error) = stdin.write_all(mail).await {
                tracing::warn!(%error, "Cannot write the whole mail to {program}.");
            }
            drop(stdin);
            child.wait().await
        };
        let status = tokio::time::timeout(self.timeout, write_and_wait).await;

        match status {
            Ok(status) => status
                .map(Some)
                .with_context(|| format!("cannot wait for {program}")),
            Err(_elapsed) => {
                tracing::warn!(timeout = ?self.timeout, "{program} is too long, killing it.");
                if let Err(error) = child.kill().await {
                    tracing::error!(%error, "Cannot kill {program}.");
                }
                Ok(None)
            }
        }
    }
}

async fn open_log_files(
    dir: &std::path::Path,
    program: &str,
    recipient: &str,
) -> anyhow::Result<(std::fs::File, std::fs::File)> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("cannot create log directory {dir:?}"))?;

    let timestamp = time::OffsetDateTime::now_utc().format(&LOG_TIMESTAMP)?;
    let base = format!(
        "{program}-{}-{timestamp}-{}",
        recipient.replace(std::path::MAIN_SEPARATOR, "_"),
        uuid::Uuid::new_v4().simple()
    );

    let open = |extension: &str| {
        let path = dir.join(format!("{base}.{extension}"));
        async move {
            tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .with_context(|| format!("cannot open log file {path:?}"))
        }
    };

    Ok((
        open("stdout").await?.into_std().await,
        open("stderr").await?.into_std().await,
    ))
}

fn outcome(program: &str, status: std::process::ExitStatus) -> RecipientOutcome {
    if status.success() {
        return RecipientOutcome::success(format!("{program} exited with success."));
    }

    match status.code() {
        Some(67) => RecipientOutcome::failure(format!(
            "{program} exited with error code 67, recipient user not known."
        )),
        Some(75) => RecipientOutcome::temporary(format!(
            "{program} exited with error code 75, temporary error."
        )),
        Some(code) => {
            RecipientOutcome::failure(format!("{program} exited with error code {code}."))
        }
        None => RecipientOutcome::failure(signal(status).map_or_else(
            || format!("{program} exited without code."),
            |signal| format!("{program} was terminated by signal {signal}."),
        )),
    }
}

#[cfg(unix)]
fn signal(status: std::process::ExitStatus) -> Option<i32> {
    std::os::unix::process::ExitStatusExt::signal(&status)
}

#[cfg(not(unix))]
const fn signal(_: std::process::ExitStatus) -> Option<i32> {
    None
}

#[async_trait::async_trait]
impl Transport for Lda {
    async fn deliver(&self, ctx: &mut DeliverContext) {
        let program = self.program();

        if ctx.recipients.is_empty() {
            ctx.result.message = Some(format!(
                "Failed to deliver to {program}, no recipients are specified."
            ));
            return;
        }

        tracing::info!(recipients = ?ctx.recipients, "Deliver to local users.");
        let mail = ctx.mail.as_bytes().to_vec();

        for recipient in ctx.recipients.clone() {
            let outcome = match self.run(&program, &recipient, &mail).await {
                Ok(Some(status)) => outcome(&program, status),
                Ok(None) => RecipientOutcome::temporary(format!(
                    "{program} did not exit within {}.",
                    humantime::format_duration(self.timeout)
                )),
                Err(error) => RecipientOutcome::failure(format!(
                    "An error was thrown when running {program}."
                ))
                .with_cause(format!("{error:#}")),
            };

            tracing::info!(%recipient, %outcome, "Agent run done.");
            ctx.result.set(recipient, outcome);
        }

        ctx.result.message = Some(format!("Done handling all recipients with {program}."));
    }
}
