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

/// Read an alias file, each row being `real,alias1,alias2,...`.
///
/// Returns a map from every alias to its real address. A missing file is an
/// empty map.
///
/// # Errors
///
/// * the file exists but cannot be read
/// * a row is not valid csv
pub async fn read_alias_file(
    path: &std::path::Path,
) -> anyhow::Result<std::collections::HashMap<String, String>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(?path, "No alias file.");
            return Ok(std::collections::HashMap::new());
        }
        Err(error) => {
            return Err(error).with_context(|| format!("cannot read alias file {path:?}"))
        }
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut aliases = std::collections::HashMap::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("invalid row in alias file {path:?}"))?;
        let mut fields = record.iter().filter(|f| !f.is_empty());

        if let Some(real) = fields.next() {
            for alias in fields {
                aliases.insert(alias.to_owned(), real.to_owned());
            }
        }
    }

    Ok(aliases)
}

/// Replace the recipients which are aliases by their real address.
///
/// The file is read again on every call.
#[derive(Debug, Clone)]
pub struct AliasRecipient {
    path: std::path::PathBuf,
}

impl AliasRecipient {
    ///
    #[must_use]
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Hook for AliasRecipient {
    fn name(&self) -> &'static str {
        "alias-recipient"
    }

    async fn call(&self, ctx: &mut DeliverContext) -> anyhow::Result<()> {
        let aliases = read_alias_file(&self.path).await?;

        for recipient in ctx.recipients.clone() {
            if let Some(real) = aliases.get(&recipient) {
                tracing::info!(alias = %recipient, real = %real, "Recipient alias resolved.");
                ctx.recipients.remove(&recipient);
                ctx.recipients.insert(real.clone());
            }
        }

        Ok(())
    }
}
