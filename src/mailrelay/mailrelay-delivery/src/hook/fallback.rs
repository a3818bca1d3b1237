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
use mailrelay_common::DeliverContext;

/// Fill an empty recipient set with fixed addresses.
#[derive(Debug, Clone, Default)]
pub struct FallbackRecipient {
    fallback: std::collections::BTreeSet<String>,
}

impl FallbackRecipient {
    ///
    #[must_use]
    pub fn new(fallback: impl IntoIterator<Item = String>) -> Self {
        Self {
            fallback: fallback.into_iter().collect(),
        }
    }
}

#[async_trait::async_trait]
impl Hook for FallbackRecipient {
    fn name(&self) -> &'static str {
        "fallback-recipient"
    }

    async fn call(&self, ctx: &mut DeliverContext) -> anyhow::Result<()> {
        if ctx.recipients.is_empty() {
            tracing::info!(fallback = ?self.fallback, "No recipients, using the fallback.");
            ctx.recipients.extend(self.fallback.iter().cloned());
        }
        Ok(())
    }
}
