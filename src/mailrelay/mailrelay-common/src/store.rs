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

/// Persisted mapping between the `Message-ID` of a mail and the identifier
/// the cloud provider assigned to it.
///
/// Both columns are unique, lookups work in both directions.
#[async_trait::async_trait]
pub trait MessageIdStore: Send + Sync {
    /// Identifier assigned by the provider to the mail whose id was `original`.
    async fn translated(&self, original: &str) -> anyhow::Result<Option<String>>;

    /// Original id of the mail the provider knows as `translated`.
    async fn original(&self, translated: &str) -> anyhow::Result<Option<String>>;

    /// Record a pair, an existing pair is left untouched.
    async fn record(&self, original: &str, translated: &str) -> anyhow::Result<()>;
}

/// [`MessageIdStore`] kept in memory.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pairs: tokio::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(any(test, feature = "testing"))]
impl MemoryStore {
    /// Store holding `pairs` of `(original, translated)`.
    #[must_use]
    pub fn with_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            pairs: tokio::sync::Mutex::new(
                pairs
                    .iter()
                    .map(|(o, t)| ((*o).to_owned(), (*t).to_owned()))
                    .collect(),
            ),
        }
    }

    /// Every recorded pair, in insertion order.
    pub async fn pairs(&self) -> Vec<(String, String)> {
        self.pairs.lock().await.clone()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait::async_trait]
impl MessageIdStore for MemoryStore {
    async fn translated(&self, original: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .pairs
            .lock()
            .await
            .iter()
            .find(|(o, _)| o == original)
            .map(|(_, t)| t.clone()))
    }

    async fn original(&self, translated: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .pairs
            .lock()
            .await
            .iter()
            .find(|(_, t)| t == translated)
            .map(|(o, _)| o.clone()))
    }

    async fn record(&self, original: &str, translated: &str) -> anyhow::Result<()> {
        let mut pairs = self.pairs.lock().await;
        if !pairs.iter().any(|(o, t)| o == original || t == translated) {
            pairs.push((original.to_owned(), translated.to_owned()));
        }
        Ok(())
    }
}
