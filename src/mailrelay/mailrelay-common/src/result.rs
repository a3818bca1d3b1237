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
use crate::RecipientOutcome;

/// Aggregate outcome of one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverResult {
    /// Outcome per recipient, or under [`crate::WHOLE_MESSAGE`].
    pub recipients: std::collections::BTreeMap<String, RecipientOutcome>,
    /// Free-form summary, set by transports.
    pub message: Option<String>,
    /// Overrides the text sent after `250 2.6.0`.
    pub smtp_message: Option<String>,
    /// Identifier assigned by the cloud provider.
    pub provider_message_id: Option<String>,
}

impl DeliverResult {
    /// Record (or overwrite) the outcome of `recipient`.
    pub fn set(&mut self, recipient: impl Into<String>, outcome: RecipientOutcome) {
        self.recipients.insert(recipient.into(), outcome);
    }

    /// A delivery without any outcome, or with one non-success outcome, failed.
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.recipients.is_empty() || self.recipients.values().any(|o| !o.is_success())
    }

    /// Text acknowledging the delivery to an SMTP client.
    #[must_use]
    pub fn smtp_message(&self) -> String {
        self.smtp_message.clone().unwrap_or_else(|| {
            self.provider_message_id.as_ref().map_or_else(
                || "OK Message accepted for delivery".to_owned(),
                |id| format!("OK {id} Message accepted for delivery"),
            )
        })
    }

    /// Multi-line rendering for the logs.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::with_capacity(self.recipients.len() + 3);
        if let Some(message) = &self.message {
            lines.push(format!("message: {message}"));
        }
        if let Some(smtp_message) = &self.smtp_message {
            lines.push(format!("smtp message: {smtp_message}"));
        }
        if let Some(id) = &self.provider_message_id {
            lines.push(format!("provider message id: {id}"));
        }
        if self.recipients.is_empty() {
            lines.push("no recipient outcome".to_owned());
        }
        lines.extend(
            self.recipients
                .iter()
                .map(|(recipient, outcome)| format!("{recipient} => {outcome}")),
        );
        lines.join("\n")
    }
}
