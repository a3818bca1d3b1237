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
use crate::parse_address_list;

/// Headers scanned for recipients when nothing else is asked.
pub const DEFAULT_RECIPIENT_HEADERS: [&str; 4] = ["to", "cc", "bcc", "x-original-to"];

/// Filter applied by [`MailHeaders::recipients`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientsOptions {
    /// Keep only the addresses ending with this string.
    pub domain: Option<String>,
    /// Lowercase names of the headers to scan.
    pub headers: Vec<String>,
}

impl Default for RecipientsOptions {
    fn default() -> Self {
        Self {
            domain: None,
            headers: DEFAULT_RECIPIENT_HEADERS.map(str::to_owned).to_vec(),
        }
    }
}

impl RecipientsOptions {
    /// Default headers, restricted to `domain`.
    #[must_use]
    pub fn with_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Self::default()
        }
    }
}

/// Unfolded header fields, in the order of the mail. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailHeaders(pub Vec<(String, String)>);

impl MailHeaders {
    /// Value of the first field named `name` (case insensitive).
    #[must_use]
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Content of the first `<...>` of the `Message-ID` field.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        let field = self.get_first("message-id")?;

        let id = field
            .split_once('<')
            .and_then(|(_, rest)| rest.split_once('>'))
            .map(|(id, _)| id)
            .filter(|id| !id.is_empty());

        if id.is_none() {
            tracing::warn!(field, "Invalid syntax in header 'message-id'.");
        }
        id.map(str::to_owned)
    }

    /// `Date` field, parsed as RFC 2822 then as RFC 3339.
    ///
    /// An unparseable value is logged and treated as absent.
    #[must_use]
    pub fn date(&self) -> Option<time::OffsetDateTime> {
        use time::format_description::well_known::{Rfc2822, Rfc3339};

        let field = self.get_first("date")?;
        let value = field.trim();
        // trailing comment, e.g. `+0000 (UTC)`
        let without_comment = value
            .rsplit_once('(')
            .filter(|(_, comment)| comment.ends_with(')'))
            .map_or(value, |(date, _)| date.trim_end());

        let parsed = time::OffsetDateTime::parse(value, &Rfc2822)
            .or_else(|_| time::OffsetDateTime::parse(without_comment, &Rfc2822))
            .or_else(|_| time::OffsetDateTime::parse(value, &Rfc3339));

        match parsed {
            Ok(date) => Some(date),
            Err(error) => {
                tracing::warn!(field, %error, "Invalid date string in header 'date'.");
                None
            }
        }
    }

    /// First mailbox of the `From` field.
    #[must_use]
    pub fn sender(&self) -> Option<String> {
        parse_address_list(self.get_first("from")?)
            .into_iter()
            .next()
    }

    /// Addresses found in the recipient headers, without duplicates, in the
    /// order they appear.
    #[must_use]
    pub fn recipients(&self, options: &RecipientsOptions) -> Vec<String> {
        let mut out = Vec::<String>::new();

        for (name, value) in &self.0 {
            let name = name.to_lowercase();
            if !options.headers.iter().any(|h| *h == name) {
                continue;
            }

            for address in parse_address_list(value) {
                let in_domain = options
                    .domain
                    .as_ref()
                    .map_or(true, |domain| address.ends_with(domain.as_str()));

                if in_domain && !out.contains(&address) {
                    out.push(address);
                }
            }
        }

        out
    }
}
