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
use crate::DeliverResult;
use mailrelay_mail_parser::Mail;

/// State of one `deliver()` call, handed to every hook and to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverContext {
    /// The mail, hooks may rewrite its text.
    pub mail: Mail,
    /// Target addresses.
    pub recipients: std::collections::BTreeSet<String>,
    ///
    pub result: DeliverResult,
}

impl DeliverContext {
    /// Start a delivery of `mail`, targeting `recipients` if provided.
    #[must_use]
    pub fn new(mail: Mail, recipients: Option<Vec<String>>) -> Self {
        Self {
            mail,
            recipients: recipients.unwrap_or_default().into_iter().collect(),
            result: DeliverResult::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DeliverContext;
    use mailrelay_mail_parser::Mail;

    #[test]
    fn seeded_recipients_are_a_set() {
        let ctx = DeliverContext::new(
            Mail::new("A: 1\n\n"),
            Some(vec!["b@x.com".to_owned(), "a@x.com".to_owned(), "b@x.com".to_owned()]),
        );
        assert_eq!(
            ctx.recipients.into_iter().collect::<Vec<_>>(),
            vec!["a@x.com", "b@x.com"]
        );
        assert!(ctx.result.recipients.is_empty());
    }
}
