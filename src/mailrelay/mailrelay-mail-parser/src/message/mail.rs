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
use super::{
    headers::{MailHeaders, RecipientsOptions},
    sections::MailSections,
};
use crate::ParserResult;

fn address_pattern() -> &'static regex::Regex {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"(?i),?<?([a-z0-9_'+\-.]+@[a-z0-9_'+\-.]+)>?,?")
            .expect("hardcoded value is valid")
    })
}

/// A raw mail and the views derived from it.
///
/// The views are computed from the current text on every call, so a hook
/// rewriting the text never observes stale headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    raw: String,
}

impl From<String> for Mail {
    fn from(raw: String) -> Self {
        Self { raw }
    }
}

impl From<&str> for Mail {
    fn from(raw: &str) -> Self {
        Self {
            raw: raw.to_owned(),
        }
    }
}

impl Mail {
    /// Wrap a raw mail.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Current text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Current text, as bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    /// Replace the whole text.
    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
    }

    ///
    #[must_use]
    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Replace every occurrence of `from` in the whole text, body included.
    ///
    /// Returns `true` if the text changed.
    pub fn replace_all(&mut self, from: &str, to: &str) -> bool {
        if from.is_empty() || !self.raw.contains(from) {
            return false;
        }
        self.raw = self.raw.replace(from, to);
        true
    }

    /// Header block and body.
    ///
    /// # Errors
    ///
    /// * see [`MailSections::parse`]
    pub fn sections(&self) -> ParserResult<MailSections> {
        MailSections::parse(&self.raw)
    }

    /// Unfolded header fields.
    ///
    /// # Errors
    ///
    /// * see [`MailSections::parse`] and [`MailSections::headers`]
    pub fn headers(&self) -> ParserResult<MailHeaders> {
        self.sections()?.headers()
    }

    /// See [`MailHeaders::message_id`].
    ///
    /// # Errors
    ///
    /// * the headers cannot be parsed
    pub fn message_id(&self) -> ParserResult<Option<String>> {
        Ok(self.headers()?.message_id())
    }

    /// See [`MailHeaders::date`].
    ///
    /// # Errors
    ///
    /// * the headers cannot be parsed
    pub fn date(&self) -> ParserResult<Option<time::OffsetDateTime>> {
        Ok(self.headers()?.date())
    }

    /// See [`MailHeaders::sender`].
    ///
    /// # Errors
    ///
    /// * the headers cannot be parsed
    pub fn sender(&self) -> ParserResult<Option<String>> {
        Ok(self.headers()?.sender())
    }

    /// See [`MailHeaders::recipients`].
    ///
    /// # Errors
    ///
    /// * the headers cannot be parsed
    pub fn recipients(&self, options: &RecipientsOptions) -> ParserResult<Vec<String>> {
        Ok(self.headers()?.recipients(options))
    }

    /// Every `local@domain` looking token of the whole text, in order,
    /// duplicates included.
    ///
    /// This is a loose scan: it matches inside the body too, and misses
    /// addresses with quoted local parts or non-ascii domains.
    #[must_use]
    pub fn simple_find_all_addresses(&self) -> Vec<String> {
        address_pattern()
            .captures_iter(&self.raw)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_owned())
            .collect()
    }

    /// Insert `pairs` as new fields after the last header line. Line
    /// endings of the mail are kept, values are not folded.
    ///
    /// # Errors
    ///
    /// * see [`MailSections::parse`]
    pub fn append_headers(&mut self, pairs: &[(&str, &str)]) -> ParserResult<()> {
        self.raw = self.sections()?.to_raw_with(pairs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Mail;
    use crate::{LineEnding, ParserError, RecipientsOptions};
    use pretty_assertions::assert_eq;

    const MESSAGE_ID: &str = "mock-message-id@from.mock";
    const MESSAGE_ID_2: &str = "mock-message-id-2@from.mock";
    const DATE: &str = "Fri, 02 May 2025 08:33:02 +0000";

    fn mock_headers() -> Vec<(&'static str, String)> {
        vec![
            ("Content-Disposition", "inline".to_owned()),
            ("Content-Transfer-Encoding", "quoted-printable".to_owned()),
            ("MIME-Version", "1.0".to_owned()),
            ("X-Mailer", "MIME-tools 5.509 (Entity 5.509)".to_owned()),
            ("Content-Type", "text/plain; charset=utf-8".to_owned()),
            ("From", r#""Mock From" <mock@from.mock>"#.to_owned()),
            (
                "To",
                [
                    r#""John \"Big\" Doe" <john@example.com>, "Alice (Work)" <alice+work@example.com>,"#,
                    r#" undisclosed-recipients:;, "Group: Team" <team@company.com>,"#,
                    r#" "Escaped, Name" <escape@test.com>, just@email.com,"#,
                    r#" "Comment (This is valid)" <comment@domain.net>,"#,
                    r#" "Odd @Chars" <weird!#$%'*+-/=?^_`{|}~@char-test.com>,"#,
                    r#" "Non-ASCII 用户" <user@例子.中国>,"#,
                    " admin@[192.168.1.1]",
                ]
                .join("\n"),
            ),
            ("CC", "Mock CC <mock@cc.mock>".to_owned()),
            ("Subject", "A very long mock\n subject".to_owned()),
            ("Message-ID", format!("<{MESSAGE_ID}>")),
            ("Date", DATE.to_owned()),
        ]
    }

    fn mock_header_block() -> String {
        mock_headers()
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn mock_body() -> String {
        format!("This is body content.\nLine 2 {MESSAGE_ID_2}\n\nLine 4")
    }

    fn mock_mail() -> String {
        format!("{}\n\n{}", mock_header_block(), mock_body())
    }

    const TO_ADDRESSES: [&str; 9] = [
        "john@example.com",
        "alice+work@example.com",
        "team@company.com",
        "escape@test.com",
        "just@email.com",
        "comment@domain.net",
        "weird!#$%'*+-/=?^_`{|}~@char-test.com",
        "user@例子.中国",
        "admin@[192.168.1.1]",
    ];

    #[test]
    fn sections() {
        let sections = Mail::new(mock_mail()).sections().unwrap();
        assert_eq!(sections.header, mock_header_block());
        assert_eq!(sections.body, mock_body());
        assert_eq!(sections.eol, LineEnding::Lf);
        assert_eq!(sections.sep, LineEnding::Lf);
    }

    #[test]
    fn sections_crlf() {
        let sections = Mail::new(mock_mail().replace('\n', "\r\n"))
            .sections()
            .unwrap();
        assert_eq!(sections.eol, LineEnding::CrLf);
        assert_eq!(sections.sep, LineEnding::CrLf);
    }

    #[test]
    fn headers() {
        let expected = mock_headers()
            .into_iter()
            .map(|(name, value)| (name.to_owned(), format!(" {}", value.replace('\n', ""))))
            .collect::<Vec<_>>();
        assert_eq!(Mail::new(mock_mail()).headers().unwrap().0, expected);
    }

    #[test]
    fn derived_fields() {
        let mail = Mail::new(mock_mail());
        assert_eq!(
            mail.date().unwrap(),
            Some(time::macros::datetime!(2025-05-02 08:33:02 UTC))
        );
        assert_eq!(mail.message_id().unwrap().as_deref(), Some(MESSAGE_ID));
        assert_eq!(mail.sender().unwrap().as_deref(), Some("mock@from.mock"));
    }

    #[test]
    fn recipients() {
        let mail = Mail::new(mock_mail());
        let mut all = TO_ADDRESSES.to_vec();
        all.push("mock@cc.mock");

        assert_eq!(
            mail.recipients(&RecipientsOptions::default()).unwrap(),
            all
        );
        assert_eq!(
            mail.recipients(&RecipientsOptions::with_domain("example.com"))
                .unwrap(),
            all.into_iter()
                .filter(|a| a.ends_with("example.com"))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn append_headers() {
        let mut mail = Mail::new(mock_mail());
        mail.append_headers(&[("abc", "123"), ("def", "456")])
            .unwrap();

        assert_eq!(
            mail.raw(),
            format!(
                "{}\nabc: 123\ndef: 456\n\n{}",
                mock_header_block(),
                mock_body()
            )
        );

        let headers = mail.headers().unwrap();
        assert_eq!(
            headers.0.last(),
            Some(&("def".to_owned(), " 456".to_owned()))
        );
        assert_eq!(mail.sections().unwrap().body, mock_body());
    }

    #[test]
    fn append_headers_crlf() {
        let mut mail = Mail::new("A: 1\r\n\r\nbody");
        mail.append_headers(&[("X-Test", "1")]).unwrap();
        assert_eq!(mail.raw(), "A: 1\r\nX-Test: 1\r\n\r\nbody");
    }

    #[test]
    fn append_headers_without_separator() {
        let mut mail = Mail::new("A: 1");
        assert!(matches!(
            mail.append_headers(&[("X-Test", "1")]),
            Err(ParserError::MissingSeparator { .. })
        ));
        assert_eq!(mail.raw(), "A: 1");
    }

    #[test]
    fn find_all_addresses() {
        assert_eq!(
            Mail::new(mock_mail()).simple_find_all_addresses(),
            vec![
                "mock@from.mock",
                "john@example.com",
                "alice+work@example.com",
                "team@company.com",
                "escape@test.com",
                "just@email.com",
                "comment@domain.net",
                "mock@cc.mock",
                MESSAGE_ID,
                MESSAGE_ID_2,
            ]
        );
    }

    #[test]
    fn replace_all_reaches_body() {
        let mut mail = Mail::new(mock_mail());
        assert!(mail.replace_all(MESSAGE_ID_2, "other@id"));
        assert!(mail.raw().contains("Line 2 other@id"));
        assert_eq!(mail.message_id().unwrap().as_deref(), Some(MESSAGE_ID));

        assert!(mail.replace_all(MESSAGE_ID, "new@id"));
        assert_eq!(mail.message_id().unwrap().as_deref(), Some("new@id"));

        assert!(!mail.replace_all("absent", "x"));
    }
}
