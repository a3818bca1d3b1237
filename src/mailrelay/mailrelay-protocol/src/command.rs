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

/// Commands understood by the session.
///
/// The serialization is the prefix matched (case insensitive) against the
/// received line, `\r\n` included for the commands without arguments.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::AsRefStr,
    strum::EnumString,
    strum::EnumVariantNames,
)]
pub enum Verb {
    /// Client identification (historical).
    #[strum(serialize = "HELO")]
    Helo,
    /// Client identification.
    #[strum(serialize = "EHLO")]
    Ehlo,
    /// Start of a mail transaction, the sender is ignored.
    #[strum(serialize = "MAIL FROM:")]
    MailFrom,
    /// One recipient, ignored.
    #[strum(serialize = "RCPT TO:")]
    RcptTo,
    /// Start of the message content.
    #[strum(serialize = "DATA\r\n")]
    Data,
    /// End of the session.
    #[strum(serialize = "QUIT\r\n")]
    Quit,
    /// Anything else.
    #[strum(disabled)]
    Unknown,
}

impl Verb {
    /// Find the command of a `\r\n` terminated line, and return its arguments.
    #[must_use]
    pub fn parse_line(line: &[u8]) -> (Self, &[u8]) {
        <Self as strum::VariantNames>::VARIANTS
            .iter()
            .filter(|prefix| {
                line.len() >= prefix.len()
                    && line[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
            })
            .find_map(|prefix| {
                prefix
                    .parse::<Self>()
                    .ok()
                    .map(|verb| (verb, &line[prefix.len()..]))
            })
            .unwrap_or((Self::Unknown, line))
    }
}

#[cfg(test)]
mod tests {
    use super::Verb;

    #[rstest::rstest]
    #[case(b"EHLO client.x.com\r\n", Verb::Ehlo, b" client.x.com\r\n")]
    #[case(b"helo client\r\n", Verb::Helo, b" client\r\n")]
    #[case(b"EHLO\r\n", Verb::Ehlo, b"\r\n")]
    #[case(b"MAIL FROM:<a@x.com>\r\n", Verb::MailFrom, b"<a@x.com>\r\n")]
    #[case(b"mail from:<>\r\n", Verb::MailFrom, b"<>\r\n")]
    #[case(b"RCPT TO:<b@x.com>\r\n", Verb::RcptTo, b"<b@x.com>\r\n")]
    #[case(b"data\r\n", Verb::Data, b"")]
    #[case(b"QUIT\r\n", Verb::Quit, b"")]
    #[case(b"DATA now\r\n", Verb::Unknown, b"DATA now\r\n")]
    #[case(b"QUITTING\r\n", Verb::Unknown, b"QUITTING\r\n")]
    #[case(b"NOOP\r\n", Verb::Unknown, b"NOOP\r\n")]
    #[case(b"MAIL <a@x.com>\r\n", Verb::Unknown, b"MAIL <a@x.com>\r\n")]
    fn parse(#[case] line: &[u8], #[case] verb: Verb, #[case] args: &[u8]) {
        assert_eq!(Verb::parse_line(line), (verb, args));
    }
}
