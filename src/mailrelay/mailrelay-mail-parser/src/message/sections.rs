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
use super::headers::MailHeaders;
use crate::{ParserError, ParserResult};

/// Line ending style detected in a raw mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
pub enum LineEnding {
    /// `\n`
    #[strum(serialize = "\n")]
    Lf,
    /// `\r\n`
    #[strum(serialize = "\r\n")]
    CrLf,
}

impl LineEnding {
    /// Length in bytes of the sequence.
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            Self::Lf => 1,
            Self::CrLf => 2,
        }
    }
}

/// Header block and body of a mail, split at the first empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSections {
    /// Header block, without its last line ending.
    pub header: String,
    /// Everything after the empty line.
    pub body: String,
    /// Line ending closing the last header line.
    pub eol: LineEnding,
    /// Line ending forming the empty line.
    pub sep: LineEnding,
}

/// Split on `\r\n`, `\n` or a lone `\r`.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                lines.push(&text[start..i]);
                i += 2;
                start = i;
            }
            b'\r' | b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push(&text[start..]);

    lines
}

fn split_field(field: &str, line: usize) -> ParserResult<(String, String)> {
    field.split_once(':').map_or_else(
        || {
            Err(ParserError::InvalidField {
                field: field.to_owned(),
                line,
            })
        },
        |(name, value)| Ok((name.trim().to_owned(), value.to_owned())),
    )
}

impl MailSections {
    /// Split `raw` at the first run of two line endings.
    ///
    /// # Errors
    ///
    /// * [`ParserError::MissingSeparator`] if `raw` has no empty line
    pub fn parse(raw: &str) -> ParserResult<Self> {
        let bytes = raw.as_bytes();
        let mut search = 0;

        while let Some(offset) = raw[search..].find('\n') {
            let lf = search + offset;
            let after = &bytes[lf + 1..];

            let sep = if after.starts_with(b"\n") {
                Some(LineEnding::Lf)
            } else if after.starts_with(b"\r\n") {
                Some(LineEnding::CrLf)
            } else {
                None
            };

            if let Some(sep) = sep {
                let (start, eol) = if lf > 0 && bytes[lf - 1] == b'\r' {
                    (lf - 1, LineEnding::CrLf)
                } else {
                    (lf, LineEnding::Lf)
                };

                if eol != sep {
                    tracing::warn!(
                        eol = ?eol,
                        sep = ?sep,
                        "Different line endings found around the header/body separator."
                    );
                }

                return Ok(Self {
                    header: raw[..start].to_owned(),
                    body: raw[lf + 1 + sep.len()..].to_owned(),
                    eol,
                    sep,
                });
            }
            search = lf + 1;
        }

        Err(ParserError::MissingSeparator {
            raw: raw.to_owned(),
        })
    }

    /// Unfold the header block into `(name, value)` pairs.
    ///
    /// Names are trimmed, values are kept as written after the `:`, leading
    /// space included. Continuation lines are appended to the previous field.
    ///
    /// # Errors
    ///
    /// * [`ParserError::InvalidField`] if a logical line has no `:`
    /// * [`ParserError::OrphanContinuation`] if the block starts with a continuation line
    pub fn headers(&self) -> ParserResult<MailHeaders> {
        let header = self.header.trim_end();
        if header.is_empty() {
            return Ok(MailHeaders::default());
        }

        let mut fields = Vec::new();
        let mut current: Option<(String, usize)> = None;

        for (index, line) in split_lines(header).into_iter().enumerate() {
            let number = index + 1;

            if line.starts_with(char::is_whitespace) {
                match current.as_mut() {
                    Some((field, end)) => {
                        field.push_str(line);
                        *end = number;
                    }
                    None => {
                        return Err(ParserError::OrphanContinuation {
                            content: line.to_owned(),
                            line: number,
                        })
                    }
                }
            } else {
                if let Some((field, end)) = current.take() {
                    fields.push(split_field(&field, end)?);
                }
                current = Some((line.to_owned(), number));
            }
        }

        if let Some((field, end)) = current {
            fields.push(split_field(&field, end)?);
        }

        Ok(MailHeaders(fields))
    }

    /// Rebuild the raw text, inserting `pairs` after the last header line.
    #[must_use]
    pub fn to_raw_with(&self, pairs: &[(&str, &str)]) -> String {
        let eol = self.eol.as_ref();
        let mut out = self.header.clone();

        for (name, value) in pairs {
            out.push_str(eol);
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
        }

        out.push_str(eol);
        out.push_str(self.sep.as_ref());
        out.push_str(&self.body);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{split_lines, LineEnding, MailSections};
    use crate::ParserError;
    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case::lf("A: 1\n\nbody", LineEnding::Lf, LineEnding::Lf)]
    #[case::crlf("A: 1\r\n\r\nbody", LineEnding::CrLf, LineEnding::CrLf)]
    #[case::mixed_crlf_lf("A: 1\r\n\nbody", LineEnding::CrLf, LineEnding::Lf)]
    #[case::mixed_lf_crlf("A: 1\n\r\nbody", LineEnding::Lf, LineEnding::CrLf)]
    fn split_round_trip(#[case] raw: &str, #[case] eol: LineEnding, #[case] sep: LineEnding) {
        let sections = MailSections::parse(raw).unwrap();
        assert_eq!(sections.header, "A: 1");
        assert_eq!(sections.body, "body");
        assert_eq!((sections.eol, sections.sep), (eol, sep));
        assert_eq!(
            format!("{}{}{}{}", sections.header, sections.eol, sections.sep, sections.body),
            raw
        );
    }

    #[test]
    fn first_empty_line_wins() {
        let sections = MailSections::parse("A: 1\n\nfirst\n\nsecond").unwrap();
        assert_eq!(sections.body, "first\n\nsecond");
    }

    #[test]
    fn missing_separator() {
        assert_eq!(
            MailSections::parse("A: 1\nB: 2\n").unwrap_err(),
            ParserError::MissingSeparator {
                raw: "A: 1\nB: 2\n".to_owned()
            }
        );
    }

    #[test]
    fn field_without_colon() {
        let sections = MailSections::parse("A: 1\nB 2\n folded\n\nbody").unwrap();
        assert_eq!(
            sections.headers().unwrap_err(),
            ParserError::InvalidField {
                field: "B 2 folded".to_owned(),
                line: 3
            }
        );
    }

    #[test]
    fn orphan_continuation() {
        let sections = MailSections::parse(" A: 1\n\nbody").unwrap();
        assert!(matches!(
            sections.headers().unwrap_err(),
            ParserError::OrphanContinuation { line: 1, .. }
        ));
    }

    #[test]
    fn duplicates_and_order_kept() {
        let headers = MailSections::parse("Received: a\nTo: x@y\nReceived: b\n\n")
            .unwrap()
            .headers()
            .unwrap();
        assert_eq!(
            headers.0,
            vec![
                ("Received".to_owned(), " a".to_owned()),
                ("To".to_owned(), " x@y".to_owned()),
                ("Received".to_owned(), " b".to_owned()),
            ]
        );
    }

    #[test]
    fn lines() {
        assert_eq!(split_lines("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
    }
}
