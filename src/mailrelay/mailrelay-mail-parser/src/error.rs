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

/// Error produced while splitting or unfolding a raw mail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParserError {
    /// No empty line separates the header block from the body.
    #[error("no header/body separator (two successive line endings) found in mail")]
    MissingSeparator {
        /// The raw text that failed to parse.
        raw: String,
    },
    /// A logical header line has no `:`.
    #[error("expected ':' in the header field at line {line}: {field}")]
    InvalidField {
        /// The offending logical line.
        field: String,
        /// 1-based physical line where the field ends.
        line: usize,
    },
    /// The header block starts with a folded (whitespace prefixed) line.
    #[error("header section starts with a continuation line at line {line}: {content}")]
    OrphanContinuation {
        /// The offending physical line.
        content: String,
        /// 1-based physical line number.
        line: usize,
    },
}

/// Result of the parsing functions.
pub type ParserResult<T> = Result<T, ParserError>;
