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

//! Address-list extraction, tolerant to the syntax found in real headers:
//! quoted display names, comments, groups and domain literals.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(String),
    Quoted(String),
    Literal(String),
    Special(char),
}

impl Token {
    fn text(&self) -> String {
        match self {
            Self::Atom(atom) | Self::Literal(atom) => atom.clone(),
            Self::Quoted(quoted) => format!("\"{quoted}\""),
            Self::Special(c) => c.to_string(),
        }
    }
}

const fn is_atom_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '(' | ')' | '<' | '>' | '[' | ']' | ':' | ';' | '@' | '\\' | ',' | '"'
        )
}

fn skip_comment(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    let mut depth = 1_usize;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
            _ => {}
        }
    }
}

fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '"' => break,
            // folding inside a quoted string
            '\r' | '\n' => {}
            c => out.push(c),
        }
    }
    out
}

fn read_literal(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut out = String::from('[');
    for c in chars.by_ref() {
        if !c.is_whitespace() {
            out.push(c);
        }
        if c == ']' {
            break;
        }
    }
    out
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => skip_comment(&mut chars),
            '"' => tokens.push(Token::Quoted(read_quoted(&mut chars))),
            '[' => tokens.push(Token::Literal(read_literal(&mut chars))),
            '<' | '>' | ':' | ';' | '@' | ',' => tokens.push(Token::Special(c)),
            c => {
                let mut atom = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !is_atom_char(next) {
                        break;
                    }
                    atom.push(next);
                    chars.next();
                }
                tokens.push(Token::Atom(atom));
            }
        }
    }

    tokens
}

/// `local@domain` built from the tokens around the last `@`.
fn addr_spec(tokens: &[Token]) -> Option<String> {
    let at = tokens.iter().rposition(|t| *t == Token::Special('@'))?;
    let local = tokens.get(at.checked_sub(1)?)?;
    let domain = tokens.get(at + 1)?;

    match (local, domain) {
        (Token::Atom(_) | Token::Quoted(_), Token::Atom(_) | Token::Literal(_)) => {
            Some(format!("{}@{}", local.text(), domain.text()))
        }
        _ => None,
    }
}

fn flush(pending: &mut Vec<Token>, out: &mut Vec<String>) {
    if let Some(address) = addr_spec(pending) {
        out.push(address);
    }
    pending.clear();
}

/// Extract the bare addresses of an RFC 5322 `address-list`.
///
/// Group members are flattened into the result, the group names themselves
/// are dropped. Entries without an `@` are ignored.
#[must_use]
pub fn parse_address_list(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending = Vec::new();
    let mut tokens = tokenize(input).into_iter();

    while let Some(token) = tokens.next() {
        match token {
            Token::Special('<') => {
                let angle = tokens
                    .by_ref()
                    .take_while(|t| *t != Token::Special('>'))
                    .collect::<Vec<_>>();
                if let Some(address) = addr_spec(&angle) {
                    out.push(address);
                }
                pending.clear();
            }
            Token::Special(':') => pending.clear(),
            Token::Special(',' | ';') => flush(&mut pending, &mut out),
            other => pending.push(other),
        }
    }
    flush(&mut pending, &mut out);

    out
}
