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

/// How the delivery to one recipient ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The mail has been handed over.
    Success,
    /// The mail has been refused, trying again will not help.
    Failure,
    /// The mail has been refused, but it could succeed later.
    Temporary,
}

/// Outcome of the delivery to one recipient.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RecipientOutcome {
    ///
    pub kind: OutcomeKind,
    /// Human readable explanation.
    pub message: String,
    /// The error which caused the failure, as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// When the outcome has been recorded.
    #[serde(with = "time::serde::iso8601")]
    pub timestamp: time::OffsetDateTime,
}

// NOTE: ignore the timestamp
impl PartialEq for RecipientOutcome {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message && self.cause == other.cause
    }
}

impl Eq for RecipientOutcome {}

impl RecipientOutcome {
    fn new(kind: OutcomeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
            timestamp: time::OffsetDateTime::now_utc(),
        }
    }

    ///
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Success, message)
    }

    ///
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Failure, message)
    }

    ///
    #[must_use]
    pub fn temporary(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Temporary, message)
    }

    /// Attach the error which produced this outcome.
    #[must_use]
    pub fn with_cause(mut self, cause: impl std::fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    ///
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

impl std::fmt::Display for RecipientOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{OutcomeKind, RecipientOutcome};

    #[rstest::rstest]
    #[case(OutcomeKind::Success, "success")]
    #[case(OutcomeKind::Failure, "failure")]
    #[case(OutcomeKind::Temporary, "temporary")]
    fn kind_display(#[case] kind: OutcomeKind, #[case] expected: &str) {
        assert_eq!(kind.to_string(), expected);
    }

    #[test]
    fn display_with_cause() {
        let outcome = RecipientOutcome::failure("lda exited with 1").with_cause("boom");
        assert_eq!(outcome.to_string(), "failure: lda exited with 1 (boom)");
        assert!(!outcome.is_success());
        assert!(RecipientOutcome::success("ok").is_success());
    }

    #[test]
    fn serialize() {
        let value = serde_json::to_value(RecipientOutcome::temporary("later")).unwrap();
        assert_eq!(value["kind"], "temporary");
        assert_eq!(value["message"], "later");
        assert!(value.get("cause").is_none());
    }
}
