//! Match results and their descriptions

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// A failed match, carrying the description
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MatchFailure(pub String);

/// Result of evaluating a [`Matcher`](super::Matcher)
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    passed: bool,
    entity: String,
    expected: Value,
    /// `None` when nothing arrived
    actual: Option<Value>,
    waited: Option<Duration>,
}

impl MatchOutcome {
    pub(crate) fn evaluated(passed: bool, entity: String, expected: Value, actual: Value) -> Self {
        Self {
            passed,
            entity,
            expected,
            actual: Some(actual),
            waited: None,
        }
    }

    pub(crate) fn timed_out(entity: String, expected: Value, waited: Duration) -> Self {
        Self {
            passed: false,
            entity,
            expected,
            actual: None,
            waited: Some(waited),
        }
    }

    /// Whether the message matched
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Whether the outcome is a failure because nothing arrived
    pub fn is_timeout(&self) -> bool {
        self.actual.is_none()
    }

    /// The value that was evaluated, if any arrived
    pub fn actual(&self) -> Option<&Value> {
        self.actual.as_ref()
    }

    /// Human-readable description
    ///
    /// Worded for the failing direction: a passed outcome describes why a
    /// negated assertion failed.
    pub fn message(&self) -> String {
        let expected = pretty(&self.expected);

        match (&self.actual, self.waited) {
            (Some(actual), _) => format!(
                "It was expected {}to be {}, like this:\n\n{}\n\nbut got:\n\n{}\n",
                if self.passed { "not " } else { "" },
                self.entity,
                expected,
                pretty(actual),
            ),
            (None, waited) => format!(
                "It was expected to receive {}, like this:\n\n{}\n\nbut nothing arrived within {:?}.\n",
                self.entity,
                expected,
                waited.unwrap_or_default(),
            ),
        }
    }

    /// `Ok` if the message matched
    pub fn check(&self) -> Result<(), MatchFailure> {
        if self.passed {
            Ok(())
        } else {
            Err(MatchFailure(self.message()))
        }
    }

    /// `Ok` if the message did not match
    pub fn check_not(&self) -> Result<(), MatchFailure> {
        if self.passed || self.is_timeout() {
            Err(MatchFailure(self.message()))
        } else {
            Ok(())
        }
    }

    /// Panic with the description unless the message matched
    #[track_caller]
    pub fn assert(&self) {
        if let Err(failure) = self.check() {
            panic!("{failure}");
        }
    }

    /// Panic with the description if the message matched
    #[track_caller]
    pub fn assert_not(&self) {
        if let Err(failure) = self.check_not() {
            panic!("{failure}");
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
