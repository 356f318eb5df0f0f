#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{borrow::Cow, fmt::Display};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use super::{RuleError, rules::Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Result of one rule on one submission.
pub enum Status {
    /// The submission satisfies the rule.
    Correct,
    /// The rule ran and the submission does not satisfy it.
    Incorrect,
    /// The rule could not be evaluated, or the submission could not be graded.
    Error,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Correct => write!(f, "Correct"),
            Status::Incorrect => write!(f, "Incorrect"),
            Status::Error => write!(f, "Error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// What an evaluator concluded, before it is attached to a rule.
pub struct Verdict {
    /// Whether the rule holds.
    pub passed:      bool,
    /// Expected-vs-actual detail.
    pub observation: String,
}

impl Verdict {
    /// The rule holds.
    pub fn correct(observation: impl Into<String>) -> Self {
        Self {
            passed:      true,
            observation: observation.into(),
        }
    }

    /// The rule does not hold.
    pub fn incorrect(observation: impl Into<String>) -> Self {
        Self {
            passed:      false,
            observation: observation.into(),
        }
    }

    /// Correct or incorrect depending on `passed`, with the same observation.
    pub fn from_check(passed: bool, observation: impl Into<String>) -> Self {
        Self {
            passed,
            observation: observation.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One report row: a rule result, a submission-level failure, or a banner.
pub struct Outcome {
    /// Question number; `None` for banners and submission-level failures.
    pub id:          Option<u32>,
    /// Topic label; empty for banners.
    pub topic:       String,
    /// Question text, or the banner text.
    pub prompt:      String,
    /// `None` for banners.
    pub status:      Option<Status>,
    /// Detail.
    pub observation: String,
}

impl Outcome {
    /// Attaches a verdict to its rule.
    pub fn from_verdict(rule: &Rule, verdict: Verdict) -> Self {
        Self {
            id:          Some(rule.id),
            topic:       rule.topic.clone(),
            prompt:      rule.prompt.clone(),
            status:      Some(if verdict.passed {
                Status::Correct
            } else {
                Status::Incorrect
            }),
            observation: verdict.observation,
        }
    }

    /// An Error row for a rule whose evaluation faulted.
    pub fn from_error(rule: &Rule, error: &RuleError) -> Self {
        Self {
            id:          Some(rule.id),
            topic:       rule.topic.clone(),
            prompt:      rule.prompt.clone(),
            status:      Some(Status::Error),
            observation: error.to_string(),
        }
    }

    /// The single Error row of a submission that could not be graded.
    pub fn submission_failure(file: &str, observation: impl Into<String>) -> Self {
        Self {
            id:          None,
            topic:       String::new(),
            prompt:      format!("Could not process {file}"),
            status:      Some(Status::Error),
            observation: observation.into(),
        }
    }

    /// Banner opening a submission's section.
    pub fn start_banner(file: &str) -> Self {
        Self::banner(format!("--- Evaluating: {file} ---"))
    }

    /// Banner closing a submission's section.
    pub fn end_banner() -> Self {
        Self::banner("--- End of evaluation ---".to_string())
    }

    /// A banner row.
    fn banner(text: String) -> Self {
        Self {
            id:          None,
            topic:       String::new(),
            prompt:      text,
            status:      None,
            observation: String::new(),
        }
    }

    /// Whether this row is a banner.
    pub fn is_banner(&self) -> bool {
        self.status.is_none()
    }
}

impl Tabled for Outcome {
    const LENGTH: usize = 5;

    fn fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            self.id.map(|id| id.to_string()).unwrap_or_default().into(),
            Cow::Borrowed(self.topic.as_str()),
            Cow::Borrowed(self.prompt.as_str()),
            self.status.map(|s| s.to_string()).unwrap_or_default().into(),
            Cow::Borrowed(self.observation.as_str()),
        ]
    }

    fn headers() -> Vec<Cow<'static, str>> {
        REPORT_HEADERS.iter().map(|h| Cow::Borrowed(*h)).collect()
    }
}

/// Column titles shared by every renderer.
pub const REPORT_HEADERS: [&str; 5] = ["No.", "Topic", "Question", "Status", "Observation"];
