#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::Serialize;
use tabled::Tabled;

use super::results::{Outcome, Status};

#[derive(Debug, Clone)]
/// Outcomes of one submission, buffered until the submission is done.
pub struct SubmissionSection {
    /// File name shown in the banners.
    file:     String,
    /// Rule outcomes, or the single submission-level failure.
    outcomes: Vec<Outcome>,
}

impl SubmissionSection {
    /// Starts an empty section for `file`.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file:     file.into(),
            outcomes: Vec::new(),
        }
    }

    /// File name of the submission.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Appends an outcome.
    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    /// Outcomes so far.
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Number of rows per status.
pub struct StatusCounts {
    /// Correct rows.
    pub correct:   usize,
    /// Incorrect rows.
    pub incorrect: usize,
    /// Error rows.
    pub error:     usize,
}

impl StatusCounts {
    /// Counts the statuses of `outcomes`; banners are ignored.
    pub fn tally<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        outcomes
            .into_iter()
            .fold(Self::default(), |mut acc, o| {
                match o.status {
                    Some(Status::Correct) => acc.correct += 1,
                    Some(Status::Incorrect) => acc.incorrect += 1,
                    Some(Status::Error) => acc.error += 1,
                    None => {}
                }
                acc
            })
    }

    /// Rows with a status.
    pub fn total(&self) -> usize {
        self.correct + self.incorrect + self.error
    }
}

#[derive(Tabled, Debug, Clone, Serialize)]
/// Per-submission line of the console summary.
pub struct SubmissionSummary {
    #[tabled(rename = "Submission")]
    /// File name.
    pub file:      String,
    #[tabled(rename = "Correct")]
    /// Correct rules.
    pub correct:   usize,
    #[tabled(rename = "Incorrect")]
    /// Incorrect rules.
    pub incorrect: usize,
    #[tabled(rename = "Error")]
    /// Rules (or the whole submission) in error.
    pub error:     usize,
}

#[derive(Debug, Clone, Default, Serialize)]
/// The ordered result of a run: per submission, a start banner, its outcomes
/// and an end banner.
pub struct Report {
    /// Every row, banners included.
    rows:        Vec<Outcome>,
    /// One summary per appended submission, in order.
    submissions: Vec<SubmissionSummary>,
}

impl Report {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished section, framed by its banners.
    pub fn append(&mut self, section: SubmissionSection) {
        let counts = StatusCounts::tally(&section.outcomes);
        self.submissions.push(SubmissionSummary {
            file:      section.file.clone(),
            correct:   counts.correct,
            incorrect: counts.incorrect,
            error:     counts.error,
        });

        self.rows.reserve(section.outcomes.len() + 2);
        self.rows.push(Outcome::start_banner(&section.file));
        self.rows.extend(section.outcomes);
        self.rows.push(Outcome::end_banner());
    }

    /// Every row in order.
    pub fn rows(&self) -> &[Outcome] {
        &self.rows
    }

    /// Per-submission summaries in order.
    pub fn submissions(&self) -> &[SubmissionSummary] {
        &self.submissions
    }

    /// Whether no submission was appended.
    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Status totals across the whole run.
    pub fn counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.rows)
    }
}
