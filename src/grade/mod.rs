#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The grading engine: rules, their evaluation, and the report they produce.

/// Ordered rule lists.
pub mod catalog;
/// Error types of the engine.
mod error;
/// One evaluation function per rule kind.
pub mod evaluate;
/// Report assembly.
pub mod report;
/// Per-rule result types.
pub mod results;
/// The rule model.
pub mod rules;
/// Submission discovery and grading.
pub mod runner;
/// Checks that run before any rule.
pub mod structure;

pub use catalog::{Catalog, CatalogRow};
pub use error::{CatalogError, PreflightError, RuleError, StructuralError};
pub use evaluate::{EvalContext, evaluate};
pub use report::{Report, StatusCounts, SubmissionSection, SubmissionSummary};
pub use results::{Outcome, REPORT_HEADERS, Status, Verdict};
pub use rules::{CaseMode, Rule, RuleKind};
pub use runner::{References, Runner, discover, run};
