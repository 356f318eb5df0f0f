#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use super::{
    PreflightError, RuleError,
    evaluate::{EvalContext, evaluate},
    report::{Report, SubmissionSection},
    results::Outcome,
    rules::Rule,
    structure,
};
use crate::{
    config::{GradingConfig, Paths},
    workbook::{DocumentError, Workbook},
};

/// Extensions accepted as submissions.
pub const SUBMISSION_EXTENSIONS: [&str; 2] = ["xlsx", "xlsm"];

/// The template and the solved reference, opened once per run.
#[derive(Debug, Clone)]
pub struct References {
    /// Blank exercise as handed out.
    pub template: Workbook,
    /// Solved exercise.
    pub expected: Workbook,
}

impl References {
    /// Opens both reference documents.
    pub fn open(paths: &Paths) -> Result<Self, PreflightError> {
        Ok(Self {
            template: open_reference(&paths.template)?,
            expected: open_reference(&paths.expected)?,
        })
    }
}

/// Opens one reference document, mapping failures to preflight errors.
fn open_reference(path: &Path) -> Result<Workbook, PreflightError> {
    Workbook::open(path).map_err(|source| match source {
        DocumentError::NotFound(path) => PreflightError::MissingReference(path),
        source => PreflightError::UnreadableReference {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Lists the submissions in `dir`, sorted by file name. Office lock files
/// (`~$name.xlsx`) are skipped.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, PreflightError> {
    if !dir.is_dir() {
        return Err(PreflightError::MissingDirectory(dir.to_path_buf()));
    }

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();
    for ext in SUBMISSION_EXTENSIONS {
        let pattern = format!("{base}/*.{ext}");
        let entries =
            glob::glob(&pattern).map_err(|_| PreflightError::NoSubmissions(dir.to_path_buf()))?;
        files.extend(entries.flatten().filter(|p| {
            p.is_file()
                && !p
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with("~$"))
        }));
    }

    if files.is_empty() {
        return Err(PreflightError::NoSubmissions(dir.to_path_buf()));
    }
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(files)
}

/// Display name of a submission path.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Text carried by a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Grades submissions against a fixed configuration and reference pair.
#[derive(Debug, Clone, Copy)]
pub struct Runner<'a> {
    /// Layout and catalog.
    config:     &'a GradingConfig,
    /// Reference documents.
    references: &'a References,
}

impl<'a> Runner<'a> {
    /// Creates a runner.
    pub fn new(config: &'a GradingConfig, references: &'a References) -> Self {
        Self { config, references }
    }

    /// Grades every file in order. Each submission's section is complete
    /// before it is appended.
    pub fn run(&self, files: &[PathBuf]) -> Report {
        let mut report = Report::new();
        for path in files {
            report.append(self.grade_file(path));
        }
        report
    }

    /// Opens and grades one file. The workbook is dropped before returning.
    pub fn grade_file(&self, path: &Path) -> SubmissionSection {
        let name = file_name(path);
        info!("Grading {name}");
        match Workbook::open(path) {
            Ok(workbook) => self.grade_workbook(&name, &workbook),
            Err(e) => {
                warn!("Could not open {name}: {e}");
                let mut section = SubmissionSection::new(&name);
                section.push(Outcome::submission_failure(&name, e.to_string()));
                section
            }
        }
    }

    /// Grades an already opened workbook.
    pub fn grade_workbook(&self, name: &str, workbook: &Workbook) -> SubmissionSection {
        let mut section = SubmissionSection::new(name);
        let layout = &self.config.layout;

        if let Err(e) = structure::check(layout, workbook, Some(&self.references.template)) {
            warn!("{name} fails the structural check: {e}");
            section.push(Outcome::submission_failure(name, e.to_string()));
            return section;
        }

        let ctx = EvalContext::new(layout, workbook, &self.references.expected);
        for rule in self.config.catalog.rules() {
            section.push(evaluate_isolated(&ctx, rule));
        }
        section
    }
}

/// Evaluates one rule, turning faults and panics into an Error outcome.
pub fn evaluate_isolated(ctx: &EvalContext<'_>, rule: &Rule) -> Outcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| evaluate(ctx, rule)))
        .unwrap_or_else(|payload| Err(RuleError::Panicked(panic_message(payload.as_ref()))));

    match result {
        Ok(verdict) => {
            let outcome = Outcome::from_verdict(rule, verdict);
            debug!("rule {} ({}): {:?}", rule.id, rule.kind.name(), outcome.status);
            outcome
        }
        Err(e) => {
            debug!("rule {} ({}) faulted: {e}", rule.id, rule.kind.name());
            Outcome::from_error(rule, &e)
        }
    }
}

/// Preflight, discovery and grading of every submission.
///
/// A missing or empty submissions directory is returned as a non-fatal
/// [`PreflightError`]; check [`PreflightError::is_fatal`].
pub fn run(config: &GradingConfig) -> Result<Report, PreflightError> {
    let references = References::open(&config.paths)?;
    let files = discover(&config.paths.submissions_dir)?;
    info!(
        "Found {} submission(s) in {}",
        files.len(),
        config.paths.submissions_dir.display()
    );
    Ok(Runner::new(config, &references).run(&files))
}
