#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use tracing::info;

/// File name used when no participant name is given.
pub const DEFAULT_SUBMISSION_NAME: &str = "user_evaluacion.xlsx";

/// File name of a participant's copy: `<name>_evaluacion.xlsx`.
pub fn submission_file_name(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{name}_evaluacion.xlsx"),
        None => DEFAULT_SUBMISSION_NAME.to_string(),
    }
}

/// Copies the blank `template` into `submissions_dir` for a participant and
/// returns the new file's path. The directory is created when missing; an
/// existing copy is never overwritten.
pub fn provision(template: &Path, submissions_dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    ensure!(
        template.is_file(),
        "Template document not found at {}",
        template.display()
    );
    let file_name = submission_file_name(name);
    ensure!(
        !file_name.contains(['/', '\\']),
        "Participant name `{file_name}` must not contain path separators"
    );

    std::fs::create_dir_all(submissions_dir)
        .with_context(|| format!("Could not create {}", submissions_dir.display()))?;
    let destination = submissions_dir.join(&file_name);
    ensure!(
        !destination.exists(),
        "{} already exists; remove it first to start over",
        destination.display()
    );

    std::fs::copy(template, &destination).with_context(|| {
        format!("Could not copy {} to {}", template.display(), destination.display())
    })?;
    info!("Created {} from {}", destination.display(), template.display());
    Ok(destination)
}
