#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # xlgrade
//! ## Introduction
//!
//! Grades a folder of spreadsheet exercise submissions and writes an
//! evaluation workbook.
//!
//! ## Usage
//!
//! Put the blank template and the solved reference under `data/`, drop the
//! participants' workbooks into `user_submissions/` and run `xlgrade grade`.
//! Every location can be changed with flags, a JSON config file or the
//! `XLGRADE_*` environment variables (a `.env` file is read too).

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bpaf::*;
use dotenvy::dotenv;
use tabled::{
    Table,
    settings::{Panel, Style},
};
use tracing::{Level, info, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};
use xlgrade::{config::GradingConfig, grade, provision::provision, render};

/// Options of the `grade` command.
#[derive(Debug, Clone)]
struct GradeOpts {
    /// Directory holding the submissions
    submissions: Option<PathBuf>,
    /// Blank template document
    template:    Option<PathBuf>,
    /// Solved reference document
    expected:    Option<PathBuf>,
    /// Report workbook path
    output:      Option<PathBuf>,
    /// Optional JSON copy of the report
    json:        Option<PathBuf>,
    /// JSON configuration file
    config:      Option<PathBuf>,
    /// Skip the console tables
    no_table:    bool,
    /// Log every rule
    verbose:     bool,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade every submission
    Grade(GradeOpts),
    /// Copy the template for a participant
    Provision {
        /// Participant name
        name:        Option<String>,
        /// Blank template document
        template:    Option<PathBuf>,
        /// Directory receiving the copy
        submissions: Option<PathBuf>,
        /// JSON configuration file
        config:      Option<PathBuf>,
    },
    /// Print the rule catalog
    Catalog {
        /// JSON configuration file
        config: Option<PathBuf>,
        /// Print JSON instead of a table
        json:   bool,
    },
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the config file flag
    fn config() -> impl Parser<Option<PathBuf>> {
        long("config")
            .short('c')
            .help("JSON configuration file")
            .argument::<PathBuf>("FILE")
            .optional()
    }

    /// parses the template flag
    fn template() -> impl Parser<Option<PathBuf>> {
        long("template")
            .help("Blank exercise template")
            .argument::<PathBuf>("FILE")
            .optional()
    }

    /// parses the submissions directory flag
    fn submissions() -> impl Parser<Option<PathBuf>> {
        long("submissions")
            .short('s')
            .help("Directory holding the submissions")
            .argument::<PathBuf>("DIR")
            .optional()
    }

    let grade = {
        let submissions = submissions();
        let template = template();
        let expected = long("expected")
            .help("Solved reference document")
            .argument::<PathBuf>("FILE")
            .optional();
        let output = long("output")
            .short('o')
            .help("Where to write the evaluation workbook")
            .argument::<PathBuf>("FILE")
            .optional();
        let json = long("json")
            .help("Also write the report as JSON")
            .argument::<PathBuf>("FILE")
            .optional();
        let config = config();
        let no_table = long("no-table")
            .help("Do not print the report tables")
            .switch();
        let verbose = long("verbose")
            .short('v')
            .help("Log every rule outcome")
            .switch();
        construct!(GradeOpts {
            submissions,
            template,
            expected,
            output,
            json,
            config,
            no_table,
            verbose
        })
    }
    .to_options()
    .command("grade")
    .help("Grade every submission")
    .map(Cmd::Grade);

    let provision = {
        let name = positional::<String>("NAME")
            .help("Participant name, used as <NAME>_evaluacion.xlsx")
            .optional();
        let template = template();
        let submissions = submissions();
        let config = config();
        construct!(Cmd::Provision {
            name,
            template,
            submissions,
            config
        })
    }
    .to_options()
    .command("provision")
    .help("Copy the blank template for a participant");

    let catalog = {
        let config = config();
        let json = long("json").help("Print the catalog as JSON").switch();
        construct!(Cmd::Catalog { config, json })
    }
    .to_options()
    .command("catalog")
    .help("List the rules that will be applied");

    let cmd = construct!([grade, provision, catalog]);

    cmd.to_options()
        .descr("Grader for spreadsheet exercises")
        .run()
}

/// Runs the `grade` command.
fn run_grade(opts: GradeOpts) -> Result<()> {
    let mut config = GradingConfig::load(opts.config.as_deref())?;
    if let Some(dir) = opts.submissions {
        config.paths.submissions_dir = dir;
    }
    if let Some(path) = opts.template {
        config.paths.template = path;
    }
    if let Some(path) = opts.expected {
        config.paths.expected = path;
    }
    if let Some(path) = opts.output {
        config.paths.output = path;
    }

    let report = match grade::run(&config) {
        Ok(report) => report,
        Err(e) if e.is_fatal() => bail!(e),
        Err(e) => {
            eprintln!("{e}");
            return Ok(());
        }
    };

    render::write_xlsx(&report, &config.paths.output)?;
    info!("Report written to {}", config.paths.output.display());
    if let Some(path) = opts.json {
        render::write_json(&report, &path)?;
        info!("JSON report written to {}", path.display());
    }

    if !opts.no_table {
        println!("{}", render::report_table(&report));
        println!("{}", render::summary_table(&report));
    }
    println!("{}", render::totals_line(&report.counts()));
    Ok(())
}

fn main() -> Result<()> {
    dotenv().ok();

    let cmd = options();
    let level = match &cmd {
        Cmd::Grade(opts) if opts.verbose => Level::DEBUG,
        _ => Level::INFO,
    };

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match cmd {
        Cmd::Grade(opts) => run_grade(opts)?,
        Cmd::Provision {
            name,
            template,
            submissions,
            config,
        } => {
            let config = GradingConfig::load(config.as_deref())?;
            let template = template.unwrap_or(config.paths.template);
            let submissions = submissions.unwrap_or(config.paths.submissions_dir);
            let path = provision(&template, &submissions, name.as_deref())?;
            println!("{}", path.display());
        }
        Cmd::Catalog { config, json } => {
            let config = GradingConfig::load(config.as_deref())?;
            if json {
                let text = serde_json::to_string_pretty(config.catalog.rules())
                    .context("Failed to serialize the catalog")?;
                println!("{text}");
            } else {
                let table = Table::new(config.catalog.summary())
                    .with(Panel::header("Rule catalog"))
                    .with(Style::modern())
                    .to_string();
                println!("{table}");
            }
        }
    };

    Ok(())
}
