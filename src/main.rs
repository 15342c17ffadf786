// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for licensedoc.
//!
//! This binary provides the `licensedoc` command for converting SPDX license
//! XML files to Markdown or plain text.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use lexopt::prelude::*;
use licensedoc::batch::{self, BatchOptions, BatchReport, Outcome};
use licensedoc::renderer::{DEFAULT_WIDTH, OutputMode, RenderOptions};
use snafu::{ensure, prelude::*};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Narrowest accepted wrap width.
const MIN_WIDTH: usize = 20;

/// Where to write the rendered output.
#[derive(Clone)]
enum OutputTarget {
    /// Write each file to the specified directory.
    Directory(PathBuf),
    /// Write to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    mode: OutputMode,
    width: usize,
    quiet: bool,
    verbose: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("no XML files found in the given inputs"))]
    NoXmlFiles,

    #[snafu(display("cannot write multiple files to stdout"))]
    MultipleFilesToStdout,

    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{source}"))]
    Convert { source: batch::BatchError },

    #[snafu(display("{count} of {total} files failed to convert"))]
    Failures { count: usize, total: usize },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert SPDX license XML files to Markdown or plain text

Usage: {name} [OPTIONS] <INPUT>...

Arguments:
  <INPUT>...  License XML files or directories containing them

Options:
  -o, --output <OUTPUT>       Output directory, or - for stdout (default: .)
  -t, --output-type <TYPE>    markdown or text (default: markdown)
  -w, --width <N>             Wrap width in columns (default: {width}, minimum: {min})

Other options:
  -q, --quiet                 Suppress progress and per-file messages
  -v, --verbose               Log debug details (RUST_LOG overrides)
  -n, --dry-run               Show what would be written without converting
  -f, --force                 Overwrite existing output files
  -h, --help                  Print help
  -V, --version               Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        width = DEFAULT_WIDTH,
        min = MIN_WIDTH,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output = OutputTarget::Directory(PathBuf::from("."));
    let mut mode = OutputMode::Markdown;
    let mut width = DEFAULT_WIDTH;
    let mut quiet = false;
    let mut verbose = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Directory(val)
                };
            }
            Short('t') | Long("output-type") => {
                mode = parser.value()?.parse()?;
            }
            Short('w') | Long("width") => {
                let val: usize = parser
                    .value()?
                    .parse()
                    .map_err(|_| "width must be a number")?;
                if val < MIN_WIDTH {
                    return Err(format!("width must be at least {MIN_WIDTH}").into());
                }
                width = val;
            }
            Short('q') | Long("quiet") => quiet = true,
            Short('v') | Long("verbose") => verbose = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output,
        mode,
        width,
        quiet,
        verbose,
        dry_run,
        force,
    })
}

/// Sends log output to stderr, filtered by `RUST_LOG` or the verbosity flags.
fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    init_tracing(&cli);

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    // Collect all input files first
    let files = batch::collect_input_files(&cli.input);
    ensure!(!files.is_empty(), NoXmlFilesSnafu);

    let opts = BatchOptions {
        render: RenderOptions {
            mode: cli.mode,
            width: cli.width,
        },
        force: cli.force,
        dry_run: cli.dry_run,
    };

    match &cli.output {
        OutputTarget::Stdout => {
            ensure!(files.len() == 1, MultipleFilesToStdoutSnafu);
            process_to_stdout(&files[0], &cli, &opts)
        }
        OutputTarget::Directory(dir) => {
            if !cli.dry_run {
                std::fs::create_dir_all(dir).context(CreateOutputDirSnafu { path: dir })?;
            }
            let report = process_files(&files, dir, &cli, &opts);
            summarize(&report, &cli)
        }
    }
}

/// Processes a single file and outputs to stdout.
fn process_to_stdout(input: &Path, cli: &Cli, opts: &BatchOptions) -> Result<(), Error> {
    if cli.dry_run {
        eprintln!("Would output {}", input.display());
        return Ok(());
    }

    let document = batch::convert_file(input, &opts.render).context(ConvertSnafu)?;
    print!("{document}");
    Ok(())
}

/// Converts every file into the output directory behind a progress bar.
fn process_files(files: &[PathBuf], out_dir: &Path, cli: &Cli, opts: &BatchOptions) -> BatchReport {
    let pb = ProgressBar::new(files.len() as u64);
    if cli.quiet {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) =
        ProgressStyle::default_bar().template("[{pos}/{len}] [{bar:40.cyan/blue}] {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let report = batch::run(files, out_dir, opts, |i, path| {
        pb.set_position(i as u64);
        pb.set_message(path.display().to_string());
    });
    pb.finish_and_clear();
    report
}

/// Prints per-file results and a summary line.
fn summarize(report: &BatchReport, cli: &Cli) -> Result<(), Error> {
    for outcome in &report.outcomes {
        match outcome {
            Outcome::Converted { output, .. } if !cli.quiet => {
                eprintln!("Wrote {}", output.display());
            }
            Outcome::Skipped { output, .. } if !cli.quiet => {
                eprintln!(
                    "Skipping {} (already exists, use --force to overwrite)",
                    output.display()
                );
            }
            Outcome::DryRun { output, .. } => {
                eprintln!(
                    "Would write {} from {}",
                    output.display(),
                    outcome.input().display()
                );
            }
            Outcome::Failed { error, .. } => {
                eprintln!("Error: {error}");
            }
            _ => {}
        }
    }

    if !cli.quiet {
        eprintln!("{}", summary_line(report, cli.mode, cli.dry_run));
    }

    let count = report.failed();
    ensure!(
        count == 0,
        FailuresSnafu {
            count,
            total: report.outcomes.len()
        }
    );
    Ok(())
}

/// One-line totals for a finished batch.
fn summary_line(report: &BatchReport, mode: OutputMode, dry_run: bool) -> String {
    if dry_run {
        format!(
            "{} {mode} files would be written, {} failed",
            report.would_write(),
            report.failed()
        )
    } else {
        format!(
            "{} converted, {} skipped, {} failed",
            report.converted(),
            report.skipped(),
            report.failed()
        )
    }
}
