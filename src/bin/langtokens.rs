// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for extracting language comment tokens.
//!
//! Reads an editor `languages.toml` and writes the comment tokens and file
//! types of each language as JSON.

use lexopt::prelude::*;
use licensedoc::batch::write_atomic;
use licensedoc::languages::{self, LanguageError};
use snafu::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUTPUT: &str = "language_data.json";

struct Cli {
    input: PathBuf,
    output: PathBuf,
    quiet: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    Extract {
        path: PathBuf,
        source: LanguageError,
    },

    #[snafu(display("{source}"))]
    Serialize { source: LanguageError },

    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{source}"))]
    WriteFile {
        source: licensedoc::batch::BatchError,
    },
}

fn print_help() {
    println!(
        "\
langtokens {version}
Extract comment tokens and file types from a languages.toml file

Usage: langtokens [OPTIONS] [INPUT]

Arguments:
  [INPUT]  languages.toml to read, or - for stdin (default: -)

Options:
  -o, --output <OUTPUT>  JSON file to write (default: {output})
  -q, --quiet            Suppress progress messages
  -h, --help             Print help
  -V, --version          Print version",
        version = env!("CARGO_PKG_VERSION"),
        output = DEFAULT_OUTPUT,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    let mut input: Option<PathBuf> = None;
    let mut output = PathBuf::from(DEFAULT_OUTPUT);
    let mut quiet = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => output = parser.value()?.parse()?,
            Short('q') | Long("quiet") => quiet = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("langtokens {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if input.is_none() => input = Some(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input: input.unwrap_or_else(|| PathBuf::from("-")),
        output,
        quiet,
    })
}

fn read_input(path: &Path) -> Result<String, Error> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context(ReadFileSnafu { path })?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).context(ReadFileSnafu { path })
    }
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    let default = if cli.quiet { "error" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();

    let toml = read_input(&cli.input)?;
    let data = languages::extract_languages(&toml).context(ExtractSnafu { path: &cli.input })?;
    let json = languages::to_json(&data).context(SerializeSnafu)?;

    if let Some(parent) = cli.output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateOutputDirSnafu { path: parent })?;
    }
    write_atomic(&cli.output, &json).context(WriteFileSnafu)?;

    if !cli.quiet {
        eprintln!(
            "Wrote {} languages to {}",
            data.len(),
            cli.output.display()
        );
    }
    Ok(())
}
