// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Converting many license files at once.
//!
//! Each input is converted on its own. A failure is recorded in the
//! [`BatchReport`] and the batch moves on to the next file.

use crate::renderer::RenderOptions;
use crate::{ConvertError, convert};
use snafu::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors for a single document in a batch.
#[derive(Debug, Snafu)]
pub enum BatchError {
    /// The input file could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        /// Input path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The input could not be converted.
    #[snafu(display("failed to convert {}: {source}", path.display()))]
    Convert {
        /// Input path.
        path: PathBuf,
        /// Underlying conversion error.
        source: ConvertError,
    },

    /// The output file could not be written.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The input path has no file name to derive an output name from.
    #[snafu(display("invalid input filename: {}", path.display()))]
    InvalidFilename {
        /// Input path.
        path: PathBuf,
    },
}

/// Options for a batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Rendering options applied to every document.
    pub render: RenderOptions,
    /// Overwrite existing output files.
    pub force: bool,
    /// Report what would be written without converting anything.
    pub dry_run: bool,
}

/// What happened to one input file.
#[derive(Debug)]
pub enum Outcome {
    /// The document was converted and written.
    Converted {
        /// Input path.
        input: PathBuf,
        /// Path written.
        output: PathBuf,
    },
    /// The output already existed and `force` was off.
    Skipped {
        /// Input path.
        input: PathBuf,
        /// Existing output path.
        output: PathBuf,
    },
    /// Dry run: the output that would have been written.
    DryRun {
        /// Input path.
        input: PathBuf,
        /// Path that would be written.
        output: PathBuf,
    },
    /// The document could not be converted or written.
    Failed {
        /// Input path.
        input: PathBuf,
        /// Why it failed.
        error: BatchError,
    },
}

impl Outcome {
    /// The input file this outcome belongs to.
    #[must_use]
    pub fn input(&self) -> &Path {
        match self {
            Self::Converted { input, .. }
            | Self::Skipped { input, .. }
            | Self::DryRun { input, .. }
            | Self::Failed { input, .. } => input,
        }
    }
}

/// Outcomes of a batch run, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One outcome per input file.
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    /// Number of documents converted and written.
    #[must_use]
    pub fn converted(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Converted { .. }))
    }

    /// Number of documents a dry run would have written.
    #[must_use]
    pub fn would_write(&self) -> usize {
        self.count(|o| matches!(o, Outcome::DryRun { .. }))
    }

    /// Number of documents skipped because their output existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    /// Number of documents that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    /// The failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &BatchError)> {
        self.outcomes.iter().filter_map(|o| match o {
            Outcome::Failed { input, error } => Some((input.as_path(), error)),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|&o| pred(o)).count()
    }
}

/// Collects all XML files from the given inputs (files and directories).
///
/// Directories are searched recursively and their files returned in sorted
/// order. Explicit file arguments are kept as given.
#[must_use]
pub fn collect_input_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file() && is_xml(e.path()))
            {
                files.push(entry.path().to_path_buf());
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// The output path for an input file: its stem plus the mode's extension.
///
/// # Errors
///
/// Returns [`BatchError::InvalidFilename`] if the input has no file stem.
pub fn output_path(input: &Path, out_dir: &Path, opts: &RenderOptions) -> Result<PathBuf, BatchError> {
    let stem = input
        .file_stem()
        .context(InvalidFilenameSnafu { path: input })?;
    Ok(out_dir.join(format!(
        "{}.{}",
        stem.to_string_lossy(),
        opts.mode.extension()
    )))
}

/// Reads and converts one file.
///
/// # Errors
///
/// Returns [`BatchError`] if the file cannot be read or converted.
pub fn convert_file(input: &Path, opts: &RenderOptions) -> Result<String, BatchError> {
    let xml = std::fs::read_to_string(input).context(ReadFileSnafu { path: input })?;
    convert(&xml, opts).context(ConvertSnafu { path: input })
}

/// Converts one file into `out_dir`.
///
/// Never fails: errors are captured in [`Outcome::Failed`].
#[must_use]
pub fn process_file(input: &Path, out_dir: &Path, opts: &BatchOptions) -> Outcome {
    match try_process_file(input, out_dir, opts) {
        Ok(outcome) => outcome,
        Err(error) => {
            warn!(input = %input.display(), %error, "conversion failed");
            Outcome::Failed {
                input: input.to_path_buf(),
                error,
            }
        }
    }
}

fn try_process_file(input: &Path, out_dir: &Path, opts: &BatchOptions) -> Result<Outcome, BatchError> {
    let output = output_path(input, out_dir, &opts.render)?;
    let input = input.to_path_buf();

    if opts.dry_run {
        return Ok(Outcome::DryRun { input, output });
    }

    if output.exists() && !opts.force {
        info!(output = %output.display(), "output exists, skipping");
        return Ok(Outcome::Skipped { input, output });
    }

    let document = convert_file(&input, &opts.render)?;
    write_atomic(&output, &document)?;
    debug!(input = %input.display(), output = %output.display(), "converted");
    Ok(Outcome::Converted { input, output })
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, so a failed write never leaves a partial file at `path`.
///
/// # Errors
///
/// Returns [`BatchError::WriteFile`] if the temporary file cannot be created,
/// written, or moved into place.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), BatchError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).context(WriteFileSnafu { path })?;
    // Temporary files are created owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .context(WriteFileSnafu { path })?;
    }
    file.write_all(contents.as_bytes())
        .context(WriteFileSnafu { path })?;
    file.persist(path)
        .map_err(|e| e.error)
        .context(WriteFileSnafu { path })?;
    Ok(())
}

/// Converts every file into `out_dir`, calling `on_file` before each one.
///
/// `on_file` receives the zero-based index and the input path, which is
/// enough to drive a progress display.
pub fn run(
    files: &[PathBuf],
    out_dir: &Path,
    opts: &BatchOptions,
    mut on_file: impl FnMut(usize, &Path),
) -> BatchReport {
    let mut report = BatchReport::default();
    for (i, file) in files.iter().enumerate() {
        on_file(i, file);
        report.outcomes.push(process_file(file, out_dir, opts));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::OutputMode;
    use std::fs;
    use tempfile::TempDir;

    const LICENSE: &str = r#"<license licenseId="X" name="X License"><text><p>Body</p></text></license>"#;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        (tmp, input, output)
    }

    #[test]
    fn collects_xml_files_sorted() {
        let (_tmp, input, _) = setup();
        fs::create_dir_all(input.join("sub")).unwrap();
        fs::write(input.join("b.xml"), LICENSE).unwrap();
        fs::write(input.join("a.XML"), LICENSE).unwrap();
        fs::write(input.join("sub/c.xml"), LICENSE).unwrap();
        fs::write(input.join("notes.txt"), "ignored").unwrap();

        let files = collect_input_files(&[input.clone()]);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(&input).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("a.XML"), PathBuf::from("b.xml"), PathBuf::from("sub/c.xml")]
        );
    }

    #[test]
    fn explicit_files_are_kept() {
        let files = collect_input_files(&[PathBuf::from("does-not-exist.txt")]);
        assert_eq!(files, vec![PathBuf::from("does-not-exist.txt")]);
    }

    #[test]
    fn output_path_uses_mode_extension() {
        let md = output_path(Path::new("in/MIT.xml"), Path::new("out"), &RenderOptions::default());
        assert_eq!(md.unwrap(), PathBuf::from("out/MIT.md"));

        let opts = RenderOptions {
            mode: OutputMode::Text,
            ..Default::default()
        };
        let txt = output_path(Path::new("in/MIT.xml"), Path::new("out"), &opts);
        assert_eq!(txt.unwrap(), PathBuf::from("out/MIT.txt"));
    }

    #[test]
    fn output_path_requires_file_stem() {
        let err = output_path(Path::new("/"), Path::new("out"), &RenderOptions::default());
        assert!(matches!(err, Err(BatchError::InvalidFilename { .. })));
    }

    #[test]
    fn converts_and_writes_file() {
        let (_tmp, input, output) = setup();
        let file = input.join("X.xml");
        fs::write(&file, LICENSE).unwrap();

        let outcome = process_file(&file, &output, &BatchOptions::default());
        assert!(matches!(outcome, Outcome::Converted { .. }));

        let written = fs::read_to_string(output.join("X.md")).unwrap();
        assert!(written.starts_with("---\nspdxID: X\n"));
        assert!(written.ends_with("Body\n"));
    }

    #[test]
    fn skips_existing_output_without_force() {
        let (_tmp, input, output) = setup();
        let file = input.join("X.xml");
        fs::write(&file, LICENSE).unwrap();
        fs::write(output.join("X.md"), "existing").unwrap();

        let outcome = process_file(&file, &output, &BatchOptions::default());
        assert!(matches!(outcome, Outcome::Skipped { .. }));
        assert_eq!(fs::read_to_string(output.join("X.md")).unwrap(), "existing");

        let opts = BatchOptions {
            force: true,
            ..Default::default()
        };
        let outcome = process_file(&file, &output, &opts);
        assert!(matches!(outcome, Outcome::Converted { .. }));
        assert_ne!(fs::read_to_string(output.join("X.md")).unwrap(), "existing");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (_tmp, input, output) = setup();
        let file = input.join("X.xml");
        fs::write(&file, LICENSE).unwrap();

        let opts = BatchOptions {
            dry_run: true,
            ..Default::default()
        };
        let outcome = process_file(&file, &output, &opts);
        assert!(matches!(outcome, Outcome::DryRun { .. }));
        assert!(!output.join("X.md").exists());
    }

    #[test]
    fn dry_run_report_counts_would_write() {
        let (_tmp, input, output) = setup();
        fs::write(input.join("a.xml"), LICENSE).unwrap();
        fs::write(input.join("b.xml"), LICENSE).unwrap();

        let files = collect_input_files(&[input]);
        let opts = BatchOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = run(&files, &output, &opts, |_, _| {});

        assert_eq!(report.would_write(), 2);
        assert_eq!(report.converted(), 0);
        assert!(report.outcomes[0].input().ends_with("a.xml"));
        assert!(report.outcomes[1].input().ends_with("b.xml"));
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
    }

    #[test]
    fn failed_conversion_leaves_no_output() {
        let (_tmp, input, output) = setup();
        let file = input.join("broken.xml");
        fs::write(&file, "<license><text>").unwrap();

        let outcome = process_file(&file, &output, &BatchOptions::default());
        assert!(matches!(
            outcome,
            Outcome::Failed {
                error: BatchError::Convert { .. },
                ..
            }
        ));
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
    }

    #[test]
    fn missing_input_is_a_read_error() {
        let (_tmp, input, output) = setup();
        let outcome = process_file(&input.join("missing.xml"), &output, &BatchOptions::default());
        assert!(matches!(
            outcome,
            Outcome::Failed {
                error: BatchError::ReadFile { .. },
                ..
            }
        ));
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let (_tmp, _, output) = setup();
        let path = output.join("file.txt");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(fs::read_dir(&output).unwrap().count(), 1);
    }

    #[test]
    fn run_reports_each_file_and_calls_back() {
        let (_tmp, input, output) = setup();
        fs::write(input.join("a.xml"), LICENSE).unwrap();
        fs::write(input.join("b.xml"), "not xml <").unwrap();
        fs::write(input.join("c.xml"), LICENSE).unwrap();

        let files = collect_input_files(&[input]);
        let mut seen = Vec::new();
        let report = run(&files, &output, &BatchOptions::default(), |i, _| seen.push(i));

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(report.converted(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 0);

        let failed: Vec<_> = report.failures().map(|(path, _)| path.to_path_buf()).collect();
        assert!(failed[0].ends_with("b.xml"));
    }
}
