use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use studyrun::cli::{ChecksumArgs, Cli, Commands, ContextArgs, RunArgs};
use studyrun::context::{format_header, CaptureOptions, ContextDump, RunContext};
use studyrun::logging::{self, LogFile};
use studyrun::study::{ProcessExecutor, RunRequest, RunSummary, StudyError, StudyRunner};
use studyrun::util::checksum::{self, ChecksumOptions};
use studyrun::Settings;

/// Bad arguments, configuration or study definition
const EXIT_USAGE: u8 = 2;
/// A step's program exists but could not be started
const EXIT_CANNOT_EXECUTE: u8 = 126;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_file = logging::init(cli.verbose);

    match run(cli, &log_file).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("error: {e:#}");
            let code = match e.downcast_ref::<StudyError>() {
                Some(StudyError::Spawn { .. }) => EXIT_CANNOT_EXECUTE,
                _ => EXIT_USAGE,
            };
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli, log_file: &LogFile) -> Result<u8> {
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    match cli.command {
        Commands::Run(args) => {
            let settings = Settings::load(&root)?;
            run_study(root, settings, args, log_file).await
        }
        Commands::Context(args) => {
            let settings = Settings::load(&root)?;
            print_context(&root, &settings, args, log_file)
        }
        Commands::Checksum(args) => checksum_path(args),
    }
}

async fn run_study(
    root: PathBuf,
    mut settings: Settings,
    args: RunArgs,
    log_file: &LogFile,
) -> Result<u8> {
    if args.overwrite {
        settings.overwrite = true;
    }

    let request = RunRequest {
        root,
        study: args.study,
        out_dir: args.out,
        config: args.config,
        notes: args.notes,
        extra_args: args.extra,
        echo: !args.quiet,
        command: None,
    };

    let runner = StudyRunner::new(settings, ProcessExecutor::new());
    let prepared = runner.prepare(&request)?;

    match log_file.attach_run(
        &prepared.layout.out_dir,
        prepared.manifest.name(),
        runner.settings().overwrite,
    ) {
        Ok(path) => tracing::info!(path = %path.display(), "Writing log file"),
        Err(e) => tracing::warn!(error = %e, "Failed to open log file, logging to console only"),
    }

    let summary = runner.run_prepared(prepared, &request).await?;
    if !args.quiet {
        report(&summary);
    }
    Ok(summary.exit_code())
}

fn report(summary: &RunSummary) {
    let mut err = io::stderr().lock();
    let _ = writeln!(err);
    for outcome in &summary.outcomes {
        let _ = writeln!(
            err,
            "{:<20} {:<28} {:>8.1}s",
            outcome.step,
            outcome.status.to_string(),
            outcome.duration.as_secs_f64()
        );
    }
    for step in &summary.skipped {
        let _ = writeln!(err, "{step:<20} skipped");
    }
    if summary.interrupted {
        let _ = writeln!(err, "Interrupted");
    }
    let _ = writeln!(
        err,
        "{}: {}/{} steps succeeded, outputs in {}",
        summary.study,
        summary
            .outcomes
            .iter()
            .filter(|o| o.status.is_success())
            .count(),
        summary.outcomes.len() + summary.skipped.len(),
        summary.out_dir.display()
    );
}

fn print_context(
    root: &Path,
    settings: &Settings,
    args: ContextArgs,
    log_file: &LogFile,
) -> Result<u8> {
    let overwrite = settings.overwrite || args.overwrite;
    if let Some(out) = &args.out {
        if let Err(e) = log_file.attach_run(out, &args.app_id, overwrite) {
            tracing::warn!(error = %e, "Failed to open log file, logging to console only");
        }
    }

    let ctx = RunContext::capture(&CaptureOptions {
        author: settings.resolve_author(),
        repo_dir: root.to_path_buf(),
        command: None,
        interpreter: settings.interpreter.clone(),
        notes: args.notes,
    });
    let ctx = match &args.config {
        Some(path) => ctx.attach_config_or_warn(path),
        None => ctx,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ctx)?);
    } else {
        print!("{}", format_header(&ctx));
    }

    if let Some(out) = &args.out {
        let dumped = ContextDump::new(out, &args.app_id)
            .with_overwrite(overwrite)
            .write(&ctx)?;
        eprintln!("Context written to {}", dumped.info_path.display());
    }
    Ok(0)
}

fn checksum_path(args: ChecksumArgs) -> Result<u8> {
    if args.path.is_file() {
        let digest = checksum::file_checksum(&args.path)?;
        println!("{}  {}", digest, args.path.display());
        return Ok(0);
    }

    let options = ChecksumOptions {
        pattern: args.pattern,
        recursive: args.recursive,
        exclude: args.out.clone(),
    };
    let entries = checksum::dir_checksums(&args.path, &options)?;
    if entries.is_empty() {
        tracing::warn!(
            path = %args.path.display(),
            pattern = %options.pattern,
            "No files matched, nothing written"
        );
        return Ok(0);
    }

    match &args.out {
        Some(out) => {
            checksum::write_manifest_file(out, &entries, args.force)?;
            eprintln!(
                "Checksums for {} files written to {}",
                entries.len(),
                out.display()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            checksum::write_manifest(&mut stdout, &entries)?;
            stdout.flush()?;
        }
    }
    Ok(0)
}
