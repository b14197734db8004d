//! Study runner
//!
//! Records the run context, then executes the study's steps in order, each
//! in its own output directory, stopping at the first step that does not
//! succeed.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::context::{format_header, CaptureOptions, ContextDump, DumpedContext, RunContext};
use crate::util::paths::ensure_dir;

use super::error::StudyError;
use super::executor::{StepExecutor, StepInvocation, StepStatus};
use super::interrupt::Interrupt;
use super::layout::StudyLayout;
use super::manifest::{StepSpec, StudyManifest, MANIFEST_FILE};

/// Variables exported to every step
pub const ENV_OUT_DIR: &str = "STUDYRUN_OUT_DIR";
pub const ENV_STEP: &str = "STUDYRUN_STEP";
pub const ENV_STUDY: &str = "STUDYRUN_STUDY";
pub const ENV_CONFIG: &str = "STUDYRUN_CONFIG";

/// Settings snapshot stored next to the context
const SETTINGS_ARTIFACT: &str = "settings.toml";

/// What to run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Project root
    pub root: PathBuf,
    /// Study name under the studies directory, or a path to one
    pub study: String,
    /// Overrides the default output root
    pub out_dir: Option<PathBuf>,
    /// Configuration file recorded in the context and exported to steps
    pub config: Option<PathBuf>,
    pub notes: Option<String>,
    /// Appended to every step's arguments
    pub extra_args: Vec<String>,
    /// Print the header and step output to stdout
    pub echo: bool,
    /// Command line recorded in the context (defaults to the process args)
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: String,
    pub dir: PathBuf,
    pub transcript: PathBuf,
    pub status: StepStatus,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub study: String,
    pub out_dir: PathBuf,
    pub context: DumpedContext,
    /// Steps that ran, in order
    pub outcomes: Vec<StepOutcome>,
    /// Steps never started because an earlier one failed or the run was
    /// interrupted
    pub skipped: Vec<String>,
    /// Ctrl-C arrived during the run
    pub interrupted: bool,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        !self.interrupted && self.outcomes.iter().all(|o| o.status.is_success())
    }

    /// The step that stopped the run, if any
    pub fn failed_step(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| !o.status.is_success())
    }

    pub fn exit_code(&self) -> u8 {
        match self.failed_step() {
            Some(outcome) => outcome.status.exit_code(),
            None if self.interrupted => StepStatus::Interrupted.exit_code(),
            None => 0,
        }
    }
}

/// A study whose paths are resolved and whose manifest is valid
#[derive(Debug, Clone)]
pub struct PreparedStudy {
    pub layout: StudyLayout,
    pub manifest: StudyManifest,
}

pub struct StudyRunner<E: StepExecutor> {
    settings: Settings,
    executor: E,
    interrupt: Interrupt,
}

impl<E: StepExecutor> StudyRunner<E> {
    pub fn new(settings: Settings, executor: E) -> Self {
        Self {
            settings,
            executor,
            interrupt: Interrupt::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Set by Ctrl-C during [`Self::run_prepared`]; once set, no further
    /// step is started
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Resolve paths and load the manifest without running anything
    pub fn prepare(&self, request: &RunRequest) -> Result<PreparedStudy, StudyError> {
        let layout = StudyLayout::resolve(
            &request.root,
            &self.settings,
            &request.study,
            request.out_dir.as_deref(),
        )
        .map_err(StudyError::Layout)?;

        if !layout.study_dir.is_dir() {
            return Err(StudyError::StudyNotFound(layout.study_dir));
        }
        let manifest = StudyManifest::load(&layout.study_dir)?;

        ensure_dir(&layout.out_dir).map_err(|source| StudyError::CreateDir {
            path: layout.out_dir.clone(),
            source,
        })?;

        Ok(PreparedStudy { layout, manifest })
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunSummary, StudyError> {
        let prepared = self.prepare(request)?;
        self.run_prepared(prepared, request).await
    }

    /// Record the context and execute the steps of a prepared study
    pub async fn run_prepared(
        &self,
        prepared: PreparedStudy,
        request: &RunRequest,
    ) -> Result<RunSummary, StudyError> {
        let PreparedStudy { layout, manifest } = prepared;
        let study = manifest.name().to_string();
        let _ctrl_c = self.interrupt.listen_for_ctrl_c();

        let ctx = self.capture_context(&layout, request);
        let dumped = self.dump_context(&layout, &manifest, &ctx)?;
        tracing::info!(
            study = %study,
            out_dir = %layout.out_dir.display(),
            context = %dumped.info_path.display(),
            "Context recorded"
        );

        if request.echo {
            print_header(&ctx);
        }

        let config = request
            .config
            .as_deref()
            .filter(|path| path.is_file())
            .and_then(|path| std::path::absolute(path).ok());

        let total = manifest.steps.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut interrupted = false;

        for (index, step) in manifest.steps.iter().enumerate() {
            if self.interrupt.is_triggered() {
                tracing::warn!(step = %step.name, "Interrupted, not starting step");
                interrupted = true;
                skipped = remaining(&manifest.steps[index..]);
                break;
            }

            let dir = layout
                .prepare_step(&step.name)
                .map_err(|source| StudyError::CreateDir {
                    path: layout.step_dir(&step.name),
                    source,
                })?;
            let invocation =
                self.invocation(&layout, &study, step, &dir, config.as_deref(), request);

            tracing::info!(step = %step.name, index = index + 1, total, "Starting step");
            let started = Instant::now();
            let status = self.executor.execute(&invocation, &self.interrupt).await?;
            let duration = started.elapsed();

            if status.is_success() {
                tracing::info!(
                    step = %step.name,
                    elapsed_ms = duration.as_millis() as u64,
                    "Step finished"
                );
            } else {
                tracing::error!(step = %step.name, %status, "Step did not succeed, stopping study");
            }

            outcomes.push(StepOutcome {
                step: step.name.clone(),
                dir,
                transcript: invocation.transcript_path,
                status,
                duration,
            });

            if !status.is_success() {
                interrupted = status == StepStatus::Interrupted;
                skipped = remaining(&manifest.steps[index + 1..]);
                break;
            }
        }
        // Ctrl-C after the last step still counts
        let interrupted = interrupted || self.interrupt.is_triggered();

        Ok(RunSummary {
            study,
            out_dir: layout.out_dir,
            context: dumped,
            outcomes,
            skipped,
            interrupted,
        })
    }

    fn capture_context(&self, layout: &StudyLayout, request: &RunRequest) -> RunContext {
        let ctx = RunContext::capture(&CaptureOptions {
            author: self.settings.resolve_author(),
            repo_dir: layout.root.clone(),
            command: request.command.clone(),
            interpreter: self.settings.interpreter.clone(),
            notes: request.notes.clone(),
        });
        match &request.config {
            Some(path) => ctx.attach_config_or_warn(path),
            None => ctx,
        }
    }

    fn dump_context(
        &self,
        layout: &StudyLayout,
        manifest: &StudyManifest,
        ctx: &RunContext,
    ) -> Result<DumpedContext, StudyError> {
        let mut dump =
            ContextDump::new(&layout.out_dir, manifest.name()).with_overwrite(self.settings.overwrite);

        match manifest.to_toml() {
            Ok(toml) => dump.add_artifact(MANIFEST_FILE, toml),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize study manifest"),
        }
        match toml::to_string(&self.settings) {
            Ok(toml) => dump.add_artifact(SETTINGS_ARTIFACT, toml),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize settings"),
        }

        Ok(dump.write(ctx)?)
    }

    fn invocation(
        &self,
        layout: &StudyLayout,
        study: &str,
        step: &StepSpec,
        step_dir: &Path,
        config: Option<&Path>,
        request: &RunRequest,
    ) -> StepInvocation {
        let mut args = step.args.clone();
        if !self.settings.out_dir_flag.is_empty() {
            args.push(self.settings.out_dir_flag.clone());
            args.push(step_dir.to_string_lossy().into_owned());
        }
        args.extend(request.extra_args.iter().cloned());

        let mut env: BTreeMap<String, OsString> = step
            .env
            .iter()
            .map(|(k, v)| (k.clone(), OsString::from(v)))
            .collect();

        let var = &self.settings.search_path_var;
        if !var.is_empty() {
            let existing = env.remove(var).or_else(|| std::env::var_os(var));
            env.insert(var.clone(), search_path(&layout.shared_dir, existing));
        }

        env.insert(ENV_OUT_DIR.to_string(), step_dir.as_os_str().to_owned());
        env.insert(ENV_STEP.to_string(), OsString::from(&step.name));
        env.insert(ENV_STUDY.to_string(), OsString::from(study));
        if let Some(config) = config {
            env.insert(ENV_CONFIG.to_string(), config.as_os_str().to_owned());
        }

        StepInvocation {
            step: step.name.clone(),
            program: step.program.clone(),
            args,
            cwd: layout.study_dir.clone(),
            env,
            transcript_path: layout.transcript_path(&step.name),
            echo: request.echo,
        }
    }
}

fn remaining(steps: &[StepSpec]) -> Vec<String> {
    steps.iter().map(|s| s.name.clone()).collect()
}

/// `shared` followed by the entries of `existing`
fn search_path(shared: &Path, existing: Option<OsString>) -> OsString {
    let mut paths = vec![shared.to_path_buf()];
    if let Some(existing) = existing {
        paths.extend(std::env::split_paths(&existing).filter(|p| !p.as_os_str().is_empty()));
    }
    std::env::join_paths(paths).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Search path entry contains a separator, using shared dir only");
        shared.as_os_str().to_owned()
    })
}

fn print_header(ctx: &RunContext) {
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", format_header(ctx));
    let _ = stdout.flush();
}
