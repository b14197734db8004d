//! Integration tests for running studies with real processes
//!
//! Steps are small `sh -c` scripts, so these tests only run on Unix.

#![cfg(unix)]

use super::common::study_fixtures::TestProject;
use studyrun::study::{
    ProcessExecutor, RunRequest, StepStatus, StudyError, StudyRunner, ENV_OUT_DIR,
};
use studyrun::Settings;

fn request(project: &TestProject, study: &str) -> RunRequest {
    RunRequest {
        root: project.root().to_path_buf(),
        study: study.to_string(),
        command: Some(vec!["studyrun".to_string(), "run".to_string(), study.to_string()]),
        ..Default::default()
    }
}

fn runner(project: &TestProject) -> StudyRunner<ProcessExecutor> {
    let mut settings = Settings::load_from(None, &project.root().join("studyrun.toml")).unwrap();
    settings.author = Some("Test User".to_string());
    StudyRunner::new(settings, ProcessExecutor::new())
}

/// Every step gets its own directory and an exact transcript
#[tokio::test]
async fn test_steps_run_in_order_with_transcripts() {
    let project = TestProject::new();
    project.add_shell_study(
        "study01",
        &[
            ("step01", "printf 'one\\n'; printf 'warn\\n' >&2; date > \"$2/first.txt\""),
            ("step02", "test -f \"$2/../step01/first.txt\" && printf 'two'"),
        ],
    );

    let summary = runner(&project).run(&request(&project, "study01")).await.unwrap();

    assert!(summary.succeeded(), "outcomes: {:?}", summary.outcomes);
    let out = project.results_dir("study01");
    assert_eq!(
        std::fs::read_to_string(out.join("step01/console.log")).unwrap(),
        "one\nwarn\n"
    );
    // No trailing newline added
    assert_eq!(
        std::fs::read_to_string(out.join("step02/console.log")).unwrap(),
        "two"
    );
    assert!(out.join("step01/first.txt").is_file());
    assert!(out.join("_context/study01/info.txt").is_file());
}

/// A failing step stops the study and its exit code is reported
#[tokio::test]
async fn test_failure_stops_later_steps() {
    let project = TestProject::new();
    project.add_shell_study(
        "study01",
        &[
            ("step01", "echo ok"),
            ("step02", "echo broken >&2; exit 3"),
            ("step03", "touch \"$2/should-not-exist\""),
        ],
    );

    let summary = runner(&project).run(&request(&project, "study01")).await.unwrap();

    assert_eq!(summary.exit_code(), 3);
    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.outcomes[1].status, StepStatus::Failed { code: Some(3) });
    assert_eq!(summary.skipped, ["step03"]);

    let out = project.results_dir("study01");
    assert_eq!(
        std::fs::read_to_string(out.join("step02/console.log")).unwrap(),
        "broken\n"
    );
    assert!(!out.join("step03").exists());
}

/// A program that does not exist fails the step before anything is spawned
#[tokio::test]
async fn test_missing_program() {
    let project = TestProject::new();
    project.add_study(
        "study01",
        "[[steps]]\nname = \"step01\"\nprogram = \"definitely-not-a-real-program-xyz\"\n",
    );

    let summary = runner(&project).run(&request(&project, "study01")).await.unwrap();

    assert_eq!(summary.outcomes[0].status, StepStatus::ProgramNotFound);
    assert_eq!(summary.exit_code(), 127);
    // The directory exists even though the step never started
    assert!(project.results_dir("study01").join("step01").is_dir());
}

/// Steps see the shared code directory, their output directory and the
/// out-dir flag
#[tokio::test]
async fn test_step_environment() {
    let project = TestProject::new();
    project.add_shell_study(
        "study01",
        &[(
            "step01",
            "printf '%s\\n' \"$PYTHONPATH\" \"$STUDYRUN_OUT_DIR\" \"$1\" \"$2\" \"$3\"",
        )],
    );

    let mut req = request(&project, "study01");
    req.extra_args = vec!["--fast".to_string()];
    runner(&project).run(&req).await.unwrap();

    let step_dir = project.results_dir("study01").join("step01");
    let transcript = std::fs::read_to_string(step_dir.join("console.log")).unwrap();
    let lines: Vec<&str> = transcript.lines().collect();

    let shared = project.root().join("src");
    assert!(
        lines[0].starts_with(shared.to_str().unwrap()),
        "search path: {}",
        lines[0]
    );
    assert_eq!(lines[1], step_dir.to_str().unwrap());
    assert_eq!(lines[2], "--outDir");
    assert_eq!(lines[3], step_dir.to_str().unwrap());
    assert_eq!(lines[4], "--fast");
    assert_eq!(ENV_OUT_DIR, "STUDYRUN_OUT_DIR");
}

/// Project settings change the search-path variable and the out-dir flag
#[tokio::test]
async fn test_project_settings() {
    let project = TestProject::new();
    project.write_settings(
        "search_path_var = \"STUDY_LIB\"\nout_dir_flag = \"--output\"\nresults_dir = \"out\"\n",
    );
    project.add_shell_study("study01", &[("step01", "printf '%s %s' \"$STUDY_LIB\" \"$1\"")]);

    let summary = runner(&project).run(&request(&project, "study01")).await.unwrap();

    let out = project.root().join("out").join("study01");
    assert_eq!(summary.out_dir, out);
    let transcript = std::fs::read_to_string(out.join("step01/console.log")).unwrap();
    assert!(transcript.starts_with(project.root().join("src").to_str().unwrap()));
    assert!(transcript.ends_with(" --output"));
}

/// The dumped context records the study manifest and the dirty state
#[tokio::test]
async fn test_context_records_manifest() {
    let project = TestProject::new();
    project.add_shell_study("study01", &[("step01", "true")]);
    project.commit_all();

    let summary = runner(&project).run(&request(&project, "study01")).await.unwrap();

    let info = std::fs::read_to_string(&summary.context.info_path).unwrap();
    assert!(info.starts_with("Context information\n"));
    assert!(info.contains("Author:    Test User\n"));
    assert!(info.contains("Console:\n--------\nstudyrun run study01\n"));
    assert!(!info.contains("[dirty"), "clean checkout expected:\n{info}");

    let manifest = std::fs::read_to_string(summary.context.dir.join("study.toml")).unwrap();
    assert!(manifest.contains("name = \"step01\""));
}

/// Outputs of an earlier run are untracked and leave the checkout clean
#[tokio::test]
async fn test_second_run_on_clean_checkout_stays_clean() {
    let project = TestProject::new();
    project.add_shell_study("study01", &[("step01", "echo result > \"$2/out.txt\"")]);
    project.commit_all();

    let runner = runner(&project);
    let first = runner.run(&request(&project, "study01")).await.unwrap();
    let second = runner.run(&request(&project, "study01")).await.unwrap();

    assert!(project.results_dir("study01").join("step01/out.txt").is_file());
    for summary in [&first, &second] {
        let info = std::fs::read_to_string(&summary.context.info_path).unwrap();
        assert!(!info.contains("[dirty"), "clean checkout expected:\n{info}");
    }
    assert_ne!(first.context.info_path, second.context.info_path);
}

/// Unknown studies fail before anything is written
#[tokio::test]
async fn test_unknown_study() {
    let project = TestProject::new();
    let err = runner(&project)
        .run(&request(&project, "missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, StudyError::StudyNotFound(_)));
    assert!(!project.results_dir("missing").exists());
}
