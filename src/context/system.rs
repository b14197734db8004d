//! Host and runtime identification

use std::fs;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::config::os_user;

/// Description of the machine a run executes on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// OS family plus distribution or kernel, e.g. "Linux (Ubuntu 22.04.4 LTS)"
    pub os: String,
    pub arch: String,
    pub cores: usize,
    /// Hostname
    pub node: String,
    pub user: String,
    /// Version string of the interpreter that runs the steps
    pub interpreter: String,
}

impl SystemInfo {
    /// Query the current host.
    ///
    /// `interpreter` names a program whose `--version` output identifies the
    /// step runtime (e.g. `python3`). Without one, or if it cannot be run,
    /// the studyrun version is recorded instead.
    pub fn detect(interpreter: Option<&str>) -> Self {
        Self {
            os: operating_system(),
            arch: std::env::consts::ARCH.to_string(),
            cores: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            node: hostname().unwrap_or_else(|| "unknown".to_string()),
            user: os_user().unwrap_or_else(|| "unknown".to_string()),
            interpreter: interpreter
                .and_then(interpreter_version)
                .unwrap_or_else(own_version),
        }
    }
}

/// "studyrun 0.1.0"
pub fn own_version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn os_family() -> &'static str {
    match std::env::consts::OS {
        "macos" => "Mac",
        "windows" => "Win",
        "linux" => "Linux",
        other => other,
    }
}

fn operating_system() -> String {
    match os_release() {
        Some(release) => format!("{} ({})", os_family(), release),
        None => os_family().to_string(),
    }
}

fn os_release() -> Option<String> {
    if cfg!(target_os = "linux") {
        if let Ok(contents) = fs::read_to_string("/etc/os-release") {
            if let Some(name) = parse_pretty_name(&contents) {
                return Some(name);
            }
        }
    }
    if cfg!(target_os = "macos") {
        return first_line_of(Command::new("sw_vers").arg("-productVersion"))
            .map(|v| format!("macOS {v}"));
    }
    if cfg!(windows) {
        return first_line_of(Command::new("cmd").args(["/C", "ver"]));
    }
    first_line_of(Command::new("uname").args(["-sr"]))
}

/// Extract PRETTY_NAME from /etc/os-release contents
fn parse_pretty_name(contents: &str) -> Option<String> {
    contents
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|v| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

fn hostname() -> Option<String> {
    if let Ok(name) = fs::read_to_string("/etc/hostname") {
        let name = name.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    if let Ok(name) = std::env::var("COMPUTERNAME") {
        if !name.is_empty() {
            return Some(name);
        }
    }
    first_line_of(&mut Command::new("hostname"))
}

/// `<program> --version`, first non-empty line of stdout or stderr.
/// Older Pythons print their version on stderr.
fn interpreter_version(program: &str) -> Option<String> {
    let output = Command::new(program).arg("--version").output().ok()?;
    if !output.status.success() {
        tracing::debug!(program, "Interpreter version query failed");
        return None;
    }
    first_non_empty_line(&output.stdout).or_else(|| first_non_empty_line(&output.stderr))
}

fn first_line_of(cmd: &mut Command) -> Option<String> {
    let output = cmd.output().ok()?;
    if !output.status.success() {
        return None;
    }
    first_non_empty_line(&output.stdout)
}

fn first_non_empty_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
