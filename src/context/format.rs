//! Fixed-layout text rendering of a [`RunContext`]

use std::fmt::Write;

use super::record::RunContext;

/// Date format used in headers, e.g. "16.10.2026 14:03:59"
pub const DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Placeholder for the git field outside a repository
pub const GIT_UNAVAILABLE: &str = "<N/A>";

/// Render the context header.
///
/// Field order and section headers are fixed; only the values vary. The
/// config section is emitted only when a config is attached. Output always
/// ends with a newline.
pub fn format_header(ctx: &RunContext) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "Context information");
    let _ = writeln!(out, "===================");
    let _ = writeln!(out, "Author:    {}", ctx.author);
    let _ = writeln!(out, "Date:      {}", ctx.timestamp.format(DATE_FORMAT));
    let _ = writeln!(out, "Git:       {}", git_field(ctx));
    out.push('\n');
    let _ = writeln!(out, "----------------------------");
    let _ = writeln!(out, "This file is auto-generated!");
    let _ = writeln!(out, "----------------------------");
    out.push('\n');

    let sys = &ctx.system;
    let _ = writeln!(out, "System:");
    let _ = writeln!(out, "-------");
    let _ = writeln!(out, "       OS: {}", sys.os);
    let _ = writeln!(out, "     Arch: {}", sys.arch);
    let _ = writeln!(out, "    Cores: {}", sys.cores);
    let _ = writeln!(out, "     Node: {}", sys.node);
    let _ = writeln!(out, "     User: {}", sys.user);
    let _ = writeln!(out, "  Runtime: {}", sys.interpreter);
    out.push('\n');

    let _ = writeln!(out, "Console:");
    let _ = writeln!(out, "--------");
    let _ = writeln!(out, "{}", command_line(&ctx.command));
    out.push('\n');

    if let Some(config) = &ctx.config {
        let _ = writeln!(out, "Config:");
        let _ = writeln!(out, "-------");
        let _ = writeln!(out, "Path: {}", config.path.display());
        out.push_str(&config.contents);
        if !config.contents.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Notes:");
    let _ = writeln!(out, "------");
    if let Some(notes) = ctx.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "{}", notes.trim_end());
    }

    out
}

fn git_field(ctx: &RunContext) -> String {
    let Some(git) = &ctx.git else {
        return GIT_UNAVAILABLE.to_string();
    };
    let hash = git.short_hash().unwrap_or("<no commits>");
    let mut field = format!("{} ({})", hash, git.repo_name);
    if git.dirty {
        let _ = write!(field, " [dirty: {}]", git.stats);
    }
    field
}

/// Join arguments into a line a POSIX shell splits back into the same
/// arguments. Arguments with NUL bytes cannot be quoted and are joined as is.
pub fn command_line(args: &[String]) -> String {
    shlex::try_join(args.iter().map(String::as_str)).unwrap_or_else(|_| args.join(" "))
}
