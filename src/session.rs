use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::config::DirsnapConfig;
use crate::error::ManagerError;
use crate::manager::DirectorySnapshotManager;
use crate::report::{PurgeReport, SnapshotReport, StatusReport};

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// One line of user input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `dir <path>`: point the session at a directory
    SetDir(String),
    /// `dir` with no argument: show the current directory
    ShowDir,
    /// `snapshot` / `save`: capture the whitelist
    Snapshot,
    /// `status`: dry-run view of what a purge would do
    Status,
    /// `list`: the files the manager currently sees
    List,
    /// `purge` / `delete`; `purge!` confirms past the no-snapshot gate
    Purge { confirmed: bool },
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }

    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    match head.to_ascii_lowercase().as_str() {
        "dir" | "cd" => {
            if rest.is_empty() {
                Command::ShowDir
            } else {
                Command::SetDir(rest.to_string())
            }
        }
        "snapshot" | "save" => Command::Snapshot,
        "status" => Command::Status,
        "list" | "ls" => Command::List,
        "purge" | "delete" => Command::Purge { confirmed: false },
        "purge!" | "delete!" => Command::Purge { confirmed: true },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

/// Whether the session keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlow {
    Continue,
    Quit,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub output: OutputFormat,
    pub no_color: bool,
    /// Disable the no-snapshot purge gate for the whole session.
    pub force: bool,
    /// Print a prompt between commands (stdin is a terminal).
    pub show_prompt: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            output: OutputFormat::Text,
            no_color: false,
            force: false,
            show_prompt: false,
        }
    }
}

/// Interactive console session around one [`DirectorySnapshotManager`].
///
/// Reads commands line by line, executes them synchronously, and renders
/// each result in the selected output format. The whitelist lives exactly
/// as long as this session. Purging while no snapshot is held for the
/// current directory is refused until the user confirms with `purge!`,
/// unless gating is disabled via `--force` or configuration.
pub struct Session {
    manager: DirectorySnapshotManager,
    config: DirsnapConfig,
    options: SessionOptions,
}

impl Session {
    pub fn new(
        manager: DirectorySnapshotManager,
        config: DirsnapConfig,
        options: SessionOptions,
    ) -> Self {
        Self {
            manager,
            config,
            options,
        }
    }

    /// Run the command loop until `quit`, end of input, or `running` goes
    /// false (Ctrl-C).
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        out: &mut W,
        running: &AtomicBool,
    ) -> Result<()> {
        self.banner(out)?;
        self.prompt(out)?;

        for line in input.lines() {
            if !running.load(Ordering::SeqCst) {
                break;
            }

            let line = line?;
            match self.execute(parse_command(&line), out)? {
                SessionFlow::Continue => {}
                SessionFlow::Quit => break,
            }
            self.prompt(out)?;
        }

        Ok(())
    }

    /// Execute a single command and render its result.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<SessionFlow> {
        match command {
            Command::Empty => {}
            Command::Quit => return Ok(SessionFlow::Quit),
            Command::Help => self.render_help(out)?,
            Command::ShowDir => self.render_current_dir(out)?,
            Command::SetDir(path) => {
                let had_snapshot = self.manager.has_snapshot();
                self.manager.set_directory(path);
                let dropped = had_snapshot && !self.manager.has_snapshot();
                self.render_dir_set(out, dropped)?;
            }
            Command::Snapshot => match self.manager.snapshot() {
                Ok(report) => self.render_snapshot(out, &report)?,
                Err(err) => self.render_error(out, "snapshot", &err)?,
            },
            Command::List => match self.manager.list_current() {
                Ok(mut names) => {
                    names.sort();
                    self.render_list(out, &names)?;
                }
                Err(err) => self.render_error(out, "list", &err)?,
            },
            Command::Status => match self.manager.status() {
                Ok(status) => self.render_status(out, &status)?,
                Err(err) => self.render_error(out, "status", &err)?,
            },
            Command::Purge { confirmed } => self.run_purge(confirmed, out)?,
            Command::Unknown(word) => self.render_unknown(out, &word)?,
        }

        Ok(SessionFlow::Continue)
    }

    fn run_purge<W: Write>(&mut self, confirmed: bool, out: &mut W) -> Result<()> {
        let gated = self.config.purge.require_snapshot && !self.options.force;
        if gated && !self.manager.has_snapshot() && !confirmed {
            // Without a snapshot the whitelist is empty and every file is a
            // deletion candidate, so make the user say it twice.
            return match self.manager.status() {
                Ok(status) => self.render_purge_gate(out, status.untracked.len()),
                Err(err) => self.render_error(out, "purge", &err),
            };
        }

        match self.manager.purge_untracked() {
            Ok(mut report) => {
                report.cap_failures(self.config.purge.max_reported_failures);
                self.render_purge(out, &report)
            }
            Err(err) => self.render_error(out, "purge", &err),
        }
    }

    fn banner<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.options.show_prompt && self.options.output == OutputFormat::Text {
            writeln!(out, "dirsnap session. Type `help` for commands, `quit` to leave.")?;
            if !self.manager.directory().as_os_str().is_empty() {
                writeln!(out, "Directory: {}", self.manager.directory().display())?;
            }
        }
        Ok(())
    }

    fn prompt<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.options.show_prompt && self.options.output == OutputFormat::Text {
            write!(out, "dirsnap> ")?;
            out.flush()?;
        }
        Ok(())
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.options.no_color {
            text.to_string()
        } else {
            format!("{}{}{}", color, text, RESET)
        }
    }

    fn render_error<W: Write>(&self, out: &mut W, command: &str, err: &ManagerError) -> Result<()> {
        match self.options.output {
            OutputFormat::Text => {
                writeln!(out, "{}", self.paint(RED, &format!("ERROR: {}", err)))?;
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({
                        "command": command,
                        "ok": false,
                        "kind": err.kind_str(),
                        "error": err.to_string(),
                    })
                )?;
            }
            OutputFormat::Compact => {
                writeln!(out, "E {}", err.kind_str())?;
            }
        }
        Ok(())
    }

    fn render_snapshot<W: Write>(&self, out: &mut W, report: &SnapshotReport) -> Result<()> {
        match self.options.output {
            OutputFormat::Text => {
                writeln!(
                    out,
                    "{}",
                    self.paint(
                        GREEN,
                        &format!(
                            "Saved {} file(s) from {} to the whitelist.",
                            report.file_count,
                            report.directory.display()
                        )
                    )
                )?;
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({"command": "snapshot", "ok": true, "report": report})
                )?;
            }
            OutputFormat::Compact => {
                writeln!(out, "S {}", report.file_count)?;
            }
        }
        Ok(())
    }

    fn render_purge<W: Write>(&self, out: &mut W, report: &PurgeReport) -> Result<()> {
        match self.options.output {
            OutputFormat::Text => {
                if report.deleted == 0 && report.is_clean() {
                    writeln!(out, "Nothing to delete; directory matches the whitelist.")?;
                } else {
                    writeln!(
                        out,
                        "{}",
                        self.paint(GREEN, &format!("Deleted {} new file(s).", report.deleted))
                    )?;
                }
                for failure in &report.failures {
                    writeln!(
                        out,
                        "{}",
                        self.paint(
                            RED,
                            &format!("  could not delete {} ({})", failure.name, failure.kind.as_str())
                        )
                    )?;
                }
                if report.suppressed_failures > 0 {
                    writeln!(
                        out,
                        "{}",
                        self.paint(
                            RED,
                            &format!("  ... and {} more failure(s)", report.suppressed_failures)
                        )
                    )?;
                }
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({"command": "purge", "ok": true, "report": report})
                )?;
            }
            OutputFormat::Compact => {
                writeln!(
                    out,
                    "P {} {}",
                    report.deleted,
                    report.failures.len() + report.suppressed_failures
                )?;
                for failure in &report.failures {
                    writeln!(out, "F {} {}", failure.name, failure.kind.code())?;
                }
            }
        }
        Ok(())
    }

    fn render_purge_gate<W: Write>(&self, out: &mut W, candidates: usize) -> Result<()> {
        match self.options.output {
            OutputFormat::Text => {
                writeln!(
                    out,
                    "{}",
                    self.paint(
                        YELLOW,
                        &format!(
                            "No snapshot has been taken for this directory. A purge now would \
delete ALL {} file(s) here. Type `purge!` to do it anyway.",
                            candidates
                        )
                    )
                )?;
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({
                        "command": "purge",
                        "ok": false,
                        "kind": "not_snapshotted",
                        "would_delete": candidates,
                    })
                )?;
            }
            OutputFormat::Compact => {
                writeln!(out, "E not_snapshotted")?;
            }
        }
        Ok(())
    }

    fn render_status<W: Write>(&self, out: &mut W, status: &StatusReport) -> Result<()> {
        match self.options.output {
            OutputFormat::Text => {
                writeln!(out, "Directory: {}", status.directory.display())?;
                match status.snapshot_taken_at {
                    Some(taken_at) => writeln!(
                        out,
                        "Snapshot: taken {}",
                        taken_at.format("%Y-%m-%d %H:%M:%S UTC")
                    )?,
                    None => writeln!(out, "Snapshot: none")?,
                }
                writeln!(out, "Tracked: {}", status.tracked)?;
                if status.untracked.is_empty() {
                    writeln!(out, "Untracked: none")?;
                } else {
                    writeln!(out, "Untracked (a purge would delete these):")?;
                    for name in &status.untracked {
                        writeln!(out, "  {}", self.paint(RED, name))?;
                    }
                }
                if !status.missing.is_empty() {
                    writeln!(out, "Missing from disk:")?;
                    for name in &status.missing {
                        writeln!(out, "  {}", self.paint(YELLOW, name))?;
                    }
                }
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({"command": "status", "ok": true, "report": status})
                )?;
            }
            OutputFormat::Compact => {
                writeln!(
                    out,
                    "T {} U {} M {}",
                    status.tracked,
                    status.untracked.len(),
                    status.missing.len()
                )?;
            }
        }
        Ok(())
    }

    fn render_list<W: Write>(&self, out: &mut W, names: &[String]) -> Result<()> {
        match self.options.output {
            OutputFormat::Text => {
                if names.is_empty() {
                    writeln!(out, "(no files)")?;
                } else {
                    for name in names {
                        writeln!(out, "{}", name)?;
                    }
                }
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({"command": "list", "ok": true, "files": names})
                )?;
            }
            OutputFormat::Compact => {
                for name in names {
                    writeln!(out, "{}", name)?;
                }
            }
        }
        Ok(())
    }

    fn render_dir_set<W: Write>(&self, out: &mut W, snapshot_dropped: bool) -> Result<()> {
        match self.options.output {
            OutputFormat::Text => {
                writeln!(
                    out,
                    "Directory set to: {}",
                    self.manager.directory().display()
                )?;
                if snapshot_dropped {
                    writeln!(
                        out,
                        "{}",
                        self.paint(YELLOW, "Note: the previous snapshot no longer applies.")
                    )?;
                }
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({
                        "command": "dir",
                        "ok": true,
                        "directory": self.manager.directory(),
                        "snapshot_dropped": snapshot_dropped,
                    })
                )?;
            }
            OutputFormat::Compact => {
                writeln!(out, "D {}", self.manager.directory().display())?;
            }
        }
        Ok(())
    }

    fn render_current_dir<W: Write>(&self, out: &mut W) -> Result<()> {
        let directory = self.manager.directory();
        match self.options.output {
            OutputFormat::Text => {
                if directory.as_os_str().is_empty() {
                    writeln!(out, "Directory: (unset)")?;
                } else {
                    writeln!(out, "Directory: {}", directory.display())?;
                }
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({"command": "dir", "ok": true, "directory": directory})
                )?;
            }
            OutputFormat::Compact => {
                writeln!(out, "D {}", directory.display())?;
            }
        }
        Ok(())
    }

    fn render_unknown<W: Write>(&self, out: &mut W, word: &str) -> Result<()> {
        match self.options.output {
            OutputFormat::Text => {
                writeln!(
                    out,
                    "{}",
                    self.paint(
                        RED,
                        &format!("Unknown command '{}'. Type `help` for commands.", word)
                    )
                )?;
            }
            OutputFormat::Json => {
                writeln!(
                    out,
                    "{}",
                    json!({"command": word, "ok": false, "kind": "unknown_command"})
                )?;
            }
            OutputFormat::Compact => {
                writeln!(out, "E unknown_command")?;
            }
        }
        Ok(())
    }

    fn render_help<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Commands:")?;
        writeln!(out, "  dir <path>   point the session at a directory")?;
        writeln!(out, "  dir          show the current directory")?;
        writeln!(out, "  snapshot     save the current files as the whitelist (alias: save)")?;
        writeln!(out, "  status       show what a purge would delete, without deleting")?;
        writeln!(out, "  list         list the files the session currently sees (alias: ls)")?;
        writeln!(out, "  purge        delete every file not on the whitelist (alias: delete)")?;
        writeln!(out, "  purge!       purge even without a snapshot")?;
        writeln!(out, "  quit         end the session (alias: exit)")?;
        Ok(())
    }
}
