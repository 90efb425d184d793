//! External command stages (tests, or anything else a task shells out to)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use super::action::{StageAction, StageContext};
use super::error::{FailureKind, StageError};

/// Lines of stderr kept in a failure diagnostic
const STDERR_TAIL_LINES: usize = 20;

/// Runs a program with the stage environment
#[derive(Debug, Clone)]
pub struct CommandStage {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    failure: FailureKind,
}

impl CommandStage {
    /// Builds a stage from `[program, args...]`; `None` if `argv` is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: None,
            env: BTreeMap::new(),
            failure: FailureKind::Command,
        })
    }

    /// Directory to run in, relative to the project directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Category of error reported when the program exits unsuccessfully
    pub fn failure_kind(mut self, kind: FailureKind) -> Self {
        self.failure = kind;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the program, returning its stdout on success
    pub fn execute(&self, ctx: &StageContext<'_>) -> Result<String, StageError> {
        let dir = match &self.working_dir {
            Some(dir) => ctx.resolve(dir),
            None => ctx.project_dir.to_path_buf(),
        };

        debug!(task = %ctx.task, command = %self.command_line(), dir = %dir.display(), "Spawning command");

        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&dir)
            .envs(ctx.env())
            .envs(&self.env)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| StageError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stdout.is_empty() {
            debug!(task = %ctx.task, "stdout:\n{}", stdout.trim_end());
        }

        if output.status.success() {
            return Ok(stdout);
        }

        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        };
        let mut message = format!("`{}` terminated with {}", self.command_line(), status);
        let tail = tail_lines(&stderr, STDERR_TAIL_LINES);
        if !tail.is_empty() {
            message.push('\n');
            message.push_str(&tail);
        }

        Err(self.failure.error(message))
    }
}

impl StageAction for CommandStage {
    fn kind(&self) -> &'static str {
        match self.failure {
            FailureKind::Test => "test",
            _ => "command",
        }
    }

    fn run(&self, ctx: &StageContext<'_>) -> Result<(), StageError> {
        self.execute(ctx).map(|_| ())
    }
}

fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
