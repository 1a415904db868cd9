//! Command builder for child processes

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::process::ProcessError;

/// Default PATH for children when the host has none
const DEFAULT_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Builder for a child process launched by [`run_with_deadline`](super::run_with_deadline)
///
/// The child starts with an empty environment; variables must be set with
/// [`env`](Self::env) or passed through with [`env_inherit`](Self::env_inherit).
#[derive(Debug, Clone)]
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    env_inherit: Vec<String>,
    stdin: Option<Vec<u8>>,
    max_output: Option<usize>,
}

impl ProcessCommand {
    /// Create a new command for `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            env_inherit: Vec::new(),
            stdin: None,
            max_output: None,
        }
    }

    /// Create a command from an argument vector whose first entry is the program
    pub fn from_argv(argv: impl IntoIterator<Item = impl Into<String>>) -> Result<Self, ProcessError> {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next().ok_or(ProcessError::EmptyCommand)?;
        if program.is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        Ok(Self::new(program).args(argv))
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set multiple environment variables
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Inherit an environment variable from the parent process
    pub fn env_inherit(mut self, key: impl Into<String>) -> Self {
        self.env_inherit.push(key.into());
        self
    }

    /// Bytes written to the child's stdin, which is closed afterwards.
    ///
    /// Without this, stdin is connected to `/dev/null`.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Cap the captured size of each output stream in bytes
    pub fn max_output(mut self, bytes: Option<usize>) -> Self {
        self.max_output = bytes;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub(crate) fn stdin_data(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    pub(crate) fn max_output_bytes(&self) -> Option<usize> {
        self.max_output
    }

    /// Build the tokio command.
    ///
    /// The child leads a new process group so the whole tree can be killed,
    /// and is killed if its handle is dropped.
    pub(crate) fn build(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env_clear()
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for key in &self.env_inherit {
            match std::env::var_os(key) {
                Some(value) => {
                    command.env(key, value);
                }
                None if key == "PATH" => {
                    command.env(key, DEFAULT_PATH);
                }
                None => {}
            }
        }
        command.envs(&self.env);

        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        command.process_group(0);

        command
    }
}
