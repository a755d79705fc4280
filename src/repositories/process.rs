//! Fire-and-forget process launching for policy refresh.

use crate::error::{ParameterError, Result};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

pub trait ProcessRunner {
    /// Start `program` without waiting for it to exit.
    fn launch(&self, program: &str, args: &[String]) -> Result;
}

/// Spawns real processes. On Windows the child gets no console window.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

impl ProcessRunner for CommandRunner {
    fn launch(&self, program: &str, args: &[String]) -> Result {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::CREATE_NO_WINDOW;
            command.creation_flags(CREATE_NO_WINDOW.0);
        }

        // The child is detached; dropping the handle does not wait on it.
        command
            .spawn()
            .map(drop)
            .map_err(|e| ParameterError::ProcessLaunch(format!("{}: {}", program, e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: String,
    pub args: Vec<String>,
}

/// Records launches instead of running them. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    launches: Arc<Mutex<Vec<Launch>>>,
    fail: bool,
}

impl RecordingRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner whose launches are recorded and then reported as failed.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn launches(&self) -> Vec<Launch> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ProcessRunner for RecordingRunner {
    fn launch(&self, program: &str, args: &[String]) -> Result {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Launch {
                program: program.to_string(),
                args: args.to_vec(),
            });

        if self.fail {
            return Err(ParameterError::ProcessLaunch(format!(
                "{}: simulated failure",
                program
            )));
        }
        Ok(())
    }
}
