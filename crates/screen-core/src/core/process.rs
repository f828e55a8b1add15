use std::ffi::OsString;
use std::io;
use std::process::{Command, Stdio};
use tracing::trace;

/// Captured result of one external process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Standard output followed by standard error.
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        combined.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') && !self.stderr.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&self.stderr);
        combined
    }
}

/// The seam between the pipeline and the external executables it drives.
///
/// Invocations are synchronous: the call returns once the process has exited and its
/// output has been captured. `Err` is reserved for failures to start the process.
pub trait ProcessRunner: Send + Sync {
    fn invoke(&self, program: &str, args: &[OsString]) -> io::Result<ProcessOutput>;
}

/// Runs programs on the host through `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn invoke(&self, program: &str, args: &[OsString]) -> io::Result<ProcessOutput> {
        trace!(program, ?args, "Spawning external process.");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Returns the last `max_chars` characters of `text`, trimmed and flattened onto one line.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let total = trimmed.chars().count();
    let tail: String = trimmed.chars().skip(total.saturating_sub(max_chars)).collect();
    let flattened = tail.split_whitespace().collect::<Vec<_>>().join(" ");
    if total > max_chars {
        format!("...{}", flattened)
    } else {
        flattened
    }
}
