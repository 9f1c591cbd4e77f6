//! Handler and shell execution with normalized, model-facing results.
//!
//! Every dispatch target runs as a freshly spawned child process under one
//! deadline policy. The process boundary is the sandboxing seam: handlers
//! share nothing with the engine but their argv and captured output.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::instrument;

use super::process::{CommandOutput, run_command_with_timeout};

/// Complete outcome of one child-process invocation. Either the whole
/// struct is produced or the call fails; there is no partial result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed (timeout) or ended by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ExecutionResult {
    fn from_output(output: CommandOutput) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.and_then(|status| status.code()),
            timed_out: output.timed_out(),
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs dispatch targets as isolated child processes under the configured
/// deadline and capture limit.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandRunner {
    pub fn new(timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }

    /// Run one command line through the shell argv prefix (for the reserved
    /// local-shell command).
    #[instrument(skip_all, fields(timeout_secs = self.timeout.as_secs()))]
    pub fn run_shell(&self, shell_command: &[String], command_line: &str) -> Result<ExecutionResult> {
        let (program, prefix) = shell_command
            .split_first()
            .ok_or_else(|| anyhow!("shell command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(prefix).arg(command_line);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run shell command via '{program}'"))?;
        Ok(ExecutionResult::from_output(output))
    }

    /// Run a handler script out of process with positional arguments.
    #[instrument(skip_all, fields(script = %script.display()))]
    pub fn run_handler(
        &self,
        interpreter: &[String],
        script: &Path,
        args: &[String],
    ) -> Result<ExecutionResult> {
        let (program, prefix) = interpreter
            .split_first()
            .ok_or_else(|| anyhow!("handler interpreter is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(prefix).arg(script).args(args);
        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run handler '{}'", script.display()))?;
        Ok(ExecutionResult::from_output(output))
    }

    /// Render an execution result as the feedback string the model sees.
    ///
    /// Timeouts and nonzero exits become tagged error strings; a clean run
    /// with empty stdout is normalized to an informational line.
    pub fn render_result(&self, label: &str, result: &ExecutionResult) -> String {
        if result.timed_out {
            return format!(
                "[EXECUTION ERROR] Command '{label}' timed out after {} seconds.",
                self.timeout.as_secs()
            );
        }
        if !result.success() {
            let detail = if result.stderr.trim().is_empty() {
                "the process failed but produced no error output"
            } else {
                result.stderr.trim_end()
            };
            return match result.exit_code {
                Some(code) => format!(
                    "[EXECUTION ERROR] Command '{label}' failed with exit code {code}:\n{detail}"
                ),
                None => format!(
                    "[EXECUTION ERROR] Command '{label}' was terminated by a signal:\n{detail}"
                ),
            };
        }
        if result.stdout.trim().is_empty() {
            return format!("[INFO] Command '{label}' ran with no output.");
        }
        result.stdout.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn runner() -> CommandRunner {
        CommandRunner::new(Duration::from_secs(5), 100_000)
    }

    fn sh() -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string()]
    }

    #[test]
    fn shell_command_captures_stdout() {
        let result = runner().run_shell(&sh(), "echo hello").expect("run");
        assert_eq!(result.stdout, "hello\n");
        assert!(result.success());
    }

    #[test]
    fn nonzero_exit_is_rendered_with_code_and_stderr() {
        let runner = runner();
        let result = runner
            .run_shell(&sh(), "echo boom >&2; exit 3")
            .expect("run");
        assert_eq!(result.exit_code, Some(3));

        let rendered = runner.render_result("run_shell", &result);
        assert!(rendered.contains("exit code 3"));
        assert!(rendered.contains("boom"));
        assert!(rendered.starts_with("[EXECUTION ERROR]"));
    }

    #[test]
    fn empty_stdout_on_success_is_normalized() {
        let runner = runner();
        let result = runner.run_shell(&sh(), "true").expect("run");
        assert_eq!(
            runner.render_result("noop", &result),
            "[INFO] Command 'noop' ran with no output."
        );
    }

    #[test]
    fn timeout_is_flagged_with_no_exit_code() {
        let runner = CommandRunner::new(Duration::from_millis(200), 100_000);
        let result = runner.run_shell(&sh(), "sleep 30").expect("run");

        assert!(result.timed_out);
        assert_eq!(result.exit_code, None);
        assert!(runner.render_result("slow", &result).contains("timed out"));
    }

    #[test]
    fn handler_receives_positional_arguments() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("greet.sh");
        fs::write(&script, "echo \"greeting: $1\"\n").expect("write script");

        let result = runner()
            .run_handler(&["sh".to_string()], &script, &["world".to_string()])
            .expect("run");
        assert_eq!(result.stdout, "greeting: world\n");
    }

    #[test]
    fn missing_interpreter_surfaces_as_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("x.sh");
        fs::write(&script, "echo hi\n").expect("write script");

        let err = runner()
            .run_handler(&["no-such-interpreter-xyz".to_string()], &script, &[])
            .unwrap_err();
        assert!(err.to_string().contains("run handler"));
    }
}
